// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Persistent relay link identity

use core::{fmt, str::FromStr};

use log::{debug, info, warn};
use rand::{rngs::OsRng, RngCore};
use zeroize::Zeroizing;

use esr_abi::PublicKey;
use esr_core::PrivateKey;

use crate::{store::StateStore, Error};

/// State store key for the link id
pub const LINK_ID_KEY: &str = "link_id";

/// State store key for the request private key
pub const REQUEST_KEY_KEY: &str = "request_key";

/// Link id length in bytes (hex encoded for use)
pub const LINK_ID_LEN: usize = 16;

/// Identity presented to the relay so applications can address this wallet
///
/// The request key is used to unseal inbound messages and is never transmitted.
#[derive(Clone, PartialEq)]
pub struct RelayLinkIdentity {
    link_id: String,
    request_key: PrivateKey,
    request_public: PublicKey,
}

impl RelayLinkIdentity {
    /// Generate a new identity
    pub fn generate() -> Result<Self, Error> {
        let mut id = [0u8; LINK_ID_LEN];
        OsRng.fill_bytes(&mut id);

        Self::new(hex::encode(id), PrivateKey::generate())
    }

    pub fn new(link_id: String, request_key: PrivateKey) -> Result<Self, Error> {
        let request_public = request_key.public_key()?;

        Ok(Self {
            link_id,
            request_key,
            request_public,
        })
    }

    /// Load the identity from `store`, generating and persisting a new one where
    /// none exists or the stored values are unusable
    pub async fn load_or_generate(store: &dyn StateStore) -> Result<Self, Error> {
        let link_id = store.get(LINK_ID_KEY).await?.filter(|id| is_link_id(id));
        let request_key = store.get(REQUEST_KEY_KEY).await?.map(Zeroizing::new);

        let stored = match (link_id, request_key) {
            (Some(id), Some(k)) => match PrivateKey::from_str(&k).map_err(Error::from) {
                Ok(key) => Self::new(id, key).ok(),
                Err(e) => {
                    warn!("Stored request key unusable ({}), regenerating link", e);
                    None
                }
            },
            _ => None,
        };

        if let Some(i) = stored {
            debug!("Loaded relay link {}", i.link_id);
            return Ok(i);
        }

        let i = Self::generate()?;
        store.set(LINK_ID_KEY, &i.link_id).await?;
        store
            .set(REQUEST_KEY_KEY, &Zeroizing::new(i.request_key.to_string()))
            .await?;

        info!("Generated relay link {} ({})", i.link_id, i.request_public);

        Ok(i)
    }

    pub fn link_id(&self) -> &str {
        &self.link_id
    }

    pub fn request_key(&self) -> &PrivateKey {
        &self.request_key
    }

    pub fn request_public_key(&self) -> &PublicKey {
        &self.request_public
    }
}

impl fmt::Debug for RelayLinkIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelayLinkIdentity")
            .field("link_id", &self.link_id)
            .field("request_public", &self.request_public)
            .finish()
    }
}

fn is_link_id(s: &str) -> bool {
    s.len() == LINK_ID_LEN * 2 && s.bytes().all(|c| matches!(c, b'0'..=b'9' | b'a'..=b'f'))
}
