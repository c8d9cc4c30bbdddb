// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Signing requests
//!
//! A [SigningRequest] describes an action, action list, full transaction or
//! identity proof for a specific chain, compactly encoded for embedding in URIs.
//!
//! ## Encoding
//! ```text
//!  header     u8          version (bits 0..2) | 0x80 when the payload is deflated
//!  payload    (optionally raw DEFLATE compressed)
//!    chain_id   variant     0: alias u8, 1: checksum256
//!    req        variant     0: action, 1: action[], 2: transaction, 3: identity
//!    flags      u8          (may be absent)
//!    callback   string      (empty for none)
//!    info       info_pair[] (may be absent)
//! ```
//!
//! Identity requests carry `permission_level?` in version 2, and
//! `scope name` followed by `permission_level?` in version 3.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use esr_abi::Name;

use crate::{
    chain::{ChainAlias, ChainId},
    transaction::{AbiMap, Action, PermissionLevel, Transaction},
    Error,
};

mod encoding;
pub use encoding::EncodeOptions;

mod flags;
pub use flags::RequestFlags;

mod sign;
pub use sign::SignedCallbackResponse;

/// Protocol versions accepted when decoding
pub const SUPPORTED_VERSIONS: &[u8] = &[2, 3];

/// Default protocol version for new requests
pub const DEFAULT_VERSION: u8 = 2;

/// Chain identifier as carried in a request
#[derive(Copy, Clone, PartialEq, Debug, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ChainIdVariant {
    Alias(ChainAlias),
    Id(ChainId),
}

impl ChainIdVariant {
    /// Resolve to a full chain id
    pub fn chain_id(&self) -> ChainId {
        match self {
            ChainIdVariant::Alias(a) => a.chain_id(),
            ChainIdVariant::Id(id) => *id,
        }
    }

    /// Use the alias form where one exists for this chain
    pub fn compact(id: ChainId) -> Self {
        match ChainAlias::from_chain_id(&id) {
            Some(a) => ChainIdVariant::Alias(a),
            None => ChainIdVariant::Id(id),
        }
    }
}

impl From<ChainAlias> for ChainIdVariant {
    fn from(a: ChainAlias) -> Self {
        ChainIdVariant::Alias(a)
    }
}

impl From<ChainId> for ChainIdVariant {
    fn from(id: ChainId) -> Self {
        ChainIdVariant::Id(id)
    }
}

/// Identity proof request
#[derive(Clone, PartialEq, Debug, Default, Serialize, Deserialize)]
pub struct IdentityRequest {
    /// Requesting application scope (version 3)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<Name>,
    /// Requested permission, the placeholder permission accepts any signer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permission: Option<PermissionLevel>,
}

/// Request payload
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum RequestPayload {
    Action(Action),
    Actions(Vec<Action>),
    Transaction(Transaction),
    Identity(IdentityRequest),
}

impl RequestPayload {
    /// Variant index on the wire
    pub fn index(&self) -> u8 {
        match self {
            RequestPayload::Action(_) => 0,
            RequestPayload::Actions(_) => 1,
            RequestPayload::Transaction(_) => 2,
            RequestPayload::Identity(_) => 3,
        }
    }

    /// Actions carried by this payload (none for identity requests)
    pub fn actions(&self) -> &[Action] {
        match self {
            RequestPayload::Action(a) => core::slice::from_ref(a),
            RequestPayload::Actions(a) => a,
            RequestPayload::Transaction(t) => &t.actions,
            RequestPayload::Identity(_) => &[],
        }
    }
}

/// Opaque request metadata
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct InfoPair {
    pub key: String,
    #[serde(with = "crate::helpers::hex_bytes")]
    pub value: Vec<u8>,
}

/// Decoded signing request
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct SigningRequest {
    pub version: u8,
    pub chain_id: ChainIdVariant,
    pub req: RequestPayload,
    /// `None` where the flags byte was absent
    pub flags: Option<RequestFlags>,
    pub callback: Option<String>,
    pub info: Vec<InfoPair>,
    /// URI this request was decoded from, echoed in callbacks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original: Option<String>,
}

impl SigningRequest {
    /// Create a request with default flags (broadcast) and no callback
    pub fn new(chain_id: impl Into<ChainIdVariant>, req: RequestPayload) -> Self {
        Self {
            version: DEFAULT_VERSION,
            chain_id: chain_id.into(),
            req,
            flags: Some(RequestFlags::BROADCAST),
            callback: None,
            info: vec![],
            original: None,
        }
    }

    /// Create an identity request
    pub fn identity(chain_id: impl Into<ChainIdVariant>, permission: Option<PermissionLevel>) -> Self {
        let mut r = Self::new(
            chain_id,
            RequestPayload::Identity(IdentityRequest {
                scope: None,
                permission,
            }),
        );
        r.flags = Some(RequestFlags::empty());
        r
    }

    pub fn with_flags(mut self, flags: RequestFlags) -> Self {
        self.flags = Some(flags);
        self
    }

    pub fn with_callback(mut self, callback: impl Into<String>) -> Self {
        self.callback = Some(callback.into());
        self
    }

    pub fn with_info(mut self, key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        self.info.push(InfoPair {
            key: key.into(),
            value: value.into(),
        });
        self
    }

    /// Resolve the chain id (aliases are expanded)
    pub fn chain_id(&self) -> ChainId {
        self.chain_id.chain_id()
    }

    pub fn is_identity(&self) -> bool {
        matches!(self.req, RequestPayload::Identity(_))
    }

    /// Check whether the signed transaction should be broadcast by the wallet,
    /// identity proofs are never broadcast
    pub fn should_broadcast(&self) -> bool {
        !self.is_identity()
            && self
                .flags
                .map(|f| f.contains(RequestFlags::BROADCAST))
                .unwrap_or(false)
    }

    pub fn is_background(&self) -> bool {
        self.flags
            .map(|f| f.contains(RequestFlags::BACKGROUND))
            .unwrap_or(false)
    }

    /// Fetch an info value by key
    pub fn info(&self, key: &str) -> Option<&[u8]> {
        self.info
            .iter()
            .find(|i| i.key == key)
            .map(|i| i.value.as_slice())
    }

    /// Fetch a UTF-8 info value by key
    pub fn info_string(&self, key: &str) -> Option<String> {
        self.info(key)
            .and_then(|v| core::str::from_utf8(v).ok())
            .map(|s| s.to_string())
    }

    /// Contracts referenced by the request, ABIs for these are needed to resolve
    /// placeholders in action data
    pub fn contracts(&self) -> Vec<Name> {
        let mut seen = BTreeSet::new();
        let mut contracts = vec![];

        let cfa = match &self.req {
            RequestPayload::Transaction(t) => t.context_free_actions.as_slice(),
            _ => &[],
        };

        for a in cfa.iter().chain(self.req.actions()) {
            if seen.insert(a.account) {
                contracts.push(a.account);
            }
        }

        contracts
    }

    /// Decode action data to typed fields where ABIs are available
    pub fn decode_actions(&self, abis: &AbiMap) -> Result<Vec<Action>, Error> {
        self.req
            .actions()
            .iter()
            .map(|a| match abis.get(&a.account) {
                Some(abi) => a.decode(abi),
                None => Ok(a.clone()),
            })
            .collect()
    }
}
