// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Wallet handle for signing requests
//!
//! This resolves requests against chain state supplied by the host's
//! collaborators, signs them, optionally broadcasts the result and delivers
//! callbacks.

use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use log::{debug, info, warn};
use tokio::{sync::Mutex, time::timeout};

use esr_abi::{Abi, Name, TimePointSec};
use esr_core::{
    request::SignedCallbackResponse, transaction::AbiMap, CallbackPayload, ChainId,
    PermissionLevel, SignerConfig, SigningRequest,
};

use crate::{
    provider::{AbiProvider, Broadcaster, ChainInfoProvider, KeySupplier, PushTransaction},
    Error,
};

/// Default callback validity
pub const DEFAULT_CALLBACK_EXPIRE_SECONDS: u32 = 30;

/// Wallet handle configuration
#[derive(Clone, PartialEq, Debug)]
pub struct WalletConfig {
    pub signer: SignerConfig,
    /// Validity of callback payloads from delivery
    pub callback_expire_seconds: u32,
    /// Timeout for each collaborator or callback request
    pub request_timeout: Duration,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            signer: SignerConfig::default(),
            callback_expire_seconds: DEFAULT_CALLBACK_EXPIRE_SECONDS,
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// Handle for resolving, signing and answering signing requests
#[derive(Clone)]
pub struct WalletHandle {
    chain: Arc<dyn ChainInfoProvider>,
    abis: Arc<dyn AbiProvider>,
    keys: Arc<dyn KeySupplier>,
    broadcaster: Option<Arc<dyn Broadcaster>>,
    http: reqwest::Client,
    cache: Arc<Mutex<HashMap<(ChainId, Name), Abi>>>,
    config: WalletConfig,
}

impl WalletHandle {
    pub fn new(
        chain: Arc<dyn ChainInfoProvider>,
        abis: Arc<dyn AbiProvider>,
        keys: Arc<dyn KeySupplier>,
        config: WalletConfig,
    ) -> Self {
        Self {
            chain,
            abis,
            keys,
            broadcaster: None,
            http: reqwest::Client::new(),
            cache: Arc::new(Mutex::new(HashMap::new())),
            config,
        }
    }

    /// Enable broadcasting of signed transactions
    pub fn with_broadcaster(mut self, broadcaster: Arc<dyn Broadcaster>) -> Self {
        self.broadcaster = Some(broadcaster);
        self
    }

    pub fn config(&self) -> &WalletConfig {
        &self.config
    }

    /// Parse a request URI
    pub fn parse(&self, uri: &str) -> Result<SigningRequest, Error> {
        let r = SigningRequest::from_uri(uri)?;

        debug!(
            "Parsed request v{} for chain {} ({} actions)",
            r.version,
            r.chain_id(),
            r.req.actions().len()
        );

        Ok(r)
    }

    /// Fetch ABIs for contracts referenced by `req`, these are cached per chain
    pub async fn fetch_abis(&self, req: &SigningRequest) -> Result<AbiMap, Error> {
        let chain_id = req.chain_id();
        let mut abis = AbiMap::new();

        for account in req.contracts() {
            let cached = self.cache.lock().await.get(&(chain_id, account)).cloned();

            let abi = match cached {
                Some(a) => a,
                None => {
                    debug!("Fetching ABI for {}", account);

                    let a = timeout(
                        self.config.request_timeout,
                        self.abis.abi(&chain_id, account),
                    )
                    .await??;

                    self.cache
                        .lock()
                        .await
                        .insert((chain_id, account), a.clone());
                    a
                }
            };

            abis.insert(account, abi);
        }

        Ok(abis)
    }

    /// Resolve and sign a request for `signer`
    ///
    /// Transactions are broadcast where requested by the request flags or by
    /// `broadcast`, identity proofs are never broadcast.
    pub async fn sign(
        &self,
        req: &SigningRequest,
        signer: &PermissionLevel,
        broadcast: bool,
    ) -> Result<SignedCallbackResponse, Error> {
        let chain_id = req.chain_id();

        let info = timeout(self.config.request_timeout, self.chain.chain_info(&chain_id)).await??;

        let abis = match req.is_identity() {
            true => AbiMap::new(),
            false => self.fetch_abis(req).await?,
        };

        let key = self.keys.signing_key(&chain_id, signer).await?;

        let mut resp = req.sign(&key, &info, unix_now(), signer, &abis, &self.config.signer)?;

        info!(
            "Signed {} for {} on {}",
            if resp.is_identity { "identity proof" } else { "transaction" },
            signer,
            chain_id
        );

        if (broadcast || req.should_broadcast()) && !req.is_identity() {
            let b = self.broadcaster.as_ref().ok_or_else(|| {
                Error::unsupported("broadcast requested with no broadcaster configured")
            })?;

            let push = PushTransaction::new(resp.signatures.clone(), &resp.packed_transaction);
            let r = timeout(self.config.request_timeout, b.broadcast(&chain_id, &push)).await??;

            info!(
                "Broadcast transaction {} (block {})",
                r.transaction_id, r.block_num
            );

            resp.set_broadcast(r.transaction_id, r.block_num);
        }

        Ok(resp)
    }

    /// Build the callback payload for a signed request, expiring shortly
    pub fn callback_payload(&self, resp: &SignedCallbackResponse) -> Result<CallbackPayload, Error> {
        let expires = TimePointSec::from_unix(
            unix_now().saturating_add(self.config.callback_expire_seconds),
        );

        Ok(resp.callback_payload(expires)?)
    }

    /// POST the callback payload to the request callback URL
    ///
    /// Returns whether the callback was accepted, failures are not retried.
    pub async fn send_callback(
        &self,
        req: &SigningRequest,
        resp: &SignedCallbackResponse,
    ) -> Result<bool, Error> {
        let template = match req.callback.as_deref() {
            Some(c) if !c.is_empty() => c,
            _ => return Err(Error::unsupported("request has no callback")),
        };

        let payload = self.callback_payload(resp)?;
        let url = payload.expand(template);

        debug!("Delivering callback to {}", url);

        let r = timeout(
            self.config.request_timeout,
            self.http.post(&url).json(&payload).send(),
        )
        .await;

        match r {
            Ok(Ok(r)) if r.status().is_success() => Ok(true),
            Ok(Ok(r)) => {
                warn!("Callback to {} rejected: HTTP {}", url, r.status());
                Ok(false)
            }
            Ok(Err(e)) => {
                warn!("Callback to {} failed: {}", url, e);
                Ok(false)
            }
            Err(_) => {
                warn!("Callback to {} timed out", url);
                Ok(false)
            }
        }
    }
}

/// Current unix time in seconds
pub(crate) fn unix_now() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().min(u32::MAX as u64) as u32)
        .unwrap_or_default()
}
