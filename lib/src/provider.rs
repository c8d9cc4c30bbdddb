// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Collaborator traits for chain access and key supply
//!
//! These are implemented by the host application, [HttpChain][crate::rpc::HttpChain]
//! provides chain access via a nodeos HTTP API and [StaticKeys] an in-memory key set.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use esr_abi::{Abi, Name, Signature};
use esr_core::{ChainId, ChainInfo, Checksum256, PermissionLevel, PrivateKey};

use crate::Error;

/// Fetch chain state for transaction headers
#[async_trait]
pub trait ChainInfoProvider: Send + Sync {
    async fn chain_info(&self, chain_id: &ChainId) -> Result<ChainInfo, Error>;
}

/// Fetch contract ABIs
#[async_trait]
pub trait AbiProvider: Send + Sync {
    async fn abi(&self, chain_id: &ChainId, account: Name) -> Result<Abi, Error>;
}

/// Push signed transactions to a chain
#[async_trait]
pub trait Broadcaster: Send + Sync {
    async fn broadcast(
        &self,
        chain_id: &ChainId,
        tx: &PushTransaction,
    ) -> Result<BroadcastResult, Error>;
}

/// Supply signing keys, after whatever unlock policy the host enforces
#[async_trait]
pub trait KeySupplier: Send + Sync {
    async fn signing_key(
        &self,
        chain_id: &ChainId,
        signer: &PermissionLevel,
    ) -> Result<PrivateKey, Error>;
}

/// Signed transaction in `push_transaction` form
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct PushTransaction {
    pub signatures: Vec<Signature>,
    pub compression: u8,
    pub packed_context_free_data: String,
    /// Packed transaction (hex)
    pub packed_trx: String,
}

impl PushTransaction {
    /// Uncompressed push request for a packed transaction
    pub fn new(signatures: Vec<Signature>, packed: &[u8]) -> Self {
        Self {
            signatures,
            compression: 0,
            packed_context_free_data: String::new(),
            packed_trx: hex::encode(packed),
        }
    }
}

/// Broadcast receipt
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct BroadcastResult {
    pub transaction_id: Checksum256,
    pub block_num: u32,
}

/// In-memory key set, keyed by signer permission
#[derive(Clone, Default)]
pub struct StaticKeys {
    keys: HashMap<PermissionLevel, PrivateKey>,
}

impl StaticKeys {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a key for `signer`, replacing any existing key
    pub fn with_key(mut self, signer: PermissionLevel, key: PrivateKey) -> Self {
        self.keys.insert(signer, key);
        self
    }

    pub fn insert(&mut self, signer: PermissionLevel, key: PrivateKey) {
        self.keys.insert(signer, key);
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[async_trait]
impl KeySupplier for StaticKeys {
    async fn signing_key(
        &self,
        _chain_id: &ChainId,
        signer: &PermissionLevel,
    ) -> Result<PrivateKey, Error> {
        self.keys
            .get(signer)
            .cloned()
            .ok_or_else(|| Error::unsupported(format!("no signing key for {signer}")))
    }
}
