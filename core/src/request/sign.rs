// Copyright (c) 2022-2023 The MobileCoin Foundation

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use esr_abi::{Name, Signature, TimePointSec};

use super::{RequestPayload, SigningRequest};
use crate::{
    callback::CallbackPayload,
    chain::{ChainId, ChainInfo, Checksum256},
    crypto::PrivateKey,
    signer::{sign_identity, sign_prepared, SignedTransaction, SignerConfig},
    transaction::{AbiMap, Action, PermissionLevel, Transaction, TransactionHeader},
    Error,
};

/// Result of signing a request, delivered to the request callback
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct SignedCallbackResponse {
    pub signatures: Vec<Signature>,
    /// Serialized transaction (the identity proof for identity requests)
    #[serde(with = "crate::helpers::hex_bytes")]
    pub packed_transaction: Vec<u8>,
    pub chain_id: ChainId,
    pub signer: Name,
    pub signer_permission: Name,
    pub ref_block_num: u16,
    pub ref_block_prefix: u32,
    pub expiration: TimePointSec,
    pub transaction_id: Checksum256,
    /// Block number, set where the transaction was broadcast
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_num: Option<u32>,
    /// Request URI, as received
    pub request: String,
    pub is_identity: bool,
}

impl SignedCallbackResponse {
    fn new(
        req: &SigningRequest,
        signer: &PermissionLevel,
        signed: SignedTransaction,
    ) -> Result<Self, Error> {
        let h = &signed.transaction.header;

        Ok(Self {
            chain_id: req.chain_id(),
            signer: signer.actor,
            signer_permission: signer.permission,
            ref_block_num: h.ref_block_num,
            ref_block_prefix: h.ref_block_prefix,
            expiration: h.expiration,
            transaction_id: signed.id,
            block_num: None,
            request: req.request_uri()?,
            is_identity: req.is_identity(),
            signatures: signed.signatures,
            packed_transaction: signed.packed,
        })
    }

    /// Merge the result of a successful broadcast
    pub fn set_broadcast(&mut self, transaction_id: Checksum256, block_num: u32) {
        if transaction_id != self.transaction_id {
            warn!(
                "broadcast returned transaction id {} for signed transaction {}",
                transaction_id, self.transaction_id
            );
        }

        self.transaction_id = transaction_id;
        self.block_num = Some(block_num);
    }

    /// Build the callback payload, `expires` is the callback validity deadline
    pub fn callback_payload(&self, expires: TimePointSec) -> Result<CallbackPayload, Error> {
        let sig = self
            .signatures
            .first()
            .ok_or_else(|| Error::unsupported("no signatures to deliver"))?;

        Ok(CallbackPayload {
            sig: sig.to_string(),
            tx: hex::encode(&self.packed_transaction),
            sa: self.signer.to_string(),
            sp: self.signer_permission.to_string(),
            rbn: self.ref_block_num.to_string(),
            rid: self.ref_block_prefix.to_string(),
            ex: expires.to_string(),
            req: self.request.clone(),
            cid: self.chain_id.to_string(),
            bn: self.block_num.map(|n| n.to_string()),
        })
    }
}

impl SigningRequest {
    /// Resolve payload actions for `signer`, replacing placeholders and
    /// serializing typed action data
    pub fn resolve_actions(
        &self,
        signer: &PermissionLevel,
        abis: &AbiMap,
    ) -> Result<Vec<Action>, Error> {
        self.req
            .actions()
            .iter()
            .map(|a| a.resolve(signer, abis))
            .collect()
    }

    /// Resolve the request to a transaction bound to fresh chain state
    ///
    /// TAPOS values carried by transaction payloads are always replaced,
    /// resource limits and delay are retained.
    pub fn resolve_transaction(
        &self,
        chain: &ChainInfo,
        now: u32,
        signer: &PermissionLevel,
        abis: &AbiMap,
        config: &SignerConfig,
    ) -> Result<Transaction, Error> {
        let tapos = TransactionHeader::from_chain(chain, now, config.expire_seconds);

        let actions = self.resolve_actions(signer, abis)?;

        let t = match &self.req {
            RequestPayload::Action(_) | RequestPayload::Actions(_) => Transaction {
                header: tapos,
                actions,
                ..Default::default()
            },
            RequestPayload::Transaction(t) => Transaction {
                header: t.header.with_tapos(&tapos),
                context_free_actions: t
                    .context_free_actions
                    .iter()
                    .map(|a| a.resolve(signer, abis))
                    .collect::<Result<_, _>>()?,
                actions,
                transaction_extensions: t.transaction_extensions.clone(),
            },
            RequestPayload::Identity(_) => {
                return Err(Error::unsupported(
                    "identity requests do not resolve to transactions",
                ))
            }
        };

        Ok(t)
    }

    /// Sign the request
    ///
    /// `chain` must be fresh chain state for the request chain, `now` is the current
    /// unix time in seconds and `abis` should contain ABIs for [SigningRequest::contracts].
    pub fn sign(
        &self,
        key: &PrivateKey,
        chain: &ChainInfo,
        now: u32,
        signer: &PermissionLevel,
        abis: &AbiMap,
        config: &SignerConfig,
    ) -> Result<SignedCallbackResponse, Error> {
        let chain_id = self.chain_id();
        if chain.chain_id != chain_id {
            return Err(Error::unsupported(format!(
                "chain info is for {}, request is for {}",
                chain.chain_id, chain_id
            )));
        }

        if signer.is_placeholder() {
            return Err(Error::unsupported("signer may not be a placeholder"));
        }

        let signed = match &self.req {
            RequestPayload::Identity(i) => {
                // A specific permission binds the signer
                if let Some(p) = &i.permission {
                    if &p.resolve(signer) != signer {
                        return Err(Error::unsupported(format!(
                            "identity requested for {p}, signer is {signer}"
                        )));
                    }
                }

                let expiration = TimePointSec::from_unix(now.saturating_add(config.expire_seconds));
                sign_identity(key, &chain_id, expiration)?
            }
            _ => {
                let t = self.resolve_transaction(chain, now, signer, abis, config)?;
                sign_prepared(key, &chain_id, t)?
            }
        };

        debug!("signed request for {} on chain {}", signer, chain_id);

        SignedCallbackResponse::new(self, signer, signed)
    }
}
