// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Signing request engine
//!
//! This provides the pure, synchronous parts of a signing request wallet: decoding
//! and encoding [SigningRequest]s, resolving requests to concrete transactions,
//! computing signing digests and producing recoverable signatures, and sealing /
//! unsealing relay messages. No I/O is performed, callers supply chain state
//! ([ChainInfo]), contract ABIs and keys.
//!
//! ## Operations
//!
//! ### Parsing a request
//!
//! [`SigningRequest::from_uri`] accepts `esr:`, `esr://` and `web+esr://` URIs,
//! the original URI is retained for echoing in callbacks.
//!
//! ### Signing a request
//!
//! 1. Fetch fresh [ChainInfo] for the request chain
//! 2. Fetch ABIs for each contract referenced by the request
//!    ([`SigningRequest::contracts`])
//! 3. Call [`SigningRequest::sign`] with the signing key and signer permission,
//!    this replaces placeholder authorizations, recomputes TAPOS fields and returns
//!    a [SignedCallbackResponse][request::SignedCallbackResponse]
//! 4. Where [`SigningRequest::should_broadcast`] is set, push the packed transaction
//!    and merge the result with [`SignedCallbackResponse::set_broadcast`][request::SignedCallbackResponse::set_broadcast]
//! 5. Deliver the [CallbackPayload] to the request callback
//!

pub use esr_abi::{self as abi};

mod error;
pub use error::Error;

pub mod callback;
pub use callback::CallbackPayload;

pub mod chain;
pub use chain::{ChainAlias, ChainId, ChainInfo, Checksum256};

pub mod crypto;
pub use crypto::{PrivateKey, SealedMessage};

pub mod helpers;

pub mod request;
pub use request::{RequestFlags, SigningRequest};

pub mod signer;
pub use signer::{SignedTransaction, SignerConfig};

pub mod transaction;
pub use transaction::{Action, ActionData, PermissionLevel, Transaction, TransactionHeader};

#[cfg(test)]
pub(crate) mod test {
    use core::str::FromStr;

    use esr_tests::chain::FIXTURE;

    use super::*;

    /// Chain info matching the shared signing fixture
    pub fn fixture() -> ChainInfo {
        ChainInfo {
            chain_id: ChainId::from_str(FIXTURE.chain_id).unwrap(),
            head_block_num: FIXTURE.head_block_num,
            last_irreversible_block_num: FIXTURE.last_irreversible_block_num,
            last_irreversible_block_id: Checksum256::from_str(FIXTURE.last_irreversible_block_id)
                .unwrap(),
            head_block_id: None,
            head_block_time: None,
            server_version: None,
        }
    }
}
