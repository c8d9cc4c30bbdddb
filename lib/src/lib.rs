// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Signing request wallet API library (and CLI)
//!
//! This provides the async host side of a signing request wallet over the
//! synchronous engine in [esr_core]:
//!
//! - [WalletHandle] resolves, signs, broadcasts and answers requests using
//!   host supplied [ChainInfoProvider], [AbiProvider], [Broadcaster] and
//!   [KeySupplier] collaborators
//! - [RelayManager] maintains a relay connection delivering (sealed) requests
//!   from remote applications
//! - [SessionStore] and [RelayLinkIdentity] persist via a [StateStore]
//!
//! [HttpChain] implements the chain collaborators for a nodeos HTTP endpoint.

// async traits not yet safe to use
// see https://github.com/rust-lang/rust/issues/91611
// #![feature(async_fn_in_trait)]

/// Re-export `esr-core` for consumers
pub use esr_core::{self as engine};

mod error;
pub use error::Error;

mod handle;
pub use handle::{WalletConfig, WalletHandle};

pub mod link;
pub use link::RelayLinkIdentity;

pub mod provider;
pub use provider::{AbiProvider, Broadcaster, ChainInfoProvider, KeySupplier, StaticKeys};

pub mod relay;
pub use relay::{RelayConfig, RelayEvent, RelayManager, RelayStatus};

pub mod rpc;
pub use rpc::HttpChain;

pub mod session;
pub use session::{Session, SessionStore};

pub mod store;
pub use store::{FileStore, MemoryStore, StateStore};
