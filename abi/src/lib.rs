// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Antelope chain binary encodings and ABI-driven type codec
//!
//! This crate provides the primitives shared by signing requests and transactions
//! ([Name], [PublicKey], [Signature], [Asset], time types) along with their canonical
//! binary encodings, and an [Abi] resolver for serializing arbitrary contract values
//! described by a contract ABI.
//!
//! Fixed primitives implement [encdec::Encode] and [encdec::DecodeOwned], dynamic values
//! are represented as a [serde_json::Value] tree and encoded via [Abi::serialize] and
//! [Abi::deserialize].
//!
//! All integer encodings are little-endian, lengths and variant indices are
//! LEB128 `varuint32`s.
//!
//! ## Value tree
//!
//! ```text
//!  bool                   true / false
//!  int8..uint64           JSON numbers (numeric strings accepted)
//!  int128 / uint128       decimal strings
//!  float32 / float64      JSON numbers
//!  float128, bytes,
//!  checksum160..512       lowercase hex strings
//!  name, symbol_code      strings
//!  symbol                 "4,EOS"
//!  asset                  "1.0000 EOS"
//!  extended_asset         { "quantity": "1.0000 EOS", "contract": "eosio.token" }
//!  time types             "2018-06-01T00:00:00.000"
//!  public_key, signature  "PUB_K1_...", "SIG_K1_..."
//!  T?                     null or T
//!  T[]                    array of T
//!  variant                { "type_name": value }
//! ```

pub mod asset;
pub use asset::{Asset, ExtendedAsset, Symbol, SymbolCode};

mod builtin;
pub use builtin::BuiltinType;

mod codec;

pub mod definition;
pub use definition::{Abi, AbiDef};

mod error;
pub use error::Error;

pub mod helpers;
pub use helpers::{Reader, Writer};

pub mod keys;
pub use keys::{KeyType, PublicKey, Signature};

mod name;
pub use name::Name;

pub mod time;
pub use time::{BlockTimestamp, TimePoint, TimePointSec};

/// Re-export of the value tree used by the dynamic codec
pub use serde_json::Value;
