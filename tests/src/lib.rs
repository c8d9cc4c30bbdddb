// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Shared test vectors for signing requests, transactions and relay messages.
//!
//! Vectors are data only so they can be consumed by every crate in the workspace,
//! values were computed independently of this implementation.

pub mod abis;

pub mod chain;

pub mod keys;

pub mod names;

pub mod requests;

/// Decode a hex string to a fixed size array, panics on invalid input
pub fn hex_array<const N: usize>(s: &str) -> [u8; N] {
    let mut b = [0u8; N];
    hex::decode_to_slice(s, &mut b).expect("invalid hex vector");
    b
}
