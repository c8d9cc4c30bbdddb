// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Chain identifiers and chain state

use core::{fmt, str::FromStr};

use encdec::{DecodeOwned, Encode};
use num_enum::TryFromPrimitive;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

use esr_abi::{
    helpers::{Reader, Writer},
    TimePoint,
};

use crate::{helpers::sha256, Error};

/// 32-byte hash value (chain ids, block ids, transaction ids, digests)
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Checksum256(pub [u8; 32]);

impl Checksum256 {
    /// Compute the SHA-256 digest of the concatenated slices
    pub fn hash(parts: &[&[u8]]) -> Self {
        Self(sha256(parts))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl From<[u8; 32]> for Checksum256 {
    fn from(v: [u8; 32]) -> Self {
        Self(v)
    }
}

impl AsRef<[u8]> for Checksum256 {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Checksum256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Checksum256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl FromStr for Checksum256 {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut b = [0u8; 32];
        hex::decode_to_slice(s, &mut b).map_err(|_| Error::parse("checksum256", 0))?;
        Ok(Self(b))
    }
}

impl Serialize for Checksum256 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Checksum256 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_str(&s).map_err(serde::de::Error::custom)
    }
}

impl Encode for Checksum256 {
    type Error = esr_abi::Error;

    fn encode_len(&self) -> Result<usize, Self::Error> {
        Ok(32)
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, Self::Error> {
        let mut w = Writer::new(buff);
        w.raw(&self.0)?;
        Ok(w.offset())
    }
}

impl DecodeOwned for Checksum256 {
    type Output = Self;

    type Error = esr_abi::Error;

    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), Self::Error> {
        let mut r = Reader::new(buff);
        let v = r.array::<32>("checksum256")?;
        Ok((Self(v), r.offset()))
    }
}

/// Chain identifier
pub type ChainId = Checksum256;

/// Block identifier, the block number is stored big-endian in the first four bytes
pub type BlockId = Checksum256;

/// Well known chains with single byte aliases for compact requests
#[derive(
    Copy, Clone, PartialEq, Eq, Hash, Debug, Display, EnumString, EnumIter, TryFromPrimitive,
)]
#[repr(u8)]
#[strum(ascii_case_insensitive)]
pub enum ChainAlias {
    #[strum(serialize = "EOS")]
    Eos = 1,
    #[strum(serialize = "TELOS")]
    Telos = 2,
    #[strum(serialize = "JUNGLE")]
    Jungle = 3,
    #[strum(serialize = "KYLIN")]
    Kylin = 4,
    #[strum(serialize = "WORBLI")]
    Worbli = 5,
    #[strum(serialize = "BOS")]
    Bos = 6,
    #[strum(serialize = "MEETONE")]
    Meetone = 7,
    #[strum(serialize = "INSIGHTS")]
    Insights = 8,
    #[strum(serialize = "BEOS")]
    Beos = 9,
    #[strum(serialize = "WAX")]
    Wax = 10,
    #[strum(serialize = "PROTON")]
    Proton = 11,
    #[strum(serialize = "FIO")]
    Fio = 12,
}

impl ChainAlias {
    /// Fetch the chain id for this alias
    pub fn chain_id(&self) -> ChainId {
        ChainId::from(ALIAS_CHAIN_IDS[*self as usize - 1])
    }

    /// Lookup the alias for a chain id
    pub fn from_chain_id(id: &ChainId) -> Option<Self> {
        Self::iter().find(|a| &a.chain_id() == id)
    }

    /// Resolve an alias byte, alias `0` is reserved and unknown
    pub fn from_index(index: u8) -> Result<Self, Error> {
        Self::try_from(index).map_err(|_| Error::UnknownVariant {
            kind: "chain alias".to_string(),
            index: index.to_string(),
        })
    }
}

/// Chain ids indexed by alias - 1, decoded at compile time
const ALIAS_CHAIN_IDS: [[u8; 32]; 12] = [
    hex32("aca376f206b8fc25a6ed44dbdc66547c36c6c33e3a119ffbeaef943642f0e906"), // EOS
    hex32("4667b205c6838ef70ff7988f6e8257e8be0e1284a2f59699054a018f743b1d11"), // TELOS
    hex32("e70aaab8997e1dfce58fbfac80cbbb8fecec7b99cf982a9444273cbc64c41473"), // JUNGLE
    hex32("5fff1dae8dc8e2fc4d5b23b2c7665c97f9e9d8edf2b6485a86ba311c25639191"), // KYLIN
    hex32("73647cde120091e0a4b85bced2f3cfdb3041e266cbbe95cee59b73235a1b3b6f"), // WORBLI
    hex32("d5a3d18fbb3c084e3b1f3fa98c21014b5f3db536cc15d08f9f6479517c6a3d86"), // BOS
    hex32("cfe6486a83bad4962f232d48003b1824ab5665c36778141034d75e57b956e422"), // MEETONE
    hex32("b042025541e25a472bffde2d62edd457b7e70cee943412b1ea0f044f88591664"), // INSIGHTS
    hex32("b912d19a6abd2b1b05611ae5be473355d64d95aeff0c09bedc8c166cd6468fe4"), // BEOS
    hex32("1064487b3cd1a897ce03ae5b6a865651747e2e152090f99c1d19d44e01aea5a4"), // WAX
    hex32("384da888112027f0321850a169f737c33e53b388aad48b5adace4bab97f437e0"), // PROTON
    hex32("21dcae42c0182200e93f954a074011f9048a7624c6fe81d3c9541a614a88bd1c"), // FIO
];

const fn hex32(s: &str) -> [u8; 32] {
    let s = s.as_bytes();
    assert!(s.len() == 64, "chain id must be 64 hex characters");

    let mut b = [0u8; 32];
    let mut i = 0;
    while i < 32 {
        b[i] = (nibble(s[2 * i]) << 4) | nibble(s[2 * i + 1]);
        i += 1;
    }
    b
}

const fn nibble(c: u8) -> u8 {
    match c {
        b'0'..=b'9' => c - b'0',
        b'a'..=b'f' => c - b'a' + 10,
        _ => panic!("invalid hex digit in chain id"),
    }
}

impl Serialize for ChainAlias {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ChainAlias {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_str(&s).map_err(serde::de::Error::custom)
    }
}

/// Chain state as returned by `/v1/chain/get_info`
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct ChainInfo {
    pub chain_id: ChainId,
    pub head_block_num: u32,
    pub last_irreversible_block_num: u32,
    pub last_irreversible_block_id: BlockId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head_block_id: Option<BlockId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head_block_time: Option<TimePoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_version: Option<String>,
}

impl ChainInfo {
    /// TAPOS reference block number, the low 16 bits of the last irreversible block
    pub fn ref_block_num(&self) -> u16 {
        (self.last_irreversible_block_num & 0xffff) as u16
    }

    /// TAPOS reference block prefix, little-endian u32 at offset 8 of the last
    /// irreversible block id
    pub fn ref_block_prefix(&self) -> u32 {
        let b = self.last_irreversible_block_id.as_bytes();
        u32::from_le_bytes([b[8], b[9], b[10], b[11]])
    }
}
