// Copyright (c) 2022-2023 The MobileCoin Foundation

use core::{convert::Infallible, fmt, str::FromStr};

use encdec::{DecodeOwned, Encode};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{helpers::Reader, Error};

/// Name symbol alphabet, index is the 5-bit symbol value
const CHARMAP: &[u8; 32] = b".12345abcdefghijklmnopqrstuvwxyz";

/// Maximum number of symbols in a name
pub const NAME_MAX_LEN: usize = 13;

/// Chain account / action / permission name, a 64-bit value encoding up to
/// 13 base-32 symbols.
///
/// Symbols 0..12 occupy five bits each from the most significant end, the 13th
/// symbol occupies the remaining four low bits.
///
/// ## Encoding:
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                                                               |
/// +                      VALUE (u64, little-endian)               +
/// |                                                               |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Name(u64);

impl Name {
    /// Create a name from its raw value
    pub const fn from_raw(v: u64) -> Self {
        Self(v)
    }

    /// Fetch the raw name value
    pub const fn raw(&self) -> u64 {
        self.0
    }

    /// Check whether this is the empty name
    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Encode a name string, symbols outside the alphabet encode as `.`
    /// and symbols beyond the 13th are ignored
    pub fn new(s: &str) -> Self {
        let b = s.as_bytes();
        let mut v = 0u64;

        for i in 0..NAME_MAX_LEN {
            let c = b.get(i).map(|c| symbol(*c)).unwrap_or(0) as u64;

            if i < NAME_MAX_LEN - 1 {
                v |= (c & 0x1f) << (64 - 5 * (i + 1));
            } else {
                v |= c & 0x0f;
            }
        }

        Self(v)
    }

    /// Check whether a string is a canonical name
    /// (round-trips through the name encoding unchanged)
    pub fn is_valid(s: &str) -> bool {
        if s.len() > NAME_MAX_LEN || s.ends_with('.') {
            return false;
        }

        if !s.bytes().all(|c| CHARMAP.contains(&c)) {
            return false;
        }

        Self::new(s).to_string() == s
    }
}

/// Map a character to its 5-bit symbol value
const fn symbol(c: u8) -> u8 {
    match c {
        b'a'..=b'z' => c - b'a' + 6,
        b'1'..=b'5' => c - b'1' + 1,
        _ => 0,
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = [b'.'; NAME_MAX_LEN];
        let mut v = self.0;

        for i in 0..NAME_MAX_LEN {
            let (mask, shift) = match i {
                0 => (0x0f, 4),
                _ => (0x1f, 5),
            };

            s[NAME_MAX_LEN - 1 - i] = CHARMAP[(v & mask) as usize];
            v >>= shift;
        }

        // Trim trailing dots
        let n = s.iter().rposition(|c| *c != b'.').map(|i| i + 1).unwrap_or(0);

        // CHARMAP is ASCII so this is always valid
        f.write_str(core::str::from_utf8(&s[..n]).unwrap_or_default())
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name({self})")
    }
}

impl FromStr for Name {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl From<&str> for Name {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<u64> for Name {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

impl Encode for Name {
    type Error = Error;

    fn encode_len(&self) -> Result<usize, Error> {
        Ok(8)
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, Error> {
        if buff.len() < 8 {
            return Err(Error::Length);
        }
        buff[..8].copy_from_slice(&self.0.to_le_bytes());
        Ok(8)
    }
}

impl DecodeOwned for Name {
    type Output = Self;

    type Error = Error;

    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), Error> {
        let mut r = Reader::new(buff);
        let v = r.u64("name")?;
        Ok((Self(v), r.offset()))
    }
}

impl Serialize for Name {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Name {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Self::new(&s))
    }
}
