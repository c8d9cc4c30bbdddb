// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Public key and signature encodings
//!
//! Binary forms are a one byte [KeyType] followed by fixed size curve data,
//! textual forms are base58 with a RIPEMD-160 checksum:
//!
//! ```text
//!  legacy:  EOS<base58(key ‖ ripemd160(key)[0..4])>
//!  modern:  PUB_K1_<base58(key ‖ ripemd160(key ‖ "K1")[0..4])>
//!           SIG_K1_<base58(sig ‖ ripemd160(sig ‖ "K1")[0..4])>
//! ```

use core::{fmt, str::FromStr};

use encdec::{DecodeOwned, Encode};
use num_enum::TryFromPrimitive;
use ripemd::{Digest, Ripemd160};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use strum::{Display, EnumString};

use crate::{
    helpers::{Reader, Writer},
    Error,
};

/// Compressed public key length
pub const PUBLIC_KEY_LEN: usize = 33;

/// Recoverable signature length (recovery byte ‖ r ‖ s)
pub const SIGNATURE_LEN: usize = 65;

/// Legacy public key prefix
pub const LEGACY_PREFIX: &str = "EOS";

/// Curve type for keys and signatures
#[derive(
    Copy, Clone, PartialEq, Eq, Hash, Debug, Display, EnumString, TryFromPrimitive, Default,
)]
#[repr(u8)]
pub enum KeyType {
    /// secp256k1
    #[default]
    K1 = 0,
    /// secp256r1
    R1 = 1,
    /// WebAuthn
    WA = 2,
}

impl KeyType {
    /// Fetch the suffix used in checksums for this key type
    pub fn suffix(&self) -> &'static str {
        match self {
            KeyType::K1 => "K1",
            KeyType::R1 => "R1",
            KeyType::WA => "WA",
        }
    }

    /// Static name for error context
    pub(crate) fn context(&self) -> &'static str {
        self.suffix()
    }
}

/// Compute the 4-byte RIPEMD-160 checksum over `data ‖ suffix`
pub fn checksum(data: &[u8], suffix: &[u8]) -> [u8; 4] {
    let h = Ripemd160::new()
        .chain_update(data)
        .chain_update(suffix)
        .finalize();

    let mut c = [0u8; 4];
    c.copy_from_slice(&h[..4]);
    c
}

/// Encode data to base58 with an appended RIPEMD-160 checksum
pub fn encode_check(data: &[u8], suffix: &[u8]) -> String {
    let mut b = Vec::with_capacity(data.len() + 4);
    b.extend_from_slice(data);
    b.extend_from_slice(&checksum(data, suffix));

    bs58::encode(b).into_string()
}

/// Decode base58 data and verify the appended RIPEMD-160 checksum
pub fn decode_check(
    s: &str,
    suffix: &[u8],
    key_type: &'static str,
) -> Result<Vec<u8>, Error> {
    let mut b = bs58::decode(s).into_vec().map_err(|_| Error::InvalidKey {
        key_type,
        reason: "invalid base58",
    })?;

    if b.len() < 4 {
        return Err(Error::InvalidKey {
            key_type,
            reason: "too short",
        });
    }

    let c = b.split_off(b.len() - 4);
    if c != checksum(&b, suffix) {
        return Err(Error::InvalidKey {
            key_type,
            reason: "checksum mismatch",
        });
    }

    Ok(b)
}

/// Split a `<PREFIX>_<TYPE>_<DATA>` string
pub fn split_prefixed<'a>(
    s: &'a str,
    prefix: &str,
) -> Option<(KeyType, &'a str)> {
    let rest = s.strip_prefix(prefix)?.strip_prefix('_')?;
    let (kind, data) = rest.split_once('_')?;
    let key_type = KeyType::from_str(kind).ok()?;
    Some((key_type, data))
}

/// Compressed public key with curve type
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct PublicKey {
    key_type: KeyType,
    data: [u8; PUBLIC_KEY_LEN],
}

impl PublicKey {
    /// Create a public key from compressed curve data
    pub const fn new(key_type: KeyType, data: [u8; PUBLIC_KEY_LEN]) -> Self {
        Self { key_type, data }
    }

    pub fn key_type(&self) -> KeyType {
        self.key_type
    }

    /// Compressed curve point
    pub fn data(&self) -> &[u8; PUBLIC_KEY_LEN] {
        &self.data
    }

    /// Encode in legacy `EOS...` format (K1 keys only)
    pub fn to_legacy_string(&self) -> Result<String, Error> {
        if self.key_type != KeyType::K1 {
            return Err(Error::InvalidKey {
                key_type: self.key_type.context(),
                reason: "legacy format is K1 only",
            });
        }

        Ok(format!("{}{}", LEGACY_PREFIX, encode_check(&self.data, &[])))
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let suffix = self.key_type.suffix();
        write!(
            f,
            "PUB_{}_{}",
            suffix,
            encode_check(&self.data, suffix.as_bytes())
        )
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({self})")
    }
}

impl FromStr for PublicKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Modern `PUB_<TYPE>_` format
        let (key_type, d) = if let Some((key_type, data)) = split_prefixed(s, "PUB") {
            let d = decode_check(data, key_type.suffix().as_bytes(), key_type.context())?;
            (key_type, d)

        // Legacy `EOS` format
        } else if let Some(data) = s.strip_prefix(LEGACY_PREFIX) {
            let d = decode_check(data, &[], "K1")?;
            (KeyType::K1, d)
        } else {
            return Err(Error::InvalidKey {
                key_type: "unknown",
                reason: "unrecognised public key format",
            });
        };

        let data = <[u8; PUBLIC_KEY_LEN]>::try_from(d.as_slice()).map_err(|_| {
            Error::InvalidKey {
                key_type: key_type.context(),
                reason: "invalid public key length",
            }
        })?;

        Ok(Self { key_type, data })
    }
}

impl Encode for PublicKey {
    type Error = Error;

    fn encode_len(&self) -> Result<usize, Error> {
        Ok(1 + PUBLIC_KEY_LEN)
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, Error> {
        let mut w = Writer::new(buff);
        w.u8(self.key_type as u8)?;
        w.raw(&self.data)?;
        Ok(w.offset())
    }
}

impl DecodeOwned for PublicKey {
    type Output = Self;

    type Error = Error;

    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), Error> {
        let mut r = Reader::new(buff);

        let key_type = read_key_type(&mut r, "public_key")?;
        let data = r.array::<PUBLIC_KEY_LEN>("public_key")?;

        Ok((Self { key_type, data }, r.offset()))
    }
}

/// Read and check a key type tag, WebAuthn data is variable length and unsupported
fn read_key_type(r: &mut Reader, ty: &str) -> Result<KeyType, Error> {
    let offset = r.offset();
    let t = r.u8(ty)?;

    match KeyType::try_from(t) {
        Ok(KeyType::WA) => Err(Error::InvalidKey {
            key_type: "WA",
            reason: "webauthn keys unsupported",
        }),
        Ok(k) => Ok(k),
        Err(_) => Err(Error::UnknownVariant {
            ty: format!("{ty} @ {offset}"),
            index: t.to_string(),
        }),
    }
}

/// Recoverable signature with curve type
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct Signature {
    key_type: KeyType,
    data: [u8; SIGNATURE_LEN],
}

impl Signature {
    /// Create a signature from `recovery ‖ r ‖ s` data
    pub const fn new(key_type: KeyType, data: [u8; SIGNATURE_LEN]) -> Self {
        Self { key_type, data }
    }

    pub fn key_type(&self) -> KeyType {
        self.key_type
    }

    /// Signature data (`recovery ‖ r ‖ s`)
    pub fn data(&self) -> &[u8; SIGNATURE_LEN] {
        &self.data
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let suffix = self.key_type.suffix();
        write!(
            f,
            "SIG_{}_{}",
            suffix,
            encode_check(&self.data, suffix.as_bytes())
        )
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({self})")
    }
}

impl FromStr for Signature {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (key_type, data) = split_prefixed(s, "SIG").ok_or(Error::InvalidKey {
            key_type: "unknown",
            reason: "unrecognised signature format",
        })?;

        let d = decode_check(data, key_type.suffix().as_bytes(), key_type.context())?;

        let data = <[u8; SIGNATURE_LEN]>::try_from(d.as_slice()).map_err(|_| {
            Error::InvalidKey {
                key_type: key_type.context(),
                reason: "invalid signature length",
            }
        })?;

        Ok(Self { key_type, data })
    }
}

impl Encode for Signature {
    type Error = Error;

    fn encode_len(&self) -> Result<usize, Error> {
        Ok(1 + SIGNATURE_LEN)
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, Error> {
        let mut w = Writer::new(buff);
        w.u8(self.key_type as u8)?;
        w.raw(&self.data)?;
        Ok(w.offset())
    }
}

impl DecodeOwned for Signature {
    type Output = Self;

    type Error = Error;

    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), Error> {
        let mut r = Reader::new(buff);

        let key_type = read_key_type(&mut r, "signature")?;
        let data = r.array::<SIGNATURE_LEN>("signature")?;

        Ok((Self { key_type, data }, r.offset()))
    }
}

macro_rules! serde_str {
    ($t:ty) => {
        impl Serialize for $t {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $t {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                <$t>::from_str(&s).map_err(serde::de::Error::custom)
            }
        }
    };
}

serde_str!(PublicKey);
serde_str!(Signature);
