// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Private keys, recoverable signatures and key agreement
//!
//! Only secp256k1 (`K1`) keys sign; `R1` private keys parse and format
//! so they survive storage, but signing or deriving with them is unsupported.

use core::{fmt, str::FromStr};

use ecdsa::{hazmat::SignPrimitive, signature::hazmat::PrehashVerifier, RecoveryId};
use k256::{
    ecdsa::{Signature as K1Signature, VerifyingKey},
    FieldBytes, SecretKey,
};
use log::{debug, trace};
use rand_core::{CryptoRng, OsRng, RngCore};
use sha2::{Digest, Sha256, Sha512};
use zeroize::Zeroize;

use esr_abi::{
    keys::{decode_check, encode_check, split_prefixed, PUBLIC_KEY_LEN, SIGNATURE_LEN},
    KeyType, PublicKey, Signature,
};

use crate::{Checksum256, Error};

mod sealed;
pub use sealed::SealedMessage;

/// Legacy WIF version byte
const WIF_VERSION: u8 = 0x80;

/// Recovery id offset for compressed keys in the signature header byte
const RECOVERY_OFFSET: u8 = 31;

/// Limit on canonical signature attempts
const MAX_SIGN_ATTEMPTS: u32 = 256;

/// Private key with curve type, secret bytes are cleared on drop
#[derive(Clone, PartialEq, Eq)]
pub struct PrivateKey {
    key_type: KeyType,
    secret: [u8; 32],
}

impl Drop for PrivateKey {
    fn drop(&mut self) {
        self.secret.zeroize();
    }
}

impl PrivateKey {
    /// Create a K1 key from a secret scalar, rejecting zero and out of range values
    pub fn from_bytes(secret: [u8; 32]) -> Result<Self, Error> {
        SecretKey::from_bytes(&FieldBytes::from(secret))
            .map_err(|_| Error::crypto("K1 key: secret out of range"))?;

        Ok(Self {
            key_type: KeyType::K1,
            secret,
        })
    }

    /// Generate a fresh K1 key
    pub fn generate() -> Self {
        Self::generate_with(&mut OsRng)
    }

    /// Generate a fresh K1 key using the provided RNG
    pub fn generate_with<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        let k = SecretKey::random(rng);

        Self {
            key_type: KeyType::K1,
            secret: k.to_bytes().into(),
        }
    }

    pub fn key_type(&self) -> KeyType {
        self.key_type
    }

    /// Secret scalar bytes
    pub fn secret_bytes(&self) -> &[u8; 32] {
        &self.secret
    }

    fn k1(&self) -> Result<SecretKey, Error> {
        if self.key_type != KeyType::K1 {
            return Err(Error::unsupported(format!(
                "{} keys cannot sign",
                self.key_type
            )));
        }

        SecretKey::from_bytes(&FieldBytes::from(self.secret))
            .map_err(|_| Error::crypto("K1 key: secret out of range"))
    }

    /// Derive the compressed public key
    pub fn public_key(&self) -> Result<PublicKey, Error> {
        let k = self.k1()?;
        Ok(public_from_verifying(&VerifyingKey::from(k.public_key())))
    }

    /// Encode in legacy WIF format (K1 keys only)
    pub fn to_wif(&self) -> Result<String, Error> {
        if self.key_type != KeyType::K1 {
            return Err(Error::unsupported("WIF encoding is K1 only"));
        }

        let mut b = Vec::with_capacity(37);
        b.push(WIF_VERSION);
        b.extend_from_slice(&self.secret);

        let c = wif_checksum(&b);
        b.extend_from_slice(&c);

        let s = bs58::encode(&b).into_string();
        b.zeroize();

        Ok(s)
    }

    /// Sign a 32-byte digest, producing a canonical recoverable signature
    ///
    /// Signatures are retried with additional RFC6979 data until both `r` and `s`
    /// satisfy the canonical encoding rule.
    pub fn sign_digest(&self, digest: &Checksum256) -> Result<Signature, Error> {
        let k = self.k1()?;
        let scalar = k.to_nonzero_scalar();
        let z = FieldBytes::from(*digest.as_bytes());

        let verifying_key = VerifyingKey::from(k.public_key());

        for attempt in 0..MAX_SIGN_ATTEMPTS {
            let ad = match attempt {
                0 => vec![],
                n => Sha256::digest(n.to_le_bytes()).to_vec(),
            };

            let (sig, _) = scalar
                .as_ref()
                .try_sign_prehashed_rfc6979::<Sha256>(&z, &ad)
                .map_err(|_| Error::crypto("K1 signing failed"))?;

            let sig = sig.normalize_s().unwrap_or(sig);

            let rs = sig.to_bytes();
            if !is_canonical(&rs) {
                trace!("non-canonical signature on attempt {}, retrying", attempt);
                continue;
            }

            let recovery_id =
                RecoveryId::trial_recovery_from_prehash(&verifying_key, digest.as_bytes(), &sig)
                    .map_err(|_| Error::crypto("K1 signature recovery failed"))?;

            let mut data = [0u8; SIGNATURE_LEN];
            data[0] = recovery_id.to_byte() + RECOVERY_OFFSET;
            data[1..].copy_from_slice(&rs);

            debug!("signed digest {} (attempt {})", digest, attempt);

            return Ok(Signature::new(KeyType::K1, data));
        }

        Err(Error::crypto("K1 signing failed to produce a canonical signature"))
    }

    /// Compute the SHA-512 of the ECDH shared x coordinate with `public`
    pub fn shared_secret(&self, public: &PublicKey) -> Result<[u8; 64], Error> {
        let k = self.k1()?;
        let p = k1_public(public)?;

        let shared = k256::ecdh::diffie_hellman(k.to_nonzero_scalar(), p.as_affine());

        let mut h = [0u8; 64];
        h.copy_from_slice(&Sha512::digest(shared.raw_secret_bytes()));
        Ok(h)
    }
}

/// Double SHA-256 checksum used by legacy WIF keys
fn wif_checksum(d: &[u8]) -> [u8; 4] {
    let h = Sha256::digest(Sha256::digest(d));
    [h[0], h[1], h[2], h[3]]
}

fn public_from_verifying(k: &VerifyingKey) -> PublicKey {
    let p = k.to_encoded_point(true);

    let mut data = [0u8; PUBLIC_KEY_LEN];
    data.copy_from_slice(p.as_bytes());

    PublicKey::new(KeyType::K1, data)
}

fn k1_public(p: &PublicKey) -> Result<k256::PublicKey, Error> {
    if p.key_type() != KeyType::K1 {
        return Err(Error::unsupported(format!(
            "{} public keys unsupported",
            p.key_type()
        )));
    }

    k256::PublicKey::from_sec1_bytes(p.data())
        .map_err(|_| Error::crypto("K1 key: invalid curve point"))
}

/// Check `r ‖ s` against the canonical signature rule, each component must be
/// positive with no redundant leading zero when read as a signed big-endian integer
pub fn is_canonical(rs: &[u8]) -> bool {
    let ok = |v: &[u8]| v[0] & 0x80 == 0 && !(v[0] == 0 && v[1] & 0x80 == 0);

    rs.len() == 64 && ok(&rs[..32]) && ok(&rs[32..])
}

impl FromStr for PrivateKey {
    type Err = Error;

    /// Parse `PVT_K1_`, `PVT_R1_` or legacy WIF keys
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some((key_type, data)) = split_prefixed(s, "PVT") {
            let mut d = decode_check(data, key_type.suffix().as_bytes(), "private")?;

            let secret = <[u8; 32]>::try_from(d.as_slice())
                .map_err(|_| Error::crypto("private key: invalid length"));
            d.zeroize();

            return match key_type {
                KeyType::K1 => Self::from_bytes(secret?),
                KeyType::R1 => Ok(Self {
                    key_type,
                    secret: secret?,
                }),
                KeyType::WA => Err(Error::unsupported("WA private keys")),
            };
        }

        // Legacy WIF
        let mut d = bs58::decode(s)
            .into_vec()
            .map_err(|_| Error::crypto("private key: invalid base58"))?;

        let r = parse_wif(&d);
        d.zeroize();

        Self::from_bytes(r?)
    }
}

fn parse_wif(d: &[u8]) -> Result<[u8; 32], Error> {
    // version ‖ secret ‖ [compressed flag] ‖ checksum
    if d.len() != 37 && d.len() != 38 {
        return Err(Error::crypto("WIF key: invalid length"));
    }

    let (payload, checksum) = d.split_at(d.len() - 4);
    if wif_checksum(payload) != checksum {
        return Err(Error::crypto("WIF key: checksum mismatch"));
    }

    if payload[0] != WIF_VERSION {
        return Err(Error::crypto("WIF key: invalid version"));
    }

    let mut secret = [0u8; 32];
    secret.copy_from_slice(&payload[1..33]);
    Ok(secret)
}

impl fmt::Display for PrivateKey {
    /// Encode as `PVT_<TYPE>_...`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let suffix = self.key_type.suffix();
        write!(
            f,
            "PVT_{}_{}",
            suffix,
            encode_check(&self.secret, suffix.as_bytes())
        )
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.public_key() {
            Ok(p) => write!(f, "PrivateKey({p})"),
            Err(_) => write!(f, "PrivateKey({} <redacted>)", self.key_type),
        }
    }
}

/// Recovery and verification for chain signatures
pub trait SignatureExt {
    /// Recover the public key that produced this signature over `digest`
    fn recover(&self, digest: &Checksum256) -> Result<PublicKey, Error>;
}

impl SignatureExt for Signature {
    fn recover(&self, digest: &Checksum256) -> Result<PublicKey, Error> {
        let (sig, recovery_id) = split_signature(self)?;

        let k = VerifyingKey::recover_from_prehash(digest.as_bytes(), &sig, recovery_id)
            .map_err(|_| Error::crypto("K1 signature: recovery failed"))?;

        Ok(public_from_verifying(&k))
    }
}

fn split_signature(s: &Signature) -> Result<(K1Signature, RecoveryId), Error> {
    if s.key_type() != KeyType::K1 {
        return Err(Error::unsupported(format!(
            "{} signatures unsupported",
            s.key_type()
        )));
    }

    let d = s.data();

    let recovery_id = d[0]
        .checked_sub(RECOVERY_OFFSET)
        .and_then(RecoveryId::from_byte)
        .ok_or_else(|| Error::crypto("K1 signature: invalid recovery id"))?;

    let sig = K1Signature::from_slice(&d[1..])
        .map_err(|_| Error::crypto("K1 signature: invalid r / s"))?;

    Ok((sig, recovery_id))
}

/// Digest verification for chain public keys
pub trait PublicKeyExt {
    /// Check `signature` over `digest` was produced by this key
    fn verify_digest(&self, digest: &Checksum256, signature: &Signature) -> bool;
}

impl PublicKeyExt for PublicKey {
    fn verify_digest(&self, digest: &Checksum256, signature: &Signature) -> bool {
        let (k, (sig, _)) = match (k1_public(self), split_signature(signature)) {
            (Ok(k), Ok(s)) => (k, s),
            _ => return false,
        };

        VerifyingKey::from(k)
            .verify_prehash(digest.as_bytes(), &sig)
            .is_ok()
    }
}
