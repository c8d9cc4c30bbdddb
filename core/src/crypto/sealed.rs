// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Sealed relay messages
//!
//! Messages are encrypted with AES-256-CBC under a key derived from the ECDH
//! shared secret between sender and receiver and a per-message nonce.
//!
//! ## Key derivation
//! ```text
//!  secret   = SHA-512(ECDH(sender, receiver).x)
//!  key64    = SHA-512(nonce (u64 LE) ‖ secret)
//!  aes key  = key64[0..32]
//!  iv       = key64[32..48]
//!  checksum = u32 LE (SHA-256(key64)[0..4])
//! ```
//!
//! ## Binary encoding
//! ```text
//!  key type    u8
//!  from        [u8; 33]   compressed sender public key
//!  nonce       u64
//!  ciphertext  varuint32 length ‖ bytes
//!  checksum    u32
//! ```

use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use encdec::{DecodeOwned, Encode};
use log::debug;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha512};
use zeroize::Zeroize;

use esr_abi::{
    helpers::{bytes_len, Reader, Writer},
    PublicKey,
};

use super::PrivateKey;
use crate::Error;

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// Encrypted message between two keys
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct SealedMessage {
    /// Sender public key
    pub from: PublicKey,
    #[serde(with = "crate::helpers::num_string")]
    pub nonce: u64,
    #[serde(with = "crate::helpers::hex_bytes")]
    pub ciphertext: Vec<u8>,
    /// Key checksum, used to reject messages for the wrong key before decrypting
    pub checksum: u32,
}

/// Per-message key material
struct MessageKey([u8; 64]);

impl Drop for MessageKey {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl MessageKey {
    fn derive(local: &PrivateKey, remote: &PublicKey, nonce: u64) -> Result<Self, Error> {
        let mut secret = local.shared_secret(remote)?;

        let h = Sha512::new()
            .chain_update(nonce.to_le_bytes())
            .chain_update(secret)
            .finalize();
        secret.zeroize();

        let mut k = [0u8; 64];
        k.copy_from_slice(&h);
        Ok(Self(k))
    }

    fn key(&self) -> &[u8] {
        &self.0[..32]
    }

    fn iv(&self) -> &[u8] {
        &self.0[32..48]
    }

    fn checksum(&self) -> u32 {
        let h = Sha256::digest(self.0);
        u32::from_le_bytes([h[0], h[1], h[2], h[3]])
    }
}

impl SealedMessage {
    /// Encrypt `message` from `sender` to `receiver`
    pub fn seal(
        sender: &PrivateKey,
        receiver: &PublicKey,
        nonce: u64,
        message: &[u8],
    ) -> Result<Self, Error> {
        let k = MessageKey::derive(sender, receiver, nonce)?;

        let ciphertext = Aes256CbcEnc::new_from_slices(k.key(), k.iv())
            .map_err(|_| Error::crypto("sealed message: invalid key length"))?
            .encrypt_padded_vec_mut::<Pkcs7>(message);

        Ok(Self {
            from: sender.public_key()?,
            nonce,
            ciphertext,
            checksum: k.checksum(),
        })
    }

    /// Decrypt using the receiver's private key
    pub fn unseal(&self, receiver: &PrivateKey) -> Result<Vec<u8>, Error> {
        let k = MessageKey::derive(receiver, &self.from, self.nonce)?;

        if k.checksum() != self.checksum {
            debug!(
                "sealed message checksum mismatch (from {}, nonce {})",
                self.from, self.nonce
            );
            return Err(Error::crypto("sealed message: checksum mismatch"));
        }

        Aes256CbcDec::new_from_slices(k.key(), k.iv())
            .map_err(|_| Error::crypto("sealed message: invalid key length"))?
            .decrypt_padded_vec_mut::<Pkcs7>(&self.ciphertext)
            .map_err(|_| Error::crypto("sealed message: invalid padding"))
    }

    /// Decrypt to a UTF-8 string
    pub fn unseal_string(&self, receiver: &PrivateKey) -> Result<String, Error> {
        let d = self.unseal(receiver)?;
        String::from_utf8(d).map_err(|e| Error::parse("sealed message", e.utf8_error().valid_up_to()))
    }
}

impl Encode for SealedMessage {
    type Error = esr_abi::Error;

    fn encode_len(&self) -> Result<usize, Self::Error> {
        Ok(self.from.encode_len()? + 8 + bytes_len(&self.ciphertext) + 4)
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, Self::Error> {
        let mut w = Writer::new(buff);

        w.write(&self.from)?;
        w.u64(self.nonce)?;
        w.bytes(&self.ciphertext)?;
        w.u32(self.checksum)?;

        Ok(w.offset())
    }
}

impl DecodeOwned for SealedMessage {
    type Output = Self;

    type Error = esr_abi::Error;

    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), Self::Error> {
        let mut r = Reader::new(buff);

        let m = SealedMessage {
            from: r.read::<PublicKey>("sealed_message.from")?,
            nonce: r.u64("sealed_message.nonce")?,
            ciphertext: r.bytes("sealed_message.ciphertext")?.to_vec(),
            checksum: r.u32("sealed_message.checksum")?,
        };

        Ok((m, r.offset()))
    }
}

#[cfg(test)]
mod test {
    use core::str::FromStr;

    use esr_tests::keys::SEALED;

    use super::*;

    fn keys() -> (PrivateKey, PrivateKey) {
        (
            PrivateKey::from_str(SEALED.sender_private).unwrap(),
            PrivateKey::from_str(SEALED.receiver_private).unwrap(),
        )
    }

    #[test]
    fn seal_vector() {
        let (sender, receiver) = keys();
        assert_eq!(sender.public_key().unwrap().to_string(), SEALED.sender_public);
        assert_eq!(receiver.public_key().unwrap().to_string(), SEALED.receiver_public);

        let receiver_public = PublicKey::from_str(SEALED.receiver_public).unwrap();

        let m = SealedMessage::seal(
            &sender,
            &receiver_public,
            SEALED.nonce,
            SEALED.plaintext.as_bytes(),
        )
        .unwrap();

        assert_eq!(hex::encode(&m.ciphertext), SEALED.ciphertext);
        assert_eq!(m.checksum, SEALED.checksum);

        let frame = esr_abi::helpers::to_vec(&m).unwrap();
        assert_eq!(hex::encode(&frame), SEALED.frame);
    }

    #[test]
    fn unseal_frame() {
        let (_sender, receiver) = keys();

        let frame = hex::decode(SEALED.frame).unwrap();
        let (m, n) = SealedMessage::decode_owned(&frame).unwrap();
        assert_eq!(n, frame.len());

        assert_eq!(m.unseal_string(&receiver).unwrap(), SEALED.plaintext);
    }

    #[test]
    fn wrong_key_rejected() {
        let (sender, receiver) = keys();
        let other = PrivateKey::generate();

        let m = SealedMessage::seal(&sender, &receiver.public_key().unwrap(), 7, b"secret").unwrap();

        assert!(matches!(m.unseal(&other), Err(Error::Crypto(_))));
        assert_eq!(m.unseal(&receiver).unwrap(), b"secret");
    }

    #[test]
    fn truncated_frame() {
        let frame = hex::decode(SEALED.frame).unwrap();

        let r = SealedMessage::decode_owned(&frame[..40]);
        assert!(matches!(r, Err(esr_abi::Error::TruncatedInput { .. })));
    }

    #[test]
    fn json_envelope() {
        let frame = hex::decode(SEALED.frame).unwrap();
        let (m, _) = SealedMessage::decode_owned(&frame).unwrap();

        let v = serde_json::to_value(&m).unwrap();
        assert_eq!(v["from"], SEALED.sender_public);
        assert_eq!(v["nonce"], "42");
        assert_eq!(v["ciphertext"], SEALED.ciphertext);

        let d: SealedMessage = serde_json::from_value(v).unwrap();
        assert_eq!(d, m);
    }
}
