// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Relay wire messages
//!
//! Text frames carry JSON envelopes tagged by `type`, binary frames carry a
//! [SealedMessage] in its binary layout:
//!
//! ```text
//!  key_type    u8
//!  from        [u8; 33]   sender public key
//!  nonce       u64        little-endian
//!  ciphertext  bytes      varuint32 length prefixed
//!  checksum    u32        key checksum, little-endian
//! ```
//!
//! Sealed plaintext is either a nested JSON envelope or a request URI.

use encdec::DecodeOwned;
use log::trace;
use serde::{Deserialize, Serialize};

use esr_abi::PublicKey;
use esr_core::{CallbackPayload, ChainAlias, ChainId, PrivateKey, SealedMessage, SigningRequest};

use crate::Error;

/// Nesting limit for sealed envelopes
const MAX_DEPTH: usize = 2;

/// Relay message envelope
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RelayMessage {
    Identify(Identify),
    Request(RequestMessage),
    Identity(RequestMessage),
    Ping,
    Pong,
    Callback(CallbackMessage),
    SealedMessage(SealedMessage),
    #[serde(other)]
    Unknown,
}

impl RelayMessage {
    pub fn to_json(&self) -> Result<String, Error> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Wallet identification, sent on connect so the relay can route requests
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct Identify {
    pub link_id: String,
    /// Wallet display name
    pub name: String,
    pub request_key: PublicKey,
    pub device_id: String,
    pub chains: Vec<RelayChain>,
}

/// Chain advertised in [Identify]
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct RelayChain {
    pub chain_id: ChainId,
    pub name: String,
}

impl From<ChainId> for RelayChain {
    fn from(chain_id: ChainId) -> Self {
        let name = match ChainAlias::from_chain_id(&chain_id) {
            Some(a) => a.to_string(),
            None => chain_id.to_string(),
        };

        Self { chain_id, name }
    }
}

/// Unsealed signing or identity request
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct RequestMessage {
    /// Request URI
    pub payload: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback: Option<String>,
}

/// Signed request result returned via the relay
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct CallbackMessage {
    pub payload: CallbackPayload,
}

/// Decoded inbound frame
#[derive(Clone, PartialEq, Debug)]
pub enum Inbound {
    /// Signing request, `sender` is set for sealed messages
    Request {
        request: Box<SigningRequest>,
        callback: Option<String>,
        sender: Option<PublicKey>,
    },
    /// Heartbeat from the relay, expects a pong
    Ping,
    /// Nothing to do
    Ignored,
}

/// Decode a text frame
pub fn decode_text(text: &str, key: &PrivateKey) -> Result<Inbound, Error> {
    decode_envelope(text, key, 0)
}

/// Decode a binary sealed message frame
pub fn decode_binary(data: &[u8], key: &PrivateKey) -> Result<Inbound, Error> {
    let (m, n) = SealedMessage::decode_owned(data)?;
    if n != data.len() {
        return Err(esr_core::Error::Parse {
            field: "sealed_message".to_string(),
            offset: n,
        }
        .into());
    }

    decode_sealed(&m, key, 0)
}

fn decode_envelope(text: &str, key: &PrivateKey, depth: usize) -> Result<Inbound, Error> {
    let m: RelayMessage = serde_json::from_str(text)?;

    let i = match m {
        RelayMessage::Request(r) | RelayMessage::Identity(r) => Inbound::Request {
            request: Box::new(SigningRequest::from_uri(r.payload.trim())?),
            callback: r.callback,
            sender: None,
        },
        RelayMessage::SealedMessage(s) => decode_sealed(&s, key, depth)?,
        RelayMessage::Ping => Inbound::Ping,
        m => {
            trace!("Ignoring relay message: {:?}", m);
            Inbound::Ignored
        }
    };

    Ok(i)
}

fn decode_sealed(m: &SealedMessage, key: &PrivateKey, depth: usize) -> Result<Inbound, Error> {
    if depth >= MAX_DEPTH {
        return Err(Error::unsupported("sealed messages nested too deeply"));
    }

    let plaintext = m.unseal_string(key)?;
    let plaintext = plaintext.trim();

    if !plaintext.starts_with('{') {
        return Ok(Inbound::Request {
            request: Box::new(SigningRequest::from_uri(plaintext)?),
            callback: None,
            sender: Some(m.from),
        });
    }

    match decode_envelope(plaintext, key, depth + 1)? {
        Inbound::Request {
            request,
            callback,
            sender,
        } => Ok(Inbound::Request {
            request,
            callback,
            sender: sender.or(Some(m.from)),
        }),
        i => Ok(i),
    }
}

#[cfg(test)]
mod test {
    use core::str::FromStr;

    use esr_abi::helpers::to_vec;
    use esr_tests::{
        chain::WAX_CHAIN_ID,
        keys::SEALED,
        requests::{IDENTITY_URI, TRANSFER_URI},
    };

    use super::*;

    fn keys() -> (PrivateKey, PrivateKey) {
        (
            PrivateKey::from_str(SEALED.sender_private).unwrap(),
            PrivateKey::from_str(SEALED.receiver_private).unwrap(),
        )
    }

    fn request_of(i: Inbound) -> (SigningRequest, Option<String>, Option<PublicKey>) {
        match i {
            Inbound::Request {
                request,
                callback,
                sender,
            } => (*request, callback, sender),
            i => panic!("expected request, got {i:?}"),
        }
    }

    #[test]
    fn envelope_json() {
        let m = RelayMessage::Request(RequestMessage {
            payload: TRANSFER_URI.to_string(),
            callback: None,
        });
        assert_eq!(
            serde_json::to_value(&m).unwrap(),
            serde_json::json!({"type": "request", "payload": TRANSFER_URI})
        );

        assert_eq!(
            RelayMessage::Pong.to_json().unwrap(),
            r#"{"type":"pong"}"#
        );

        let m: RelayMessage = serde_json::from_str(r#"{"type":"something_new","x":1}"#).unwrap();
        assert_eq!(m, RelayMessage::Unknown);
    }

    #[test]
    fn identify_json() {
        let (_, receiver) = keys();
        let wax = ChainId::from_str(WAX_CHAIN_ID).unwrap();

        let m = RelayMessage::Identify(Identify {
            link_id: "00112233445566778899aabbccddeeff".to_string(),
            name: "wallet".to_string(),
            request_key: receiver.public_key().unwrap(),
            device_id: "device".to_string(),
            chains: vec![wax.into()],
        });

        let v = serde_json::to_value(&m).unwrap();
        assert_eq!(v["type"], "identify");
        assert_eq!(v["request_key"], SEALED.receiver_public);
        assert_eq!(v["chains"][0]["chain_id"], WAX_CHAIN_ID);
        assert_eq!(v["chains"][0]["name"], "WAX");
    }

    #[test]
    fn plain_requests() {
        let (_, receiver) = keys();

        let text = serde_json::json!({
            "type": "identity",
            "payload": IDENTITY_URI,
            "callback": "https://cb.example.com/x",
        })
        .to_string();

        let (r, callback, sender) = request_of(decode_text(&text, &receiver).unwrap());
        assert!(r.is_identity());
        assert_eq!(r.chain_id(), ChainId::from_str(WAX_CHAIN_ID).unwrap());
        assert_eq!(callback.as_deref(), Some("https://cb.example.com/x"));
        assert_eq!(sender, None);

        assert_eq!(
            decode_text(r#"{"type":"ping"}"#, &receiver).unwrap(),
            Inbound::Ping
        );
        assert_eq!(
            decode_text(r#"{"type":"pong"}"#, &receiver).unwrap(),
            Inbound::Ignored
        );
        assert!(matches!(
            decode_text("not json", &receiver),
            Err(Error::Json(_))
        ));
    }

    #[test]
    fn sealed_text_frame() {
        let (sender, receiver) = keys();

        let s = SealedMessage::seal(&sender, &receiver.public_key().unwrap(), 7, TRANSFER_URI.as_bytes())
            .unwrap();
        let text = RelayMessage::SealedMessage(s).to_json().unwrap();

        let (r, _, from) = request_of(decode_text(&text, &receiver).unwrap());
        assert_eq!(r.original.as_deref(), Some(TRANSFER_URI));
        assert_eq!(from, Some(sender.public_key().unwrap()));

        // Only the receiver can unseal
        assert!(matches!(
            decode_text(&text, &sender),
            Err(Error::Core(esr_core::Error::Crypto(_)))
        ));
    }

    #[test]
    fn sealed_nested_envelope() {
        let (sender, receiver) = keys();

        let inner = serde_json::json!({
            "type": "request",
            "payload": TRANSFER_URI,
            "callback": "https://cb.example.com/y",
        })
        .to_string();

        let s = SealedMessage::seal(&sender, &receiver.public_key().unwrap(), 8, inner.as_bytes())
            .unwrap();
        let frame = to_vec(&s).unwrap();

        let (r, callback, from) = request_of(decode_binary(&frame, &receiver).unwrap());
        assert_eq!(r.original.as_deref(), Some(TRANSFER_URI));
        assert_eq!(callback.as_deref(), Some("https://cb.example.com/y"));
        assert_eq!(from, Some(sender.public_key().unwrap()));
    }

    #[test]
    fn binary_frame_vector() {
        let (_, receiver) = keys();
        let frame = hex::decode(SEALED.frame).unwrap();

        // Vector plaintext is not a request
        assert!(matches!(
            decode_binary(&frame, &receiver),
            Err(Error::Core(esr_core::Error::Parse { .. }))
        ));

        // Truncated frames fail before decryption
        assert!(matches!(
            decode_binary(&frame[..frame.len() - 2], &receiver),
            Err(Error::Core(esr_core::Error::Parse { .. }))
        ));

        let mut long = frame.clone();
        long.push(0);
        assert!(matches!(
            decode_binary(&long, &receiver),
            Err(Error::Core(esr_core::Error::Parse { offset, .. })) if offset == frame.len()
        ));
    }
}
