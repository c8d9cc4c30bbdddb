// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Signing request URI and binary encoding

use std::io::{Read, Write};

use base64::{
    engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD},
    DecodeError, Engine,
};
use flate2::{read::DeflateDecoder, write::DeflateEncoder, Compression};
use log::{debug, trace};

use esr_abi::{
    helpers::{push, push_bytes, push_varuint32, Reader},
    Name,
};

use super::{
    ChainIdVariant, IdentityRequest, InfoPair, RequestFlags, RequestPayload, SigningRequest,
    SUPPORTED_VERSIONS,
};
use crate::{
    chain::{ChainAlias, Checksum256},
    transaction::{Action, PermissionLevel, Transaction},
    Error,
};

/// Accepted URI schemes, longest first
const SCHEMES: &[&str] = &["web+esr://", "esr://", "esr:"];

/// Header bit set when the payload is deflated
const COMPRESSED: u8 = 1 << 7;

/// Header bits carrying the protocol version
const VERSION_MASK: u8 = 0x07;

/// Limit on inflated payload size
const MAX_INFLATED_LEN: u64 = 1 << 20;

/// Request encoding options
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct EncodeOptions {
    /// Deflate the payload where this reduces its size
    pub compress: bool,
    /// Use `esr://` rather than `esr:`
    pub slashes: bool,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            compress: true,
            slashes: false,
        }
    }
}

impl SigningRequest {
    /// Decode a request from an `esr:`, `esr://` or `web+esr://` URI
    pub fn from_uri(uri: &str) -> Result<Self, Error> {
        let uri = uri.trim();

        let payload = SCHEMES
            .iter()
            .find_map(|s| uri.strip_prefix(s))
            .ok_or_else(|| Error::parse("scheme", 0))?;

        let mut r = Self::from_base64(payload)?;
        r.original = Some(uri.to_string());

        Ok(r)
    }

    /// Decode a request from base64url data with no scheme
    pub fn from_base64(payload: &str) -> Result<Self, Error> {
        let d = decode_base64(payload)?;
        Self::from_bytes(&d)
    }

    /// Decode a request from header and (optionally compressed) payload bytes
    pub fn from_bytes(d: &[u8]) -> Result<Self, Error> {
        let (header, body) = d.split_first().ok_or_else(|| Error::parse("header", 0))?;

        let version = header & VERSION_MASK;
        if !SUPPORTED_VERSIONS.contains(&version) {
            return Err(Error::unsupported(format!("protocol version {version}")));
        }

        let body = match header & COMPRESSED != 0 {
            true => inflate(body)?,
            false => body.to_vec(),
        };

        trace!(
            "decoding v{} request ({} payload bytes, compressed: {})",
            version,
            body.len(),
            header & COMPRESSED != 0
        );

        decode_payload(version, &body)
    }

    /// Encode to header and payload bytes
    pub fn to_bytes(&self, opts: &EncodeOptions) -> Result<Vec<u8>, Error> {
        if !SUPPORTED_VERSIONS.contains(&self.version) {
            return Err(Error::unsupported(format!(
                "protocol version {}",
                self.version
            )));
        }

        let body = encode_payload(self)?;

        let mut header = self.version;
        let body = match opts.compress {
            true => {
                let c = deflate(&body)?;
                match c.len() < body.len() {
                    true => {
                        header |= COMPRESSED;
                        c
                    }
                    false => body,
                }
            }
            false => body,
        };

        let mut out = Vec::with_capacity(body.len() + 1);
        out.push(header);
        out.extend_from_slice(&body);

        Ok(out)
    }

    /// Encode to an `esr:` URI
    pub fn encode_uri(&self, opts: &EncodeOptions) -> Result<String, Error> {
        let b = self.to_bytes(opts)?;

        let scheme = match opts.slashes {
            true => "esr://",
            false => "esr:",
        };

        Ok(format!("{}{}", scheme, URL_SAFE_NO_PAD.encode(b)))
    }

    /// URI echoed in callbacks, the original URI where this request was decoded
    pub fn request_uri(&self) -> Result<String, Error> {
        match &self.original {
            Some(u) => Ok(u.clone()),
            None => self.encode_uri(&EncodeOptions::default()),
        }
    }
}

/// Decode base64url data, tolerating missing padding and the standard alphabet
fn decode_base64(s: &str) -> Result<Vec<u8>, Error> {
    let mut b: String = s
        .trim_end_matches('=')
        .chars()
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            c => c,
        })
        .collect();

    while b.len() % 4 != 0 {
        b.push('=');
    }

    STANDARD.decode(&b).map_err(|e| match e {
        DecodeError::InvalidByte(offset, _) | DecodeError::InvalidLastSymbol(offset, _) => {
            Error::parse("base64", offset)
        }
        _ => Error::parse("base64", s.len()),
    })
}

fn inflate(d: &[u8]) -> Result<Vec<u8>, Error> {
    let mut out = vec![];

    DeflateDecoder::new(d)
        .take(MAX_INFLATED_LEN)
        .read_to_end(&mut out)
        .map_err(|e| {
            debug!("inflate failed: {:?}", e);
            Error::parse("deflate", out.len())
        })?;

    if out.len() as u64 >= MAX_INFLATED_LEN {
        return Err(Error::unsupported("inflated request exceeds size limit"));
    }

    Ok(out)
}

fn deflate(d: &[u8]) -> Result<Vec<u8>, Error> {
    let mut e = DeflateEncoder::new(Vec::new(), Compression::best());

    e.write_all(d)
        .and_then(|_| e.finish())
        .map_err(|e| Error::unsupported(format!("deflate failed: {e}")))
}

fn decode_payload(version: u8, d: &[u8]) -> Result<SigningRequest, Error> {
    let mut r = Reader::new(d);

    let chain_id = match r.u8("chain_id")? {
        0 => ChainIdVariant::Alias(ChainAlias::from_index(r.u8("chain_alias")?)?),
        1 => ChainIdVariant::Id(r.read::<Checksum256>("chain_id")?),
        i => {
            return Err(Error::UnknownVariant {
                kind: "chain_id".to_string(),
                index: i.to_string(),
            })
        }
    };

    let req = match r.u8("request")? {
        0 => RequestPayload::Action(r.read::<Action>("action")?),
        1 => RequestPayload::Actions(r.list::<Action>("action[]")?),
        2 => RequestPayload::Transaction(r.read::<Transaction>("transaction")?),
        3 => RequestPayload::Identity(decode_identity(version, &mut r)?),
        i => {
            return Err(Error::UnknownVariant {
                kind: "request".to_string(),
                index: i.to_string(),
            })
        }
    };

    // Trailing fields may be absent
    let flags = match r.is_empty() {
        true => None,
        false => Some(RequestFlags::from_bits_truncate(r.u8("flags")?)),
    };

    let callback = match r.is_empty() {
        true => None,
        false => Some(r.string("callback")?).filter(|c| !c.is_empty()),
    };

    let mut info = vec![];
    if !r.is_empty() {
        let n = r.varuint32("info")?;
        for _ in 0..n {
            let key = r.string("info.key")?;
            let value = r.bytes("info.value")?.to_vec();
            info.push(InfoPair { key, value });
        }
    }

    if !r.is_empty() {
        debug!(
            "ignoring {} trailing request bytes at offset {}",
            r.remaining().len(),
            r.offset()
        );
    }

    Ok(SigningRequest {
        version,
        chain_id,
        req,
        flags,
        callback,
        info,
        original: None,
    })
}

fn decode_identity(version: u8, r: &mut Reader) -> Result<IdentityRequest, Error> {
    let scope = match version >= 3 {
        true => Some(r.read::<Name>("identity.scope")?),
        false => None,
    };

    let offset = r.offset();
    let permission = match r.u8("identity.permission")? {
        0 => None,
        1 => Some(r.read::<PermissionLevel>("identity.permission")?),
        _ => return Err(Error::parse("identity.permission", offset)),
    };

    Ok(IdentityRequest { scope, permission })
}

fn encode_payload(req: &SigningRequest) -> Result<Vec<u8>, Error> {
    let mut out = vec![];

    match &req.chain_id {
        ChainIdVariant::Alias(a) => {
            out.push(0);
            out.push(*a as u8);
        }
        ChainIdVariant::Id(id) => {
            out.push(1);
            push(&mut out, id)?;
        }
    }

    out.push(req.req.index());

    match &req.req {
        RequestPayload::Action(a) => push(&mut out, a)?,
        RequestPayload::Actions(v) => {
            push_varuint32(&mut out, v.len() as u32);
            for a in v {
                push(&mut out, a)?;
            }
        }
        RequestPayload::Transaction(t) => push(&mut out, t)?,
        RequestPayload::Identity(i) => {
            match (req.version >= 3, i.scope) {
                (true, scope) => push(&mut out, &scope.unwrap_or_default())?,
                (false, Some(_)) => {
                    return Err(Error::unsupported("identity scope requires version 3"))
                }
                (false, None) => (),
            }

            match &i.permission {
                Some(p) => {
                    out.push(1);
                    push(&mut out, p)?;
                }
                None => out.push(0),
            }
        }
    }

    // Omit trailing fields entirely where none are set so absent flags survive
    if req.flags.is_none() && req.callback.is_none() && req.info.is_empty() {
        return Ok(out);
    }

    out.push(req.flags.unwrap_or_default().bits());

    push_bytes(&mut out, req.callback.as_deref().unwrap_or_default().as_bytes());

    push_varuint32(&mut out, req.info.len() as u32);
    for i in &req.info {
        push_bytes(&mut out, i.key.as_bytes());
        push_bytes(&mut out, &i.value);
    }

    Ok(out)
}

#[cfg(test)]
mod test {
    use core::str::FromStr;

    use esr_tests::{
        chain::{EOS_CHAIN_ID, WAX_CHAIN_ID},
        requests::*,
    };

    use super::*;
    use crate::ChainId;

    fn raw(uri: &str) -> Vec<u8> {
        decode_base64(uri.trim_start_matches("esr:")).unwrap()
    }

    #[test]
    fn decode_transfer() {
        let r = SigningRequest::from_uri(TRANSFER_URI).unwrap();

        assert_eq!(r.version, 2);
        assert_eq!(r.chain_id, ChainIdVariant::Alias(ChainAlias::Eos));
        assert_eq!(r.chain_id().to_string(), EOS_CHAIN_ID);
        assert_eq!(r.flags, Some(RequestFlags::BROADCAST));
        assert!(r.should_broadcast());
        assert!(!r.is_background());
        assert_eq!(r.callback.as_deref(), Some(TRANSFER_CALLBACK));
        assert_eq!(r.info_string("memo").as_deref(), Some("hi"));
        assert_eq!(r.original.as_deref(), Some(TRANSFER_URI));

        let a = match &r.req {
            RequestPayload::Action(a) => a,
            p => panic!("unexpected payload {p:?}"),
        };
        assert_eq!(a.account, Name::new("eosio.token"));
        assert_eq!(a.name, Name::new("transfer"));
        assert_eq!(a.authorization, vec![PermissionLevel::placeholder()]);
        assert_eq!(a.data.raw().map(hex::encode).as_deref(), Some(TRANSFER_DATA));

        assert_eq!(r.contracts(), vec![Name::new("eosio.token")]);
    }

    #[test]
    fn decode_compressed() {
        let a = SigningRequest::from_uri(TRANSFER_URI).unwrap();
        let b = SigningRequest::from_uri(TRANSFER_URI_COMPRESSED).unwrap();

        assert_eq!(b.original.as_deref(), Some(TRANSFER_URI_COMPRESSED));
        assert_eq!(SigningRequest { original: None, ..a }, SigningRequest { original: None, ..b });
    }

    #[test]
    fn encode_transfer() {
        let r = SigningRequest::from_uri(TRANSFER_URI).unwrap();

        let opts = EncodeOptions {
            compress: false,
            slashes: false,
        };
        assert_eq!(r.encode_uri(&opts).unwrap(), TRANSFER_URI);

        // Compressed output is no larger and decodes to the same request
        let c = r.encode_uri(&EncodeOptions::default()).unwrap();
        assert!(c.len() <= TRANSFER_URI.len());

        let d = SigningRequest::from_uri(&c).unwrap();
        assert_eq!(d.req, r.req);
        assert_eq!(d.flags, r.flags);
        assert_eq!(d.callback, r.callback);
        assert_eq!(d.info, r.info);
    }

    #[test]
    fn decode_identity_v2() {
        let r = SigningRequest::from_uri(IDENTITY_URI).unwrap();

        assert_eq!(r.version, 2);
        assert_eq!(r.chain_id(), ChainId::from_str(WAX_CHAIN_ID).unwrap());
        assert!(r.is_identity());
        assert_eq!(r.req, RequestPayload::Identity(IdentityRequest::default()));
        assert!(r.req.actions().is_empty());
        assert_eq!(r.flags, Some(RequestFlags::BACKGROUND));
        assert!(r.is_background());
        assert!(!r.should_broadcast());
        assert_eq!(r.callback.as_deref(), Some(IDENTITY_CALLBACK));
        assert!(r.info.is_empty());
    }

    #[test]
    fn identity_v3_with_scope() {
        let r = SigningRequest::from_uri(IDENTITY_V3_URI).unwrap();

        assert_eq!(r.version, 3);
        assert_eq!(
            r.chain_id,
            ChainIdVariant::Id(ChainId::from_str(EOS_CHAIN_ID).unwrap())
        );
        assert_eq!(
            r.req,
            RequestPayload::Identity(IdentityRequest {
                scope: Some(Name::new("example")),
                permission: Some(PermissionLevel::placeholder()),
            })
        );
        assert_eq!(r.flags, Some(RequestFlags::empty()));
        assert_eq!(r.callback, None);
        assert_eq!(r.info_string("foo").as_deref(), Some("bar"));

        let opts = EncodeOptions {
            compress: false,
            slashes: false,
        };
        assert_eq!(r.encode_uri(&opts).unwrap(), IDENTITY_V3_URI);

        // Scope requires version 3
        let v2 = SigningRequest { version: 2, ..r };
        assert!(matches!(v2.to_bytes(&opts), Err(Error::Unsupported(_))));
    }

    #[test]
    fn absent_flags() {
        // v2, EOS alias, identity with no permission, nothing after
        let r = SigningRequest::from_bytes(&[0x02, 0x00, 0x01, 0x03, 0x00]).unwrap();

        assert_eq!(r.flags, None);
        assert_eq!(r.callback, None);
        assert!(r.info.is_empty());
        assert!(!r.should_broadcast());

        let b = r.to_bytes(&EncodeOptions { compress: false, slashes: false }).unwrap();
        assert_eq!(b, [0x02, 0x00, 0x01, 0x03, 0x00]);
    }

    #[test]
    fn schemes() {
        let payload = TRANSFER_URI.trim_start_matches("esr:");
        let a = SigningRequest::from_uri(TRANSFER_URI).unwrap();

        for s in ["esr://", "web+esr://"] {
            let r = SigningRequest::from_uri(&format!("{s}{payload}")).unwrap();
            assert_eq!(r.req, a.req);
        }

        // Standard alphabet and padding are tolerated
        let std = STANDARD.encode(raw(TRANSFER_URI));
        let r = SigningRequest::from_base64(&std).unwrap();
        assert_eq!(r.req, a.req);

        assert_eq!(
            SigningRequest::from_uri(&format!("https://{payload}")),
            Err(Error::parse("scheme", 0))
        );

        let opts = EncodeOptions {
            compress: false,
            slashes: true,
        };
        assert!(a.encode_uri(&opts).unwrap().starts_with("esr://"));
    }

    #[test]
    fn truncated_requests_fail() {
        let d = raw(TRANSFER_URI);

        // Every cut inside the action fails rather than returning a partial request
        for n in 1..60 {
            let r = SigningRequest::from_bytes(&d[..n]);
            assert!(
                matches!(r, Err(Error::Parse { .. })),
                "expected parse error at {n}, got {r:?}"
            );
        }
    }

    #[test]
    fn invalid_variants() {
        assert!(matches!(
            SigningRequest::from_bytes(&[0x02, 0x02]),
            Err(Error::UnknownVariant { .. })
        ));
        assert!(matches!(
            SigningRequest::from_bytes(&[0x02, 0x00, 0x01, 0x07]),
            Err(Error::UnknownVariant { .. })
        ));
        assert!(matches!(
            SigningRequest::from_bytes(&[0x02, 0x00, 0x00, 0x03, 0x00]),
            Err(Error::UnknownVariant { .. })
        ));
        assert!(matches!(
            SigningRequest::from_bytes(&[0x02, 0x00, 0x01, 0x03, 0x05]),
            Err(Error::Parse { .. })
        ));
        assert!(matches!(
            SigningRequest::from_bytes(&[0x01, 0x00, 0x01, 0x03, 0x00]),
            Err(Error::Unsupported(_))
        ));
        assert!(matches!(
            SigningRequest::from_bytes(&[0x82, 0xff, 0xff]),
            Err(Error::Parse { .. })
        ));
        assert!(matches!(
            SigningRequest::from_bytes(&[]),
            Err(Error::Parse { .. })
        ));
    }

    #[test]
    fn invalid_base64() {
        assert!(matches!(
            SigningRequest::from_uri("esr:AgAB*AAA"),
            Err(Error::Parse { .. })
        ));
        assert!(matches!(
            SigningRequest::from_uri("esr:A"),
            Err(Error::Parse { .. })
        ));
    }
}
