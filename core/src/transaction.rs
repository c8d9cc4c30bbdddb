// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Actions and transactions
//!
//! ## Transaction encoding
//! ```text
//!  expiration             u32 (time_point_sec)
//!  ref_block_num          u16
//!  ref_block_prefix       u32
//!  max_net_usage_words    varuint32
//!  max_cpu_usage_ms       u8
//!  delay_sec              varuint32
//!  context_free_actions   action[]
//!  actions                action[]
//!  transaction_extensions extension[]
//! ```

use core::{fmt, str::FromStr};
use std::collections::HashMap;

use byteorder::{ByteOrder, LittleEndian};
use encdec::{DecodeOwned, Encode};
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use esr_abi::{
    helpers::{bytes_len, list_len, varuint32_len, Reader, Writer},
    Abi, Name, TimePointSec,
};

use crate::{chain::ChainInfo, ChainId, Checksum256, Error};

/// Placeholder resolved to the signing actor (`............1`)
pub const PLACEHOLDER_ACTOR: Name = Name::from_raw(1);

/// Placeholder resolved to the signing permission (`............2`)
pub const PLACEHOLDER_PERMISSION: Name = Name::from_raw(2);

/// Contract ABIs keyed by account
pub type AbiMap = HashMap<Name, Abi>;

/// Actor and permission pair
#[derive(Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PermissionLevel {
    pub actor: Name,
    pub permission: Name,
}

impl PermissionLevel {
    pub fn new(actor: impl Into<Name>, permission: impl Into<Name>) -> Self {
        Self {
            actor: actor.into(),
            permission: permission.into(),
        }
    }

    /// Placeholder permission, resolved to the signer at signing time
    pub const fn placeholder() -> Self {
        Self {
            actor: PLACEHOLDER_ACTOR,
            permission: PLACEHOLDER_PERMISSION,
        }
    }

    /// Check whether either field is a placeholder
    pub fn is_placeholder(&self) -> bool {
        is_placeholder(self.actor) || is_placeholder(self.permission)
    }

    /// Replace placeholder fields with the signer
    ///
    /// `............1` resolves to the signing actor, `............2` to the
    /// signing permission. Either placeholder in the permission slot resolves
    /// to the signing permission.
    pub fn resolve(&self, signer: &PermissionLevel) -> Self {
        Self {
            actor: resolve_name(self.actor, signer),
            permission: match self.permission {
                PLACEHOLDER_ACTOR => signer.permission,
                n => resolve_name(n, signer),
            },
        }
    }
}

fn is_placeholder(n: Name) -> bool {
    n == PLACEHOLDER_ACTOR || n == PLACEHOLDER_PERMISSION
}

fn resolve_name(n: Name, signer: &PermissionLevel) -> Name {
    match n {
        PLACEHOLDER_ACTOR => signer.actor,
        PLACEHOLDER_PERMISSION => signer.permission,
        n => n,
    }
}

impl fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.actor, self.permission)
    }
}

impl fmt::Debug for PermissionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PermissionLevel({self})")
    }
}

impl FromStr for PermissionLevel {
    type Err = Error;

    /// Parse `actor@permission`, permission defaults to `active`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (actor, permission) = s.split_once('@').unwrap_or((s, "active"));

        for n in [actor, permission] {
            if !Name::is_valid(n) {
                return Err(Error::Abi(esr_abi::Error::invalid(
                    "permission_level",
                    format!("invalid name '{n}'"),
                )));
            }
        }

        Ok(Self::new(actor, permission))
    }
}

impl Encode for PermissionLevel {
    type Error = esr_abi::Error;

    fn encode_len(&self) -> Result<usize, Self::Error> {
        Ok(16)
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, Self::Error> {
        let mut w = Writer::new(buff);
        w.write(&self.actor)?;
        w.write(&self.permission)?;
        Ok(w.offset())
    }
}

impl DecodeOwned for PermissionLevel {
    type Output = Self;

    type Error = esr_abi::Error;

    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), Self::Error> {
        let mut r = Reader::new(buff);

        let actor = r.read::<Name>("permission_level")?;
        let permission = r.read::<Name>("permission_level")?;

        Ok((Self { actor, permission }, r.offset()))
    }
}

/// Action payload, either chain binary or ABI-typed fields pending serialization
#[derive(Clone, PartialEq, Debug)]
pub enum ActionData {
    /// Serialized action data
    Raw(Vec<u8>),
    /// Typed fields, serialized using the contract ABI
    Fields(Map<String, Value>),
}

impl Default for ActionData {
    fn default() -> Self {
        ActionData::Raw(vec![])
    }
}

impl ActionData {
    /// Build typed fields from ordered key / value pairs
    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        ActionData::Fields(pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }

    pub fn is_raw(&self) -> bool {
        matches!(self, ActionData::Raw(_))
    }

    /// Fetch serialized data, typed fields must be serialized first
    pub fn raw(&self) -> Option<&[u8]> {
        match self {
            ActionData::Raw(d) => Some(d),
            ActionData::Fields(_) => None,
        }
    }
}

/// Normalise loosely structured input
///
/// - objects become typed fields
/// - arrays of `[key, value]` pairs become typed fields in order
/// - hex strings become raw data
impl TryFrom<Value> for ActionData {
    type Error = Error;

    fn try_from(v: Value) -> Result<Self, Self::Error> {
        match v {
            Value::Object(m) => Ok(ActionData::Fields(m)),
            Value::String(s) => hex::decode(&s)
                .map(ActionData::Raw)
                .map_err(|_| Error::Abi(esr_abi::Error::invalid("action data", "invalid hex"))),
            Value::Array(a) => {
                let mut m = Map::new();
                for p in a {
                    match p {
                        Value::Array(kv) if kv.len() == 2 => match (&kv[0], &kv[1]) {
                            (Value::String(k), v) => {
                                m.insert(k.clone(), v.clone());
                            }
                            _ => return Err(invalid_pairs()),
                        },
                        _ => return Err(invalid_pairs()),
                    }
                }
                Ok(ActionData::Fields(m))
            }
            Value::Null => Ok(ActionData::Raw(vec![])),
            _ => Err(Error::Abi(esr_abi::Error::invalid(
                "action data",
                "expected object, pairs or hex string",
            ))),
        }
    }
}

fn invalid_pairs() -> Error {
    Error::Abi(esr_abi::Error::invalid(
        "action data",
        "expected [key, value] pairs",
    ))
}

impl From<Vec<u8>> for ActionData {
    fn from(d: Vec<u8>) -> Self {
        ActionData::Raw(d)
    }
}

impl From<Map<String, Value>> for ActionData {
    fn from(m: Map<String, Value>) -> Self {
        ActionData::Fields(m)
    }
}

impl From<ActionData> for Value {
    fn from(d: ActionData) -> Self {
        match d {
            ActionData::Raw(d) => Value::String(hex::encode(d)),
            ActionData::Fields(m) => Value::Object(m),
        }
    }
}

impl Serialize for ActionData {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ActionData::Raw(d) => serializer.serialize_str(&hex::encode(d)),
            ActionData::Fields(m) => m.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for ActionData {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let v = Value::deserialize(deserializer)?;
        ActionData::try_from(v).map_err(serde::de::Error::custom)
    }
}

/// Patch placeholder `name` slots in serialized action data
fn resolve_raw(abi: &Abi, ty: &str, d: &[u8], signer: &PermissionLevel) -> Vec<u8> {
    let mut out = d.to_vec();

    let offsets = match abi.name_offsets(ty, d) {
        Ok(o) => o,
        Err(e) => {
            debug!("action data not decodable as '{}', left unchanged: {}", ty, e);
            return out;
        }
    };

    for o in offsets {
        let slot = match out.get_mut(o..o + 8) {
            Some(s) => s,
            None => continue,
        };

        let n = Name::from_raw(LittleEndian::read_u64(slot));
        let r = resolve_name(n, signer);
        if r != n {
            LittleEndian::write_u64(slot, r.raw());
        }
    }

    out
}

/// Contract action
#[derive(Clone, PartialEq, Debug, Default, Serialize, Deserialize)]
pub struct Action {
    pub account: Name,
    pub name: Name,
    pub authorization: Vec<PermissionLevel>,
    pub data: ActionData,
}

impl Action {
    /// Resolve placeholders and serialize typed data
    ///
    /// Placeholders are replaced only in `name` typed fields. Raw data keeps every
    /// byte other than placeholder `name` slots, which are located using the contract
    /// ABI where one is available.
    pub fn resolve(&self, signer: &PermissionLevel, abis: &AbiMap) -> Result<Action, Error> {
        let authorization = self
            .authorization
            .iter()
            .map(|p| p.resolve(signer))
            .collect();

        let abi = abis.get(&self.account);

        let data = match (&self.data, abi) {
            (ActionData::Fields(m), Some(abi)) => {
                let ty = abi
                    .action_type(self.name)
                    .ok_or_else(|| esr_abi::Error::UnknownType(self.name.to_string()))?;

                let mut v = Value::Object(m.clone());
                abi.map_names(ty, &mut v, &mut |n| resolve_name(n, signer))?;
                abi.serialize(ty, &v)?
            }
            (ActionData::Fields(_), None) => {
                return Err(Error::unsupported(format!(
                    "no ABI available for typed action {}::{}",
                    self.account, self.name
                )))
            }
            (ActionData::Raw(d), Some(abi)) => match abi.action_type(self.name) {
                Some(ty) => resolve_raw(abi, ty, d, signer),
                None => d.clone(),
            },
            (ActionData::Raw(d), None) => d.clone(),
        };

        Ok(Action {
            account: self.account,
            name: self.name,
            authorization,
            data: ActionData::Raw(data),
        })
    }

    /// Decode raw data to typed fields for display
    pub fn decode(&self, abi: &Abi) -> Result<Action, Error> {
        let data = match &self.data {
            ActionData::Raw(d) => match abi.deserialize_action(self.name, d)? {
                Value::Object(m) => ActionData::Fields(m),
                _ => return Err(Error::unsupported("action type is not a struct")),
            },
            f => f.clone(),
        };

        Ok(Action {
            data,
            ..self.clone()
        })
    }

    fn raw_data(&self) -> Result<&[u8], esr_abi::Error> {
        self.data.raw().ok_or_else(|| {
            esr_abi::Error::invalid("action", "action data must be serialized before encoding")
        })
    }
}

impl Encode for Action {
    type Error = esr_abi::Error;

    fn encode_len(&self) -> Result<usize, Self::Error> {
        Ok(16 + list_len(&self.authorization)? + bytes_len(self.raw_data()?))
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, Self::Error> {
        let mut w = Writer::new(buff);

        w.write(&self.account)?;
        w.write(&self.name)?;
        w.list(&self.authorization)?;
        w.bytes(self.raw_data()?)?;

        Ok(w.offset())
    }
}

impl DecodeOwned for Action {
    type Output = Self;

    type Error = esr_abi::Error;

    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), Self::Error> {
        let mut r = Reader::new(buff);

        let account = r.read::<Name>("action.account")?;
        let name = r.read::<Name>("action.name")?;
        let authorization = r.list::<PermissionLevel>("action.authorization")?;
        let data = r.bytes("action.data")?.to_vec();

        let a = Action {
            account,
            name,
            authorization,
            data: ActionData::Raw(data),
        };

        Ok((a, r.offset()))
    }
}

/// Transaction extension
#[derive(Clone, PartialEq, Debug, Default, Serialize, Deserialize)]
pub struct Extension {
    #[serde(rename = "type")]
    pub ty: u16,
    #[serde(with = "crate::helpers::hex_bytes")]
    pub data: Vec<u8>,
}

impl Encode for Extension {
    type Error = esr_abi::Error;

    fn encode_len(&self) -> Result<usize, Self::Error> {
        Ok(2 + bytes_len(&self.data))
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, Self::Error> {
        let mut w = Writer::new(buff);
        w.u16(self.ty)?;
        w.bytes(&self.data)?;
        Ok(w.offset())
    }
}

impl DecodeOwned for Extension {
    type Output = Self;

    type Error = esr_abi::Error;

    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), Self::Error> {
        let mut r = Reader::new(buff);

        let ty = r.u16("extension.type")?;
        let data = r.bytes("extension.data")?.to_vec();

        Ok((Self { ty, data }, r.offset()))
    }
}

/// Transaction header, TAPOS fields bind the transaction to a recent block
#[derive(Copy, Clone, PartialEq, Debug, Default, Serialize, Deserialize)]
pub struct TransactionHeader {
    pub expiration: TimePointSec,
    pub ref_block_num: u16,
    pub ref_block_prefix: u32,
    pub max_net_usage_words: u32,
    pub max_cpu_usage_ms: u8,
    pub delay_sec: u32,
}

impl TransactionHeader {
    /// Build a header from fresh chain state, expiring `expire_seconds` after `now`
    pub fn from_chain(info: &ChainInfo, now: u32, expire_seconds: u32) -> Self {
        Self {
            expiration: TimePointSec::from_unix(now.saturating_add(expire_seconds)),
            ref_block_num: info.ref_block_num(),
            ref_block_prefix: info.ref_block_prefix(),
            ..Default::default()
        }
    }

    /// Replace TAPOS fields, retaining resource limits and delay
    pub fn with_tapos(&self, tapos: &TransactionHeader) -> Self {
        Self {
            expiration: tapos.expiration,
            ref_block_num: tapos.ref_block_num,
            ref_block_prefix: tapos.ref_block_prefix,
            ..*self
        }
    }
}

impl Encode for TransactionHeader {
    type Error = esr_abi::Error;

    fn encode_len(&self) -> Result<usize, Self::Error> {
        Ok(4 + 2
            + 4
            + varuint32_len(self.max_net_usage_words)
            + 1
            + varuint32_len(self.delay_sec))
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, Self::Error> {
        let mut w = Writer::new(buff);

        w.write(&self.expiration)?;
        w.u16(self.ref_block_num)?;
        w.u32(self.ref_block_prefix)?;
        w.varuint32(self.max_net_usage_words)?;
        w.u8(self.max_cpu_usage_ms)?;
        w.varuint32(self.delay_sec)?;

        Ok(w.offset())
    }
}

impl DecodeOwned for TransactionHeader {
    type Output = Self;

    type Error = esr_abi::Error;

    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), Self::Error> {
        let mut r = Reader::new(buff);

        let h = TransactionHeader {
            expiration: r.read::<TimePointSec>("transaction.expiration")?,
            ref_block_num: r.u16("transaction.ref_block_num")?,
            ref_block_prefix: r.u32("transaction.ref_block_prefix")?,
            max_net_usage_words: r.varuint32("transaction.max_net_usage_words")?,
            max_cpu_usage_ms: r.u8("transaction.max_cpu_usage_ms")?,
            delay_sec: r.varuint32("transaction.delay_sec")?,
        };

        Ok((h, r.offset()))
    }
}

/// Chain transaction
#[derive(Clone, PartialEq, Debug, Default, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(flatten)]
    pub header: TransactionHeader,
    #[serde(default)]
    pub context_free_actions: Vec<Action>,
    pub actions: Vec<Action>,
    #[serde(default)]
    pub transaction_extensions: Vec<Extension>,
}

impl Transaction {
    /// Serialize the transaction, all action data must be raw
    pub fn packed(&self) -> Result<Vec<u8>, Error> {
        Ok(esr_abi::helpers::to_vec(self)?)
    }

    /// Transaction id, SHA-256 of the serialized transaction
    pub fn id(&self) -> Result<Checksum256, Error> {
        let p = self.packed()?;
        Ok(Checksum256::hash(&[p.as_slice()]))
    }

    /// Signing digest, `SHA-256(chain_id ‖ transaction ‖ context_free_data_digest)`
    /// where context free data is empty (32 zero bytes)
    pub fn signing_digest(&self, chain_id: &ChainId) -> Result<Checksum256, Error> {
        let p = self.packed()?;
        Ok(signing_digest(chain_id, &p))
    }
}

/// Compute the signing digest for a packed transaction with no context free data
pub fn signing_digest(chain_id: &ChainId, packed: &[u8]) -> Checksum256 {
    Checksum256::hash(&[chain_id.as_ref(), packed, &[0u8; 32][..]])
}

impl Encode for Transaction {
    type Error = esr_abi::Error;

    fn encode_len(&self) -> Result<usize, Self::Error> {
        Ok(self.header.encode_len()?
            + list_len(&self.context_free_actions)?
            + list_len(&self.actions)?
            + list_len(&self.transaction_extensions)?)
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, Self::Error> {
        let mut w = Writer::new(buff);

        w.write(&self.header)?;
        w.list(&self.context_free_actions)?;
        w.list(&self.actions)?;
        w.list(&self.transaction_extensions)?;

        Ok(w.offset())
    }
}

impl DecodeOwned for Transaction {
    type Output = Self;

    type Error = esr_abi::Error;

    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), Self::Error> {
        let mut r = Reader::new(buff);

        let t = Transaction {
            header: r.read::<TransactionHeader>("transaction")?,
            context_free_actions: r.list::<Action>("transaction.context_free_actions")?,
            actions: r.list::<Action>("transaction.actions")?,
            transaction_extensions: r.list::<Extension>("transaction.transaction_extensions")?,
        };

        Ok((t, r.offset()))
    }
}
