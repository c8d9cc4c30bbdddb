// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Built-in scalar types and their value tree conversions

use core::str::FromStr;

use serde_json::{Map, Number, Value};
use strum::{Display, EnumIter, EnumString};

use crate::{
    helpers::{push, push_bytes, push_varuint32, zigzag, Reader},
    Error,
};

/// Built-in ABI scalar types
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Display, EnumString, EnumIter)]
pub enum BuiltinType {
    #[strum(serialize = "bool")]
    Bool,
    #[strum(serialize = "int8")]
    Int8,
    #[strum(serialize = "uint8")]
    Uint8,
    #[strum(serialize = "int16")]
    Int16,
    #[strum(serialize = "uint16")]
    Uint16,
    #[strum(serialize = "int32")]
    Int32,
    #[strum(serialize = "uint32")]
    Uint32,
    #[strum(serialize = "int64")]
    Int64,
    #[strum(serialize = "uint64")]
    Uint64,
    #[strum(serialize = "int128")]
    Int128,
    #[strum(serialize = "uint128")]
    Uint128,
    #[strum(serialize = "varint32")]
    Varint32,
    #[strum(serialize = "varuint32")]
    Varuint32,
    #[strum(serialize = "float32")]
    Float32,
    #[strum(serialize = "float64")]
    Float64,
    #[strum(serialize = "float128")]
    Float128,
    #[strum(serialize = "time_point")]
    TimePoint,
    #[strum(serialize = "time_point_sec")]
    TimePointSec,
    #[strum(serialize = "block_timestamp_type")]
    BlockTimestamp,
    #[strum(serialize = "name")]
    Name,
    #[strum(serialize = "bytes")]
    Bytes,
    #[strum(serialize = "string")]
    String,
    #[strum(serialize = "checksum160")]
    Checksum160,
    #[strum(serialize = "checksum256")]
    Checksum256,
    #[strum(serialize = "checksum512")]
    Checksum512,
    #[strum(serialize = "public_key")]
    PublicKey,
    #[strum(serialize = "signature")]
    Signature,
    #[strum(serialize = "symbol")]
    Symbol,
    #[strum(serialize = "symbol_code")]
    SymbolCode,
    #[strum(serialize = "asset")]
    Asset,
    #[strum(serialize = "extended_asset")]
    ExtendedAsset,
}

impl BuiltinType {
    /// Lookup a built-in type by ABI name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::from_str(name).ok()
    }

    /// Encode a value of this type, appending to `out`
    pub fn encode(&self, v: &Value, out: &mut Vec<u8>) -> Result<(), Error> {
        use BuiltinType::*;

        let ty = self.to_string();
        let ty = ty.as_str();

        match self {
            Bool => match v {
                Value::Bool(b) => out.push(*b as u8),
                _ => return Err(Error::invalid(ty, "expected boolean")),
            },
            Int8 => out.extend_from_slice(&narrow::<i8, _>(as_i64(v, ty)?, ty)?.to_le_bytes()),
            Uint8 => out.extend_from_slice(&narrow::<u8, _>(as_u64(v, ty)?, ty)?.to_le_bytes()),
            Int16 => out.extend_from_slice(&narrow::<i16, _>(as_i64(v, ty)?, ty)?.to_le_bytes()),
            Uint16 => out.extend_from_slice(&narrow::<u16, _>(as_u64(v, ty)?, ty)?.to_le_bytes()),
            Int32 => out.extend_from_slice(&narrow::<i32, _>(as_i64(v, ty)?, ty)?.to_le_bytes()),
            Uint32 => out.extend_from_slice(&narrow::<u32, _>(as_u64(v, ty)?, ty)?.to_le_bytes()),
            Int64 => out.extend_from_slice(&as_i64(v, ty)?.to_le_bytes()),
            Uint64 => out.extend_from_slice(&as_u64(v, ty)?.to_le_bytes()),
            Int128 => out.extend_from_slice(&as_i128(v, ty)?.to_le_bytes()),
            Uint128 => out.extend_from_slice(&as_u128(v, ty)?.to_le_bytes()),
            Varint32 => push_varuint32(out, zigzag(narrow::<i32, _>(as_i64(v, ty)?, ty)?)),
            Varuint32 => push_varuint32(out, narrow::<u32, _>(as_u64(v, ty)?, ty)?),
            Float32 => out.extend_from_slice(&(as_f64(v, ty)? as f32).to_le_bytes()),
            Float64 => out.extend_from_slice(&as_f64(v, ty)?.to_le_bytes()),
            Float128 => out.extend_from_slice(&as_hex_fixed::<16>(v, ty)?),
            TimePoint => match v {
                Value::Number(_) => out.extend_from_slice(&as_i64(v, ty)?.to_le_bytes()),
                _ => push(out, &parse::<crate::TimePoint>(v, ty)?)?,
            },
            TimePointSec => match v {
                Value::Number(_) => {
                    out.extend_from_slice(&narrow::<u32, _>(as_u64(v, ty)?, ty)?.to_le_bytes())
                }
                _ => push(out, &parse::<crate::TimePointSec>(v, ty)?)?,
            },
            BlockTimestamp => match v {
                Value::Number(_) => {
                    out.extend_from_slice(&narrow::<u32, _>(as_u64(v, ty)?, ty)?.to_le_bytes())
                }
                _ => push(out, &parse::<crate::BlockTimestamp>(v, ty)?)?,
            },
            Name => push(out, &crate::Name::new(as_str(v, ty)?))?,
            Bytes => push_bytes(out, &as_hex(v, ty)?),
            String => push_bytes(out, as_str(v, ty)?.as_bytes()),
            Checksum160 => out.extend_from_slice(&as_hex_fixed::<20>(v, ty)?),
            Checksum256 => out.extend_from_slice(&as_hex_fixed::<32>(v, ty)?),
            Checksum512 => out.extend_from_slice(&as_hex_fixed::<64>(v, ty)?),
            PublicKey => push(out, &parse::<crate::PublicKey>(v, ty)?)?,
            Signature => push(out, &parse::<crate::Signature>(v, ty)?)?,
            Symbol => push(out, &parse::<crate::Symbol>(v, ty)?)?,
            SymbolCode => push(out, &parse::<crate::SymbolCode>(v, ty)?)?,
            Asset => push(out, &parse::<crate::Asset>(v, ty)?)?,
            ExtendedAsset => {
                let quantity = v
                    .get("quantity")
                    .ok_or_else(|| missing(ty, "quantity"))?;
                let contract = v
                    .get("contract")
                    .ok_or_else(|| missing(ty, "contract"))?;

                let a = crate::ExtendedAsset {
                    quantity: parse::<crate::Asset>(quantity, ty)?,
                    contract: crate::Name::new(as_str(contract, ty)?),
                };
                push(out, &a)?
            }
        }

        Ok(())
    }

    /// Decode a value of this type from the reader
    pub fn decode(&self, r: &mut Reader) -> Result<Value, Error> {
        use BuiltinType::*;

        let ty = self.to_string();
        let ty = ty.as_str();

        let v = match self {
            Bool => {
                let offset = r.offset();
                match r.u8(ty)? {
                    0 => Value::Bool(false),
                    1 => Value::Bool(true),
                    b => {
                        return Err(Error::invalid(
                            ty,
                            format!("invalid bool 0x{b:02x} at offset {offset}"),
                        ))
                    }
                }
            }
            Int8 => Value::from(r.u8(ty)? as i8),
            Uint8 => Value::from(r.u8(ty)?),
            Int16 => Value::from(r.u16(ty)? as i16),
            Uint16 => Value::from(r.u16(ty)?),
            Int32 => Value::from(r.u32(ty)? as i32),
            Uint32 => Value::from(r.u32(ty)?),
            Int64 => Value::from(r.i64(ty)?),
            Uint64 => Value::from(r.u64(ty)?),
            Int128 => Value::String(i128::from_le_bytes(r.array::<16>(ty)?).to_string()),
            Uint128 => Value::String(u128::from_le_bytes(r.array::<16>(ty)?).to_string()),
            Varint32 => Value::from(r.varint32(ty)?),
            Varuint32 => Value::from(r.varuint32(ty)?),
            Float32 => float(f32::from_le_bytes(r.array::<4>(ty)?) as f64),
            Float64 => float(f64::from_le_bytes(r.array::<8>(ty)?)),
            Float128 => Value::String(hex::encode(r.take(16, ty)?)),
            TimePoint => display(r.read::<crate::TimePoint>(ty)?),
            TimePointSec => display(r.read::<crate::TimePointSec>(ty)?),
            BlockTimestamp => display(r.read::<crate::BlockTimestamp>(ty)?),
            Name => display(r.read::<crate::Name>(ty)?),
            Bytes => Value::String(hex::encode(r.bytes(ty)?)),
            String => Value::String(r.string(ty)?),
            Checksum160 => Value::String(hex::encode(r.take(20, ty)?)),
            Checksum256 => Value::String(hex::encode(r.take(32, ty)?)),
            Checksum512 => Value::String(hex::encode(r.take(64, ty)?)),
            PublicKey => display(r.read::<crate::PublicKey>(ty)?),
            Signature => display(r.read::<crate::Signature>(ty)?),
            Symbol => display(r.read::<crate::Symbol>(ty)?),
            SymbolCode => display(r.read::<crate::SymbolCode>(ty)?),
            Asset => display(r.read::<crate::Asset>(ty)?),
            ExtendedAsset => {
                let a = r.read::<crate::ExtendedAsset>(ty)?;

                let mut m = Map::new();
                m.insert("quantity".to_string(), display(a.quantity));
                m.insert("contract".to_string(), display(a.contract));
                Value::Object(m)
            }
        };

        Ok(v)
    }
}

fn missing(ty: &str, field: &str) -> Error {
    Error::MissingField {
        ty: ty.to_string(),
        field: field.to_string(),
    }
}

fn display(v: impl ToString) -> Value {
    Value::String(v.to_string())
}

/// Non-finite floats have no JSON number form and are carried as strings
fn float(f: f64) -> Value {
    match Number::from_f64(f) {
        Some(n) => Value::Number(n),
        None => Value::String(f.to_string()),
    }
}

fn narrow<T: TryFrom<U>, U: core::fmt::Display + Copy>(v: U, ty: &str) -> Result<T, Error> {
    T::try_from(v).map_err(|_| Error::invalid(ty, format!("{v} out of range")))
}

fn as_str<'a>(v: &'a Value, ty: &str) -> Result<&'a str, Error> {
    v.as_str()
        .ok_or_else(|| Error::invalid(ty, format!("expected string, found {v}")))
}

fn parse<T>(v: &Value, ty: &str) -> Result<T, Error>
where
    T: FromStr<Err = Error>,
{
    T::from_str(as_str(v, ty)?)
}

fn as_u64(v: &Value, ty: &str) -> Result<u64, Error> {
    let n = match v {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    n.ok_or_else(|| Error::invalid(ty, format!("expected unsigned integer, found {v}")))
}

fn as_i64(v: &Value, ty: &str) -> Result<i64, Error> {
    let n = match v {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    n.ok_or_else(|| Error::invalid(ty, format!("expected integer, found {v}")))
}

fn as_i128(v: &Value, ty: &str) -> Result<i128, Error> {
    let n = match v {
        Value::Number(n) => n.as_i64().map(i128::from),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    n.ok_or_else(|| Error::invalid(ty, format!("expected integer, found {v}")))
}

fn as_u128(v: &Value, ty: &str) -> Result<u128, Error> {
    let n = match v {
        Value::Number(n) => n.as_u64().map(u128::from),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    n.ok_or_else(|| Error::invalid(ty, format!("expected unsigned integer, found {v}")))
}

fn as_f64(v: &Value, ty: &str) -> Result<f64, Error> {
    let n = match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    n.ok_or_else(|| Error::invalid(ty, format!("expected number, found {v}")))
}

fn as_hex(v: &Value, ty: &str) -> Result<Vec<u8>, Error> {
    hex::decode(as_str(v, ty)?).map_err(|e| Error::invalid(ty, e))
}

fn as_hex_fixed<const N: usize>(v: &Value, ty: &str) -> Result<[u8; N], Error> {
    let d = as_hex(v, ty)?;
    <[u8; N]>::try_from(d.as_slice())
        .map_err(|_| Error::invalid(ty, format!("expected {N} bytes, found {}", d.len())))
}

#[cfg(test)]
mod test {
    use serde_json::json;
    use strum::IntoEnumIterator;

    use super::*;

    fn round_trip(t: BuiltinType, v: Value) -> Vec<u8> {
        let mut b = vec![];
        t.encode(&v, &mut b).unwrap();

        let mut r = Reader::new(&b);
        let d = t.decode(&mut r).unwrap();

        assert_eq!(d, v, "round trip mismatch for {t}");
        assert!(r.is_empty(), "trailing data for {t}");

        b
    }

    #[test]
    fn asset_precision_from_wire() {
        // 1 EOS with precision 255
        let b = hex::decode("0100000000000000ff454f5300000000").unwrap();

        assert_eq!(
            BuiltinType::Asset.decode(&mut Reader::new(&b)),
            Err(Error::invalid("symbol", "precision out of range"))
        );
        assert!(BuiltinType::Symbol.decode(&mut Reader::new(&b[8..])).is_err());
    }

    #[test]
    fn type_names() {
        for t in BuiltinType::iter() {
            assert_eq!(BuiltinType::from_name(&t.to_string()), Some(t));
        }
        assert_eq!(BuiltinType::from_name("transfer"), None);
    }

    #[test]
    fn integer_boundaries() {
        use BuiltinType::*;

        assert_eq!(round_trip(Uint64, json!(0)), [0u8; 8]);
        assert_eq!(round_trip(Uint64, json!(u64::MAX)), [0xffu8; 8]);
        assert_eq!(round_trip(Int8, json!(-128)), [0x80]);
        assert_eq!(round_trip(Int8, json!(-1)), [0xff]);
        round_trip(Int16, json!(i16::MIN));
        round_trip(Uint32, json!(u32::MAX));
        round_trip(Int64, json!(i64::MIN));
        round_trip(Int128, json!(i128::MIN.to_string()));
        round_trip(Uint128, json!(u128::MAX.to_string()));
        assert_eq!(round_trip(Varint32, json!(-1)), [0x01]);
        assert_eq!(round_trip(Varuint32, json!(300)), [0xac, 0x02]);

        // Range checks
        let mut b = vec![];
        assert!(Uint8.encode(&json!(256), &mut b).is_err());
        assert!(Int8.encode(&json!(128), &mut b).is_err());
        assert!(Uint64.encode(&json!(-1), &mut b).is_err());
    }

    #[test]
    fn numeric_strings() {
        let mut b = vec![];
        BuiltinType::Uint64
            .encode(&json!("18446744073709551615"), &mut b)
            .unwrap();
        assert_eq!(b, [0xffu8; 8]);
    }

    #[test]
    fn scalar_round_trips() {
        use BuiltinType::*;

        round_trip(Bool, json!(true));
        round_trip(Float32, json!(1.5));
        round_trip(Float64, json!(-0.125));
        round_trip(Float128, json!("00112233445566778899aabbccddeeff"));
        round_trip(Name, json!("eosio.token"));
        round_trip(String, json!("hello ✓"));
        round_trip(Bytes, json!("deadbeef"));
        round_trip(Checksum160, json!("00".repeat(20)));
        round_trip(Checksum256, json!("ab".repeat(32)));
        round_trip(Checksum512, json!("cd".repeat(64)));
        round_trip(TimePoint, json!("2023-01-01T00:00:00.500"));
        round_trip(TimePointSec, json!("2023-01-01T00:05:00"));
        round_trip(BlockTimestamp, json!("2023-01-01T00:00:00.500"));
        round_trip(Symbol, json!("4,EOS"));
        round_trip(SymbolCode, json!("WAX"));
        round_trip(Asset, json!("1.0000 EOS"));
        round_trip(Asset, json!("7 NFT"));
        round_trip(Asset, json!("0.00000001 BTC"));
        round_trip(
            ExtendedAsset,
            json!({ "quantity": "1.0000 EOS", "contract": "eosio.token" }),
        );
        round_trip(
            PublicKey,
            json!("PUB_K1_6MRyAjQq8ud7hVNYcfnVPJqcVpscN5So8BhtHuGYqET5BoDq63"),
        );
    }

    #[test]
    fn legacy_key_accepted() {
        let mut b = vec![];
        BuiltinType::PublicKey
            .encode(
                &json!("EOS6MRyAjQq8ud7hVNYcfnVPJqcVpscN5So8BhtHuGYqET5GDW5CV"),
                &mut b,
            )
            .unwrap();

        let v = BuiltinType::PublicKey.decode(&mut Reader::new(&b)).unwrap();
        assert_eq!(
            v,
            json!("PUB_K1_6MRyAjQq8ud7hVNYcfnVPJqcVpscN5So8BhtHuGYqET5BoDq63")
        );
    }

    #[test]
    fn invalid_bool() {
        assert!(matches!(
            BuiltinType::Bool.decode(&mut Reader::new(&[2])),
            Err(Error::InvalidValue { .. })
        ));
    }

    #[test]
    fn truncated_scalar() {
        assert_eq!(
            BuiltinType::Uint32.decode(&mut Reader::new(&[1, 2])),
            Err(Error::TruncatedInput {
                ty: "uint32".to_string(),
                offset: 0
            })
        );
    }
}
