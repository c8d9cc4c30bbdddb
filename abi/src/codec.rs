// Copyright (c) 2022-2023 The MobileCoin Foundation

//! ABI-driven value tree serialization

use log::trace;
use serde_json::{Map, Value};

use crate::{
    definition::{StructDef, VariantDef},
    helpers::{push_varuint32, Reader},
    Abi, BuiltinType, Error, Name,
};

/// Maximum nesting of composite types
const MAX_DEPTH: usize = 32;

/// Resolved type classification
enum Kind<'a> {
    /// `T?`, presence byte then value
    Optional(&'a str),
    /// `T[]`, `varuint32` length then values
    Array(&'a str),
    /// `T$`, value may be absent at the end of a struct
    Extension(&'a str),
    Builtin(BuiltinType),
    Struct(&'a StructDef),
    Variant(&'a VariantDef),
}

impl Abi {
    fn classify<'a>(&'a self, ty: &'a str) -> Result<Kind<'a>, Error> {
        let t = self.resolve(ty);

        if let Some(t) = t.strip_suffix('$') {
            return Ok(Kind::Extension(t));
        }
        if let Some(t) = t.strip_suffix('?') {
            return Ok(Kind::Optional(t));
        }
        if let Some(t) = t.strip_suffix("[]") {
            return Ok(Kind::Array(t));
        }
        if let Some(b) = BuiltinType::from_name(t) {
            return Ok(Kind::Builtin(b));
        }
        if let Some(s) = self.get_struct(t) {
            return Ok(Kind::Struct(s));
        }
        if let Some(v) = self.get_variant(t) {
            return Ok(Kind::Variant(v));
        }

        Err(Error::UnknownType(ty.to_string()))
    }

    /// Serialize a value tree as the provided type
    pub fn serialize(&self, ty: &str, v: &Value) -> Result<Vec<u8>, Error> {
        let mut out = vec![];
        self.encode_value(ty, v, &mut out, 0)?;

        trace!("serialized '{}' ({} bytes)", ty, out.len());

        Ok(out)
    }

    /// Deserialize a value tree of the provided type, all data must be consumed
    pub fn deserialize(&self, ty: &str, d: &[u8]) -> Result<Value, Error> {
        let mut r = Reader::new(d);
        let v = self.decode_value(ty, &mut r, 0, &mut vec![])?;

        if !r.is_empty() {
            return Err(Error::invalid(
                ty,
                format!("{} trailing bytes at offset {}", r.remaining().len(), r.offset()),
            ));
        }

        Ok(v)
    }

    /// Serialize action arguments using the type declared for `action`
    pub fn serialize_action(&self, action: Name, v: &Value) -> Result<Vec<u8>, Error> {
        let ty = self
            .action_type(action)
            .ok_or_else(|| Error::UnknownType(action.to_string()))?;

        self.serialize(ty, v)
    }

    /// Deserialize action arguments using the type declared for `action`
    pub fn deserialize_action(&self, action: Name, d: &[u8]) -> Result<Value, Error> {
        let ty = self
            .action_type(action)
            .ok_or_else(|| Error::UnknownType(action.to_string()))?;

        self.deserialize(ty, d)
    }

    /// Apply `f` to every `name` typed value within a value tree of the provided type
    ///
    /// Values not matching their type are left for serialization to report.
    pub fn map_names(
        &self,
        ty: &str,
        v: &mut Value,
        f: &mut dyn FnMut(Name) -> Name,
    ) -> Result<(), Error> {
        self.map_value(ty, v, f, 0)
    }

    /// Offsets of `name` typed values within serialized data of the provided type
    ///
    /// Data following the value is not inspected.
    pub fn name_offsets(&self, ty: &str, d: &[u8]) -> Result<Vec<usize>, Error> {
        let mut names = vec![];
        self.decode_value(ty, &mut Reader::new(d), 0, &mut names)?;
        Ok(names)
    }

    fn map_value(
        &self,
        ty: &str,
        v: &mut Value,
        f: &mut dyn FnMut(Name) -> Name,
        depth: usize,
    ) -> Result<(), Error> {
        if depth > MAX_DEPTH {
            return Err(Error::invalid(ty, "maximum nesting depth exceeded"));
        }

        match (self.classify(ty)?, v) {
            (Kind::Builtin(BuiltinType::Name), Value::String(s)) => {
                let n = Name::new(s);
                let r = f(n);
                if r != n {
                    *s = r.to_string();
                }
            }
            (Kind::Builtin(_), _) => (),
            (Kind::Optional(_), Value::Null) => (),
            (Kind::Optional(t), v) | (Kind::Extension(t), v) => {
                self.map_value(t, v, f, depth + 1)?
            }
            (Kind::Array(t), Value::Array(a)) => {
                for i in a.iter_mut() {
                    self.map_value(t, i, f, depth + 1)?;
                }
            }
            (Kind::Struct(s), Value::Object(m)) => {
                for fd in self.struct_fields(&s.name)? {
                    if let Some(fv) = m.get_mut(&fd.name) {
                        self.map_value(&fd.ty, fv, f, depth + 1)?;
                    }
                }
            }
            (Kind::Variant(_), Value::Object(m)) if m.len() == 1 => {
                if let Some((t, inner)) = m.iter_mut().next() {
                    self.map_value(t, inner, f, depth + 1)?;
                }
            }
            (Kind::Variant(_), Value::Array(a)) if a.len() == 2 => {
                if let [Value::String(t), inner] = a.as_mut_slice() {
                    self.map_value(t, inner, f, depth + 1)?;
                }
            }
            _ => (),
        }

        Ok(())
    }

    fn encode_value(
        &self,
        ty: &str,
        v: &Value,
        out: &mut Vec<u8>,
        depth: usize,
    ) -> Result<(), Error> {
        if depth > MAX_DEPTH {
            return Err(Error::invalid(ty, "maximum nesting depth exceeded"));
        }

        match self.classify(ty)? {
            Kind::Builtin(b) => b.encode(v, out),
            Kind::Optional(t) => match v {
                Value::Null => {
                    out.push(0);
                    Ok(())
                }
                _ => {
                    out.push(1);
                    self.encode_value(t, v, out, depth + 1)
                }
            },
            Kind::Array(t) => {
                let a = v
                    .as_array()
                    .ok_or_else(|| Error::invalid(ty, "expected array"))?;

                push_varuint32(out, a.len() as u32);
                for i in a {
                    self.encode_value(t, i, out, depth + 1)?;
                }
                Ok(())
            }
            // Presence is handled by the enclosing struct
            Kind::Extension(t) => self.encode_value(t, v, out, depth + 1),
            Kind::Struct(s) => self.encode_struct(s, v, out, depth),
            Kind::Variant(d) => self.encode_variant(d, v, out, depth),
        }
    }

    fn encode_struct(
        &self,
        s: &StructDef,
        v: &Value,
        out: &mut Vec<u8>,
        depth: usize,
    ) -> Result<(), Error> {
        let m = v
            .as_object()
            .ok_or_else(|| Error::invalid(&s.name, "expected object"))?;

        for f in self.struct_fields(&s.name)? {
            match m.get(&f.name) {
                Some(fv) => self.encode_value(&f.ty, fv, out, depth + 1)?,
                // Trailing extension fields may be omitted
                None if f.ty.ends_with('$') => break,
                None => {
                    return Err(Error::MissingField {
                        ty: s.name.clone(),
                        field: f.name.clone(),
                    })
                }
            }
        }

        Ok(())
    }

    fn encode_variant(
        &self,
        d: &VariantDef,
        v: &Value,
        out: &mut Vec<u8>,
        depth: usize,
    ) -> Result<(), Error> {
        // Accept `{ "type": value }` and `["type", value]` forms
        let (name, inner) = match v {
            Value::Object(m) if m.len() == 1 => match m.iter().next() {
                Some((k, v)) => (k.as_str(), v),
                None => return Err(Error::invalid(&d.name, "expected single key object")),
            },
            Value::Array(a) if a.len() == 2 => match (&a[0], &a[1]) {
                (Value::String(k), v) => (k.as_str(), v),
                _ => return Err(Error::invalid(&d.name, "expected [type, value] pair")),
            },
            _ => {
                return Err(Error::invalid(
                    &d.name,
                    "expected { type: value } or [type, value]",
                ))
            }
        };

        let index = d
            .types
            .iter()
            .position(|t| t == name)
            .ok_or_else(|| Error::UnknownVariant {
                ty: d.name.clone(),
                index: name.to_string(),
            })?;

        push_varuint32(out, index as u32);
        self.encode_value(name, inner, out, depth + 1)
    }

    /// Decode a value, recording the offset of each `name` in `names`
    fn decode_value(
        &self,
        ty: &str,
        r: &mut Reader,
        depth: usize,
        names: &mut Vec<usize>,
    ) -> Result<Value, Error> {
        if depth > MAX_DEPTH {
            return Err(Error::invalid(ty, "maximum nesting depth exceeded"));
        }

        match self.classify(ty)? {
            Kind::Builtin(b) => {
                if b == BuiltinType::Name {
                    names.push(r.offset());
                }
                b.decode(r)
            }
            Kind::Optional(t) => {
                let offset = r.offset();
                match r.u8(ty)? {
                    0 => Ok(Value::Null),
                    1 => self.decode_value(t, r, depth + 1, names),
                    b => Err(Error::invalid(
                        ty,
                        format!("invalid presence byte 0x{b:02x} at offset {offset}"),
                    )),
                }
            }
            Kind::Array(t) => {
                let n = r.varuint32(ty)? as usize;

                let mut a = Vec::with_capacity(n.min(r.remaining().len()));
                for _ in 0..n {
                    a.push(self.decode_value(t, r, depth + 1, names)?);
                }
                Ok(Value::Array(a))
            }
            Kind::Extension(t) => self.decode_value(t, r, depth + 1, names),
            Kind::Struct(s) => {
                let mut m = Map::new();

                for f in self.struct_fields(&s.name)? {
                    if f.ty.ends_with('$') && r.is_empty() {
                        break;
                    }
                    let v = self.decode_value(&f.ty, r, depth + 1, names)?;
                    m.insert(f.name.clone(), v);
                }

                Ok(Value::Object(m))
            }
            Kind::Variant(d) => {
                let index = r.varuint32(ty)?;

                let t = d
                    .types
                    .get(index as usize)
                    .ok_or_else(|| Error::UnknownVariant {
                        ty: d.name.clone(),
                        index: index.to_string(),
                    })?;

                let v = self.decode_value(t, r, depth + 1, names)?;

                let mut m = Map::new();
                m.insert(t.clone(), v);
                Ok(Value::Object(m))
            }
        }
    }
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;

    use esr_tests::abis::{TEST_ABI, TOKEN_ABI};
    use esr_tests::requests::TRANSFER_DATA;

    fn transfer() -> Value {
        json!({
            "from": "............1",
            "to": "teamgreymass",
            "quantity": "1.0000 EOS",
            "memo": "hello",
        })
    }

    #[test]
    fn serialize_transfer() {
        let abi = Abi::from_json(TOKEN_ABI).unwrap();

        let b = abi
            .serialize_action(Name::new("transfer"), &transfer())
            .unwrap();
        assert_eq!(hex::encode(&b), TRANSFER_DATA);

        let v = abi.deserialize_action(Name::new("transfer"), &b).unwrap();
        assert_eq!(v, transfer());
    }

    #[test]
    fn missing_field() {
        let abi = Abi::from_json(TOKEN_ABI).unwrap();

        let mut v = transfer();
        v.as_object_mut().unwrap().remove("memo");

        assert_eq!(
            abi.serialize("transfer", &v),
            Err(Error::MissingField {
                ty: "transfer".to_string(),
                field: "memo".to_string()
            })
        );
    }

    #[test]
    fn unknown_type() {
        let abi = Abi::from_json(TOKEN_ABI).unwrap();

        assert_eq!(
            abi.serialize("nope", &json!({})),
            Err(Error::UnknownType("nope".to_string()))
        );
        assert_eq!(
            abi.serialize_action(Name::new("burn"), &json!({})),
            Err(Error::UnknownType("burn".to_string()))
        );
    }

    #[test]
    fn truncated_transfer() {
        let abi = Abi::from_json(TOKEN_ABI).unwrap();
        let b = hex::decode(TRANSFER_DATA).unwrap();

        // Cut inside the quantity field (from + to = 16 bytes)
        let r = abi.deserialize("transfer", &b[..20]);
        assert_eq!(
            r,
            Err(Error::TruncatedInput {
                ty: "asset".to_string(),
                offset: 16
            })
        );
    }

    #[test]
    fn inherited_fields_and_aliases() {
        let abi = Abi::from_json(TEST_ABI).unwrap();

        let v = json!({
            "owner": "alice",
            "id": 7,
            "tags": ["a", "b"],
            "note": null,
            "value": { "uint8": 3 },
        });

        let b = abi.serialize("record", &v).unwrap();
        assert_eq!(
            hex::encode(&b),
            concat!(
                "0000000000855c34", // owner
                "0700000000000000", // id
                "02", "0161", "0162", // tags
                "00",   // note
                "00", "03", // value
            )
        );

        assert_eq!(abi.deserialize("record", &b).unwrap(), v);
    }

    #[test]
    fn variant_forms() {
        let abi = Abi::from_json(TEST_ABI).unwrap();

        let a = abi.serialize("value_t", &json!({ "string": "hi" })).unwrap();
        let b = abi.serialize("value_t", &json!(["string", "hi"])).unwrap();
        assert_eq!(a, b);
        assert_eq!(a, [0x01, 0x02, b'h', b'i']);

        assert!(matches!(
            abi.serialize("value_t", &json!({ "uint64": 1 })),
            Err(Error::UnknownVariant { .. })
        ));
        assert!(matches!(
            abi.deserialize("value_t", &[0x05, 0x00]),
            Err(Error::UnknownVariant { .. })
        ));
    }

    #[test]
    fn binary_extensions() {
        let abi = Abi::from_json(TEST_ABI).unwrap();

        // Extension absent
        let v = json!({ "id": 1 });
        let b = abi.serialize("extended", &v).unwrap();
        assert_eq!(b, [1, 0, 0, 0]);
        assert_eq!(abi.deserialize("extended", &b).unwrap(), v);

        // Extension present
        let v = json!({ "id": 1, "extra": "ab" });
        let b = abi.serialize("extended", &v).unwrap();
        assert_eq!(b, [1, 0, 0, 0, 2, b'a', b'b']);
        assert_eq!(abi.deserialize("extended", &b).unwrap(), v);
    }

    #[test]
    fn trailing_data() {
        let abi = Abi::from_json(TEST_ABI).unwrap();
        assert!(matches!(
            abi.deserialize("extended", &[1, 0, 0, 0, 0, 0xff]),
            Err(Error::TruncatedInput { .. }) | Err(Error::InvalidValue { .. })
        ));
    }

    #[test]
    fn name_slots() {
        let abi = Abi::from_json(TEST_ABI).unwrap();

        let mut v = json!({
            "owner": "............1",
            "id": 1,
            "tags": ["............1"],
            "note": "............1",
            "value": { "name": "............2" },
        });
        let mut b = abi.serialize("record", &v).unwrap();

        // Owner (via alias) and the variant value, strings are not names
        assert_eq!(abi.name_offsets("record", &b).unwrap(), vec![0, b.len() - 8]);

        // Trailing data is not inspected
        let n = b.len();
        b.push(0xff);
        assert_eq!(abi.name_offsets("record", &b).unwrap(), vec![0, n - 8]);

        abi.map_names("record", &mut v, &mut |n| Name::from_raw(n.raw() + 10))
            .unwrap();
        assert_eq!(v["owner"], json!(Name::from_raw(11).to_string()));
        assert_eq!(v["value"]["name"], json!(Name::from_raw(12).to_string()));
        assert_eq!(v["tags"][0], json!("............1"));
        assert_eq!(v["note"], json!("............1"));

        // Pair form variants are mapped too
        let mut p = json!(["name", "............1"]);
        abi.map_names("value_t", &mut p, &mut |_| Name::new("alice"))
            .unwrap();
        assert_eq!(p, json!(["name", "alice"]));
    }
}
