// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Contract ABI definitions
//!
//! [AbiDef] mirrors the JSON ABI published by contracts (`get_abi`), [Abi] indexes
//! a definition for use by the codec.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{Error, Name};

/// Type alias declaration (`new_type_name` is an alias of `type`)
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct TypeDef {
    pub new_type_name: String,
    #[serde(rename = "type")]
    pub ty: String,
}

/// Struct field
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
}

/// Struct declaration, `base` fields are prepended to `fields`
#[derive(Clone, PartialEq, Debug, Default, Serialize, Deserialize)]
pub struct StructDef {
    pub name: String,
    #[serde(default)]
    pub base: String,
    #[serde(default)]
    pub fields: Vec<FieldDef>,
}

/// Action declaration, maps an action name to its argument struct
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct ActionDef {
    pub name: Name,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default)]
    pub ricardian_contract: String,
}

/// Table declaration
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct TableDef {
    pub name: Name,
    #[serde(default)]
    pub index_type: String,
    #[serde(default)]
    pub key_names: Vec<String>,
    #[serde(default)]
    pub key_types: Vec<String>,
    #[serde(rename = "type")]
    pub ty: String,
}

/// Variant declaration, values are encoded as an index into `types`
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct VariantDef {
    pub name: String,
    pub types: Vec<String>,
}

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct ClauseDef {
    pub id: String,
    pub body: String,
}

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct ActionResultDef {
    pub name: Name,
    pub result_type: String,
}

/// Contract ABI definition
#[derive(Clone, PartialEq, Debug, Default, Serialize, Deserialize)]
pub struct AbiDef {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub types: Vec<TypeDef>,
    #[serde(default)]
    pub structs: Vec<StructDef>,
    #[serde(default)]
    pub actions: Vec<ActionDef>,
    #[serde(default)]
    pub tables: Vec<TableDef>,
    #[serde(default)]
    pub ricardian_clauses: Vec<ClauseDef>,
    #[serde(default)]
    pub variants: Vec<VariantDef>,
    #[serde(default)]
    pub action_results: Vec<ActionResultDef>,
}

/// Indexed contract ABI
#[derive(Clone, Debug, Default)]
pub struct Abi {
    def: AbiDef,
    aliases: HashMap<String, String>,
    structs: HashMap<String, usize>,
    variants: HashMap<String, usize>,
    actions: HashMap<Name, String>,
}

impl Abi {
    /// Index an ABI definition
    pub fn new(def: AbiDef) -> Self {
        let aliases = def
            .types
            .iter()
            .map(|t| (t.new_type_name.clone(), t.ty.clone()))
            .collect();

        let structs = def
            .structs
            .iter()
            .enumerate()
            .map(|(i, s)| (s.name.clone(), i))
            .collect();

        let variants = def
            .variants
            .iter()
            .enumerate()
            .map(|(i, v)| (v.name.clone(), i))
            .collect();

        let actions = def.actions.iter().map(|a| (a.name, a.ty.clone())).collect();

        Self {
            def,
            aliases,
            structs,
            variants,
            actions,
        }
    }

    /// Parse and index a JSON ABI
    pub fn from_json(s: &str) -> Result<Self, Error> {
        let def: AbiDef = serde_json::from_str(s).map_err(|e| Error::invalid("abi", e))?;
        Ok(Self::new(def))
    }

    /// Fetch the underlying definition
    pub fn def(&self) -> &AbiDef {
        &self.def
    }

    /// Resolve type aliases, stopping on cycles
    pub fn resolve<'a>(&'a self, mut ty: &'a str) -> &'a str {
        for _ in 0..=self.aliases.len() {
            match self.aliases.get(ty) {
                Some(t) => ty = t.as_str(),
                None => break,
            }
        }
        ty
    }

    pub fn get_struct(&self, name: &str) -> Option<&StructDef> {
        self.structs.get(name).map(|i| &self.def.structs[*i])
    }

    pub fn get_variant(&self, name: &str) -> Option<&VariantDef> {
        self.variants.get(name).map(|i| &self.def.variants[*i])
    }

    /// Resolve the argument type for an action
    pub fn action_type(&self, action: Name) -> Option<&str> {
        self.actions.get(&action).map(|s| s.as_str())
    }

    /// Collect struct fields including inherited base fields (base first)
    pub fn struct_fields(&self, name: &str) -> Result<Vec<&FieldDef>, Error> {
        let mut chain = vec![];
        let mut next = Some(name);

        while let Some(n) = next {
            let s = self
                .get_struct(self.resolve(n))
                .ok_or_else(|| Error::UnknownType(n.to_string()))?;

            if chain.len() > self.def.structs.len() {
                return Err(Error::invalid(name, "recursive struct base"));
            }

            chain.push(s);
            next = match s.base.as_str() {
                "" => None,
                b => Some(b),
            };
        }

        Ok(chain.into_iter().rev().flat_map(|s| s.fields.iter()).collect())
    }
}

impl From<AbiDef> for Abi {
    fn from(def: AbiDef) -> Self {
        Self::new(def)
    }
}
