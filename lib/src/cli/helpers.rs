// Copyright (c) 2022-2023 The MobileCoin Foundation

use std::str::FromStr;

use serde::Serialize;

use esr_wallet::engine::{ChainAlias, ChainId};

/// Chain argument, by alias name (`EOS`, `WAX`, ...) or hex chain id
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct ChainArg(pub ChainId);

impl FromStr for ChainArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(a) = ChainAlias::from_str(s) {
            return Ok(ChainArg(a.chain_id()));
        }

        ChainId::from_str(s)
            .map(ChainArg)
            .map_err(|_| format!("unrecognised chain '{s}', expected an alias or 32-byte hex id"))
    }
}

/// Print a value as pretty JSON to stdout
pub fn print_json<T: Serialize>(v: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(v)?);
    Ok(())
}
