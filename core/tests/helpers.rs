#![allow(unused)]

use std::str::FromStr;

use log::LevelFilter;
use simplelog::SimpleLogger;

use esr_core::{
    abi::{Abi, Name},
    transaction::AbiMap,
    ChainId, ChainInfo, Checksum256,
};
use esr_tests::{abis::TOKEN_ABI, chain::FIXTURE};

/// Setup logging, `LOG_LEVEL` overrides the default debug level
pub fn setup() {
    let log_level = match std::env::var("LOG_LEVEL").map(|v| LevelFilter::from_str(&v)) {
        Ok(Ok(l)) => l,
        _ => LevelFilter::Debug,
    };

    let _ = SimpleLogger::init(log_level, Default::default());
}

/// Chain state for the shared signing fixture
pub fn chain_info() -> ChainInfo {
    ChainInfo {
        chain_id: ChainId::from_str(FIXTURE.chain_id).unwrap(),
        head_block_num: FIXTURE.head_block_num,
        last_irreversible_block_num: FIXTURE.last_irreversible_block_num,
        last_irreversible_block_id: Checksum256::from_str(FIXTURE.last_irreversible_block_id)
            .unwrap(),
        head_block_id: None,
        head_block_time: None,
        server_version: None,
    }
}

/// ABIs for the contracts used by request vectors
pub fn abis() -> AbiMap {
    let mut m = AbiMap::new();
    m.insert(Name::new("eosio.token"), Abi::from_json(TOKEN_ABI).unwrap());
    m
}
