// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Chain state fixtures for transaction signing

/// EOS mainnet chain id
pub const EOS_CHAIN_ID: &str = "aca376f206b8fc25a6ed44dbdc66547c36c6c33e3a119ffbeaef943642f0e906";

/// WAX mainnet chain id
pub const WAX_CHAIN_ID: &str = "1064487b3cd1a897ce03ae5b6a865651747e2e152090f99c1d19d44e01aea5a4";

/// Chain info fixture with expected TAPOS values and signing outputs
pub struct ChainFixture {
    pub chain_id: &'static str,
    pub head_block_num: u32,
    pub last_irreversible_block_num: u32,
    pub last_irreversible_block_id: &'static str,
    /// Signing time (unix seconds)
    pub now: u32,

    pub ref_block_num: u16,
    pub ref_block_prefix: u32,
    pub expiration: u32,
}

pub const FIXTURE: ChainFixture = ChainFixture {
    chain_id: EOS_CHAIN_ID,
    head_block_num: 227_310_321,
    last_irreversible_block_num: 227_309_987,
    last_irreversible_block_id: "0d8c79a3e2c1f0b0a1b2c3d4e5f60718293a4b5c6d7e8f90a1b2c3d4e5f60718",
    now: 1_672_531_200,

    ref_block_num: 31139,
    ref_block_prefix: 3_569_595_041,
    expiration: 1_672_531_500,
};

/// `eosio.token::transfer` from `eosio@active` to `teamgreymass`, `1.0000 EOS`, memo `hello`,
/// signed against [FIXTURE]
pub mod transfer {
    /// Packed transaction (hex)
    pub const PACKED: &str = "2cceb063a379a1b2c3d4000000000100a6823403ea3055000000572d3ccdcd010000000000ea305500000000a8ed3232260000000000ea305580b1915e5d268dca102700000000000004454f53000000000568656c6c6f00";

    /// Signing digest over chain id, transaction and empty context free data hash
    pub const DIGEST: &str = "1f16c3e3aacf6e08ea7b97952fe52026628b213eb800cbfb82884d53ef5ec8cd";

    /// Transaction id
    pub const ID: &str = "f6b3fe58a80f9f12da61eb69735bf63405f37f832281628d9352c61146c2f245";
}

/// Identity proof digest for WAX with the [FIXTURE] expiration
pub const IDENTITY_DIGEST: &str = "f81ff53460c7d9ccebf5c82fec4bb73097f69dd2c5ca3cbee5556af38c55b879";
