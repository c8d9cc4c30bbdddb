// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Key format vectors

/// Key in each supported text format
pub struct KeyVector {
    /// Secret scalar (hex)
    pub secret_hex: &'static str,
    /// Legacy WIF private key
    pub wif: &'static str,
    /// `PVT_K1_` private key
    pub private_k1: &'static str,
    /// Compressed public key (hex)
    pub public_hex: &'static str,
    /// Legacy `EOS` public key
    pub public_legacy: &'static str,
    /// `PUB_K1_` public key
    pub public_k1: &'static str,
}

/// Well known development key
pub const DEV_KEY: KeyVector = KeyVector {
    secret_hex: "d2653ff7cbb2d8ff129ac27ef5781ce68b2558c41a74af1f2ddca635cbeef07d",
    wif: "5KQwrPbwdL6PhXujxW37FSSQZ1JiwsST4cqQzDeyXtP79zkvFD3",
    private_k1: "PVT_K1_2bfGi9rYsXQSXXTvJbDAPhHLQUojjaNLomdm3cEJ1XTzMqUt3V",
    public_hex: "02c0ded2bc1f1305fb0faac5e6c03ee3a1924234985427b6167ca569d13df435cf",
    public_legacy: "EOS6MRyAjQq8ud7hVNYcfnVPJqcVpscN5So8BhtHuGYqET5GDW5CV",
    public_k1: "PUB_K1_6MRyAjQq8ud7hVNYcfnVPJqcVpscN5So8BhtHuGYqET5BoDq63",
};

/// Sealed message exchange between two fixed keys
pub struct SealedVector {
    pub sender_private: &'static str,
    pub sender_public: &'static str,
    pub receiver_private: &'static str,
    pub receiver_public: &'static str,
    pub nonce: u64,
    pub plaintext: &'static str,
    /// AES-256-CBC ciphertext (hex)
    pub ciphertext: &'static str,
    /// Key checksum
    pub checksum: u32,
    /// Binary relay frame (hex)
    pub frame: &'static str,
}

pub const SEALED: SealedVector = SealedVector {
    sender_private: "PVT_K1_8WwpJCixn9cKe3jAyXvxNeo5JrBFKj43ULkUeTfeLMqJgFM2a",
    sender_public: "PUB_K1_7S7oY6Jrjzq8txrPmBwUhUmKzpN64835E7ura1HDDAVUsriHtC",
    receiver_private: "PVT_K1_G2tdbQSvZJDeH6TLx4rukJb9chMVeT75wgVxHvLHfifgXWePe",
    receiver_public: "PUB_K1_5RWLQudhUehv8bFcVwqJWBor8VTy4psRS2J2s9PwahRhw7t92W",
    nonce: 42,
    plaintext: "hello relay",
    ciphertext: "fcbb62d908643bf900e9bb0cfce94013",
    checksum: 3163700829,
    frame: "00034f355bdcb7cc0af728ef3cceb9615d90684bb5b2ca5f859ab0f0b704075871aa2a0000000000000010fcbb62d908643bf900e9bb0cfce940135d3e92bc",
};
