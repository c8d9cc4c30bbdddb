// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Name encoding vectors

/// (name, raw value) pairs
pub const VECTORS: &[(&str, u64)] = &[
    ("eosio", 6138663577826885632),
    ("eosio.token", 6138663591592764928),
    ("transfer", 14829575313431724032),
    ("teamgreymass", 14595364149838066048),
    ("identity", 8238557868240928768),
    ("active", 3617214756542218240),
    ("example", 6290731281177116672),
    ("a", 3458764513820540928),
    ("............1", 1),
    ("............2", 2),
    ("zzzzzzzzzzzzj", u64::MAX),
    ("", 0),
];
