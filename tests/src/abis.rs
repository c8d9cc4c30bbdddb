// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Contract ABIs for codec and signing tests

/// Subset of the `eosio.token` ABI
pub const TOKEN_ABI: &str = r#"{
    "version": "eosio::abi/1.2",
    "types": [],
    "structs": [
        {
            "name": "transfer",
            "base": "",
            "fields": [
                { "name": "from", "type": "name" },
                { "name": "to", "type": "name" },
                { "name": "quantity", "type": "asset" },
                { "name": "memo", "type": "string" }
            ]
        },
        {
            "name": "open",
            "base": "",
            "fields": [
                { "name": "owner", "type": "name" },
                { "name": "symbol", "type": "symbol" },
                { "name": "ram_payer", "type": "name" }
            ]
        }
    ],
    "actions": [
        { "name": "transfer", "type": "transfer", "ricardian_contract": "" },
        { "name": "open", "type": "open", "ricardian_contract": "" }
    ],
    "tables": [],
    "ricardian_clauses": [],
    "variants": [],
    "action_results": []
}"#;

/// Synthetic ABI exercising aliases, inheritance, optionals, arrays,
/// variants and binary extensions
pub const TEST_ABI: &str = r#"{
    "version": "eosio::abi/1.2",
    "types": [
        { "new_type_name": "account_name", "type": "name" }
    ],
    "structs": [
        {
            "name": "owned",
            "base": "",
            "fields": [ { "name": "owner", "type": "account_name" } ]
        },
        {
            "name": "record",
            "base": "owned",
            "fields": [
                { "name": "id", "type": "uint64" },
                { "name": "tags", "type": "string[]" },
                { "name": "note", "type": "string?" },
                { "name": "value", "type": "value_t" }
            ]
        },
        {
            "name": "extended",
            "base": "",
            "fields": [
                { "name": "id", "type": "uint32" },
                { "name": "extra", "type": "string$" }
            ]
        }
    ],
    "actions": [
        { "name": "record", "type": "record", "ricardian_contract": "" }
    ],
    "variants": [
        { "name": "value_t", "types": [ "uint8", "string", "name" ] }
    ]
}"#;
