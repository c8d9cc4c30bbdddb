// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Signing request URI vectors

/// `eosio.token::transfer` arguments with a placeholder sender (hex)
pub const TRANSFER_DATA: &str =
    "010000000000000080b1915e5d268dca102700000000000004454f53000000000568656c6c6f";

/// Version 2 transfer request for EOS with placeholder authorization,
/// broadcast flag, callback template and a `memo` info pair
pub const TRANSFER_URI: &str = "esr:AgABAACmgjQD6jBVAAAAVy08zc0BAQAAAAAAAAACAAAAAAAAACYBAAAAAAAAAICxkV5dJo3KECcAAAAAAAAERU9TAAAAAAVoZWxsbwEmaHR0cHM6Ly9leGFtcGxlLmNvbS9jYWxsYmFjaz90eD17e3R4fX0BBG1lbW8CaGk";

/// [TRANSFER_URI] with a compressed payload
pub const TRANSFER_URI_COMPRESSED: &str = "esr://gmNgZGBY1mTC_MoglIGBIVzX5uxZRqAQGDBBaTWYQMPGiXGxar2nBNQhfBZX_2AQzZqRmpOTz6iWUVJSUGylr59akZhbkJOql5yfq5-cmJOTlJicbV9SYVtdXVJRW8vIkpuam8-UkQkA";

/// Callback template used by [TRANSFER_URI]
pub const TRANSFER_CALLBACK: &str = "https://example.com/callback?tx={{tx}}";

/// Version 2 compressed identity request for WAX, background flag, no permission
pub const IDENTITY_URI: &str = "esr:gmPgYmZgkssoKSkottLXT07SS61IzC3ISdVLzs_Vr64uzkyvrWUAAA";

/// Callback template used by [IDENTITY_URI]
pub const IDENTITY_CALLBACK: &str = "https://cb.example.com/{{sig}}";

/// Version 3 identity request with explicit EOS chain id, scope `example`, placeholder
/// permission, no flags, no callback and a `foo=bar` info pair
pub const IDENTITY_V3_URI: &str = "esr:AwGso3byBrj8JabtRNvcZlR8NsbDPjoRn_vq75Q2QvDpBgMAAABAxSpNVwEBAAAAAAAAAAIAAAAAAAAAAAABA2ZvbwNiYXI";
