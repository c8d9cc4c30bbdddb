// Copyright (c) 2022-2023 The MobileCoin Foundation

use bitflags::bitflags;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

bitflags! {
    /// Signing request flags
    #[derive(Default)]
    pub struct RequestFlags: u8 {
        /// Broadcast the signed transaction
        const BROADCAST = 1 << 0;
        /// Request may be handled without bringing the wallet to the foreground
        const BACKGROUND = 1 << 1;
    }
}

impl Serialize for RequestFlags {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.bits())
    }
}

impl<'de> Deserialize<'de> for RequestFlags {
    /// Unknown bits are dropped
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let v = u8::deserialize(deserializer)?;
        Ok(Self::from_bits_truncate(v))
    }
}
