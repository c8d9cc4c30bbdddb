// Copyright (c) 2022-2023 The MobileCoin Foundation

/// ABI codec errors
///
/// Errors are terminal for the serialize / deserialize call that raised them,
/// no partial results are returned.
#[derive(Clone, PartialEq, Debug, thiserror::Error)]
pub enum Error {
    /// Type name could not be resolved
    #[error("unknown type '{0}'")]
    UnknownType(String),

    /// Struct value is missing a required field
    #[error("missing field '{field}' for struct '{ty}'")]
    MissingField { ty: String, field: String },

    /// Input ended before a value was complete
    #[error("truncated input reading '{ty}' at offset {offset}")]
    TruncatedInput { ty: String, offset: usize },

    /// Variant index or name is not declared
    #[error("unknown variant {index} for '{ty}'")]
    UnknownVariant { ty: String, index: String },

    /// Value does not match the expected type
    #[error("invalid value for '{ty}': {reason}")]
    InvalidValue { ty: String, reason: String },

    /// Key or signature encoding is invalid
    #[error("invalid key ({key_type}): {reason}")]
    InvalidKey {
        key_type: &'static str,
        reason: &'static str,
    },

    /// String data is not valid UTF-8
    #[error("invalid utf-8 at offset {offset}")]
    InvalidUtf8 { offset: usize },

    /// Output buffer too short
    #[error("output buffer too short")]
    Length,
}

impl Error {
    /// Helper to build an [Error::InvalidValue]
    pub fn invalid(ty: &str, reason: impl ToString) -> Self {
        Error::InvalidValue {
            ty: ty.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Shift offsets in positional errors by `base`,
    /// used when nested decoders operate on sub-slices
    pub fn offset_by(self, base: usize) -> Self {
        match self {
            Error::TruncatedInput { ty, offset } => Error::TruncatedInput {
                ty,
                offset: offset + base,
            },
            Error::InvalidUtf8 { offset } => Error::InvalidUtf8 {
                offset: offset + base,
            },
            e => e,
        }
    }

    /// Attach type context to a length error raised while decoding
    pub fn reading(self, ty: &str) -> Self {
        match self {
            Error::Length => Error::TruncatedInput {
                ty: ty.to_string(),
                offset: 0,
            },
            e => e,
        }
    }
}

impl From<encdec::Error> for Error {
    fn from(_e: encdec::Error) -> Self {
        Error::Length
    }
}
