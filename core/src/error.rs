// Copyright (c) 2022-2023 The MobileCoin Foundation

/// Signing request engine errors
///
/// Parse and crypto errors are fatal to the operation that raised them,
/// no partially decoded or signed objects are returned.
#[derive(Clone, PartialEq, Debug, thiserror::Error)]
pub enum Error {
    /// Malformed or truncated wire data
    #[error("parse error in '{field}' at offset {offset}")]
    Parse { field: String, offset: usize },

    /// Unrecognised chain id / request / type tag
    #[error("unknown {kind} variant {index}")]
    UnknownVariant { kind: String, index: String },

    /// Operation is not supported for these inputs
    #[error("unsupported operation: {0}")]
    Unsupported(String),

    /// Key, signature or decryption failure
    #[error("crypto failure: {0}")]
    Crypto(String),

    /// ABI codec failure
    #[error("abi error: {0}")]
    Abi(esr_abi::Error),
}

impl Error {
    pub(crate) fn parse(field: &str, offset: usize) -> Self {
        Error::Parse {
            field: field.to_string(),
            offset,
        }
    }

    pub(crate) fn unsupported(reason: impl ToString) -> Self {
        Error::Unsupported(reason.to_string())
    }

    pub(crate) fn crypto(reason: impl ToString) -> Self {
        Error::Crypto(reason.to_string())
    }
}

impl From<esr_abi::Error> for Error {
    fn from(e: esr_abi::Error) -> Self {
        use esr_abi::Error as E;

        match e {
            E::TruncatedInput { ty, offset } => Error::Parse { field: ty, offset },
            E::InvalidUtf8 { offset } => Error::Parse {
                field: "utf-8 string".to_string(),
                offset,
            },
            E::UnknownVariant { ty, index } => Error::UnknownVariant { kind: ty, index },
            E::InvalidKey { key_type, reason } => Error::Crypto(format!("{key_type} key: {reason}")),
            e => Error::Abi(e),
        }
    }
}
