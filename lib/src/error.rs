// Copyright (c) 2022-2023 The MobileCoin Foundation

use tokio::time::error::Elapsed;

/// Signing request wallet API error type
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Request parsing, signing or sealed message failure
    #[error(transparent)]
    Core(#[from] esr_core::Error),

    /// Relay socket or HTTP transport failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// Chain refused the transaction
    #[error("Transaction rejected ({code}): {message}")]
    RemoteRejection { code: i64, message: String },

    /// Request timeout
    #[error("Timeout waiting for response")]
    RequestTimeout,

    /// JSON encoding or decoding failure
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// State store read or write failure
    #[error("State store error: {0}")]
    Store(String),

    /// Relay session is not connected
    #[error("Relay not connected")]
    NotConnected,
}

impl From<Elapsed> for Error {
    fn from(_: Elapsed) -> Self {
        Error::RequestTimeout
    }
}

impl From<esr_abi::Error> for Error {
    fn from(e: esr_abi::Error) -> Self {
        Error::Core(e.into())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for Error {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        Error::Transport(format!("relay: {e}"))
    }
}

impl Error {
    pub(crate) fn unsupported(reason: impl ToString) -> Self {
        Error::Core(esr_core::Error::Unsupported(reason.to_string()))
    }
}
