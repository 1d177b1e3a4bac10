//! Wire decoding errors.

use thiserror::Error;

/// Errors from decoding or structurally checking an [`crate::EncryptedMessage`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WireError {
    /// Input exceeds the maximum accepted encoded size.
    #[error("encoded message too large: {size} bytes (max {max})")]
    TooLarge {
        /// Size of the rejected input
        size: usize,
        /// Maximum accepted size
        max: usize,
    },

    /// Input is not a well-formed message document.
    #[error("malformed message: {0}")]
    Malformed(String),

    /// Message was produced by an incompatible protocol version.
    #[error("unsupported wire version: {0}")]
    UnsupportedVersion(u16),

    /// Plaintext metadata contradicts the encrypted payload.
    #[error("inconsistent message: {0}")]
    Inconsistent(&'static str),
}

impl From<serde_json::Error> for WireError {
    fn from(err: serde_json::Error) -> Self {
        Self::Malformed(err.to_string())
    }
}
