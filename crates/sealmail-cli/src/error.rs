//! CLI error types.

use std::path::PathBuf;

use sealmail_core::{DirectoryError, MailerError};
use sealmail_crypto::CryptoError;
use sealmail_proto::WireError;
use thiserror::Error;

/// Errors surfaced to the user by the `sealmail` binary.
#[derive(Error, Debug)]
pub enum CliError {
    /// Reading or writing a file failed
    #[error("{}: {source}", path.display())]
    Io {
        /// File or directory involved
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A JSON input (draft, config, identity) did not parse
    #[error("{}: invalid JSON: {source}", path.display())]
    Json {
        /// File that failed to parse
        path: PathBuf,
        /// Underlying parse error
        #[source]
        source: serde_json::Error,
    },

    /// No identity has been created in this home directory
    #[error("no identity at {}; run `sealmail identity create` first", .0.display())]
    NoIdentity(PathBuf),

    /// Address given to `identity create` is not a valid mail address
    #[error("invalid address: {0:?}")]
    InvalidAddress(String),

    /// Refusing to overwrite an existing identity
    #[error("identity already exists at {}", .0.display())]
    IdentityExists(PathBuf),

    /// Protocol workflow failed
    #[error(transparent)]
    Mailer(#[from] MailerError),

    /// Key encoding failed
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// Message document is not valid
    #[error(transparent)]
    Wire(#[from] WireError),

    /// Local key directory could not be updated
    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

impl CliError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }

    pub(crate) fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Json { path: path.into(), source }
    }
}
