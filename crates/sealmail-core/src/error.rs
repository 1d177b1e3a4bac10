//! Error types for the sealmail core.
//!
//! Two families with different propagation rules:
//!
//! - Draft problems ([`ValidationError`]) and lookup problems
//!   ([`LookupWarning`]) are collected into one [`crate::ValidationReport`]
//!   so the user sees everything wrong with a draft at once.
//! - Cryptographic failures fail fast and surface as a single
//!   [`ProtocolError`].

use std::fmt;

use sealmail_crypto::CryptoError;
use sealmail_proto::{RecipientField, WireError};
use thiserror::Error;

/// Location in a draft that a [`ValidationError`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldPath {
    /// One address, e.g. `cc[2]`
    Recipient(RecipientField, usize),
    /// The recipient lists as a whole
    Recipients,
    /// Subject line
    Subject,
    /// One attachment, e.g. `attachments[0]`
    Attachment(usize),
    /// The attachment list as a whole
    Attachments,
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Recipient(field, index) => write!(f, "{field}[{index}]"),
            Self::Recipients => f.write_str("recipients"),
            Self::Subject => f.write_str("subject"),
            Self::Attachment(index) => write!(f, "attachments[{index}]"),
            Self::Attachments => f.write_str("attachments"),
        }
    }
}

/// A hard problem with a draft. Any one of these blocks sealing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Address is not syntactically valid
    #[error("{field}: invalid address {address:?}")]
    InvalidAddress {
        /// Where the address appears
        field: FieldPath,
        /// The rejected address
        address: String,
    },

    /// to, cc and bcc are all empty
    #[error("recipients: at least one recipient is required")]
    NoRecipients,

    /// Sealing was asked for but no recipient has a public key
    #[error("recipients: no recipient has a public key")]
    NoKeyedRecipients,

    /// Subject exceeds the configured length
    #[error("subject: {len} bytes exceeds limit of {max}")]
    SubjectTooLong {
        /// Subject length in UTF-8 bytes
        len: usize,
        /// Configured limit
        max: usize,
    },

    /// Single attachment exceeds the per-attachment limit
    #[error("attachments[{index}]: {size} bytes exceeds limit of {max}")]
    AttachmentTooLarge {
        /// Attachment position
        index: usize,
        /// Attachment size
        size: u64,
        /// Configured limit
        max: u64,
    },

    /// Declared attachment size disagrees with its content
    #[error("attachments[{index}]: declared size {declared} but content is {actual} bytes")]
    SizeMismatch {
        /// Attachment position
        index: usize,
        /// Declared size
        declared: u64,
        /// Actual content length
        actual: u64,
    },

    /// Sum of attachment sizes exceeds the total limit
    #[error("attachments: total {total} bytes exceeds limit of {max}")]
    TotalTooLarge {
        /// Sum of attachment sizes
        total: u64,
        /// Configured limit
        max: u64,
    },
}

impl ValidationError {
    /// Draft location this error refers to.
    pub fn field(&self) -> FieldPath {
        match self {
            Self::InvalidAddress { field, .. } => *field,
            Self::NoRecipients | Self::NoKeyedRecipients => FieldPath::Recipients,
            Self::SubjectTooLong { .. } => FieldPath::Subject,
            Self::AttachmentTooLarge { index, .. } | Self::SizeMismatch { index, .. } => {
                FieldPath::Attachment(*index)
            },
            Self::TotalTooLarge { .. } => FieldPath::Attachments,
        }
    }
}

/// Why a recipient has no public key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LookupFailure {
    /// Directory has no key for the address
    NotFound,
    /// Directory returned an error
    Unavailable,
    /// Lookup exceeded the configured timeout
    TimedOut,
}

impl fmt::Display for LookupFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => f.write_str("no public key published"),
            Self::Unavailable => f.write_str("key directory unavailable"),
            Self::TimedOut => f.write_str("key lookup timed out"),
        }
    }
}

/// A recipient that will not receive an encrypted copy.
///
/// Soft: the draft stays valid as long as another recipient has a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LookupWarning {
    /// Normalized address
    pub address: String,
    /// Why no key is available
    pub reason: LookupFailure,
}

impl fmt::Display for LookupWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.address, self.reason)
    }
}

/// Errors from a [`crate::KeyDirectory`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    /// Directory could not answer
    #[error("key directory unavailable: {0}")]
    Unavailable(String),

    /// Directory returned a key that does not parse
    #[error("key directory returned a malformed key for {0}")]
    MalformedKey(String),
}

/// Errors from sealing, opening or verifying a message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Any primitive failure while sealing. The cause is kept as the source
    /// and never shown in the message.
    #[error("failed to encrypt message")]
    Seal(#[source] CryptoError),

    /// Verification or decryption failed
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// Message is structurally invalid
    #[error(transparent)]
    Wire(#[from] WireError),

    /// Sealing could not start
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Caller cancelled the operation; nothing was produced
    #[error("operation cancelled")]
    Cancelled,
}

/// Errors from a [`crate::Transport`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// A message with this id was already delivered
    #[error("duplicate message id: {0}")]
    Duplicate(String),

    /// Stored message no longer decodes
    #[error(transparent)]
    Wire(#[from] WireError),

    /// Transport could not be reached
    #[error("transport unavailable: {0}")]
    Unavailable(String),
}

/// Errors from a [`crate::DraftStore`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Draft could not be encoded or decoded
    #[error("draft encoding failed: {0}")]
    Codec(String),

    /// Backend failed
    #[error("draft store unavailable: {0}")]
    Unavailable(String),
}

/// Errors from the [`crate::Mailer`] workflows.
#[derive(Error, Debug)]
pub enum MailerError {
    /// Draft failed validation; every problem is listed
    #[error("draft is invalid ({} problem(s))", .0.len())]
    Invalid(Vec<ValidationError>),

    /// Seal, open or verify failed
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Identity operation failed
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// Delivery or retrieval failed
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Sender key lookup failed
    #[error(transparent)]
    Directory(#[from] DirectoryError),

    /// Sender has no published key, so the signature cannot be checked
    #[error("no public key for sender {0}")]
    UnknownSender(String),

    /// Transport has no message with this id
    #[error("message not found: {0}")]
    NotFound(String),

    /// Background task panicked or was aborted
    #[error("background task failed")]
    TaskFailed,
}
