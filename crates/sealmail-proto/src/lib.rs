//! Sealmail Wire Protocol
//!
//! Plaintext message model and the encrypted message format exchanged between
//! sender, transport and recipients.
//!
//! # Components
//!
//! - [`Draft`]: message being composed, consumed by sealing
//! - [`EncryptedMessage`]: sealed message as stored and transported
//! - [`OpenedMessage`]: verified and decrypted message
//! - [`signature_transcript`]: canonical bytes the sender signs
//!
//! The wire format is versioned ([`WIRE_VERSION`]). Decoders reject any other
//! version rather than guessing.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod draft;
mod error;
pub mod message;
pub mod transcript;

pub use draft::{Attachment, Draft, OpenedAttachment, OpenedMessage, RecipientField};
pub use error::WireError;
pub use message::{
    EncryptedAttachment, EncryptedMessage, MAX_ENCODED_SIZE, MessageMetadata, WIRE_VERSION,
    WrappedKey,
};
pub use transcript::signature_transcript;
