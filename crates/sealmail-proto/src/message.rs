//! The encrypted message as it travels between sender, transport and
//! recipients.
//!
//! Encoded as JSON with camelCase field names. Every binary field is standard
//! base64 so the document survives any text transport unchanged.
//!
//! ```text
//! {
//!   "version": 1,
//!   "id": "…",
//!   "encryptedSubject": { "ciphertext": "…", "nonce": "…" },
//!   "encryptedBody":    { "ciphertext": "…", "nonce": "…" },
//!   "attachments": [ { "id", "encryptedName", "encryptedContent", "size", "mimeType" } ],
//!   "signature": "…",
//!   "recipientKeys": { "alice@example.com": "…" },
//!   "metadata": { "senderId", "recipientIds", "timestamp", "size", "attachmentCount", "isRead" }
//! }
//! ```
//!
//! # Invariants
//!
//! - `recipientKeys` holds only wrapped keys, never the message key itself
//! - `metadata.recipientIds` lists exactly the keys of `recipientKeys`, each
//!   once
//! - `metadata.attachmentCount == attachments.len()`

use std::collections::{BTreeMap, BTreeSet};

use sealmail_crypto::{Sealed, encoding::base64_bytes};
use serde::{Deserialize, Serialize};

use crate::error::WireError;

/// Current wire version.
pub const WIRE_VERSION: u16 = 1;

/// Largest encoded message [`EncryptedMessage::from_json`] will parse.
///
/// Sized for the default 100 MiB attachment total after base64 expansion,
/// plus headroom for the envelope.
pub const MAX_ENCODED_SIZE: usize = 140 * 1024 * 1024;

/// A per-message key wrapped under one recipient's public key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WrappedKey(#[serde(with = "base64_bytes")] pub Vec<u8>);

/// One encrypted attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedAttachment {
    /// Attachment id, unique within the message.
    pub id: String,
    /// Encrypted file name.
    pub encrypted_name: Sealed,
    /// Encrypted file content.
    pub encrypted_content: Sealed,
    /// Plaintext content size in bytes.
    pub size: u64,
    /// MIME type (in the clear, for indexing).
    pub mime_type: String,
}

/// Routing and indexing data readable without decryption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageMetadata {
    /// Sender address.
    pub sender_id: String,
    /// Addresses holding a wrapped key.
    pub recipient_ids: Vec<String>,
    /// Unix timestamp (seconds) at sealing.
    pub timestamp: u64,
    /// Sum of plaintext subject, body and attachment sizes.
    pub size: u64,
    /// Number of attachments.
    pub attachment_count: u32,
    /// Read flag, maintained by the surrounding application.
    pub is_read: bool,
}

/// A sealed message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedMessage {
    /// Wire format version.
    pub version: u16,
    /// Message id.
    pub id: String,
    /// Encrypted subject.
    pub encrypted_subject: Sealed,
    /// Encrypted body.
    pub encrypted_body: Sealed,
    /// Encrypted attachments, in the draft's order.
    pub attachments: Vec<EncryptedAttachment>,
    /// Sender signature over the transcript (see [`crate::transcript`]).
    #[serde(with = "base64_bytes")]
    pub signature: Vec<u8>,
    /// Recipient address to wrapped message key, ordered by address.
    pub recipient_keys: BTreeMap<String, WrappedKey>,
    /// Plaintext metadata.
    pub metadata: MessageMetadata,
}

impl EncryptedMessage {
    /// Encode as JSON.
    pub fn to_json(&self) -> Result<String, WireError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode from JSON and check structural consistency.
    ///
    /// # Errors
    ///
    /// - `TooLarge`: input exceeds [`MAX_ENCODED_SIZE`]
    /// - `Malformed`: not a message document (bad JSON, bad base64, wrong
    ///   nonce length)
    /// - `UnsupportedVersion`: `version` is not [`WIRE_VERSION`]
    /// - `Inconsistent`: metadata contradicts the payload
    pub fn from_json(json: &str) -> Result<Self, WireError> {
        if json.len() > MAX_ENCODED_SIZE {
            return Err(WireError::TooLarge { size: json.len(), max: MAX_ENCODED_SIZE });
        }

        let message: Self = serde_json::from_str(json)?;
        message.check_structure()?;
        Ok(message)
    }

    /// Verify the invariants listed in the module docs.
    pub fn check_structure(&self) -> Result<(), WireError> {
        if self.version != WIRE_VERSION {
            return Err(WireError::UnsupportedVersion(self.version));
        }

        if self.recipient_keys.is_empty() {
            return Err(WireError::Inconsistent("no recipient keys"));
        }

        if self.metadata.attachment_count as usize != self.attachments.len() {
            return Err(WireError::Inconsistent("attachment count mismatch"));
        }

        let listed: BTreeSet<&str> =
            self.metadata.recipient_ids.iter().map(String::as_str).collect();
        let keyed: BTreeSet<&str> = self.recipient_keys.keys().map(String::as_str).collect();
        if listed.len() != self.metadata.recipient_ids.len() || listed != keyed {
            return Err(WireError::Inconsistent("recipient ids do not match recipient keys"));
        }

        Ok(())
    }

    /// Whether `address` has a wrapped key in this message.
    pub fn is_addressed_to(&self, address: &str) -> bool {
        self.recipient_keys.contains_key(address)
    }
}
