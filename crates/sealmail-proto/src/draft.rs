//! Plaintext message model.
//!
//! [`Draft`] is what the composer edits and what sealing consumes.
//! [`OpenedMessage`] is what opening produces: the same shape plus the
//! routing metadata that travelled in the clear.

use std::fmt;

use sealmail_crypto::encoding::base64_bytes;
use serde::{Deserialize, Serialize};

/// A plaintext attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    /// File name.
    pub name: String,
    /// File content.
    #[serde(with = "base64_bytes")]
    pub content: Vec<u8>,
    /// Declared size in bytes. Must equal `content.len()`.
    pub size: u64,
    /// MIME type, e.g. `application/pdf`.
    pub mime_type: String,
}

impl Attachment {
    /// Attachment whose declared size matches its content.
    pub fn new(name: impl Into<String>, content: Vec<u8>, mime_type: impl Into<String>) -> Self {
        let size = content.len() as u64;
        Self { name: name.into(), content, size, mime_type: mime_type.into() }
    }
}

/// Which address list a recipient came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecipientField {
    /// Primary recipients
    To,
    /// Carbon copy
    Cc,
    /// Blind carbon copy
    Bcc,
}

impl fmt::Display for RecipientField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::To => f.write_str("to"),
            Self::Cc => f.write_str("cc"),
            Self::Bcc => f.write_str("bcc"),
        }
    }
}

/// A message being composed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Draft {
    /// Primary recipients.
    pub to: Vec<String>,
    /// Carbon copy recipients.
    pub cc: Vec<String>,
    /// Blind carbon copy recipients.
    pub bcc: Vec<String>,
    /// Subject line.
    pub subject: String,
    /// Message body.
    pub body: String,
    /// Attachments, in display order.
    pub attachments: Vec<Attachment>,
    /// Whether the composer asked for end-to-end encryption.
    pub encrypt: bool,
}

impl Draft {
    /// Every address with the list and position it appears at.
    pub fn recipients(&self) -> impl Iterator<Item = (RecipientField, usize, &str)> {
        tagged(RecipientField::To, &self.to)
            .chain(tagged(RecipientField::Cc, &self.cc))
            .chain(tagged(RecipientField::Bcc, &self.bcc))
    }

    /// Total number of addresses across to/cc/bcc.
    pub fn recipient_count(&self) -> usize {
        self.to.len() + self.cc.len() + self.bcc.len()
    }

    /// Sum of declared attachment sizes.
    pub fn total_attachment_size(&self) -> u64 {
        self.attachments.iter().map(|attachment| attachment.size).fold(0, u64::saturating_add)
    }
}

fn tagged(
    field: RecipientField,
    list: &[String],
) -> impl Iterator<Item = (RecipientField, usize, &str)> {
    list.iter().enumerate().map(move |(index, address)| (field, index, address.as_str()))
}

/// A decrypted attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenedAttachment {
    /// Attachment id from the wire message.
    pub id: String,
    /// Decrypted file name.
    pub name: String,
    /// Decrypted content.
    #[serde(with = "base64_bytes")]
    pub content: Vec<u8>,
    /// Size from the wire message.
    pub size: u64,
    /// MIME type from the wire message.
    pub mime_type: String,
}

/// A verified and decrypted message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenedMessage {
    /// Message id.
    pub id: String,
    /// Verified sender address.
    pub sender: String,
    /// Addresses the message key was wrapped for.
    pub recipients: Vec<String>,
    /// Unix timestamp (seconds) assigned at sealing.
    pub timestamp: u64,
    /// Decrypted subject.
    pub subject: String,
    /// Decrypted body.
    pub body: String,
    /// Decrypted attachments.
    pub attachments: Vec<OpenedAttachment>,
}
