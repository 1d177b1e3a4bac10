//! Message transport abstraction.
//!
//! The transport only ever sees the serialized wire form: ciphertexts, wrapped
//! keys, signature and plaintext metadata. It routes on
//! `metadata.recipientIds` and never needs a key.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use sealmail_proto::EncryptedMessage;

use crate::{address, error::TransportError};

/// Delivers and retrieves sealed messages.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Accept `message` for delivery to its recipients.
    async fn deliver(&self, message: &EncryptedMessage) -> Result<(), TransportError>;

    /// Retrieve a message by id. `Ok(None)` if unknown.
    async fn fetch(&self, id: &str) -> Result<Option<EncryptedMessage>, TransportError>;

    /// Ids of messages addressed to `address`, oldest first.
    async fn inbox(&self, address: &str) -> Result<Vec<String>, TransportError>;
}

/// In-memory transport storing messages as JSON text.
///
/// Clones share the same mailboxes.
#[derive(Debug, Clone, Default)]
pub struct MemoryTransport {
    inner: Arc<Mutex<MemoryTransportInner>>,
}

#[derive(Debug, Default)]
struct MemoryTransportInner {
    /// Message id -> serialized message
    messages: HashMap<String, String>,

    /// Recipient address -> message ids in delivery order
    mailboxes: HashMap<String, Vec<String>>,
}

impl MemoryTransport {
    /// Create an empty transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serialized form of a stored message, exactly as delivered.
    pub fn raw(&self, id: &str) -> Result<Option<String>, TransportError> {
        let inner = self.inner.lock().map_err(|_| poisoned())?;
        Ok(inner.messages.get(id).cloned())
    }

    /// Overwrite a stored message's serialized form. Lets tests model a
    /// hostile relay.
    pub fn replace_raw(&self, id: &str, json: String) -> Result<bool, TransportError> {
        let mut inner = self.inner.lock().map_err(|_| poisoned())?;
        Ok(inner.messages.get_mut(id).map(|stored| *stored = json).is_some())
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn deliver(&self, message: &EncryptedMessage) -> Result<(), TransportError> {
        let json = message.to_json()?;
        let mut inner = self.inner.lock().map_err(|_| poisoned())?;

        if inner.messages.contains_key(&message.id) {
            return Err(TransportError::Duplicate(message.id.clone()));
        }

        inner.messages.insert(message.id.clone(), json);
        for recipient in &message.metadata.recipient_ids {
            let mailbox = inner.mailboxes.entry(address::normalize(recipient)).or_default();
            mailbox.push(message.id.clone());
        }

        tracing::debug!(
            message_id = %message.id,
            recipients = message.metadata.recipient_ids.len(),
            "Message delivered"
        );

        Ok(())
    }

    async fn fetch(&self, id: &str) -> Result<Option<EncryptedMessage>, TransportError> {
        let Some(json) = self.raw(id)? else {
            return Ok(None);
        };

        Ok(Some(EncryptedMessage::from_json(&json)?))
    }

    async fn inbox(&self, address: &str) -> Result<Vec<String>, TransportError> {
        let inner = self.inner.lock().map_err(|_| poisoned())?;
        Ok(inner.mailboxes.get(&address::normalize(address)).cloned().unwrap_or_default())
    }
}

fn poisoned() -> TransportError {
    TransportError::Unavailable("transport lock poisoned".to_string())
}
