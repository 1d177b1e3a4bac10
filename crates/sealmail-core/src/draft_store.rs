//! Storage for unsent drafts.
//!
//! Synchronous, like any local store the composer saves to between edits.
//! Drafts are plaintext and belong to the local user only; they never reach
//! a transport.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use sealmail_proto::Draft;

use crate::error::StoreError;

/// Draft persistence keyed by draft id.
///
/// Must be Clone (shared between the composer and the sender) and thread
/// safe. Implementations typically share state via `Arc`, so clones see the
/// same drafts.
pub trait DraftStore: Clone + Send + Sync + 'static {
    /// Save `draft` under `id`, replacing any previous version.
    fn save(&self, id: &str, draft: &Draft) -> Result<(), StoreError>;

    /// Load the draft saved under `id`.
    fn load(&self, id: &str) -> Result<Option<Draft>, StoreError>;

    /// Delete the draft saved under `id`. Returns whether one existed.
    fn delete(&self, id: &str) -> Result<bool, StoreError>;
}

/// In-memory draft store holding CBOR-encoded drafts.
#[derive(Debug, Clone, Default)]
pub struct MemoryDraftStore {
    drafts: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MemoryDraftStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of saved drafts.
    pub fn len(&self) -> usize {
        self.drafts.lock().map_or(0, |drafts| drafts.len())
    }

    /// Whether no drafts are saved.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DraftStore for MemoryDraftStore {
    fn save(&self, id: &str, draft: &Draft) -> Result<(), StoreError> {
        let mut encoded = Vec::new();
        ciborium::ser::into_writer(draft, &mut encoded)
            .map_err(|e| StoreError::Codec(format!("CBOR encode failed: {e}")))?;

        let mut drafts = self.drafts.lock().map_err(|_| poisoned())?;
        drafts.insert(id.to_string(), encoded);
        Ok(())
    }

    fn load(&self, id: &str) -> Result<Option<Draft>, StoreError> {
        let drafts = self.drafts.lock().map_err(|_| poisoned())?;
        let Some(encoded) = drafts.get(id) else {
            return Ok(None);
        };

        ciborium::de::from_reader(&encoded[..])
            .map(Some)
            .map_err(|e| StoreError::Codec(format!("CBOR decode failed: {e}")))
    }

    fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let mut drafts = self.drafts.lock().map_err(|_| poisoned())?;
        Ok(drafts.remove(id).is_some())
    }
}

fn poisoned() -> StoreError {
    StoreError::Unavailable("draft store lock poisoned".to_string())
}
