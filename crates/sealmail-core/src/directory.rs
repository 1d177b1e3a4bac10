//! Public key directory abstraction.
//!
//! The core only needs to ask "what is this address's public key?". Where
//! the answer comes from (HTTP key server, LDAP, local files) is the
//! implementor's business. [`MemoryDirectory`] backs tests and the CLI.

use std::{
    collections::HashMap,
    future::Future,
    sync::{Arc, RwLock},
};

use sealmail_crypto::PublicKey;

use crate::{address, error::DirectoryError};

/// Source of recipients' public keys.
///
/// Lookups for different addresses run concurrently, so implementations must
/// tolerate overlapping calls.
pub trait KeyDirectory: Send + Sync {
    /// Public key published for `address`.
    ///
    /// `address` is already normalized. `Ok(None)` means the directory
    /// answered and has no key; `Err` means it could not answer.
    fn lookup(
        &self,
        address: &str,
    ) -> impl Future<Output = Result<Option<PublicKey>, DirectoryError>> + Send;
}

/// In-memory directory.
///
/// Clones share the same underlying map.
#[derive(Debug, Clone, Default)]
pub struct MemoryDirectory {
    keys: Arc<RwLock<HashMap<String, PublicKey>>>,
}

impl MemoryDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish `key` for `address`, replacing any previous key.
    pub fn publish(&self, address: &str, key: PublicKey) -> Result<(), DirectoryError> {
        let mut keys = self.keys.write().map_err(|_| poisoned())?;
        keys.insert(address::normalize(address), key);
        Ok(())
    }

    /// Withdraw the key for `address`. Returns whether one was published.
    pub fn withdraw(&self, address: &str) -> Result<bool, DirectoryError> {
        let mut keys = self.keys.write().map_err(|_| poisoned())?;
        Ok(keys.remove(&address::normalize(address)).is_some())
    }

    /// Number of published keys.
    pub fn len(&self) -> usize {
        self.keys.read().map_or(0, |keys| keys.len())
    }

    /// Whether no keys are published.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyDirectory for MemoryDirectory {
    async fn lookup(&self, address: &str) -> Result<Option<PublicKey>, DirectoryError> {
        let keys = self.keys.read().map_err(|_| poisoned())?;
        Ok(keys.get(address).cloned())
    }
}

fn poisoned() -> DirectoryError {
    DirectoryError::Unavailable("directory lock poisoned".to_string())
}
