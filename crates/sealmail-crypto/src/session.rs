//! Scoped access to an unlocked key pair for one user session.
//!
//! [`KeySession`] owns the unlocked [`KeyPair`]. Operations borrow it through
//! a [`KeyHandle`] that keeps the key alive until the handle is dropped. Any
//! number of handles may exist at once. [`KeySession::lock`] waits for every
//! outstanding handle to drop, then destroys the key (zeroizing it). Handles
//! requested after the lock fail with [`CryptoError::KeyLocked`].
//!
//! # Invariants
//!
//! - The key is never mutated or replaced while a handle exists
//! - Once locked, a session stays locked

use std::ops::Deref;

use tokio::sync::{RwLock, RwLockReadGuard};

use crate::{asymmetric::KeyPair, error::CryptoError};

/// Holder of an unlocked key pair.
#[derive(Debug)]
pub struct KeySession {
    slot: RwLock<Option<KeyPair>>,
}

/// Borrowed access to the session's key pair.
///
/// Blocks [`KeySession::lock`] for as long as it lives.
#[derive(Debug)]
pub struct KeyHandle<'a> {
    guard: RwLockReadGuard<'a, KeyPair>,
}

impl KeySession {
    /// Start a session with an unlocked key pair.
    pub fn new(key_pair: KeyPair) -> Self {
        Self { slot: RwLock::new(Some(key_pair)) }
    }

    /// Borrow the key pair for the duration of one operation.
    ///
    /// # Errors
    ///
    /// - `KeyLocked`: the session was locked
    pub async fn acquire(&self) -> Result<KeyHandle<'_>, CryptoError> {
        let guard = self.slot.read().await;
        RwLockReadGuard::try_map(guard, |slot| slot.as_ref())
            .map(|guard| KeyHandle { guard })
            .map_err(|_| CryptoError::KeyLocked)
    }

    /// Destroy the key once all in-flight operations have released it.
    ///
    /// Idempotent.
    pub async fn lock(&self) {
        let mut slot = self.slot.write().await;
        drop(slot.take());
    }

    /// Whether [`lock`](Self::lock) has completed.
    pub async fn is_locked(&self) -> bool {
        self.slot.read().await.is_none()
    }
}

impl Deref for KeyHandle<'_> {
    type Target = KeyPair;

    fn deref(&self) -> &KeyPair {
        &self.guard
    }
}
