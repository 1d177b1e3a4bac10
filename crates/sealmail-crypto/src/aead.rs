//! Symmetric authenticated encryption using `ChaCha20-Poly1305`.
//!
//! # Security
//!
//! - Every call to [`aead_encrypt`] draws a fresh 12-byte nonce from the
//!   caller's RNG and returns it next to the ciphertext. There is no API that
//!   accepts a caller-chosen nonce for encryption, so nonce reuse cannot be
//!   expressed.
//! - A failed tag check is reported as [`CryptoError::AuthenticationFailed`]
//!   and never yields partial plaintext.

use chacha20poly1305::{
    ChaCha20Poly1305, Nonce,
    aead::{Aead, KeyInit},
};
use rand_core::CryptoRngCore;
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::{encoding::base64_array, error::CryptoError};

/// Symmetric key size (32 bytes).
pub const SYMMETRIC_KEY_SIZE: usize = 32;

/// Nonce size (12 bytes).
pub const NONCE_SIZE: usize = 12;

/// Poly1305 tag size (16 bytes).
pub const TAG_SIZE: usize = 16;

/// A 256-bit AEAD key.
///
/// Zeroized on drop. Not `Clone`: a per-message key has exactly one owner.
pub struct SymmetricKey {
    bytes: [u8; SYMMETRIC_KEY_SIZE],
}

impl SymmetricKey {
    /// Wrap raw key bytes.
    pub fn from_bytes(bytes: [u8; SYMMETRIC_KEY_SIZE]) -> Self {
        Self { bytes }
    }

    /// Build a key from a slice, rejecting any length other than 32.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let bytes: [u8; SYMMETRIC_KEY_SIZE] =
            bytes.try_into().map_err(|_| CryptoError::MalformedKey)?;
        Ok(Self { bytes })
    }

    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8; SYMMETRIC_KEY_SIZE] {
        &self.bytes
    }
}

impl Drop for SymmetricKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SymmetricKey([REDACTED])")
    }
}

/// Ciphertext (including tag) and the nonce it was sealed with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sealed {
    /// Ciphertext including the 16-byte Poly1305 tag.
    #[serde(with = "crate::encoding::base64_bytes")]
    pub ciphertext: Vec<u8>,
    /// The 12-byte nonce used for this ciphertext.
    #[serde(with = "base64_array")]
    pub nonce: [u8; NONCE_SIZE],
}

impl Sealed {
    /// Plaintext length (ciphertext length minus authentication tag).
    pub fn plaintext_len(&self) -> usize {
        self.ciphertext.len().saturating_sub(TAG_SIZE)
    }
}

/// Generate a fresh symmetric key.
pub fn generate_symmetric_key(rng: &mut impl CryptoRngCore) -> Result<SymmetricKey, CryptoError> {
    let mut bytes = [0u8; SYMMETRIC_KEY_SIZE];
    rng.try_fill_bytes(&mut bytes).map_err(|_| CryptoError::ProviderFailure)?;
    Ok(SymmetricKey { bytes })
}

/// Encrypt `plaintext` under `key` with a fresh random nonce.
pub fn aead_encrypt(
    plaintext: &[u8],
    key: &SymmetricKey,
    rng: &mut impl CryptoRngCore,
) -> Result<Sealed, CryptoError> {
    let mut nonce = [0u8; NONCE_SIZE];
    rng.try_fill_bytes(&mut nonce).map_err(|_| CryptoError::ProviderFailure)?;

    let cipher = ChaCha20Poly1305::new(key.as_bytes().into());
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), plaintext)
        .map_err(|_| CryptoError::ProviderFailure)?;

    Ok(Sealed { ciphertext, nonce })
}

/// Decrypt a ciphertext produced by [`aead_encrypt`].
///
/// # Errors
///
/// - `AuthenticationFailed`: tag, key or nonce is wrong (tamper)
pub fn aead_decrypt(
    ciphertext: &[u8],
    key: &SymmetricKey,
    nonce: &[u8; NONCE_SIZE],
) -> Result<Vec<u8>, CryptoError> {
    if ciphertext.len() < TAG_SIZE {
        return Err(CryptoError::AuthenticationFailed);
    }

    let cipher = ChaCha20Poly1305::new(key.as_bytes().into());
    cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| CryptoError::AuthenticationFailed)
}
