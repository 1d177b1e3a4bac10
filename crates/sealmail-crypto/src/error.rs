//! Error types for cryptographic operations.
//!
//! Variants name the kind of failure only. Internal causes, such as which
//! padding check failed, never reach `Display`.

use thiserror::Error;

/// Errors produced by primitives, the key manager and key sessions.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CryptoError {
    /// RNG or cryptographic provider failed (entropy exhaustion, invalid
    /// parameters, oversized input for the asymmetric scheme).
    #[error("cryptographic provider failure")]
    ProviderFailure,

    /// Password did not unlock the private key.
    ///
    /// Also returned for corrupted key material so the two cases are
    /// indistinguishable.
    #[error("invalid password")]
    InvalidPassword,

    /// AEAD tag did not verify (tampering, wrong key or wrong nonce).
    #[error("authentication failed")]
    AuthenticationFailed,

    /// Sender signature did not verify against the claimed public key.
    #[error("signature invalid")]
    SignatureInvalid,

    /// Message carries no wrapped key for this recipient.
    #[error("not a recipient of this message")]
    NotARecipient,

    /// Key session was locked before the operation could use the key.
    #[error("key session is locked")]
    KeyLocked,

    /// Public or private key bytes could not be parsed.
    #[error("malformed key")]
    MalformedKey,
}
