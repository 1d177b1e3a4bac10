//! Sealmail Cryptographic Primitives
//!
//! Stateless building blocks for sealmail's hybrid encryption scheme, plus
//! the key manager that protects a user's long-term key pair at rest.
//! Randomness is always supplied by the caller, so tests can run with a
//! seeded RNG and production passes the OS RNG.
//!
//! # Key Hierarchy
//!
//! ```text
//! password ──Argon2id──► wrapping key ──AEAD──► private key at rest
//!
//! per-message key K ──AEAD──► subject, body, attachment names/contents
//!        │
//!        └──RSA-OAEP──► one wrapped copy of K per recipient
//!
//! ciphertexts ──RSA-PSS (sender private key)──► signature
//! ```
//!
//! # Security
//!
//! Confidentiality:
//! - `ChaCha20-Poly1305` with a fresh random 12-byte nonce for every call
//! - Per-message keys are zeroized on drop and never `Clone`
//!
//! Authenticity:
//! - Failed AEAD tag -> [`CryptoError::AuthenticationFailed`], never partial
//!   plaintext
//! - RSA-PSS signatures over ciphertext let recipients and relays verify the
//!   sender without decrypting
//!
//! Key protection:
//! - Private keys are only persisted AEAD-encrypted under an Argon2id-derived
//!   key
//! - Unlocked keys live in a [`KeySession`] and are destroyed on lock

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod aead;
pub mod asymmetric;
pub mod encoding;
mod error;
pub mod kdf;
pub mod key_manager;
pub mod session;
pub mod signature;

pub use aead::{NONCE_SIZE, Sealed, SymmetricKey, aead_decrypt, aead_encrypt, generate_symmetric_key};
pub use asymmetric::{
    DEFAULT_RSA_BITS, KeyPair, MIN_RSA_BITS, PrivateKey, PublicKey, asymmetric_decrypt,
    asymmetric_encrypt, generate_asymmetric_keypair,
};
pub use encoding::EncodingError;
pub use error::CryptoError;
pub use kdf::{DerivedKey, KdfParams, SALT_SIZE, derive_key_from_password, derive_with_salt};
pub use key_manager::{EncryptedPrivateKey, KeyManager, NewIdentity};
pub use rand_core::{CryptoRngCore, OsRng};
pub use session::{KeyHandle, KeySession};
pub use signature::{sign, verify};
