//! Long-term identity keys protected at rest by the user's password.
//!
//! ```text
//! password ──Argon2id+HKDF──► wrapping key ──AEAD──► encrypted PKCS#8 private key
//!                 ▲                                         │
//!                salt ◄──────────── persisted ──────────────┘
//! ```
//!
//! # Invariants
//!
//! - The private key only exists unencrypted in memory. DER buffers holding
//!   it are zeroized on drop.
//! - Every unlock failure (wrong password, corrupted blob, mismatched public
//!   key) is reported as [`CryptoError::InvalidPassword`].

use rand_core::CryptoRngCore;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::{
    aead::{NONCE_SIZE, aead_decrypt, aead_encrypt},
    asymmetric::{DEFAULT_RSA_BITS, KeyPair, PrivateKey, PublicKey, generate_asymmetric_keypair},
    encoding::{base64_array, base64_bytes},
    error::CryptoError,
    kdf::{DerivedKey, KdfParams, SALT_SIZE, derive_key_from_password, derive_with_salt},
};

/// An encrypted private key plus everything needed to unlock it.
///
/// Safe to persist: holds no secret in the clear.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedPrivateKey {
    /// Public half, used to check the unlocked private key.
    pub public_key: PublicKey,
    /// KDF salt.
    #[serde(with = "base64_array")]
    pub salt: [u8; SALT_SIZE],
    /// KDF parameters the wrapping key was derived with.
    pub kdf: KdfParams,
    /// AEAD nonce.
    #[serde(with = "base64_array")]
    pub nonce: [u8; NONCE_SIZE],
    /// AEAD-encrypted PKCS#8 DER of the private key.
    #[serde(with = "base64_bytes")]
    pub ciphertext: Vec<u8>,
}

/// Result of [`KeyManager::create_identity`].
#[derive(Debug)]
pub struct NewIdentity {
    /// Freshly generated key pair, already unlocked.
    pub key_pair: KeyPair,
    /// The wrapping key and its salt.
    pub derived_key: DerivedKey,
    /// What the caller persists.
    pub encrypted: EncryptedPrivateKey,
}

/// Creates and unlocks password-protected identities.
#[derive(Debug, Clone, Copy)]
pub struct KeyManager {
    kdf: KdfParams,
    rsa_bits: usize,
}

impl Default for KeyManager {
    fn default() -> Self {
        Self::new(KdfParams::default(), DEFAULT_RSA_BITS)
    }
}

impl KeyManager {
    /// Key manager deriving with `kdf` and generating `rsa_bits` key pairs.
    pub fn new(kdf: KdfParams, rsa_bits: usize) -> Self {
        Self { kdf, rsa_bits }
    }

    /// KDF parameters used for new identities.
    pub fn kdf_params(&self) -> &KdfParams {
        &self.kdf
    }

    /// Generate a key pair and encrypt its private half under `password`.
    pub fn create_identity(
        &self,
        password: &[u8],
        rng: &mut impl CryptoRngCore,
    ) -> Result<NewIdentity, CryptoError> {
        let key_pair = generate_asymmetric_keypair(rng, self.rsa_bits)?;
        let derived_key = derive_key_from_password(password, None, &self.kdf, rng)?;
        let encrypted = wrap_private_key(&key_pair, &derived_key, self.kdf, rng)?;

        Ok(NewIdentity { key_pair, derived_key, encrypted })
    }

    /// Decrypt the private key with `password`.
    ///
    /// Uses the KDF parameters stored in `encrypted`, not this manager's.
    ///
    /// # Errors
    ///
    /// - `InvalidPassword`: any failure to recover a matching private key
    /// - `ProviderFailure`: stored KDF parameters are unusable
    pub fn unlock(
        &self,
        password: &[u8],
        encrypted: &EncryptedPrivateKey,
    ) -> Result<KeyPair, CryptoError> {
        let wrapping_key = derive_with_salt(password, &encrypted.salt, &encrypted.kdf)?;

        let der = aead_decrypt(&encrypted.ciphertext, &wrapping_key, &encrypted.nonce)
            .map(Zeroizing::new)
            .map_err(|_| CryptoError::InvalidPassword)?;

        let private = PrivateKey::from_pkcs8_der(&der).map_err(|_| CryptoError::InvalidPassword)?;
        KeyPair::from_parts(encrypted.public_key.clone(), private)
            .map_err(|_| CryptoError::InvalidPassword)
    }

    /// Re-wrap the private key under a new password and fresh salt.
    ///
    /// The key pair itself is unchanged, so recipients' cached public keys
    /// stay valid. New wrapping uses this manager's KDF parameters.
    pub fn change_password(
        &self,
        old_password: &[u8],
        new_password: &[u8],
        encrypted: &EncryptedPrivateKey,
        rng: &mut impl CryptoRngCore,
    ) -> Result<EncryptedPrivateKey, CryptoError> {
        let key_pair = self.unlock(old_password, encrypted)?;
        let derived_key = derive_key_from_password(new_password, None, &self.kdf, rng)?;
        wrap_private_key(&key_pair, &derived_key, self.kdf, rng)
    }
}

fn wrap_private_key(
    key_pair: &KeyPair,
    derived_key: &DerivedKey,
    kdf: KdfParams,
    rng: &mut impl CryptoRngCore,
) -> Result<EncryptedPrivateKey, CryptoError> {
    let der = key_pair.private_key().to_pkcs8_der()?;
    let sealed = aead_encrypt(&der, &derived_key.key, rng)?;

    Ok(EncryptedPrivateKey {
        public_key: key_pair.public_key().clone(),
        salt: derived_key.salt,
        kdf,
        nonce: sealed.nonce,
        ciphertext: sealed.ciphertext,
    })
}
