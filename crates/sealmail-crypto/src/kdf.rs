//! Password key derivation using Argon2id.
//!
//! The Argon2 output is expanded through HKDF with a fixed label so the
//! derived key is bound to its purpose (wrapping the private key) and can
//! never collide with a key derived for something else from the same
//! password.

use argon2::{Algorithm, Argon2, Params, Version};
use hkdf::Hkdf;
use rand_core::CryptoRngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::{
    aead::{SYMMETRIC_KEY_SIZE, SymmetricKey},
    error::CryptoError,
};

/// Salt size (16 bytes).
pub const SALT_SIZE: usize = 16;

/// Label for expanding the Argon2 output into the key-wrapping key.
const WRAP_KEY_LABEL: &[u8] = b"sealmailKeyWrapV1";

/// Argon2id cost parameters.
///
/// Persisted next to the encrypted private key. Changing the defaults does
/// not affect identities created earlier as long as their parameters are
/// stored with them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KdfParams {
    /// Memory cost in KiB.
    pub memory_kib: u32,
    /// Number of passes.
    pub iterations: u32,
    /// Degree of parallelism.
    pub parallelism: u32,
}

impl Default for KdfParams {
    /// 64 MiB, 3 passes, 4 lanes.
    fn default() -> Self {
        Self { memory_kib: 64 * 1024, iterations: 3, parallelism: 4 }
    }
}

/// A password-derived key and the salt it was derived with.
#[derive(Debug)]
pub struct DerivedKey {
    /// Derived 32-byte key.
    pub key: SymmetricKey,
    /// Salt to persist for re-derivation.
    pub salt: [u8; SALT_SIZE],
}

/// Derive a key from `password`.
///
/// With `salt = None` a fresh random salt is drawn from `rng`. The same
/// password, salt and parameters always produce the same key.
///
/// # Errors
///
/// - `ProviderFailure`: parameters rejected by Argon2 or RNG failure
pub fn derive_key_from_password(
    password: &[u8],
    salt: Option<[u8; SALT_SIZE]>,
    params: &KdfParams,
    rng: &mut impl CryptoRngCore,
) -> Result<DerivedKey, CryptoError> {
    let salt = match salt {
        Some(salt) => salt,
        None => {
            let mut salt = [0u8; SALT_SIZE];
            rng.try_fill_bytes(&mut salt).map_err(|_| CryptoError::ProviderFailure)?;
            salt
        },
    };

    let key = derive_with_salt(password, &salt, params)?;
    Ok(DerivedKey { key, salt })
}

/// Re-derive the key for a known salt.
///
/// Used at unlock time, when the salt was persisted alongside the encrypted
/// private key.
pub fn derive_with_salt(
    password: &[u8],
    salt: &[u8; SALT_SIZE],
    params: &KdfParams,
) -> Result<SymmetricKey, CryptoError> {
    let argon_params = Params::new(
        params.memory_kib,
        params.iterations,
        params.parallelism,
        Some(SYMMETRIC_KEY_SIZE),
    )
    .map_err(|_| CryptoError::ProviderFailure)?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon_params);

    let mut stretched = Zeroizing::new([0u8; SYMMETRIC_KEY_SIZE]);
    argon2
        .hash_password_into(password, salt, &mut *stretched)
        .map_err(|_| CryptoError::ProviderFailure)?;

    let hkdf = Hkdf::<Sha256>::new(Some(salt), &*stretched);
    let mut key = [0u8; SYMMETRIC_KEY_SIZE];
    let Ok(()) = hkdf.expand(WRAP_KEY_LABEL, &mut key) else {
        unreachable!("32 bytes is a valid HKDF-SHA256 output length");
    };

    Ok(SymmetricKey::from_bytes(key))
}

#[cfg(test)]
mod tests {
    use rand_chacha::{ChaCha20Rng, rand_core::SeedableRng};

    use super::*;

    const FAST: KdfParams = KdfParams { memory_kib: 8, iterations: 1, parallelism: 1 };

    #[test]
    fn same_password_and_salt_is_deterministic() {
        let mut rng = ChaCha20Rng::seed_from_u64(0);

        let first = derive_key_from_password(b"hunter2", None, &FAST, &mut rng).unwrap();
        let second =
            derive_key_from_password(b"hunter2", Some(first.salt), &FAST, &mut rng).unwrap();

        assert_eq!(first.key.as_bytes(), second.key.as_bytes());
    }

    #[test]
    fn omitted_salt_is_fresh() {
        let mut rng = ChaCha20Rng::seed_from_u64(1);

        let first = derive_key_from_password(b"hunter2", None, &FAST, &mut rng).unwrap();
        let second = derive_key_from_password(b"hunter2", None, &FAST, &mut rng).unwrap();

        assert_ne!(first.salt, second.salt);
        assert_ne!(first.key.as_bytes(), second.key.as_bytes());
    }

    #[test]
    fn different_password_differs() {
        let mut rng = ChaCha20Rng::seed_from_u64(2);
        let salt = [9u8; SALT_SIZE];

        let first = derive_key_from_password(b"hunter2", Some(salt), &FAST, &mut rng).unwrap();
        let second = derive_key_from_password(b"hunter3", Some(salt), &FAST, &mut rng).unwrap();

        assert_ne!(first.key.as_bytes(), second.key.as_bytes());
    }

    #[test]
    fn rederive_matches_original() {
        let mut rng = ChaCha20Rng::seed_from_u64(5);

        let derived = derive_key_from_password(b"pw", None, &FAST, &mut rng).unwrap();
        let again = derive_with_salt(b"pw", &derived.salt, &FAST).unwrap();

        assert_eq!(derived.key.as_bytes(), again.as_bytes());
    }

    #[test]
    fn empty_password_is_allowed() {
        let mut rng = ChaCha20Rng::seed_from_u64(3);
        assert!(derive_key_from_password(b"", None, &FAST, &mut rng).is_ok());
    }

    #[test]
    fn invalid_params_rejected() {
        let mut rng = ChaCha20Rng::seed_from_u64(4);
        let params = KdfParams { memory_kib: 1, iterations: 0, parallelism: 1 };

        assert_eq!(
            derive_key_from_password(b"pw", None, &params, &mut rng).unwrap_err(),
            CryptoError::ProviderFailure
        );
    }
}
