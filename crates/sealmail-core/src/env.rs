//! Environment abstraction for deterministic testing.
//!
//! Decouples sealing from system resources (wall clock, randomness). Tests
//! run with a seeded RNG and a fixed clock; production uses the OS RNG and
//! system time (see [`crate::SystemEnv`]).

use sealmail_crypto::{CryptoError, CryptoRngCore};

/// Abstract environment providing time and randomness.
///
/// # Invariants
///
/// Implementations MUST guarantee:
///
/// - Every RNG returned by [`rng`](Self::rng) is cryptographically secure in
///   production
/// - Two calls to [`rng`](Self::rng) never yield the same stream
pub trait Environment: Clone + Send + Sync + 'static {
    /// RNG handed to primitives for one operation.
    ///
    /// `'static` so it can move onto the blocking pool together with the
    /// work that consumes it.
    type Rng: CryptoRngCore + Send + 'static;

    /// Fresh RNG for one operation.
    fn rng(&self) -> Self::Rng;

    /// Seconds since the Unix epoch.
    fn wall_clock_secs(&self) -> u64;
}

/// Random 128-bit identifier as 32 lowercase hex digits.
///
/// # Errors
///
/// - `ProviderFailure`: the RNG failed
pub fn random_id(rng: &mut impl CryptoRngCore) -> Result<String, CryptoError> {
    let mut bytes = [0u8; 16];
    rand::RngCore::try_fill_bytes(rng, &mut bytes).map_err(|_| CryptoError::ProviderFailure)?;
    Ok(format!("{:032x}", u128::from_be_bytes(bytes)))
}

#[cfg(test)]
mod tests {
    use rand_chacha::{ChaCha20Rng, rand_core::SeedableRng};

    use super::*;

    #[test]
    fn random_id_is_32_hex_digits() {
        let mut rng = ChaCha20Rng::seed_from_u64(1);

        let id = random_id(&mut rng).unwrap();

        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn random_ids_differ() {
        let mut rng = ChaCha20Rng::seed_from_u64(1);

        assert_ne!(random_id(&mut rng).unwrap(), random_id(&mut rng).unwrap());
    }
}
