//! RSA key pairs and OAEP key wrapping.
//!
//! The asymmetric scheme only ever wraps the 32-byte per-message key. Bulk
//! data goes through [`crate::aead`]. Plaintext is bounded by the modulus:
//! `modulus_bytes - 2 * 32 - 2` for OAEP with SHA-256.

use rand_core::CryptoRngCore;
use rsa::{
    Oaep, RsaPrivateKey, RsaPublicKey,
    pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey},
    traits::PublicKeyParts,
};
use serde::{Deserialize, Deserializer, Serialize, Serializer, de::Error as _};
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::{encoding, error::CryptoError};

/// Default modulus size in bits.
pub const DEFAULT_RSA_BITS: usize = 2048;

/// Smallest modulus accepted for new key pairs.
pub const MIN_RSA_BITS: usize = 1024;

/// SHA-256 output size, used for the OAEP bound.
const HASH_SIZE: usize = 32;

/// A recipient's or sender's public key.
#[derive(Clone, PartialEq, Eq)]
pub struct PublicKey(RsaPublicKey);

impl PublicKey {
    /// Encode as SPKI DER.
    pub fn to_der(&self) -> Result<Vec<u8>, CryptoError> {
        self.0
            .to_public_key_der()
            .map(|doc| doc.as_bytes().to_vec())
            .map_err(|_| CryptoError::MalformedKey)
    }

    /// Decode from SPKI DER.
    pub fn from_der(der: &[u8]) -> Result<Self, CryptoError> {
        RsaPublicKey::from_public_key_der(der).map(Self).map_err(|_| CryptoError::MalformedKey)
    }

    /// Encode as base64 of the SPKI DER (the wire form).
    pub fn to_base64(&self) -> Result<String, CryptoError> {
        Ok(encoding::bytes_to_base64(&self.to_der()?))
    }

    /// Decode from base64 SPKI DER.
    pub fn from_base64(text: &str) -> Result<Self, CryptoError> {
        let der = encoding::base64_to_bytes(text).map_err(|_| CryptoError::MalformedKey)?;
        Self::from_der(&der)
    }

    /// Modulus size in bytes.
    pub fn size(&self) -> usize {
        self.0.size()
    }

    /// Largest plaintext [`asymmetric_encrypt`] accepts for this key.
    pub fn max_plaintext_len(&self) -> usize {
        self.size().saturating_sub(2 * HASH_SIZE + 2)
    }

    pub(crate) fn inner(&self) -> &RsaPublicKey {
        &self.0
    }
}

impl std::fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PublicKey").field("bits", &(self.size() * 8)).finish()
    }
}

impl Serialize for PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let text = self.to_base64().map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&text)
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::from_base64(&text).map_err(D::Error::custom)
    }
}

/// A private key. Never serialized in the clear.
///
/// The underlying key zeroizes its limbs on drop.
pub struct PrivateKey(RsaPrivateKey);

impl PrivateKey {
    /// Encode as PKCS#8 DER. The buffer is zeroized when dropped.
    pub(crate) fn to_pkcs8_der(&self) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        self.0
            .to_pkcs8_der()
            .map(|doc| Zeroizing::new(doc.as_bytes().to_vec()))
            .map_err(|_| CryptoError::ProviderFailure)
    }

    /// Decode from PKCS#8 DER.
    pub(crate) fn from_pkcs8_der(der: &[u8]) -> Result<Self, CryptoError> {
        RsaPrivateKey::from_pkcs8_der(der).map(Self).map_err(|_| CryptoError::MalformedKey)
    }

    /// Public half of this key.
    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.0.to_public_key())
    }

    pub(crate) fn inner(&self) -> &RsaPrivateKey {
        &self.0
    }
}

impl std::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PrivateKey([REDACTED])")
    }
}

/// Long-term key pair used for both key unwrapping and signing.
#[derive(Debug)]
pub struct KeyPair {
    public: PublicKey,
    private: PrivateKey,
}

impl KeyPair {
    /// Assemble a key pair, checking that the halves match.
    pub fn from_parts(public: PublicKey, private: PrivateKey) -> Result<Self, CryptoError> {
        if private.public_key() != public {
            return Err(CryptoError::MalformedKey);
        }
        Ok(Self { public, private })
    }

    /// Public half.
    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }

    /// Private half.
    pub fn private_key(&self) -> &PrivateKey {
        &self.private
    }
}

/// Generate an RSA key pair with a `bits`-bit modulus.
///
/// # Errors
///
/// - `ProviderFailure`: `bits` below [`MIN_RSA_BITS`] or RNG failure
pub fn generate_asymmetric_keypair(
    rng: &mut impl CryptoRngCore,
    bits: usize,
) -> Result<KeyPair, CryptoError> {
    if bits < MIN_RSA_BITS {
        return Err(CryptoError::ProviderFailure);
    }

    let private = RsaPrivateKey::new(rng, bits).map_err(|_| CryptoError::ProviderFailure)?;
    let public = PublicKey(private.to_public_key());

    Ok(KeyPair { public, private: PrivateKey(private) })
}

/// Wrap a small secret under `public_key` using RSA-OAEP (SHA-256).
///
/// # Errors
///
/// - `ProviderFailure`: plaintext exceeds [`PublicKey::max_plaintext_len`]
pub fn asymmetric_encrypt(
    plaintext: &[u8],
    public_key: &PublicKey,
    rng: &mut impl CryptoRngCore,
) -> Result<Vec<u8>, CryptoError> {
    if plaintext.len() > public_key.max_plaintext_len() {
        return Err(CryptoError::ProviderFailure);
    }

    public_key
        .inner()
        .encrypt(rng, Oaep::new::<Sha256>(), plaintext)
        .map_err(|_| CryptoError::ProviderFailure)
}

/// Unwrap a secret produced by [`asymmetric_encrypt`].
///
/// # Errors
///
/// - `AuthenticationFailed`: wrong key or corrupted ciphertext
pub fn asymmetric_decrypt(
    ciphertext: &[u8],
    private_key: &PrivateKey,
) -> Result<Vec<u8>, CryptoError> {
    private_key
        .inner()
        .decrypt(Oaep::new::<Sha256>(), ciphertext)
        .map_err(|_| CryptoError::AuthenticationFailed)
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::OnceLock;

    use proptest::prelude::*;
    use rand_chacha::{
        ChaCha20Rng,
        rand_core::{RngCore, SeedableRng},
    };

    use super::*;

    /// Small keys keep unit tests fast. Shared across tests in this crate.
    pub(crate) fn test_keypair(index: usize) -> &'static KeyPair {
        static KEYS: OnceLock<Vec<KeyPair>> = OnceLock::new();
        &KEYS.get_or_init(|| {
            (0..2)
                .map(|i| {
                    let mut rng = ChaCha20Rng::seed_from_u64(1000 + i);
                    generate_asymmetric_keypair(&mut rng, MIN_RSA_BITS).unwrap()
                })
                .collect()
        })[index]
    }

    #[test]
    fn rejects_undersized_modulus() {
        let mut rng = ChaCha20Rng::seed_from_u64(0);
        assert_eq!(
            generate_asymmetric_keypair(&mut rng, 512).unwrap_err(),
            CryptoError::ProviderFailure
        );
    }

    #[test]
    fn wrong_private_key_fails() {
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        let wrapped = asymmetric_encrypt(&[7u8; 32], test_keypair(0).public_key(), &mut rng).unwrap();

        assert_eq!(
            asymmetric_decrypt(&wrapped, test_keypair(1).private_key()),
            Err(CryptoError::AuthenticationFailed)
        );
    }

    #[test]
    fn oversized_plaintext_rejected() {
        let mut rng = ChaCha20Rng::seed_from_u64(2);
        let public = test_keypair(0).public_key();
        let too_big = vec![0u8; public.max_plaintext_len() + 1];

        assert_eq!(
            asymmetric_encrypt(&too_big, public, &mut rng),
            Err(CryptoError::ProviderFailure)
        );
    }

    #[test]
    fn public_key_der_and_base64_roundtrip() {
        let public = test_keypair(0).public_key();

        assert_eq!(&PublicKey::from_der(&public.to_der().unwrap()).unwrap(), public);
        assert_eq!(&PublicKey::from_base64(&public.to_base64().unwrap()).unwrap(), public);
        assert_eq!(PublicKey::from_base64("AAAA").unwrap_err(), CryptoError::MalformedKey);
    }

    #[test]
    fn public_key_serde_is_base64_string() {
        let public = test_keypair(1).public_key();
        let json = serde_json::to_string(public).unwrap();

        assert!(json.starts_with('"'));
        assert_eq!(&serde_json::from_str::<PublicKey>(&json).unwrap(), public);
    }

    #[test]
    fn from_parts_rejects_mismatched_halves() {
        let public = test_keypair(0).public_key().clone();
        let der = test_keypair(1).private_key().to_pkcs8_der().unwrap();
        let private = PrivateKey::from_pkcs8_der(&der).unwrap();

        assert_eq!(KeyPair::from_parts(public, private).unwrap_err(), CryptoError::MalformedKey);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn prop_roundtrip_within_bound(len in 0usize..=62, seed in any::<u64>()) {
            let mut rng = ChaCha20Rng::seed_from_u64(seed);
            let keypair = test_keypair(0);
            let mut plaintext = vec![0u8; len];
            rng.fill_bytes(&mut plaintext);

            let wrapped = asymmetric_encrypt(&plaintext, keypair.public_key(), &mut rng).unwrap();
            let unwrapped = asymmetric_decrypt(&wrapped, keypair.private_key()).unwrap();

            prop_assert_eq!(unwrapped, plaintext);
        }
    }
}
