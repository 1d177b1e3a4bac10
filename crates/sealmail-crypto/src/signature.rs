//! RSA-PSS signatures over SHA-256.
//!
//! Signatures cover ciphertext, never plaintext, so a verifier can check
//! sender authenticity without decrypting anything.

use rand_core::CryptoRngCore;
use rsa::Pss;
use sha2::{Digest, Sha256};

use crate::{
    asymmetric::{PrivateKey, PublicKey},
    error::CryptoError,
};

/// Sign `message` with `private_key`.
pub fn sign(
    message: &[u8],
    private_key: &PrivateKey,
    rng: &mut impl CryptoRngCore,
) -> Result<Vec<u8>, CryptoError> {
    let digest = Sha256::digest(message);
    private_key
        .inner()
        .sign_with_rng(rng, Pss::new::<Sha256>(), &digest)
        .map_err(|_| CryptoError::ProviderFailure)
}

/// Verify `signature` over `message` against `public_key`.
///
/// Returns `false` for any mismatch: wrong message, wrong key, truncated or
/// malformed signature.
pub fn verify(signature: &[u8], message: &[u8], public_key: &PublicKey) -> bool {
    let digest = Sha256::digest(message);
    public_key.inner().verify(Pss::new::<Sha256>(), &digest, signature).is_ok()
}
