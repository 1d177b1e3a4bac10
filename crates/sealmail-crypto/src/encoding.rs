//! Byte and text conversions.
//!
//! Every binary field that crosses the wire (ciphertexts, nonces, signatures,
//! wrapped keys, public keys) uses standard padded base64. Encoding is total.
//! Decoding untrusted text can fail and reports [`EncodingError`].

use base64::{Engine, engine::general_purpose::STANDARD};
use thiserror::Error;

/// Errors from decoding untrusted text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodingError {
    /// Input was not valid base64.
    #[error("invalid base64")]
    InvalidBase64,

    /// Bytes were not valid UTF-8.
    #[error("invalid utf-8")]
    InvalidUtf8,
}

/// UTF-8 text to bytes.
pub fn utf8_to_bytes(text: &str) -> Vec<u8> {
    text.as_bytes().to_vec()
}

/// Bytes to UTF-8 text.
pub fn bytes_to_utf8(bytes: &[u8]) -> Result<String, EncodingError> {
    String::from_utf8(bytes.to_vec()).map_err(|_| EncodingError::InvalidUtf8)
}

/// Bytes to base64 text.
pub fn bytes_to_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Base64 text to bytes.
pub fn base64_to_bytes(text: &str) -> Result<Vec<u8>, EncodingError> {
    STANDARD.decode(text).map_err(|_| EncodingError::InvalidBase64)
}

/// Serde adapter storing `Vec<u8>` fields as base64 strings.
///
/// Use with `#[serde(with = "sealmail_crypto::encoding::base64_bytes")]`.
pub mod base64_bytes {
    use serde::{Deserialize, Deserializer, Serializer, de::Error as _};

    /// Serialize bytes as a base64 string.
    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::bytes_to_base64(bytes))
    }

    /// Deserialize bytes from a base64 string.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        super::base64_to_bytes(&text).map_err(D::Error::custom)
    }
}

/// Serde adapter storing fixed-size arrays as base64 strings.
pub mod base64_array {
    use serde::{Deserialize, Deserializer, Serializer, de::Error as _};

    /// Serialize a fixed-size array as a base64 string.
    pub fn serialize<S: Serializer, const N: usize>(
        bytes: &[u8; N],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::bytes_to_base64(bytes))
    }

    /// Deserialize a fixed-size array, rejecting any other length.
    pub fn deserialize<'de, D: Deserializer<'de>, const N: usize>(
        deserializer: D,
    ) -> Result<[u8; N], D::Error> {
        let text = String::deserialize(deserializer)?;
        let bytes = super::base64_to_bytes(&text).map_err(D::Error::custom)?;
        let len = bytes.len();
        bytes
            .try_into()
            .map_err(|_| D::Error::custom(format!("expected {N} bytes, got {len}")))
    }
}
