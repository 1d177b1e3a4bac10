//! Protocol configuration.
//!
//! Plain structs with `Default`. The CLI can also load them from JSON; any
//! field left out keeps its default.

use std::time::Duration;

use sealmail_crypto::{DEFAULT_RSA_BITS, KdfParams, KeyManager};
use serde::{Deserialize, Serialize};

/// Size limits checked before any encryption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DraftLimits {
    /// Largest single attachment, in bytes (inclusive).
    pub max_attachment_size: u64,
    /// Largest sum of attachment sizes, in bytes (inclusive).
    pub max_total_attachment_size: u64,
    /// Longest subject, in UTF-8 bytes (inclusive).
    pub max_subject_len: usize,
}

impl Default for DraftLimits {
    fn default() -> Self {
        Self {
            max_attachment_size: 25 * 1024 * 1024,
            max_total_attachment_size: 100 * 1024 * 1024,
            max_subject_len: 998,
        }
    }
}

/// Configuration for a [`crate::Mailer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProtocolConfig {
    /// Draft size limits.
    pub limits: DraftLimits,
    /// Password KDF cost for new identities and password changes.
    pub kdf: KdfParams,
    /// RSA modulus size for new identities.
    pub rsa_bits: usize,
    /// Deadline for each directory lookup.
    #[serde(rename = "lookupTimeoutMs", with = "millis")]
    pub lookup_timeout: Duration,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            limits: DraftLimits::default(),
            kdf: KdfParams::default(),
            rsa_bits: DEFAULT_RSA_BITS,
            lookup_timeout: Duration::from_secs(10),
        }
    }
}

impl ProtocolConfig {
    /// Parse from JSON, filling missing fields with defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Key manager using this configuration's KDF cost and key size.
    pub fn key_manager(&self) -> KeyManager {
        KeyManager::new(self.kdf, self.rsa_bits)
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
