//! On-disk layout of a sealmail home directory.
//!
//! ```text
//! <home>/
//!   identity.json         address + password-protected private key
//!   directory/
//!     alice@example.com.pub   base64 SPKI public key, one file per address
//! ```
//!
//! The `directory/` folder stands in for a key server: every `.pub` file is
//! loaded into a [`MemoryDirectory`] at startup. It can live outside the home
//! so that several identities share one folder.

use std::path::{Path, PathBuf};

use sealmail_core::{MemoryDirectory, ProtocolConfig, address};
use sealmail_crypto::{EncryptedPrivateKey, PublicKey};
use serde::{Deserialize, Serialize};
use tokio::{fs, io::AsyncWriteExt};

use crate::error::CliError;

const IDENTITY_FILE: &str = "identity.json";
const DIRECTORY_DIR: &str = "directory";
const PUBLIC_KEY_EXT: &str = "pub";

/// A persisted identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityFile {
    /// Address the identity sends as.
    pub address: String,
    /// Private key wrapped under the user's password.
    pub key: EncryptedPrivateKey,
}

/// Paths under one home directory.
#[derive(Debug, Clone)]
pub struct Home {
    root: PathBuf,
    directory: PathBuf,
}

impl Home {
    /// Home rooted at `root`. Nothing is created until something is written.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self { directory: root.join(DIRECTORY_DIR), root }
    }

    /// Use `directory` for public keys instead of `<home>/directory`, e.g. a
    /// folder shared between several homes.
    #[must_use]
    pub fn with_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.directory = directory.into();
        self
    }

    /// Location of `identity.json`.
    pub fn identity_path(&self) -> PathBuf {
        self.root.join(IDENTITY_FILE)
    }

    /// Location of the public key folder.
    pub fn directory_path(&self) -> &Path {
        &self.directory
    }

    /// Read the persisted identity.
    pub async fn load_identity(&self) -> Result<IdentityFile, CliError> {
        let path = self.identity_path();
        match fs::read_to_string(&path).await {
            Ok(json) => serde_json::from_str(&json).map_err(|e| CliError::json(&path, e)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(CliError::NoIdentity(path)),
            Err(e) => Err(CliError::io(path, e)),
        }
    }

    /// Write `identity.json` for the first time.
    ///
    /// Fails with `IdentityExists` rather than replacing a key.
    pub async fn create_identity(&self, identity: &IdentityFile) -> Result<(), CliError> {
        fs::create_dir_all(&self.root).await.map_err(|e| CliError::io(&self.root, e))?;

        let path = self.identity_path();
        let json = encode(identity, &path)?;
        let mut file = match fs::OpenOptions::new().write(true).create_new(true).open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(CliError::IdentityExists(path));
            },
            Err(e) => return Err(CliError::io(path, e)),
        };

        file.write_all(json.as_bytes()).await.map_err(|e| CliError::io(&path, e))?;
        file.flush().await.map_err(|e| CliError::io(&path, e))
    }

    /// Replace an existing `identity.json`.
    pub async fn replace_identity(&self, identity: &IdentityFile) -> Result<(), CliError> {
        let path = self.identity_path();
        let json = encode(identity, &path)?;
        fs::write(&path, json).await.map_err(|e| CliError::io(path, e))
    }

    /// Write `key` as the published key for `address`.
    pub async fn publish(&self, address: &str, key: &PublicKey) -> Result<PathBuf, CliError> {
        let dir = self.directory_path();
        fs::create_dir_all(dir).await.map_err(|e| CliError::io(dir, e))?;

        let path = dir.join(format!("{}.{PUBLIC_KEY_EXT}", address::normalize(address)));
        fs::write(&path, key.to_base64()?).await.map_err(|e| CliError::io(&path, e))?;
        Ok(path)
    }

    /// Load every `.pub` file into a directory.
    ///
    /// A missing folder yields an empty directory. Files that do not hold a
    /// valid key are skipped with a warning.
    pub async fn load_directory(&self) -> Result<MemoryDirectory, CliError> {
        let directory = MemoryDirectory::new();
        let dir = self.directory_path();

        let mut entries = match fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(directory),
            Err(e) => return Err(CliError::io(dir, e)),
        };

        while let Some(entry) = entries.next_entry().await.map_err(|e| CliError::io(dir, e))? {
            let path = entry.path();
            let Some(address) = published_address(&path) else {
                continue;
            };

            let text = fs::read_to_string(&path).await.map_err(|e| CliError::io(&path, e))?;
            match PublicKey::from_base64(text.trim()) {
                Ok(key) => directory.publish(&address, key)?,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable key");
                },
            }
        }

        tracing::debug!(keys = directory.len(), "Loaded key directory");
        Ok(directory)
    }
}

/// Read a [`ProtocolConfig`] from `path`, or the defaults if there is none.
pub async fn load_config(path: Option<&Path>) -> Result<ProtocolConfig, CliError> {
    let Some(path) = path else {
        return Ok(ProtocolConfig::default());
    };

    let json = fs::read_to_string(path).await.map_err(|e| CliError::io(path, e))?;
    ProtocolConfig::from_json(&json).map_err(|e| CliError::json(path, e))
}

/// Address a `<address>.pub` file publishes a key for.
fn published_address(path: &Path) -> Option<String> {
    if path.extension()? != PUBLIC_KEY_EXT {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    address::is_valid_address(stem).then(|| address::normalize(stem))
}

fn encode(identity: &IdentityFile, path: &Path) -> Result<String, CliError> {
    serde_json::to_string_pretty(identity).map_err(|e| CliError::json(path, e))
}
