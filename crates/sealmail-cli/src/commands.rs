//! The work behind each subcommand, independent of argument parsing.

use std::path::{Path, PathBuf};

use sealmail_core::{
    CancellationToken, Mailer, MemoryDirectory, ProtocolConfig, SealOutcome, SystemEnv, address,
};
use sealmail_crypto::KeySession;
use sealmail_proto::{Draft, EncryptedMessage, OpenedMessage};
use tokio::fs;

use crate::{
    error::CliError,
    home::{Home, IdentityFile},
};

/// A loaded home directory plus a mailer over its key folder.
#[derive(Debug)]
pub struct Context {
    home: Home,
    mailer: Mailer<SystemEnv, MemoryDirectory>,
}

impl Context {
    /// Load the key folder of `home` and build a mailer with `config`.
    pub async fn load(home: Home, config: ProtocolConfig) -> Result<Self, CliError> {
        let directory = home.load_directory().await?;
        Ok(Self { mailer: Mailer::new(SystemEnv, directory, config), home })
    }

    /// Create an identity for `address` and publish its public key.
    ///
    /// Returns the path of the published key file.
    pub async fn create_identity(
        &self,
        address: &str,
        password: &str,
    ) -> Result<PathBuf, CliError> {
        if !address::is_valid_address(address) {
            return Err(CliError::InvalidAddress(address.to_string()));
        }
        let address = address::normalize(address);

        let (key, session) = self.mailer.create_identity(password.as_bytes()).await?;
        session.lock().await;

        let public_key = key.public_key.clone();
        self.home.create_identity(&IdentityFile { address: address.clone(), key }).await?;
        self.mailer.directory().publish(&address, public_key.clone())?;
        let path = self.home.publish(&address, &public_key).await?;

        tracing::info!(%address, "Identity created");
        Ok(path)
    }

    /// Re-wrap the stored identity under `new_password`.
    pub async fn change_password(
        &self,
        password: &str,
        new_password: &str,
    ) -> Result<(), CliError> {
        let identity = self.home.load_identity().await?;
        let key = self
            .mailer
            .change_password(password.as_bytes(), new_password.as_bytes(), &identity.key)
            .await?;

        self.home.replace_identity(&IdentityFile { key, ..identity }).await
    }

    /// Base64 public key of the stored identity.
    pub async fn export_public_key(&self) -> Result<String, CliError> {
        let identity = self.home.load_identity().await?;
        Ok(identity.key.public_key.to_base64()?)
    }

    /// Seal the draft at `draft_path` as the stored identity.
    pub async fn seal(
        &self,
        draft_path: &Path,
        password: &str,
        cancel: &CancellationToken,
    ) -> Result<SealOutcome, CliError> {
        let json = read(draft_path).await?;
        let draft: Draft = serde_json::from_str(&json).map_err(|e| CliError::json(draft_path, e))?;

        let (identity, session) = self.unlock(password).await?;
        let outcome = self.mailer.seal(&draft, &identity.address, &session, cancel).await;
        session.lock().await;

        Ok(outcome?)
    }

    /// Verify and open the message at `message_path` as the stored identity.
    pub async fn open(
        &self,
        message_path: &Path,
        password: &str,
    ) -> Result<OpenedMessage, CliError> {
        let message = read_message(message_path).await?;

        let (identity, session) = self.unlock(password).await?;
        let opened = self.mailer.open(&message, &identity.address, &session).await;
        session.lock().await;

        Ok(opened?)
    }

    /// Check the sender signature on the message at `message_path`.
    ///
    /// Returns the verified sender address.
    pub async fn verify(&self, message_path: &Path) -> Result<String, CliError> {
        let message = read_message(message_path).await?;
        self.mailer.verify(&message).await?;
        Ok(message.metadata.sender_id)
    }

    async fn unlock(&self, password: &str) -> Result<(IdentityFile, KeySession), CliError> {
        let identity = self.home.load_identity().await?;
        let session = self.mailer.unlock(password.as_bytes(), &identity.key).await?;
        Ok((identity, session))
    }
}

async fn read(path: &Path) -> Result<String, CliError> {
    fs::read_to_string(path).await.map_err(|e| CliError::io(path, e))
}

async fn read_message(path: &Path) -> Result<EncryptedMessage, CliError> {
    Ok(EncryptedMessage::from_json(&read(path).await?)?)
}
