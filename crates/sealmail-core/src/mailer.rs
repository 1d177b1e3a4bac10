//! Owned context tying the components together for one user.
//!
//! A [`Mailer`] holds the environment, the configuration and the key
//! directory. It owns no secrets: unlocked keys live in the caller's
//! [`KeySession`] and are borrowed per operation.
//!
//! Send path: validate and resolve, seal, deliver. Receive path: fetch, look
//! up the sender's key, verify, open.

use sealmail_crypto::{CryptoError, EncryptedPrivateKey, KeySession, NewIdentity, PublicKey};
use sealmail_proto::{Draft, EncryptedMessage, OpenedMessage};
use tokio_util::sync::CancellationToken;
use zeroize::Zeroizing;

use crate::{
    address,
    config::ProtocolConfig,
    directory::KeyDirectory,
    env::Environment,
    error::{DirectoryError, LookupWarning, MailerError},
    protocol::{MessageProtocol, verify_sender},
    resolver::{RecipientResolver, ValidationReport},
    transport::Transport,
    validator::DraftValidator,
};

/// A sealed message plus the recipients left out of it.
#[derive(Debug, Clone)]
pub struct SealOutcome {
    /// The sealed message.
    pub message: EncryptedMessage,
    /// Recipients without a key; they did not receive an encrypted copy.
    pub warnings: Vec<LookupWarning>,
}

/// Per-user protocol context.
#[derive(Debug)]
pub struct Mailer<E, D> {
    env: E,
    config: ProtocolConfig,
    resolver: RecipientResolver<D>,
    protocol: MessageProtocol<E>,
}

impl<E: Environment, D: KeyDirectory> Mailer<E, D> {
    /// Mailer resolving recipients through `directory`.
    pub fn new(env: E, directory: D, config: ProtocolConfig) -> Self {
        let validator = DraftValidator::new(config.limits);
        Self {
            resolver: RecipientResolver::new(directory, validator, config.lookup_timeout),
            protocol: MessageProtocol::new(env.clone()),
            env,
            config,
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &ProtocolConfig {
        &self.config
    }

    /// Key directory used for recipients and senders.
    pub fn directory(&self) -> &D {
        self.resolver.directory()
    }

    /// Underlying seal/open protocol.
    pub fn protocol(&self) -> &MessageProtocol<E> {
        &self.protocol
    }

    /// Generate a key pair protected by `password`.
    ///
    /// Returns the blob to persist and a session already holding the
    /// unlocked key. Key generation and derivation run on the blocking pool.
    pub async fn create_identity(
        &self,
        password: &[u8],
    ) -> Result<(EncryptedPrivateKey, KeySession), MailerError> {
        let manager = self.config.key_manager();
        let password = Zeroizing::new(password.to_vec());
        let mut rng = self.env.rng();

        let NewIdentity { key_pair, encrypted, .. } =
            run_blocking(move || manager.create_identity(&password, &mut rng)).await?;

        tracing::info!(rsa_bits = self.config.rsa_bits, "Created identity");
        Ok((encrypted, KeySession::new(key_pair)))
    }

    /// Unlock a persisted identity for this session.
    pub async fn unlock(
        &self,
        password: &[u8],
        encrypted: &EncryptedPrivateKey,
    ) -> Result<KeySession, MailerError> {
        let manager = self.config.key_manager();
        let password = Zeroizing::new(password.to_vec());
        let encrypted = encrypted.clone();

        let key_pair = run_blocking(move || manager.unlock(&password, &encrypted)).await?;

        tracing::debug!("Unlocked identity");
        Ok(KeySession::new(key_pair))
    }

    /// Re-wrap a persisted identity under a new password.
    pub async fn change_password(
        &self,
        old_password: &[u8],
        new_password: &[u8],
        encrypted: &EncryptedPrivateKey,
    ) -> Result<EncryptedPrivateKey, MailerError> {
        let manager = self.config.key_manager();
        let old_password = Zeroizing::new(old_password.to_vec());
        let new_password = Zeroizing::new(new_password.to_vec());
        let encrypted = encrypted.clone();
        let mut rng = self.env.rng();

        let rewrapped = run_blocking(move || {
            manager.change_password(&old_password, &new_password, &encrypted, &mut rng)
        })
        .await?;

        tracing::info!("Changed identity password");
        Ok(rewrapped)
    }

    /// Validate `draft` and resolve its recipients.
    pub async fn validate(&self, draft: &Draft) -> ValidationReport {
        self.resolver.resolve(draft).await
    }

    /// Validate, resolve and seal `draft` as `sender`.
    ///
    /// The draft's `encrypt` flag is informational; every message is sealed.
    ///
    /// # Errors
    ///
    /// - `Invalid`: the draft has hard errors; nothing was encrypted
    /// - `Protocol(Validation(NoKeyedRecipients))`: no recipient has a key;
    ///   refused before any encryption
    /// - `Protocol`: sealing failed or was cancelled
    pub async fn seal(
        &self,
        draft: &Draft,
        sender: &str,
        session: &KeySession,
        cancel: &CancellationToken,
    ) -> Result<SealOutcome, MailerError> {
        if !draft.encrypt {
            tracing::debug!("Draft did not request encryption; sealing anyway");
        }

        let report = self.validate(draft).await;
        if !report.is_valid() {
            return Err(MailerError::Invalid(report.errors));
        }

        for warning in &report.warnings {
            tracing::warn!(
                address = %warning.address,
                reason = %warning.reason,
                "Recipient will not receive an encrypted copy"
            );
        }

        let message = self.protocol.seal(draft, &report.recipients, sender, session, cancel).await?;
        Ok(SealOutcome { message, warnings: report.warnings })
    }

    /// Seal `draft` and hand it to `transport`.
    pub async fn send(
        &self,
        draft: &Draft,
        sender: &str,
        session: &KeySession,
        transport: &dyn Transport,
        cancel: &CancellationToken,
    ) -> Result<SealOutcome, MailerError> {
        let outcome = self.seal(draft, sender, session, cancel).await?;
        transport.deliver(&outcome.message).await?;

        tracing::info!(message_id = %outcome.message.id, "Message sent");
        Ok(outcome)
    }

    /// Fetch message `id` from `transport` and open it as `recipient`.
    ///
    /// The sender's key comes from the directory, keyed by the message's
    /// `senderId`.
    pub async fn receive(
        &self,
        id: &str,
        recipient: &str,
        session: &KeySession,
        transport: &dyn Transport,
    ) -> Result<OpenedMessage, MailerError> {
        let message = transport.fetch(id).await?.ok_or_else(|| MailerError::NotFound(id.into()))?;
        self.open(&message, recipient, session).await
    }

    /// Verify and open `message` as `recipient`.
    pub async fn open(
        &self,
        message: &EncryptedMessage,
        recipient: &str,
        session: &KeySession,
    ) -> Result<OpenedMessage, MailerError> {
        let sender_key = self.sender_key(&message.metadata.sender_id).await?;
        Ok(self.protocol.open(message, recipient, session, &sender_key).await?)
    }

    /// Check the sender signature on `message` without decrypting.
    pub async fn verify(&self, message: &EncryptedMessage) -> Result<(), MailerError> {
        let sender_key = self.sender_key(&message.metadata.sender_id).await?;
        Ok(verify_sender(message, &sender_key)?)
    }

    async fn sender_key(&self, sender: &str) -> Result<PublicKey, MailerError> {
        let sender = address::normalize(sender);
        let outcome =
            tokio::time::timeout(self.config.lookup_timeout, self.directory().lookup(&sender))
                .await;

        match outcome {
            Ok(Ok(Some(key))) => Ok(key),
            Ok(Ok(None)) => Err(MailerError::UnknownSender(sender)),
            Ok(Err(e)) => Err(e.into()),
            Err(_) => {
                let reason = format!("lookup for {sender} timed out");
                Err(DirectoryError::Unavailable(reason).into())
            },
        }
    }
}

/// Run CPU-heavy key work (RSA generation, Argon2) on the blocking pool.
async fn run_blocking<T, F>(task: F) -> Result<T, MailerError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, CryptoError> + Send + 'static,
{
    let result = tokio::task::spawn_blocking(task).await.map_err(|_| MailerError::TaskFailed)?;
    Ok(result?)
}
