//! Hybrid message sealing and opening.
//!
//! # Seal
//!
//! 1. Generate a fresh per-message key `K`
//! 2. Encrypt subject and body under `K`, each with its own nonce
//! 3. Encrypt every attachment's name and content as two independent
//!    ciphertexts
//! 4. Wrap `K` under each keyed recipient's public key, then destroy `K`
//! 5. Sign the ciphertext transcript with the sender's private key
//!
//! # Open
//!
//! 1. Verify the signature against the claimed sender key; on failure
//!    nothing is decrypted
//! 2. Unwrap this recipient's copy of `K`
//! 3. Decrypt every field; any failure aborts the whole open
//!
//! # Invariants
//!
//! - `K` is never reused, never cached and zeroized when sealing ends, however
//!   it ends (success, failure, cancellation, or the future being dropped)
//! - No partial plaintext is ever returned

use std::collections::BTreeMap;

use sealmail_crypto::{
    CryptoError, KeySession, PublicKey, Sealed, SymmetricKey, aead_decrypt, aead_encrypt,
    asymmetric_decrypt, asymmetric_encrypt, encoding::bytes_to_utf8, generate_symmetric_key, sign,
    verify,
};
use sealmail_proto::{
    Draft, EncryptedAttachment, EncryptedMessage, MessageMetadata, OpenedAttachment,
    OpenedMessage, WIRE_VERSION, WireError, WrappedKey, signature_transcript,
};
use tokio_util::sync::CancellationToken;
use zeroize::Zeroizing;

use crate::{
    address,
    env::{Environment, random_id},
    error::{ProtocolError, ValidationError},
    resolver::Recipient,
};

/// Seals drafts into [`EncryptedMessage`]s and opens them again.
#[derive(Debug, Clone)]
pub struct MessageProtocol<E> {
    env: E,
}

impl<E: Environment> MessageProtocol<E> {
    /// Protocol drawing time and randomness from `env`.
    pub fn new(env: E) -> Self {
        Self { env }
    }

    /// Encrypt `draft` for every recipient in `recipients` that has a key.
    ///
    /// Recipients without a key are skipped; they were already reported as
    /// warnings during resolution. `cancel` is checked between steps.
    ///
    /// # Errors
    ///
    /// - `Validation(NoKeyedRecipients)`: nobody to encrypt for; no crypto
    ///   work was done
    /// - `Seal`: any primitive failure, including a locked key session
    /// - `Cancelled`: `cancel` fired before sealing finished
    pub async fn seal(
        &self,
        draft: &Draft,
        recipients: &[Recipient],
        sender: &str,
        session: &KeySession,
        cancel: &CancellationToken,
    ) -> Result<EncryptedMessage, ProtocolError> {
        let keyed: Vec<(String, &PublicKey)> = recipients
            .iter()
            .filter_map(|r| r.public_key.as_ref().map(|key| (address::normalize(&r.address), key)))
            .collect();
        if keyed.is_empty() {
            return Err(ValidationError::NoKeyedRecipients.into());
        }

        checkpoint(cancel).await?;
        let identity = session.acquire().await.map_err(ProtocolError::Seal)?;
        let mut rng = self.env.rng();

        let id = random_id(&mut rng).map_err(ProtocolError::Seal)?;
        let message_key = generate_symmetric_key(&mut rng).map_err(ProtocolError::Seal)?;

        let encrypted_subject = aead_encrypt(draft.subject.as_bytes(), &message_key, &mut rng)
            .map_err(ProtocolError::Seal)?;
        let encrypted_body = aead_encrypt(draft.body.as_bytes(), &message_key, &mut rng)
            .map_err(ProtocolError::Seal)?;

        let mut attachments = Vec::with_capacity(draft.attachments.len());
        for attachment in &draft.attachments {
            checkpoint(cancel).await?;
            attachments.push(EncryptedAttachment {
                id: random_id(&mut rng).map_err(ProtocolError::Seal)?,
                encrypted_name: aead_encrypt(attachment.name.as_bytes(), &message_key, &mut rng)
                    .map_err(ProtocolError::Seal)?,
                encrypted_content: aead_encrypt(&attachment.content, &message_key, &mut rng)
                    .map_err(ProtocolError::Seal)?,
                size: attachment.content.len() as u64,
                mime_type: attachment.mime_type.clone(),
            });
        }

        let mut recipient_keys = BTreeMap::new();
        for (address, public_key) in keyed {
            checkpoint(cancel).await?;
            let wrapped = asymmetric_encrypt(message_key.as_bytes(), public_key, &mut rng)
                .map_err(ProtocolError::Seal)?;
            recipient_keys.insert(address, WrappedKey(wrapped));
        }
        drop(message_key);

        let size = draft
            .attachments
            .iter()
            .map(|attachment| attachment.content.len() as u64)
            .fold(draft.subject.len() as u64 + draft.body.len() as u64, u64::saturating_add);

        let mut message = EncryptedMessage {
            version: WIRE_VERSION,
            id,
            encrypted_subject,
            encrypted_body,
            metadata: MessageMetadata {
                sender_id: address::normalize(sender),
                recipient_ids: recipient_keys.keys().cloned().collect(),
                timestamp: self.env.wall_clock_secs(),
                size,
                attachment_count: attachments.len() as u32,
                is_read: false,
            },
            attachments,
            signature: Vec::new(),
            recipient_keys,
        };

        checkpoint(cancel).await?;
        let transcript = signature_transcript(&message);
        message.signature =
            sign(&transcript, identity.private_key(), &mut rng).map_err(ProtocolError::Seal)?;

        tracing::debug!(
            message_id = %message.id,
            recipients = message.recipient_keys.len(),
            attachments = message.attachments.len(),
            size,
            "Sealed message"
        );

        Ok(message)
    }

    /// Verify and decrypt `message` as `recipient`.
    ///
    /// # Errors
    ///
    /// - `Wire`: message is structurally inconsistent or a field is not
    ///   valid UTF-8
    /// - `Crypto(SignatureInvalid)`: signature does not match `sender_key`;
    ///   nothing was decrypted
    /// - `Crypto(NotARecipient)`: no wrapped key for `recipient`
    /// - `Crypto(KeyLocked)`: `session` was locked
    /// - `Crypto(AuthenticationFailed)`: a ciphertext or wrapped key was
    ///   tampered with
    pub async fn open(
        &self,
        message: &EncryptedMessage,
        recipient: &str,
        session: &KeySession,
        sender_key: &PublicKey,
    ) -> Result<OpenedMessage, ProtocolError> {
        message.check_structure()?;
        verify_sender(message, sender_key)?;

        let recipient = address::normalize(recipient);
        let wrapped = message.recipient_keys.get(&recipient).ok_or(CryptoError::NotARecipient)?;

        let message_key = {
            let identity = session.acquire().await?;
            let raw = Zeroizing::new(asymmetric_decrypt(&wrapped.0, identity.private_key())?);
            SymmetricKey::from_slice(&raw).map_err(|_| CryptoError::AuthenticationFailed)?
        };

        let subject = open_text(&message.encrypted_subject, &message_key)?;
        let body = open_text(&message.encrypted_body, &message_key)?;

        let mut attachments = Vec::with_capacity(message.attachments.len());
        for attachment in &message.attachments {
            let name = open_text(&attachment.encrypted_name, &message_key)?;
            let content = open_bytes(&attachment.encrypted_content, &message_key)?;
            if content.len() as u64 != attachment.size {
                return Err(WireError::Inconsistent("attachment size mismatch").into());
            }

            attachments.push(OpenedAttachment {
                id: attachment.id.clone(),
                name,
                content,
                size: attachment.size,
                mime_type: attachment.mime_type.clone(),
            });
        }

        tracing::debug!(message_id = %message.id, "Opened message");

        Ok(OpenedMessage {
            id: message.id.clone(),
            sender: message.metadata.sender_id.clone(),
            recipients: message.metadata.recipient_ids.clone(),
            timestamp: message.metadata.timestamp,
            subject,
            body,
            attachments,
        })
    }
}

/// Check that `message` was signed by the holder of `sender_key`.
///
/// Needs no private key and decrypts nothing, so relays and indexers can
/// call it.
///
/// # Errors
///
/// - `Crypto(SignatureInvalid)`: any mismatch
pub fn verify_sender(
    message: &EncryptedMessage,
    sender_key: &PublicKey,
) -> Result<(), ProtocolError> {
    let transcript = signature_transcript(message);
    if verify(&message.signature, &transcript, sender_key) {
        Ok(())
    } else {
        tracing::warn!(message_id = %message.id, "Signature verification failed");
        Err(CryptoError::SignatureInvalid.into())
    }
}

/// Yield to the scheduler, then stop if cancelled.
async fn checkpoint(cancel: &CancellationToken) -> Result<(), ProtocolError> {
    tokio::task::yield_now().await;
    if cancel.is_cancelled() {
        tracing::debug!("Seal cancelled");
        return Err(ProtocolError::Cancelled);
    }
    Ok(())
}

fn open_bytes(sealed: &Sealed, key: &SymmetricKey) -> Result<Vec<u8>, CryptoError> {
    aead_decrypt(&sealed.ciphertext, key, &sealed.nonce)
}

fn open_text(sealed: &Sealed, key: &SymmetricKey) -> Result<String, ProtocolError> {
    let bytes = open_bytes(sealed, key)?;
    bytes_to_utf8(&bytes).map_err(|e| WireError::Malformed(e.to_string()).into())
}
