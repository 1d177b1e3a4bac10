//! Canonical byte string covered by the sender signature.
//!
//! Layout: the label, then every item as a big-endian `u64` length followed
//! by its bytes, in this order:
//!
//! 1. message id
//! 2. sender id
//! 3. subject nonce, subject ciphertext
//! 4. body nonce, body ciphertext
//! 5. per attachment, in order: id, name nonce, name ciphertext, content
//!    nonce, content ciphertext
//! 6. per recipient key, in address order: address, wrapped key
//!
//! Length prefixes make the encoding injective: no two different messages
//! produce the same transcript. `isRead`, timestamp and size are left out
//! because they are mutable or derived.

use sealmail_crypto::Sealed;

use crate::message::EncryptedMessage;

/// Domain separation label.
const TRANSCRIPT_LABEL: &[u8] = b"sealmail-signature-v1";

/// Build the transcript for `message`. The `signature` field is ignored.
pub fn signature_transcript(message: &EncryptedMessage) -> Vec<u8> {
    let mut transcript = Transcript::new();

    transcript.push(message.id.as_bytes());
    transcript.push(message.metadata.sender_id.as_bytes());
    transcript.push_sealed(&message.encrypted_subject);
    transcript.push_sealed(&message.encrypted_body);

    for attachment in &message.attachments {
        transcript.push(attachment.id.as_bytes());
        transcript.push_sealed(&attachment.encrypted_name);
        transcript.push_sealed(&attachment.encrypted_content);
    }

    for (address, wrapped) in &message.recipient_keys {
        transcript.push(address.as_bytes());
        transcript.push(&wrapped.0);
    }

    transcript.finish()
}

struct Transcript {
    bytes: Vec<u8>,
}

impl Transcript {
    fn new() -> Self {
        let mut bytes = Vec::with_capacity(1024);
        bytes.extend_from_slice(TRANSCRIPT_LABEL);
        Self { bytes }
    }

    fn push(&mut self, item: &[u8]) {
        self.bytes.extend_from_slice(&(item.len() as u64).to_be_bytes());
        self.bytes.extend_from_slice(item);
    }

    fn push_sealed(&mut self, sealed: &Sealed) {
        self.push(&sealed.nonce);
        self.push(&sealed.ciphertext);
    }

    fn finish(self) -> Vec<u8> {
        self.bytes
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::message::{
        EncryptedAttachment, MessageMetadata, WIRE_VERSION, WrappedKey,
    };

    fn sealed(byte: u8, len: usize) -> Sealed {
        Sealed { ciphertext: vec![byte; len], nonce: [byte; 12] }
    }

    fn message() -> EncryptedMessage {
        let mut recipient_keys = BTreeMap::new();
        recipient_keys.insert("bob@example.com".to_string(), WrappedKey(vec![2; 8]));
        recipient_keys.insert("alice@example.com".to_string(), WrappedKey(vec![1; 8]));

        EncryptedMessage {
            version: WIRE_VERSION,
            id: "m1".into(),
            encrypted_subject: sealed(0xA0, 20),
            encrypted_body: sealed(0xB0, 30),
            attachments: vec![EncryptedAttachment {
                id: "a1".into(),
                encrypted_name: sealed(0xC0, 17),
                encrypted_content: sealed(0xD0, 40),
                size: 24,
                mime_type: "text/plain".into(),
            }],
            signature: Vec::new(),
            recipient_keys,
            metadata: MessageMetadata {
                sender_id: "carol@example.com".into(),
                recipient_ids: vec!["alice@example.com".into(), "bob@example.com".into()],
                timestamp: 1_700_000_000,
                size: 100,
                attachment_count: 1,
                is_read: false,
            },
        }
    }

    #[test]
    fn starts_with_label_and_message_id() {
        let transcript = signature_transcript(&message());

        assert!(transcript.starts_with(TRANSCRIPT_LABEL));
        let rest = &transcript[TRANSCRIPT_LABEL.len()..];
        assert_eq!(&rest[..8], &2u64.to_be_bytes());
        assert_eq!(&rest[8..10], b"m1");
    }

    #[test]
    fn ignores_signature_and_mutable_metadata() {
        let original = signature_transcript(&message());

        let mut changed = message();
        changed.signature = vec![9; 64];
        changed.metadata.is_read = true;
        changed.metadata.timestamp += 1;

        assert_eq!(signature_transcript(&changed), original);
    }

    #[test]
    fn covers_every_ciphertext_and_nonce() {
        let original = signature_transcript(&message());
        let mutations: Vec<fn(&mut EncryptedMessage)> = vec![
            |m| m.id.push('x'),
            |m| m.metadata.sender_id.push('x'),
            |m| m.encrypted_subject.ciphertext[0] ^= 1,
            |m| m.encrypted_subject.nonce[0] ^= 1,
            |m| m.encrypted_body.ciphertext[0] ^= 1,
            |m| m.encrypted_body.nonce[11] ^= 1,
            |m| m.attachments[0].id.push('x'),
            |m| m.attachments[0].encrypted_name.ciphertext[0] ^= 1,
            |m| m.attachments[0].encrypted_content.nonce[0] ^= 1,
            |m| m.attachments[0].encrypted_content.ciphertext[39] ^= 1,
            |m| {
                if let Some(wrapped) = m.recipient_keys.get_mut("bob@example.com") {
                    wrapped.0[0] ^= 1;
                }
            },
            |m| {
                m.recipient_keys.insert("eve@example.com".into(), WrappedKey(vec![3; 8]));
            },
        ];

        for mutate in mutations {
            let mut changed = message();
            mutate(&mut changed);
            assert_ne!(signature_transcript(&changed), original);
        }
    }

    #[test]
    fn moving_bytes_between_fields_changes_transcript() {
        let mut left = message();
        left.encrypted_subject.ciphertext = vec![1, 2, 3];
        left.encrypted_body.ciphertext = vec![4];

        let mut right = message();
        right.encrypted_subject.ciphertext = vec![1, 2];
        right.encrypted_body.ciphertext = vec![3, 4];

        assert_ne!(signature_transcript(&left), signature_transcript(&right));
    }
}
