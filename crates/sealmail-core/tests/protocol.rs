//! Seal and open at the [`MessageProtocol`] level.

mod common;

use common::{NOW, TestEnv, address, draft, public_key, session, text_attachment};
use rand_chacha::{ChaCha20Rng, rand_core::SeedableRng};
use sealmail_core::{
    CancellationToken, MessageProtocol, ProtocolError, Recipient, ValidationError, verify_sender,
};
use sealmail_crypto::{CryptoError, KeySession, asymmetric_decrypt, sign};
use sealmail_proto::{Attachment, Draft, EncryptedMessage, signature_transcript};

fn protocol() -> MessageProtocol<TestEnv> {
    MessageProtocol::new(TestEnv::new(42))
}

fn keyed(names: &[&str]) -> Vec<Recipient> {
    names.iter().map(|name| Recipient::keyed(address(name), public_key(name))).collect()
}

async fn seal_from_alice(draft: &Draft, to: &[&str]) -> EncryptedMessage {
    protocol()
        .seal(draft, &keyed(to), &address("alice"), &session("alice"), &CancellationToken::new())
        .await
        .unwrap()
}

/// Re-sign after a deliberate modification, as a malicious sender could.
async fn resign(message: &mut EncryptedMessage, sender: &KeySession) {
    let identity = sender.acquire().await.unwrap();
    let mut rng = ChaCha20Rng::seed_from_u64(9);
    message.signature =
        sign(&signature_transcript(message), identity.private_key(), &mut rng).unwrap();
}

#[tokio::test]
async fn every_recipient_unwraps_the_same_message_key() {
    let names = ["bob", "carol", "dave", "erin"];
    let message = seal_from_alice(&draft(&names, "fan-out", "body"), &names).await;

    assert_eq!(message.recipient_keys.len(), names.len());

    let mut unwrapped = Vec::new();
    for name in names {
        let session = session(name);
        let identity = session.acquire().await.unwrap();
        let wrapped = &message.recipient_keys[&address(name)];
        unwrapped.push(asymmetric_decrypt(&wrapped.0, identity.private_key()).unwrap());
    }

    assert_eq!(unwrapped[0].len(), 32);
    assert!(unwrapped.iter().all(|key| *key == unwrapped[0]));

    let wrapped: Vec<&Vec<u8>> = message.recipient_keys.values().map(|w| &w.0).collect();
    assert!(wrapped.windows(2).all(|pair| pair[0] != pair[1]));
}

#[tokio::test]
async fn every_recipient_opens_identical_plaintext() {
    let names = ["bob", "carol", "dave"];
    let mut draft = draft(&names, "Team update", "Numbers attached");
    draft.attachments.push(text_attachment("q3.csv", "a,b\n1,2\n"));
    let message = seal_from_alice(&draft, &names).await;

    for name in names {
        let opened = protocol()
            .open(&message, &address(name), &session(name), &public_key("alice"))
            .await
            .unwrap();
        assert_eq!(opened.subject, "Team update");
        assert_eq!(opened.attachments[0].content, b"a,b\n1,2\n");
    }
}

#[tokio::test]
async fn metadata_describes_the_plaintext() {
    let mut draft = draft(&["dave", "bob"], "four", "twelve bytes");
    draft.attachments.push(text_attachment("one", "12345"));
    draft.attachments.push(text_attachment("two", ""));

    let message = seal_from_alice(&draft, &["dave", "bob"]).await;

    assert_eq!(message.metadata.sender_id, address("alice"));
    assert_eq!(message.metadata.recipient_ids, vec![address("bob"), address("dave")]);
    assert_eq!(message.metadata.timestamp, NOW);
    assert_eq!(message.metadata.size, 4 + 12 + 5);
    assert_eq!(message.metadata.attachment_count, 2);
    assert!(!message.metadata.is_read);
    assert_eq!(message.id.len(), 32);
}

#[tokio::test]
async fn every_ciphertext_has_its_own_nonce() {
    let mut draft = draft(&["bob"], "s", "b");
    draft.attachments.push(text_attachment("a", "x"));
    draft.attachments.push(text_attachment("a", "x"));

    let message = seal_from_alice(&draft, &["bob"]).await;

    let mut nonces = vec![message.encrypted_subject.nonce, message.encrypted_body.nonce];
    for attachment in &message.attachments {
        nonces.push(attachment.encrypted_name.nonce);
        nonces.push(attachment.encrypted_content.nonce);
    }
    let count = nonces.len();
    nonces.sort_unstable();
    nonces.dedup();
    assert_eq!(nonces.len(), count);
    assert_ne!(message.attachments[0].id, message.attachments[1].id);
}

#[tokio::test]
async fn empty_fields_round_trip() {
    let mut draft = draft(&["bob"], "", "");
    draft.attachments.push(Attachment::new("", Vec::new(), "application/octet-stream"));
    let message = seal_from_alice(&draft, &["bob"]).await;

    let opened = protocol()
        .open(&message, &address("bob"), &session("bob"), &public_key("alice"))
        .await
        .unwrap();

    assert_eq!(opened.subject, "");
    assert_eq!(opened.body, "");
    assert!(opened.attachments[0].content.is_empty());
    assert_eq!(message.metadata.size, 0);
}

#[tokio::test]
async fn unkeyed_recipients_are_skipped() {
    let mut recipients = keyed(&["bob"]);
    recipients.push(Recipient {
        address: address("carol"),
        public_key: None,
        warning: None,
    });

    let message = protocol()
        .seal(
            &draft(&["bob", "carol"], "s", "b"),
            &recipients,
            &address("alice"),
            &session("alice"),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(message.metadata.recipient_ids, vec![address("bob")]);
}

#[tokio::test]
async fn zero_keyed_recipients_fails_before_touching_the_key() {
    let alice = session("alice");
    alice.lock().await;

    // a locked session would fail with Seal(KeyLocked) if sealing had started
    let cancel = CancellationToken::new();
    let result =
        protocol().seal(&draft(&["bob"], "s", "b"), &[], &address("alice"), &alice, &cancel).await;

    assert_eq!(result, Err(ProtocolError::Validation(ValidationError::NoKeyedRecipients)));
}

#[tokio::test]
async fn seal_with_locked_session_fails() {
    let alice = session("alice");
    alice.lock().await;

    let result = protocol()
        .seal(
            &draft(&["bob"], "s", "b"),
            &keyed(&["bob"]),
            &address("alice"),
            &alice,
            &CancellationToken::new(),
        )
        .await;

    assert_eq!(result, Err(ProtocolError::Seal(CryptoError::KeyLocked)));
    assert_eq!(result.unwrap_err().to_string(), "failed to encrypt message");
}

#[tokio::test]
async fn cancelled_before_start_produces_nothing() {
    let cancel = CancellationToken::new();
    cancel.cancel();

    let alice = session("alice");
    let result = protocol()
        .seal(&draft(&["bob"], "s", "b"), &keyed(&["bob"]), &address("alice"), &alice, &cancel)
        .await;

    assert_eq!(result, Err(ProtocolError::Cancelled));
}

#[tokio::test]
async fn cancelled_mid_seal_produces_nothing() {
    let cancel = CancellationToken::new();
    let protocol = protocol();
    let alice = session("alice");
    let recipients = keyed(&["bob", "carol", "dave", "erin"]);
    let draft = draft(&["bob", "carol", "dave", "erin"], "s", "b");
    let sender = address("alice");

    let (result, ()) = tokio::join!(
        protocol.seal(&draft, &recipients, &sender, &alice, &cancel),
        async { cancel.cancel() },
    );

    assert_eq!(result, Err(ProtocolError::Cancelled));
    // the session is untouched and still usable
    assert!(!alice.is_locked().await);
}

#[tokio::test]
async fn cancelling_after_completion_has_no_effect() {
    let cancel = CancellationToken::new();
    let alice = session("alice");
    let message = protocol()
        .seal(&draft(&["bob"], "s", "b"), &keyed(&["bob"]), &address("alice"), &alice, &cancel)
        .await
        .unwrap();

    cancel.cancel();

    assert!(verify_sender(&message, &public_key("alice")).is_ok());
}

#[tokio::test]
async fn non_recipient_cannot_open() {
    let message = seal_from_alice(&draft(&["bob"], "s", "b"), &["bob"]).await;

    let result = protocol()
        .open(&message, &address("carol"), &session("carol"), &public_key("alice"))
        .await;

    assert_eq!(result, Err(ProtocolError::Crypto(CryptoError::NotARecipient)));
}

#[tokio::test]
async fn wrong_sender_key_fails_before_decryption() {
    let message = seal_from_alice(&draft(&["bob"], "s", "b"), &["bob"]).await;
    let bob = session("bob");
    bob.lock().await;

    // a locked session proves no unwrap was attempted
    let result = protocol().open(&message, &address("bob"), &bob, &public_key("dave")).await;

    assert_eq!(result, Err(ProtocolError::Crypto(CryptoError::SignatureInvalid)));
}

#[tokio::test]
async fn any_signed_field_change_breaks_the_signature() {
    let mut draft = draft(&["bob"], "s", "b");
    draft.attachments.push(text_attachment("a.txt", "content"));
    let original = seal_from_alice(&draft, &["bob"]).await;

    let tamperings: Vec<fn(&mut EncryptedMessage)> = vec![
        |m| m.encrypted_subject.ciphertext[0] ^= 1,
        |m| m.encrypted_body.nonce[0] ^= 1,
        |m| m.attachments[0].encrypted_name.ciphertext[0] ^= 1,
        |m| m.attachments[0].encrypted_content.ciphertext[0] ^= 1,
        |m| m.metadata.sender_id = address("dave"),
        |m| m.id.push('0'),
        |m| {
            if let Some(wrapped) = m.recipient_keys.get_mut(&address("bob")) {
                wrapped.0[0] ^= 1;
            }
        },
    ];

    for tamper in tamperings {
        let mut message = original.clone();
        tamper(&mut message);
        assert_eq!(
            verify_sender(&message, &public_key("alice")),
            Err(ProtocolError::Crypto(CryptoError::SignatureInvalid))
        );
    }
}

#[tokio::test]
async fn decryption_fails_closed_even_with_a_valid_signature() {
    let alice = session("alice");
    let mut draft = draft(&["bob"], "s", "b");
    draft.attachments.push(text_attachment("first.txt", "one"));
    draft.attachments.push(text_attachment("second.txt", "two"));
    let mut message = seal_from_alice(&draft, &["bob"]).await;

    // corrupt the last field only; earlier fields would decrypt fine
    message.attachments[1].encrypted_content.ciphertext[0] ^= 1;
    resign(&mut message, &alice).await;

    let result = protocol()
        .open(&message, &address("bob"), &session("bob"), &public_key("alice"))
        .await;

    assert_eq!(result, Err(ProtocolError::Crypto(CryptoError::AuthenticationFailed)));
}

#[tokio::test]
async fn swapped_nonce_fails_authentication() {
    let alice = session("alice");
    let mut message = seal_from_alice(&draft(&["bob"], "subject", "body"), &["bob"]).await;

    message.encrypted_body.nonce = message.encrypted_subject.nonce;
    resign(&mut message, &alice).await;

    let result = protocol()
        .open(&message, &address("bob"), &session("bob"), &public_key("alice"))
        .await;

    assert_eq!(result, Err(ProtocolError::Crypto(CryptoError::AuthenticationFailed)));
}

#[tokio::test]
async fn inconsistent_metadata_is_rejected() {
    let mut message = seal_from_alice(&draft(&["bob"], "s", "b"), &["bob"]).await;
    message.metadata.attachment_count = 3;

    let result = protocol()
        .open(&message, &address("bob"), &session("bob"), &public_key("alice"))
        .await;

    assert!(matches!(result, Err(ProtocolError::Wire(_))));
}

#[tokio::test]
async fn recipient_address_is_matched_case_insensitively() {
    let message = seal_from_alice(&draft(&["bob"], "s", "b"), &["bob"]).await;

    let opened = protocol()
        .open(&message, "Bob@Example.COM", &session("bob"), &public_key("alice"))
        .await
        .unwrap();

    assert_eq!(opened.body, "b");
}

async fn seal_with_seed(seed: u64, draft: &Draft) -> EncryptedMessage {
    MessageProtocol::new(TestEnv::new(seed))
        .seal(
            draft,
            &keyed(&["bob"]),
            &address("alice"),
            &session("alice"),
            &CancellationToken::new(),
        )
        .await
        .unwrap()
}

#[tokio::test]
async fn same_seed_seals_identically() {
    let draft = draft(&["bob"], "deterministic", "body");

    assert_eq!(seal_with_seed(5, &draft).await, seal_with_seed(5, &draft).await);
    assert_ne!(seal_with_seed(5, &draft).await.id, seal_with_seed(6, &draft).await.id);
}
