//! Fuzz target for EncryptedMessage::from_json
//!
//! Feeds arbitrary text to the wire decoder to find:
//! - Panics in JSON or base64 handling
//! - Nonces of the wrong length slipping through
//! - Structurally inconsistent messages passing `check_structure`
//!
//! # Invariants
//!
//! - NEVER panic; invalid input returns an error
//! - Anything that decodes re-encodes to a document that decodes to the same
//!   message with the same signature transcript

#![no_main]

use libfuzzer_sys::fuzz_target;
use sealmail_proto::{EncryptedMessage, signature_transcript};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    let Ok(message) = EncryptedMessage::from_json(text) else {
        return;
    };

    assert_eq!(message.metadata.attachment_count as usize, message.attachments.len());
    assert!(!message.recipient_keys.is_empty());

    let encoded = message.to_json().expect("decoded message must re-encode");
    let decoded = EncryptedMessage::from_json(&encoded).expect("re-encoded message must decode");

    assert_eq!(decoded, message);
    assert_eq!(signature_transcript(&decoded), signature_transcript(&message));
});
