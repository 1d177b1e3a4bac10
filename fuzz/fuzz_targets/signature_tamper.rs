//! Fuzz target for sender signature coverage
//!
//! Seals one message from alice to bob, then applies arbitrary modifications
//! to the signed parts of it.
//!
//! # Invariants
//!
//! - Any change to the transcript or signature makes `verify_sender` fail
//! - A tampered message never opens
//! - NEVER panic

#![no_main]

use std::sync::OnceLock;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use rand_chacha::{ChaCha20Rng, rand_core::SeedableRng};
use sealmail_core::{CancellationToken, MessageProtocol, Recipient, SystemEnv, verify_sender};
use sealmail_crypto::{KeySession, MIN_RSA_BITS, PublicKey, Sealed, generate_asymmetric_keypair};
use sealmail_proto::{Attachment, Draft, EncryptedMessage, WrappedKey, signature_transcript};
use tokio::runtime::Runtime;

const BOB: &str = "bob@example.com";

struct Fixture {
    runtime: Runtime,
    protocol: MessageProtocol<SystemEnv>,
    message: EncryptedMessage,
    alice: PublicKey,
    bob: KeySession,
}

#[derive(Debug, Arbitrary)]
enum Tamper {
    Id(String),
    Sender(String),
    Subject(Flip),
    SubjectNonce(Flip),
    Body(Flip),
    BodyNonce(Flip),
    AttachmentId(String),
    AttachmentName(Flip),
    AttachmentContent(Flip),
    WrappedKey(Flip),
    ReplaceWrappedKey(Vec<u8>),
    AddRecipient { address: String, key: Vec<u8> },
    DropAttachment,
    Signature(Flip),
}

#[derive(Debug, Arbitrary)]
struct Flip {
    index: usize,
    bit: u8,
}

impl Flip {
    fn apply(&self, bytes: &mut [u8]) {
        if bytes.is_empty() {
            return;
        }
        let index = self.index % bytes.len();
        bytes[index] ^= 1 << (self.bit % 8);
    }

    fn apply_sealed(&self, sealed: &mut Sealed, nonce: bool) {
        if nonce {
            self.apply(&mut sealed.nonce);
        } else {
            self.apply(&mut sealed.ciphertext);
        }
    }
}

fn fixture() -> &'static Fixture {
    static FIXTURE: OnceLock<Fixture> = OnceLock::new();
    FIXTURE.get_or_init(|| {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .expect("runtime must build");

        let mut rng = ChaCha20Rng::seed_from_u64(0x5ea1);
        let alice = generate_asymmetric_keypair(&mut rng, MIN_RSA_BITS).expect("alice key");
        let bob = generate_asymmetric_keypair(&mut rng, MIN_RSA_BITS).expect("bob key");

        let alice_public = alice.public_key().clone();
        let recipients = [Recipient::keyed(BOB, bob.public_key().clone())];
        let draft = Draft {
            to: vec![BOB.to_string()],
            subject: "fuzz".into(),
            body: "signed body".into(),
            attachments: vec![Attachment::new("a.txt", b"attached".to_vec(), "text/plain")],
            encrypt: true,
            ..Draft::default()
        };

        let protocol = MessageProtocol::new(SystemEnv);
        let alice_session = KeySession::new(alice);
        let message = runtime
            .block_on(protocol.seal(
                &draft,
                &recipients,
                "alice@example.com",
                &alice_session,
                &CancellationToken::new(),
            ))
            .expect("fixture must seal");

        Fixture { runtime, protocol, message, alice: alice_public, bob: KeySession::new(bob) }
    })
}

fuzz_target!(|tamper: Tamper| {
    let fixture = fixture();
    let mut message = fixture.message.clone();

    match tamper {
        Tamper::Id(id) => message.id = id,
        Tamper::Sender(sender) => message.metadata.sender_id = sender,
        Tamper::Subject(flip) => flip.apply_sealed(&mut message.encrypted_subject, false),
        Tamper::SubjectNonce(flip) => flip.apply_sealed(&mut message.encrypted_subject, true),
        Tamper::Body(flip) => flip.apply_sealed(&mut message.encrypted_body, false),
        Tamper::BodyNonce(flip) => flip.apply_sealed(&mut message.encrypted_body, true),
        Tamper::AttachmentId(id) => message.attachments[0].id = id,
        Tamper::AttachmentName(flip) => {
            flip.apply_sealed(&mut message.attachments[0].encrypted_name, false);
        },
        Tamper::AttachmentContent(flip) => {
            flip.apply_sealed(&mut message.attachments[0].encrypted_content, false);
        },
        Tamper::WrappedKey(flip) => {
            if let Some(wrapped) = message.recipient_keys.get_mut(BOB) {
                flip.apply(&mut wrapped.0);
            }
        },
        Tamper::ReplaceWrappedKey(key) => {
            message.recipient_keys.insert(BOB.to_string(), WrappedKey(key));
        },
        Tamper::AddRecipient { address, key } => {
            message.recipient_keys.insert(address.clone(), WrappedKey(key));
            message.metadata.recipient_ids.push(address);
        },
        Tamper::DropAttachment => {
            message.attachments.clear();
            message.metadata.attachment_count = 0;
        },
        Tamper::Signature(flip) => flip.apply(&mut message.signature),
    }

    let unchanged = message.signature == fixture.message.signature
        && signature_transcript(&message) == signature_transcript(&fixture.message);
    if unchanged {
        return;
    }

    assert!(verify_sender(&message, &fixture.alice).is_err(), "tampering went unnoticed");

    let open = fixture.protocol.open(&message, BOB, &fixture.bob, &fixture.alice);
    let opened = fixture.runtime.block_on(open);
    assert!(opened.is_err(), "tampered message opened");
});
