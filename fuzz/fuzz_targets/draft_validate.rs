//! Fuzz target for DraftValidator
//!
//! Generates drafts with arbitrary addresses, subjects and attachment sizes.
//!
//! # Invariants
//!
//! - NEVER panic, including on sizes near `u64::MAX`
//! - Every accepted address is syntactically valid and appears once
//! - An empty recipient list always reports `NoRecipients`
//! - Errors are deterministic for the same draft

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use sealmail_core::{DraftLimits, DraftValidator, ValidationError, address};
use sealmail_proto::{Attachment, Draft};

#[derive(Debug, Arbitrary)]
struct FuzzDraft {
    to: Vec<String>,
    cc: Vec<String>,
    bcc: Vec<String>,
    subject: String,
    attachments: Vec<FuzzAttachment>,
    max_attachment_size: u16,
    max_total_attachment_size: u16,
    max_subject_len: u8,
}

#[derive(Debug, Arbitrary)]
struct FuzzAttachment {
    content: Vec<u8>,
    declared_size: Option<u64>,
}

fuzz_target!(|input: FuzzDraft| {
    let limits = DraftLimits {
        max_attachment_size: u64::from(input.max_attachment_size),
        max_total_attachment_size: u64::from(input.max_total_attachment_size),
        max_subject_len: usize::from(input.max_subject_len),
    };

    let draft = Draft {
        to: input.to,
        cc: input.cc,
        bcc: input.bcc,
        subject: input.subject,
        attachments: input
            .attachments
            .into_iter()
            .map(|a| {
                let mut attachment = Attachment::new("f", a.content, "application/octet-stream");
                if let Some(size) = a.declared_size {
                    attachment.size = size;
                }
                attachment
            })
            .collect(),
        ..Draft::default()
    };

    let validator = DraftValidator::new(limits);
    let check = validator.validate(&draft);

    for (i, accepted) in check.addresses.iter().enumerate() {
        assert!(address::is_valid_address(accepted));
        assert!(!check.addresses[..i].contains(accepted));
    }

    if draft.recipient_count() == 0 {
        assert!(check.errors.contains(&ValidationError::NoRecipients));
    }

    assert_eq!(validator.validate(&draft).errors, check.errors);
});
