//! Local draft checks that need no network access.
//!
//! Everything wrong with a draft is reported at once. Only syntactically
//! valid addresses are handed on for key lookup, deduplicated
//! case-insensitively in to/cc/bcc order.

use std::collections::HashSet;

use sealmail_proto::Draft;

use crate::{
    address,
    config::DraftLimits,
    error::{FieldPath, ValidationError},
};

/// Result of [`DraftValidator::validate`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DraftCheck {
    /// Hard errors found in the draft.
    pub errors: Vec<ValidationError>,
    /// Valid, normalized, unique addresses to resolve.
    pub addresses: Vec<String>,
}

/// Checks recipients, subject and attachments against [`DraftLimits`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DraftValidator {
    limits: DraftLimits,
}

impl DraftValidator {
    /// Validator enforcing `limits`.
    pub fn new(limits: DraftLimits) -> Self {
        Self { limits }
    }

    /// Limits this validator enforces.
    pub fn limits(&self) -> &DraftLimits {
        &self.limits
    }

    /// Check `draft` without touching the network.
    pub fn validate(&self, draft: &Draft) -> DraftCheck {
        let mut check = DraftCheck::default();

        self.check_recipients(draft, &mut check);
        self.check_subject(draft, &mut check.errors);
        self.check_attachments(draft, &mut check.errors);

        check
    }

    fn check_recipients(&self, draft: &Draft, check: &mut DraftCheck) {
        if draft.recipient_count() == 0 {
            check.errors.push(ValidationError::NoRecipients);
            return;
        }

        let mut seen = HashSet::new();
        for (field, index, raw) in draft.recipients() {
            if !address::is_valid_address(raw) {
                check.errors.push(ValidationError::InvalidAddress {
                    field: FieldPath::Recipient(field, index),
                    address: raw.to_string(),
                });
                continue;
            }

            let normalized = address::normalize(raw);
            if seen.insert(normalized.clone()) {
                check.addresses.push(normalized);
            }
        }
    }

    fn check_subject(&self, draft: &Draft, errors: &mut Vec<ValidationError>) {
        let len = draft.subject.len();
        if len > self.limits.max_subject_len {
            errors.push(ValidationError::SubjectTooLong { len, max: self.limits.max_subject_len });
        }
    }

    fn check_attachments(&self, draft: &Draft, errors: &mut Vec<ValidationError>) {
        let max = self.limits.max_attachment_size;

        for (index, attachment) in draft.attachments.iter().enumerate() {
            let actual = attachment.content.len() as u64;
            if attachment.size != actual {
                errors.push(ValidationError::SizeMismatch {
                    index,
                    declared: attachment.size,
                    actual,
                });
            }

            let size = attachment.size.max(actual);
            if size > max {
                errors.push(ValidationError::AttachmentTooLarge { index, size, max });
            }
        }

        let total = draft
            .attachments
            .iter()
            .map(|attachment| attachment.size.max(attachment.content.len() as u64))
            .fold(0, u64::saturating_add);
        if total > self.limits.max_total_attachment_size {
            errors.push(ValidationError::TotalTooLarge {
                total,
                max: self.limits.max_total_attachment_size,
            });
        }
    }
}
