//! Recipient resolution: validate the draft, then fetch every recipient's
//! public key concurrently.
//!
//! A lookup that fails, times out or finds nothing downgrades that one
//! recipient to a warning. It never blocks the others.

use std::time::Duration;

use futures::future::join_all;
use sealmail_crypto::PublicKey;
use sealmail_proto::Draft;

use crate::{
    directory::KeyDirectory,
    error::{LookupFailure, LookupWarning, ValidationError},
    validator::DraftValidator,
};

/// One recipient after lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipient {
    /// Normalized address.
    pub address: String,
    /// Public key, if the directory produced one.
    pub public_key: Option<PublicKey>,
    /// Why there is no key, if there isn't.
    pub warning: Option<LookupWarning>,
}

impl Recipient {
    /// Recipient with a resolved key.
    pub fn keyed(address: impl Into<String>, public_key: PublicKey) -> Self {
        Self { address: address.into(), public_key: Some(public_key), warning: None }
    }

    fn unkeyed(address: String, reason: LookupFailure) -> Self {
        let warning = LookupWarning { address: address.clone(), reason };
        Self { address, public_key: None, warning: Some(warning) }
    }
}

/// Everything known about a draft before sealing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    /// Hard errors; any one blocks sealing.
    pub errors: Vec<ValidationError>,
    /// Recipients that will not receive an encrypted copy.
    pub warnings: Vec<LookupWarning>,
    /// Every looked-up recipient, keyed or not, in draft order.
    pub recipients: Vec<Recipient>,
}

impl ValidationReport {
    /// Whether the draft has no hard errors.
    ///
    /// Missing keys only produce warnings; whether to go ahead without them
    /// is the caller's decision.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Recipients that have a public key.
    pub fn keyed_recipients(&self) -> impl Iterator<Item = (&str, &PublicKey)> {
        self.recipients
            .iter()
            .filter_map(|r| r.public_key.as_ref().map(|key| (r.address.as_str(), key)))
    }
}

/// Validates drafts and resolves recipient keys through a [`KeyDirectory`].
#[derive(Debug)]
pub struct RecipientResolver<D> {
    directory: D,
    validator: DraftValidator,
    lookup_timeout: Duration,
}

impl<D: KeyDirectory> RecipientResolver<D> {
    /// Resolver bounding each lookup by `lookup_timeout`.
    pub fn new(directory: D, validator: DraftValidator, lookup_timeout: Duration) -> Self {
        Self { directory, validator, lookup_timeout }
    }

    /// Directory lookups go to.
    pub fn directory(&self) -> &D {
        &self.directory
    }

    /// Validate `draft` and look up every valid recipient.
    ///
    /// Malformed addresses are reported as errors and never looked up.
    /// Lookups run concurrently; the report is built after all of them
    /// settle.
    pub async fn resolve(&self, draft: &Draft) -> ValidationReport {
        let check = self.validator.validate(draft);
        let mut report = ValidationReport { errors: check.errors, ..ValidationReport::default() };

        let lookups = check.addresses.into_iter().map(|address| async move {
            let outcome =
                tokio::time::timeout(self.lookup_timeout, self.directory.lookup(&address)).await;
            (address, outcome)
        });

        for (address, outcome) in join_all(lookups).await {
            let recipient = match outcome {
                Ok(Ok(Some(key))) => Recipient::keyed(address, key),
                Ok(Ok(None)) => Recipient::unkeyed(address, LookupFailure::NotFound),
                Ok(Err(e)) => {
                    tracing::warn!(address = %address, error = %e, "Key lookup failed");
                    Recipient::unkeyed(address, LookupFailure::Unavailable)
                },
                Err(_) => {
                    tracing::warn!(
                        address = %address,
                        timeout_ms = self.lookup_timeout.as_millis() as u64,
                        "Key lookup timed out"
                    );
                    Recipient::unkeyed(address, LookupFailure::TimedOut)
                },
            };

            if let Some(warning) = &recipient.warning {
                report.warnings.push(warning.clone());
            }
            report.recipients.push(recipient);
        }

        tracing::debug!(
            recipients = report.recipients.len(),
            warnings = report.warnings.len(),
            errors = report.errors.len(),
            "Resolved recipients"
        );

        report
    }
}
