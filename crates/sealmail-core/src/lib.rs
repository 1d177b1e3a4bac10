//! Sealmail Core
//!
//! End-to-end encrypted mail on top of [`sealmail_crypto`] and
//! [`sealmail_proto`]: draft validation, concurrent recipient key
//! resolution, hybrid sealing and verified opening.
//!
//! # Architecture
//!
//! ```text
//! Draft ──► DraftValidator ──► RecipientResolver ──► MessageProtocol::seal ──► Transport
//!                                  │ (KeyDirectory, concurrent, timed)
//!
//! Transport ──► MessageProtocol::open (verify, unwrap, decrypt) ──► OpenedMessage
//! ```
//!
//! Time and randomness come from an [`Environment`], so sealing is fully
//! deterministic under test. [`Mailer`] bundles the pieces into one owned
//! per-user context.
//!
//! # Components
//!
//! - [`DraftValidator`]: size and structure limits, address syntax
//! - [`RecipientResolver`]: key lookups with per-lookup timeout; missing
//!   keys are warnings
//! - [`MessageProtocol`]: seal and open, with cooperative cancellation
//! - [`KeyDirectory`], [`Transport`], [`DraftStore`]: external collaborators,
//!   each with an in-memory implementation

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod address;
mod config;
mod directory;
mod draft_store;
pub mod env;
mod error;
mod mailer;
mod protocol;
mod resolver;
mod system_env;
mod transport;
mod validator;

pub use config::{DraftLimits, ProtocolConfig};
pub use directory::{KeyDirectory, MemoryDirectory};
pub use draft_store::{DraftStore, MemoryDraftStore};
pub use env::Environment;
pub use error::{
    DirectoryError, FieldPath, LookupFailure, LookupWarning, MailerError, ProtocolError,
    StoreError, TransportError, ValidationError,
};
pub use mailer::{Mailer, SealOutcome};
pub use protocol::{MessageProtocol, verify_sender};
pub use resolver::{Recipient, RecipientResolver, ValidationReport};
pub use system_env::SystemEnv;
pub use tokio_util::sync::CancellationToken;
pub use transport::{MemoryTransport, Transport};
pub use validator::{DraftCheck, DraftValidator};
