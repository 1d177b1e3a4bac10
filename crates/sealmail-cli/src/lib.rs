//! Sealmail CLI
//!
//! File-based front end for [`sealmail_core`]: identities live in a home
//! directory, drafts and sealed messages are JSON files, and a folder of
//! `.pub` files plays the part of the key directory.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod commands;
mod error;
pub mod home;

pub use commands::Context;
pub use error::CliError;
pub use home::{Home, IdentityFile, load_config};
