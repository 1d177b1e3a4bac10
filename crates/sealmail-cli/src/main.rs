//! Sealmail command-line binary.
//!
//! # Usage
//!
//! ```bash
//! # Create an identity and publish its key into a shared folder
//! sealmail --home ~/.sealmail --directory ./keys identity create alice@example.com
//!
//! # Seal a draft (JSON) and write the encrypted message
//! sealmail --directory ./keys seal draft.json --out message.json
//!
//! # Verify and open as a recipient
//! sealmail --home ~/.bob --directory ./keys open message.json
//! ```
//!
//! Passwords come from `--password` or `SEALMAIL_PASSWORD`.

use std::{io::Write, path::PathBuf, time::Duration};

use clap::{Parser, Subcommand};
use sealmail_cli::{Context, Home, load_config};
use sealmail_core::CancellationToken;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use zeroize::Zeroizing;

/// End-to-end encrypted mail
#[derive(Parser, Debug)]
#[command(name = "sealmail")]
#[command(about = "End-to-end encrypted mail: identities, sealing and opening")]
#[command(version)]
struct Args {
    /// Home directory holding identity.json
    #[arg(long, env = "SEALMAIL_HOME", default_value = ".sealmail")]
    home: PathBuf,

    /// Folder of <address>.pub key files (default: <home>/directory)
    #[arg(long, env = "SEALMAIL_DIRECTORY")]
    directory: Option<PathBuf>,

    /// Protocol configuration file (JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// RSA modulus size for new identities (overrides the config file)
    #[arg(long)]
    rsa_bits: Option<usize>,

    /// Key lookup deadline in milliseconds (overrides the config file)
    #[arg(long)]
    lookup_timeout_ms: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Manage the local identity
    #[command(subcommand)]
    Identity(IdentityCommand),

    /// Seal a draft for its recipients
    Seal {
        /// Draft JSON file
        draft: PathBuf,

        /// Write the sealed message here instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Identity password
        #[arg(long, env = "SEALMAIL_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Verify and decrypt a sealed message
    Open {
        /// Sealed message JSON file
        message: PathBuf,

        /// Identity password
        #[arg(long, env = "SEALMAIL_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Check the sender signature without decrypting
    Verify {
        /// Sealed message JSON file
        message: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
enum IdentityCommand {
    /// Generate a key pair and publish its public key
    Create {
        /// Address to send as
        address: String,

        /// Password protecting the private key
        #[arg(long, env = "SEALMAIL_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Change the identity password
    Passwd {
        /// Current password
        #[arg(long, env = "SEALMAIL_PASSWORD", hide_env_values = true)]
        password: String,

        /// New password
        #[arg(long, env = "SEALMAIL_NEW_PASSWORD", hide_env_values = true)]
        new_password: String,
    },

    /// Print the base64 public key
    Export,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    // stdout carries command output
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let mut home = Home::new(args.home);
    if let Some(directory) = args.directory {
        home = home.with_directory(directory);
    }
    let mut config = load_config(args.config.as_deref()).await?;
    if let Some(bits) = args.rsa_bits {
        config.rsa_bits = bits;
    }
    if let Some(ms) = args.lookup_timeout_ms {
        config.lookup_timeout = Duration::from_millis(ms);
    }
    let context = Context::load(home, config).await?;

    let mut stdout = std::io::stdout().lock();
    match args.command {
        Command::Identity(IdentityCommand::Create { address, password }) => {
            let password = Zeroizing::new(password);
            let path = context.create_identity(&address, &password).await?;
            writeln!(stdout, "published {}", path.display())?;
        },
        Command::Identity(IdentityCommand::Passwd { password, new_password }) => {
            let password = Zeroizing::new(password);
            let new_password = Zeroizing::new(new_password);
            context.change_password(&password, &new_password).await?;
            writeln!(stdout, "password changed")?;
        },
        Command::Identity(IdentityCommand::Export) => {
            writeln!(stdout, "{}", context.export_public_key().await?)?;
        },
        Command::Seal { draft, out, password } => {
            let password = Zeroizing::new(password);
            let cancel = CancellationToken::new();
            cancel_on_interrupt(cancel.clone());

            let outcome = context.seal(&draft, &password, &cancel).await?;
            for warning in &outcome.warnings {
                writeln!(std::io::stderr(), "warning: {warning}")?;
            }

            let json = outcome.message.to_json()?;
            match out {
                Some(path) => tokio::fs::write(&path, json).await?,
                None => writeln!(stdout, "{json}")?,
            }
        },
        Command::Open { message, password } => {
            let password = Zeroizing::new(password);
            let opened = context.open(&message, &password).await?;
            writeln!(stdout, "{}", serde_json::to_string_pretty(&opened)?)?;
        },
        Command::Verify { message } => {
            let sender = context.verify(&message).await?;
            writeln!(stdout, "valid signature from {sender}")?;
        },
    }

    Ok(())
}

/// Cancel `token` on Ctrl-C so an interrupted seal leaves nothing behind.
fn cancel_on_interrupt(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted, cancelling");
            token.cancel();
        }
    });
}
