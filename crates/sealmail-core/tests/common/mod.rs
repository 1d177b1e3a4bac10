//! Shared fixtures for sealmail-core integration tests.

#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex, OnceLock,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use rand_chacha::{ChaCha20Rng, rand_core::SeedableRng};
use sealmail_core::{
    DirectoryError, Environment, KeyDirectory, Mailer, MemoryDirectory, ProtocolConfig,
};
use sealmail_crypto::{EncryptedPrivateKey, KdfParams, KeyManager, KeySession, PublicKey};
use sealmail_proto::{Attachment, Draft};

pub const PASSWORD: &[u8] = b"correct horse battery staple";

/// Cheap Argon2 cost; the real default takes 64 MiB per derivation.
pub const FAST_KDF: KdfParams = KdfParams { memory_kib: 8, iterations: 1, parallelism: 1 };

pub const TEST_RSA_BITS: usize = 1024;

/// Fixed wall clock for every test environment.
pub const NOW: u64 = 1_700_000_000;

/// Deterministic environment: fixed clock, one seeded RNG stream per call.
#[derive(Debug, Clone)]
pub struct TestEnv {
    seed: u64,
    streams: Arc<AtomicU64>,
}

impl TestEnv {
    pub fn new(seed: u64) -> Self {
        Self { seed, streams: Arc::new(AtomicU64::new(0)) }
    }
}

impl Environment for TestEnv {
    type Rng = ChaCha20Rng;

    fn rng(&self) -> ChaCha20Rng {
        let stream = self.streams.fetch_add(1, Ordering::Relaxed);
        ChaCha20Rng::seed_from_u64(self.seed.wrapping_mul(1_000_003).wrapping_add(stream))
    }

    fn wall_clock_secs(&self) -> u64 {
        NOW
    }
}

pub struct Identity {
    pub address: String,
    pub encrypted: EncryptedPrivateKey,
}

const NAMES: [&str; 5] = ["alice", "bob", "carol", "dave", "erin"];

fn identities() -> &'static [Identity] {
    static IDENTITIES: OnceLock<Vec<Identity>> = OnceLock::new();
    IDENTITIES.get_or_init(|| {
        NAMES
            .iter()
            .zip(100u64..)
            .map(|(name, seed)| {
                let mut rng = ChaCha20Rng::seed_from_u64(seed);
                let identity = key_manager().create_identity(PASSWORD, &mut rng).unwrap();
                Identity { address: address(name), encrypted: identity.encrypted }
            })
            .collect()
    })
}

pub fn key_manager() -> KeyManager {
    KeyManager::new(FAST_KDF, TEST_RSA_BITS)
}

pub fn address(name: &str) -> String {
    format!("{name}@example.com")
}

pub fn identity(name: &str) -> &'static Identity {
    let index = NAMES.iter().position(|candidate| *candidate == name).unwrap();
    &identities()[index]
}

pub fn public_key(name: &str) -> PublicKey {
    identity(name).encrypted.public_key.clone()
}

/// Fresh unlocked session for a fixture identity.
pub fn session(name: &str) -> KeySession {
    KeySession::new(key_manager().unlock(PASSWORD, &identity(name).encrypted).unwrap())
}

/// Directory with keys published for `names`.
pub fn directory_with(names: &[&str]) -> MemoryDirectory {
    let directory = MemoryDirectory::new();
    for name in names {
        directory.publish(&address(name), public_key(name)).unwrap();
    }
    directory
}

pub fn config() -> ProtocolConfig {
    ProtocolConfig {
        kdf: FAST_KDF,
        rsa_bits: TEST_RSA_BITS,
        lookup_timeout: Duration::from_secs(1),
        ..ProtocolConfig::default()
    }
}

pub fn mailer<D: KeyDirectory>(directory: D) -> Mailer<TestEnv, D> {
    Mailer::new(TestEnv::new(7), directory, config())
}

pub fn draft(to: &[&str], subject: &str, body: &str) -> Draft {
    Draft {
        to: to.iter().map(|name| address(name)).collect(),
        subject: subject.to_string(),
        body: body.to_string(),
        encrypt: true,
        ..Draft::default()
    }
}

pub fn text_attachment(name: &str, content: &str) -> Attachment {
    Attachment::new(name, content.as_bytes().to_vec(), "text/plain")
}

/// How a [`ScriptedDirectory`] answers for one address.
#[derive(Debug, Clone)]
pub enum Answer {
    Key(PublicKey),
    Missing,
    Fail,
    Hang,
}

/// Directory with scripted answers, a fixed latency and a lookup log.
#[derive(Debug, Clone, Default)]
pub struct ScriptedDirectory {
    answers: HashMap<String, Answer>,
    latency: Duration,
    lookups: Arc<Mutex<Vec<String>>>,
}

impl ScriptedDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answer(mut self, name: &str, answer: Answer) -> Self {
        self.answers.insert(address(name), answer);
        self
    }

    pub fn key_for(self, name: &str) -> Self {
        self.answer(name, Answer::Key(public_key(name)))
    }

    pub fn latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Addresses looked up so far, in call order.
    pub fn lookups(&self) -> Vec<String> {
        self.lookups.lock().unwrap().clone()
    }
}

impl KeyDirectory for ScriptedDirectory {
    async fn lookup(&self, address: &str) -> Result<Option<PublicKey>, DirectoryError> {
        self.lookups.lock().unwrap().push(address.to_string());
        tokio::time::sleep(self.latency).await;

        match self.answers.get(address) {
            Some(Answer::Key(key)) => Ok(Some(key.clone())),
            Some(Answer::Fail) => Err(DirectoryError::Unavailable("backend down".to_string())),
            Some(Answer::Hang) => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(None)
            },
            Some(Answer::Missing) | None => Ok(None),
        }
    }
}
