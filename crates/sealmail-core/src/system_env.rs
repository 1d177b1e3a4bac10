//! Production environment using system time and the OS RNG.
//!
//! Not reproducible: every RNG draws from the operating system (getrandom),
//! and the clock is the real wall clock.

use std::time::{SystemTime, UNIX_EPOCH};

use rand::rngs::OsRng;

use crate::env::Environment;

/// Production environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Create a new system environment.
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    type Rng = OsRng;

    fn rng(&self) -> OsRng {
        OsRng
    }

    /// A clock set before 1970 reads as zero rather than failing the send.
    #[allow(clippy::disallowed_methods)]
    fn wall_clock_secs(&self) -> u64 {
        SystemTime::now().duration_since(UNIX_EPOCH).map_or(0, |elapsed| elapsed.as_secs())
    }
}
