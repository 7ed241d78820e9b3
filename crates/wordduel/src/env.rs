//! Environment abstraction for deterministic testing.
//!
//! Sessions never read the wall clock or a global RNG directly. They ask an
//! [`Environment`], which lets tests move time by hand and pick the starting
//! player deterministically.
//!
//! # Invariants
//!
//! - Monotonicity: `env.now()` never goes backwards
//! - Isolation: clones share one clock, distinct instances share nothing

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Time and randomness as seen by a session.
pub trait Environment: Clone + Send + Sync + 'static {
    /// Returns the current time.
    fn now(&self) -> Instant;

    /// Generates a random `u64`.
    fn random_u64(&self) -> u64;

    /// Picks an index uniformly from `0..len`. `len` must be non-zero.
    fn random_index(&self, len: usize) -> usize {
        (self.random_u64() % len.max(1) as u64) as usize
    }
}

/// Production environment.
///
/// Reads the tokio clock, so timer-driven code observes paused time in
/// `start_paused` tests exactly like it observes real time in production.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnv;

impl Environment for SystemEnv {
    fn now(&self) -> Instant {
        tokio::time::Instant::now().into_std()
    }

    fn random_u64(&self) -> u64 {
        rand::random()
    }
}

/// Hand-cranked environment for tests.
///
/// Time only moves on [`ManualEnv::advance`]. Random values are drawn from a
/// splitmix64 sequence seeded by [`ManualEnv::with_seed`].
#[derive(Debug, Clone)]
pub struct ManualEnv {
    origin: Instant,
    elapsed_ms: Arc<AtomicU64>,
    state: Arc<AtomicU64>,
}

impl ManualEnv {
    /// Creates an environment frozen at the moment of construction.
    pub fn new() -> Self {
        Self::with_seed(0)
    }

    /// Creates an environment with a specific random seed.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            origin: Instant::now(),
            elapsed_ms: Arc::new(AtomicU64::new(0)),
            state: Arc::new(AtomicU64::new(seed)),
        }
    }

    /// Moves the clock forward.
    pub fn advance(&self, by: Duration) {
        let millis = u64::try_from(by.as_millis()).unwrap_or(u64::MAX);
        self.elapsed_ms.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Default for ManualEnv {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment for ManualEnv {
    fn now(&self) -> Instant {
        self.origin + Duration::from_millis(self.elapsed_ms.load(Ordering::SeqCst))
    }

    fn random_u64(&self) -> u64 {
        let mut z = self
            .state
            .fetch_add(0x9e37_79b9_7f4a_7c15, Ordering::SeqCst)
            .wrapping_add(0x9e37_79b9_7f4a_7c15);
        z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
        z ^ (z >> 31)
    }
}
