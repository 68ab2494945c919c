//! Clock Module
//!
//! Time source for the cache. The system clock is the normal case; the
//! manual clock makes expiration decisions deterministic under test.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

// == Manual Clock ==
/// A hand-driven clock. Cloning shares the underlying counter, so a test
/// can keep a handle and advance time while the cache holds the clock.
#[derive(Debug, Clone)]
pub struct ManualClock(Arc<AtomicU64>);

impl ManualClock {
    /// Creates a manual clock starting at the given Unix-millisecond instant.
    pub fn new(start_ms: u64) -> Self {
        Self(Arc::new(AtomicU64::new(start_ms)))
    }

    /// Current instant in Unix milliseconds.
    pub fn now_ms(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }

    /// Moves the clock forward.
    pub fn advance(&self, by: Duration) {
        self.0.fetch_add(by.as_millis() as u64, Ordering::SeqCst);
    }

    /// Jumps the clock to an absolute instant.
    pub fn set(&self, now_ms: u64) {
        self.0.store(now_ms, Ordering::SeqCst);
    }
}

// == Clock ==
/// Time source injected into the cache store.
#[derive(Debug, Clone, Default)]
pub enum Clock {
    /// Wall-clock time
    #[default]
    System,
    /// Test-controlled time
    Manual(ManualClock),
}

impl Clock {
    /// Current instant in Unix milliseconds.
    pub fn now_ms(&self) -> u64 {
        match self {
            Clock::System => current_timestamp_ms(),
            Clock::Manual(clock) => clock.now_ms(),
        }
    }

    /// Creates a manual clock and returns it alongside a handle for
    /// advancing it.
    pub fn manual(start_ms: u64) -> (Self, ManualClock) {
        let handle = ManualClock::new(start_ms);
        (Clock::Manual(handle.clone()), handle)
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("Time went backwards")
        .as_millis() as u64
}
