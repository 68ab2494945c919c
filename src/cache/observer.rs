//! Cache Observer Module
//!
//! Optional lifecycle notifications: entry added, entry about to be removed,
//! entry about to be accessed. The observer is an injected capability, not a
//! base class; all three methods default to no-ops so implementers pick the
//! events they care about.

use std::panic::{catch_unwind, AssertUnwindSafe};

use tracing::warn;

// == Cache Observer ==
/// Receives cache lifecycle events.
///
/// Callbacks are invoked synchronously from within the triggering operation
/// while the cache lock is held, so they must not call back into the cache
/// and should return quickly. A panicking observer is logged and ignored;
/// it never aborts the triggering operation or corrupts cache state.
pub trait CacheObserver<K, V>: Send + Sync {
    /// A new entry was created (not fired on overwrite of a live key).
    fn did_add(&self, _key: &K, _value: &V) {}

    /// An entry is about to be deleted, whether by explicit removal,
    /// lazy expiration, or a reaper sweep.
    fn will_remove(&self, _key: &K, _value: &V) {}

    /// An entry is about to be returned from a successful read.
    fn will_access(&self, _key: &K, _value: &V) {}
}

// == Guarded Dispatch ==
/// Runs one observer callback, isolating panics.
pub(crate) fn notify<F: FnOnce()>(event: &str, f: F) {
    if catch_unwind(AssertUnwindSafe(f)).is_err() {
        warn!("Cache observer panicked during {event}; event dropped");
    }
}
