//! Cache Entry Module
//!
//! Defines the structure for individual cache entries and the expiration
//! predicate. The predicate here is the only one in the crate: lazy checks
//! on read and the background reaper both call it, so the two paths cannot
//! drift.

use crate::cache::TagMap;

// == Cache Entry ==
/// A single cache entry: the stored value, its tag metadata, and timing state.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// The stored value
    pub value: V,
    /// Named tag metadata; empty by default, never absent for a live entry
    pub tags: TagMap,
    /// Creation timestamp (Unix milliseconds), set once
    pub inserted_at: u64,
    /// Last timer reset (Unix milliseconds); never earlier than `inserted_at`
    pub last_touched_at: u64,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates a new entry with fresh timestamps and no tags.
    pub fn new(value: V, now_ms: u64) -> Self {
        Self {
            value,
            tags: TagMap::new(),
            inserted_at: now_ms,
            last_touched_at: now_ms,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// Boundary condition: an entry is expired once the full TTL has
    /// elapsed since its last timer reset, i.e. when
    /// `now - last_touched_at >= ttl`.
    ///
    /// # Returns
    /// - `true` if a TTL is configured and it has fully elapsed
    /// - `false` if no TTL is configured (never expires) or it hasn't elapsed
    pub fn is_expired(&self, now_ms: u64, ttl_ms: Option<u64>) -> bool {
        match ttl_ms {
            Some(ttl) => now_ms.saturating_sub(self.last_touched_at) >= ttl,
            None => false,
        }
    }

    // == Touch ==
    /// Resets the entry timer to `now_ms`.
    ///
    /// Clamped so that `last_touched_at >= inserted_at` holds even if the
    /// clock moves backwards.
    pub fn touch(&mut self, now_ms: u64) {
        self.last_touched_at = now_ms.max(self.inserted_at);
    }

    // == Time To Live ==
    /// Returns remaining TTL in milliseconds, or None if no TTL is configured.
    ///
    /// # Returns
    /// - `Some(0)` if the entry has expired
    /// - `Some(remaining_ms)` if a TTL is configured and hasn't elapsed
    /// - `None` if no TTL is configured (never expires)
    pub fn ttl_remaining_ms(&self, now_ms: u64, ttl_ms: Option<u64>) -> Option<u64> {
        ttl_ms.map(|ttl| {
            let deadline = self.last_touched_at + ttl;
            deadline.saturating_sub(now_ms)
        })
    }
}
