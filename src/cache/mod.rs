//! Cache Module
//!
//! Provides a time-expiring keyed object store with per-entry tag metadata,
//! lifecycle notifications, and full-state serialization.

mod clock;
mod entry;
mod observer;
mod snapshot;
mod stats;
mod store;


// Re-export public types
pub use clock::{Clock, ManualClock};
pub use entry::CacheEntry;
pub use observer::CacheObserver;
pub use snapshot::{CacheSnapshot, EntryRecord};
pub use stats::CacheStats;
pub use store::ObjectCache;

use std::collections::HashMap;

// == Public Type Aliases ==
/// An opaque tagged value. `serde_json::Value` gives heterogeneous tag
/// payloads with exact equality semantics and lossless serialization.
pub type TagValue = serde_json::Value;

/// The full tag mapping attached to a single entry.
pub type TagMap = HashMap<String, TagValue>;

/// A query: tag name to required value, combined conjunctively.
pub type Criteria = HashMap<String, TagValue>;
