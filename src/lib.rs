//! Tagcache - A time-expiring, tag-indexed in-memory object cache
//!
//! Entries age out a configurable duration after their last timer reset,
//! carry named tag metadata usable for multi-criteria queries, notify an
//! optional observer of lifecycle events, and round-trip through a full
//! state snapshot (tags and timers included).

pub mod cache;
pub mod config;
pub mod error;
pub mod tasks;

pub use cache::{
    CacheObserver, CacheSnapshot, CacheStats, Clock, Criteria, EntryRecord, ManualClock,
    ObjectCache, TagMap, TagValue,
};
pub use config::CacheConfig;
pub use error::{CacheError, Result};
pub use tasks::{spawn_reaper, ReaperHandle};
