//! Background Tasks Module
//!
//! Contains background work that runs alongside the cache.
//!
//! # Tasks
//! - Reaper: proactively evicts expired entries at configured intervals so
//!   memory is reclaimed even for keys nobody re-reads

mod reaper;

pub use reaper::{spawn_reaper, ReaperHandle};
