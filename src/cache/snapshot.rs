//! Cache Snapshot Module
//!
//! The full-state serialization form: every entry's key, value, tags, and
//! both timestamps verbatim, plus the store-level configuration. Restoring
//! a snapshot reproduces a store indistinguishable in behavior from the one
//! serialized, expiration outcomes included, which is why timestamps are
//! carried as-is rather than reset to "now".
//!
//! This is deliberately distinct from the plain mapping export, which is
//! values-only and lossy.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cache::TagMap;
use crate::error::{CacheError, Result};

// == Entry Record ==
/// One serialized cache entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryRecord<K, V> {
    /// The entry's key
    pub key: K,
    /// The stored value
    pub value: V,
    /// Tag metadata; omitted in the payload when empty
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub tags: TagMap,
    /// Creation timestamp (Unix milliseconds)
    pub inserted_at_ms: u64,
    /// Last timer reset (Unix milliseconds)
    pub last_touched_at_ms: u64,
}

// == Cache Snapshot ==
/// Full cache state: configuration plus every entry.
///
/// Entries already past their TTL are included with their original
/// timestamps; the restoring side's own lazy expiration filters them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSnapshot<K, V> {
    /// When the snapshot was taken (informational)
    pub taken_at: DateTime<Utc>,
    /// Cache-wide TTL in milliseconds; `None` means entries never expire
    pub ttl_ms: Option<u64>,
    /// Whether reads reset entry timers
    pub reset_on_access: bool,
    /// Whether re-adds reset entry timers
    pub reset_on_add: bool,
    /// All entries, timestamps verbatim
    pub entries: Vec<EntryRecord<K, V>>,
}

impl<K, V> CacheSnapshot<K, V> {
    /// Validates structural invariants of the payload.
    ///
    /// Called by the store before any state is replaced, so a bad payload
    /// can never leave a partially restored cache behind.
    pub(crate) fn validate(&self) -> Result<()>
    where
        K: std::hash::Hash + Eq,
    {
        let mut seen = std::collections::HashSet::with_capacity(self.entries.len());
        for record in &self.entries {
            if record.last_touched_at_ms < record.inserted_at_ms {
                return Err(CacheError::MalformedSnapshot(
                    "entry touched before it was inserted".to_string(),
                ));
            }
            if !seen.insert(&record.key) {
                return Err(CacheError::MalformedSnapshot(
                    "duplicate key in snapshot".to_string(),
                ));
            }
        }
        Ok(())
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    fn record(key: &str, inserted: u64, touched: u64) -> EntryRecord<String, i32> {
        EntryRecord {
            key: key.to_string(),
            value: 1,
            tags: TagMap::new(),
            inserted_at_ms: inserted,
            last_touched_at_ms: touched,
        }
    }

    fn snapshot(entries: Vec<EntryRecord<String, i32>>) -> CacheSnapshot<String, i32> {
        CacheSnapshot {
            taken_at: Utc::now(),
            ttl_ms: Some(60_000),
            reset_on_access: false,
            reset_on_add: false,
            entries,
        }
    }

    #[test]
    fn test_validate_accepts_well_formed_payload() {
        let snap = snapshot(vec![record("a", 0, 10), record("b", 5, 5)]);
        assert!(snap.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_inverted_timestamps() {
        let snap = snapshot(vec![record("a", 10, 5)]);
        assert!(matches!(
            snap.validate(),
            Err(CacheError::MalformedSnapshot(_))
        ));
    }

    #[test]
    fn test_validate_rejects_duplicate_keys() {
        let snap = snapshot(vec![record("a", 0, 0), record("a", 1, 1)]);
        assert!(matches!(
            snap.validate(),
            Err(CacheError::MalformedSnapshot(_))
        ));
    }

    #[test]
    fn test_json_round_trip_preserves_every_field() {
        let mut tags = TagMap::new();
        tags.insert("color".to_string(), serde_json::json!("blue"));
        let snap = CacheSnapshot {
            taken_at: Utc::now(),
            ttl_ms: Some(1_234),
            reset_on_access: true,
            reset_on_add: false,
            entries: vec![EntryRecord {
                key: "a".to_string(),
                value: 7,
                tags,
                inserted_at_ms: 100,
                last_touched_at_ms: 250,
            }],
        };

        let json = serde_json::to_string(&snap).unwrap();
        let back: CacheSnapshot<String, i32> = serde_json::from_str(&json).unwrap();

        assert_eq!(back.ttl_ms, Some(1_234));
        assert!(back.reset_on_access);
        assert!(!back.reset_on_add);
        assert_eq!(back.entries.len(), 1);
        let entry = &back.entries[0];
        assert_eq!(entry.key, "a");
        assert_eq!(entry.value, 7);
        assert_eq!(entry.tags.get("color"), Some(&serde_json::json!("blue")));
        assert_eq!(entry.inserted_at_ms, 100);
        assert_eq!(entry.last_touched_at_ms, 250);
    }

    #[test]
    fn test_empty_tags_omitted_from_payload() {
        let snap = snapshot(vec![record("a", 0, 0)]);
        let json = serde_json::to_string(&snap).unwrap();
        assert!(!json.contains("\"tags\""));

        let back: CacheSnapshot<String, i32> = serde_json::from_str(&json).unwrap();
        assert!(back.entries[0].tags.is_empty());
    }
}
