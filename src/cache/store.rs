//! Cache Store Module
//!
//! Main cache engine: a keyed map of entries with TTL expiration, per-entry
//! tag metadata, criteria queries, lifecycle notifications, bulk mapping
//! import/export, and full-state snapshots.
//!
//! The store is intentionally time-based rather than size-based: nothing is
//! evicted for memory pressure, only for age. Expiration is enforced lazily
//! on access and proactively by the reaper task (see `crate::tasks`); both
//! paths share `CacheEntry::is_expired`.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::cache::observer::notify;
use crate::cache::{
    CacheEntry, CacheObserver, CacheSnapshot, CacheStats, Clock, Criteria, EntryRecord, TagMap,
    TagValue,
};
use crate::config::CacheConfig;
use crate::error::Result;

// == Object Cache ==
/// A time-expiring, tag-indexed object cache.
///
/// Keys are hashable and cloneable; values and tag values are opaque to the
/// cache. Callers only ever receive clones of stored values, never
/// references into the store.
///
/// The store itself is synchronous; for concurrent use wrap it in
/// `Arc<tokio::sync::RwLock<_>>` as `crate::tasks::spawn_reaper` expects.
pub struct ObjectCache<K, V> {
    /// Key-value storage
    entries: HashMap<K, CacheEntry<V>>,
    /// Cache-wide TTL in milliseconds; `None` means entries never expire
    ttl_ms: Option<u64>,
    /// Whether every successful read refreshes the entry timer
    reset_on_access: bool,
    /// Whether re-adding a live key refreshes the entry timer
    reset_on_add: bool,
    /// Optional lifecycle observer
    observer: Option<Arc<dyn CacheObserver<K, V>>>,
    /// Performance statistics
    stats: CacheStats,
    /// Time source
    clock: Clock,
}

impl<K, V> fmt::Debug for ObjectCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectCache")
            .field("entries", &self.entries.len())
            .field("ttl_ms", &self.ttl_ms)
            .field("reset_on_access", &self.reset_on_access)
            .field("reset_on_add", &self.reset_on_add)
            .field("observer", &self.observer.is_some())
            .finish()
    }
}

impl<K, V> ObjectCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    // == Constructors ==
    /// Creates a new ObjectCache from the given configuration, using the
    /// system clock.
    pub fn new(config: CacheConfig) -> Self {
        Self::with_clock(config, Clock::System)
    }

    /// Creates a new ObjectCache with an explicit time source.
    pub fn with_clock(config: CacheConfig, clock: Clock) -> Self {
        Self {
            entries: HashMap::new(),
            ttl_ms: config
                .ttl
                .filter(|ttl| !ttl.is_zero())
                .map(|ttl| ttl.as_millis() as u64),
            reset_on_access: config.reset_on_access,
            reset_on_add: config.reset_on_add,
            observer: None,
            stats: CacheStats::new(),
            clock,
        }
    }

    /// Creates a new cache pre-loaded from a plain key/value mapping.
    pub fn from_mapping(mapping: impl IntoIterator<Item = (K, V)>, config: CacheConfig) -> Self {
        let mut cache = Self::new(config);
        cache.load_from_mapping(mapping);
        cache
    }

    // == Configuration ==
    /// Current TTL, or `None` if entries never expire.
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl_ms.map(Duration::from_millis)
    }

    /// Sets the cache-wide TTL. `None` or a zero duration means entries
    /// never expire; already-stored entries are re-judged against the new
    /// TTL on their next access or sweep.
    pub fn set_ttl(&mut self, ttl: Option<Duration>) {
        self.ttl_ms = ttl
            .filter(|ttl| !ttl.is_zero())
            .map(|ttl| ttl.as_millis() as u64);
    }

    /// Whether successful reads refresh entry timers.
    pub fn reset_on_access(&self) -> bool {
        self.reset_on_access
    }

    /// Sets whether successful reads refresh entry timers.
    pub fn set_reset_on_access(&mut self, reset: bool) {
        self.reset_on_access = reset;
    }

    /// Whether re-adding a live key refreshes its timer.
    pub fn reset_on_add(&self) -> bool {
        self.reset_on_add
    }

    /// Sets whether re-adding a live key refreshes its timer.
    pub fn set_reset_on_add(&mut self, reset: bool) {
        self.reset_on_add = reset;
    }

    /// Registers the lifecycle observer (at most one; replaces any previous).
    pub fn set_observer(&mut self, observer: Arc<dyn CacheObserver<K, V>>) {
        self.observer = Some(observer);
    }

    /// Removes the registered observer, if any.
    pub fn clear_observer(&mut self) {
        self.observer = None;
    }

    // == Get ==
    /// Looks up the value for a key.
    ///
    /// Returns `None` if the key is absent or its entry has expired; an
    /// expired entry is removed on the spot (firing `will_remove`) before
    /// `None` is returned. A live hit fires `will_access` and, when
    /// `reset_on_access` is set, refreshes the entry timer.
    pub fn get(&mut self, key: &K) -> Option<V> {
        let now = self.clock.now_ms();
        let expired = match self.entries.get(key) {
            Some(entry) => entry.is_expired(now, self.ttl_ms),
            None => {
                self.stats.record_miss();
                return None;
            }
        };

        if expired {
            self.evict_expired(key);
            self.stats.record_miss();
            return None;
        }

        let observer = self.observer.clone();
        let reset = self.reset_on_access;
        let value = match self.entries.get_mut(key) {
            Some(entry) => {
                if let Some(obs) = &observer {
                    notify("will_access", || obs.will_access(key, &entry.value));
                }
                if reset {
                    entry.touch(now);
                }
                entry.value.clone()
            }
            None => {
                self.stats.record_miss();
                return None;
            }
        };

        self.stats.record_hit();
        Some(value)
    }

    // == Set ==
    /// Stores a value under a key.
    ///
    /// Returns `true` if a new entry was created (the key was absent, or
    /// present but expired; an expired incumbent is evicted first, with
    /// notification). Returns `false` for an overwrite of a live key, in
    /// which case tags are preserved and the timer is refreshed only when
    /// `reset_on_add` is set.
    pub fn set(&mut self, key: K, value: V) -> bool {
        let now = self.clock.now_ms();
        let live = self
            .entries
            .get(&key)
            .map(|entry| !entry.is_expired(now, self.ttl_ms))
            .unwrap_or(false);

        if live {
            let reset = self.reset_on_add;
            if let Some(entry) = self.entries.get_mut(&key) {
                entry.value = value;
                if reset {
                    entry.touch(now);
                }
            }
            return false;
        }

        // Present-but-expired is treated as absent; the stale entry goes
        // through the normal removal path first
        if self.entries.contains_key(&key) {
            self.evict_expired(&key);
        }

        let entry = CacheEntry::new(value, now);
        if let Some(obs) = self.observer.clone() {
            notify("did_add", || obs.did_add(&key, &entry.value));
        }
        self.entries.insert(key, entry);
        self.stats.set_total_entries(self.entries.len());
        true
    }

    // == Remove ==
    /// Removes an entry by key, firing `will_remove` first.
    ///
    /// Removing an absent key is a no-op, not an error.
    pub fn remove(&mut self, key: &K) {
        match self.entries.get(key) {
            Some(entry) => self.fire_will_remove(key, &entry.value),
            None => return,
        }
        self.entries.remove(key);
        self.stats.set_total_entries(self.entries.len());
    }

    // == Bulk Load ==
    /// Merges a plain key/value mapping into the cache.
    ///
    /// Each pair goes through [`set`](Self::set), so the usual
    /// new-vs-existing and timer-reset rules apply per key. Existing keys
    /// not present in the input are left untouched.
    pub fn load_from_mapping(&mut self, mapping: impl IntoIterator<Item = (K, V)>) {
        for (key, value) in mapping {
            self.set(key, value);
        }
    }

    // == Bulk Export ==
    /// Snapshot of the live entries' values, keyed by their keys.
    ///
    /// Intentionally lossy: no tags, no timers. Entries already past their
    /// TTL are excluded even if the reaper has not swept them yet.
    pub fn export_mapping(&self) -> HashMap<K, V> {
        let now = self.clock.now_ms();
        self.entries
            .iter()
            .filter(|(_, entry)| !entry.is_expired(now, self.ttl_ms))
            .map(|(key, entry)| (key.clone(), entry.value.clone()))
            .collect()
    }

    // == Tags ==
    /// Sets a single tag on a live entry, creating or overwriting it.
    ///
    /// Returns `false` without effect if the key is absent or expired.
    pub fn set_value_for_tag(&mut self, key: &K, tag: impl Into<String>, value: TagValue) -> bool {
        let now = self.clock.now_ms();
        let ttl = self.ttl_ms;
        match self.entries.get_mut(key) {
            Some(entry) if !entry.is_expired(now, ttl) => {
                entry.tags.insert(tag.into(), value);
                true
            }
            _ => false,
        }
    }

    /// Looks up one tag value on a live entry.
    pub fn value_for_tag(&self, key: &K, tag: &str) -> Option<TagValue> {
        let now = self.clock.now_ms();
        self.entries
            .get(key)
            .filter(|entry| !entry.is_expired(now, self.ttl_ms))
            .and_then(|entry| entry.tags.get(tag).cloned())
    }

    /// Returns the full tag mapping for a live key.
    ///
    /// `Some(empty map)` means the key exists with no tags; `None` means
    /// the key is absent or expired. Callers must not conflate the two.
    pub fn tags_for_key(&self, key: &K) -> Option<TagMap> {
        let now = self.clock.now_ms();
        self.entries
            .get(key)
            .filter(|entry| !entry.is_expired(now, self.ttl_ms))
            .map(|entry| entry.tags.clone())
    }

    /// Replaces the entire tag mapping for a live key. This does NOT merge
    /// with the existing tags.
    ///
    /// Returns `false` without effect if the key is absent or expired.
    pub fn set_tags(&mut self, key: &K, tags: TagMap) -> bool {
        let now = self.clock.now_ms();
        let ttl = self.ttl_ms;
        match self.entries.get_mut(key) {
            Some(entry) if !entry.is_expired(now, ttl) => {
                entry.tags = tags;
                true
            }
            _ => false,
        }
    }

    // == Criteria Query ==
    /// Returns the values of all live entries whose tags satisfy every
    /// (tag, required value) pair in the criteria, keyed by their keys.
    ///
    /// Extra tags not mentioned in the criteria do not disqualify an entry.
    /// Empty criteria matches every live entry.
    pub fn dictionary_matching(&self, criteria: &Criteria) -> HashMap<K, V> {
        let now = self.clock.now_ms();
        self.entries
            .iter()
            .filter(|(_, entry)| !entry.is_expired(now, self.ttl_ms))
            .filter(|(_, entry)| {
                criteria
                    .iter()
                    .all(|(tag, required)| entry.tags.get(tag) == Some(required))
            })
            .map(|(key, entry)| (key.clone(), entry.value.clone()))
            .collect()
    }

    // == Sweep ==
    /// Keys whose entries are past their TTL right now.
    pub fn expired_keys(&self) -> Vec<K> {
        let now = self.clock.now_ms();
        self.entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(now, self.ttl_ms))
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Removes the entry for a key only if it is expired, firing
    /// `will_remove`. Returns whether an entry was removed.
    ///
    /// The predicate is re-checked here: between candidate collection and
    /// eviction a concurrent `set` or `get` may have refreshed the entry.
    pub fn remove_if_expired(&mut self, key: &K) -> bool {
        let now = self.clock.now_ms();
        let expired = self
            .entries
            .get(key)
            .map(|entry| entry.is_expired(now, self.ttl_ms))
            .unwrap_or(false);
        if !expired {
            return false;
        }

        if let Some(entry) = self.entries.get(key) {
            self.fire_will_remove(key, &entry.value);
        }
        self.entries.remove(key);
        self.stats.record_swept();
        self.stats.set_total_entries(self.entries.len());
        true
    }

    /// Removes all expired entries in one pass.
    ///
    /// Returns the number of entries removed. The background reaper uses
    /// the finer-grained [`expired_keys`](Self::expired_keys) /
    /// [`remove_if_expired`](Self::remove_if_expired) pair so it can yield
    /// the lock between batches; this is the single-lock-hold equivalent.
    pub fn sweep_expired(&mut self) -> usize {
        let keys = self.expired_keys();
        let mut removed = 0;
        for key in &keys {
            if self.remove_if_expired(key) {
                removed += 1;
            }
        }
        if removed > 0 {
            debug!("Sweep removed {} expired entries", removed);
        }
        removed
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.entries.len());
        stats
    }

    // == Length ==
    /// Number of entries physically present, expired-but-unswept included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // == Full-State Snapshot ==
    /// Captures the full cache state: configuration plus every entry with
    /// its tags and verbatim timestamps.
    ///
    /// Expired-but-unswept entries are included as-is; the restoring side's
    /// lazy expiration filters them (the plain mapping export, by contrast,
    /// excludes them).
    pub fn snapshot(&self) -> CacheSnapshot<K, V> {
        CacheSnapshot {
            taken_at: Utc::now(),
            ttl_ms: self.ttl_ms,
            reset_on_access: self.reset_on_access,
            reset_on_add: self.reset_on_add,
            entries: self
                .entries
                .iter()
                .map(|(key, entry)| EntryRecord {
                    key: key.clone(),
                    value: entry.value.clone(),
                    tags: entry.tags.clone(),
                    inserted_at_ms: entry.inserted_at,
                    last_touched_at_ms: entry.last_touched_at,
                })
                .collect(),
        }
    }

    /// Replaces the cache's entries and configuration with a snapshot's.
    ///
    /// Timestamps are restored verbatim, not reset to now, so expiration
    /// behaves exactly as it would have in the serialized store. The
    /// payload is validated up front; on error the prior state is left
    /// untouched. The observer, clock, and lifetime counters survive a
    /// restore.
    pub fn restore(&mut self, snapshot: CacheSnapshot<K, V>) -> Result<()> {
        snapshot.validate()?;

        let mut entries = HashMap::with_capacity(snapshot.entries.len());
        for record in snapshot.entries {
            entries.insert(
                record.key,
                CacheEntry {
                    value: record.value,
                    tags: record.tags,
                    inserted_at: record.inserted_at_ms,
                    last_touched_at: record.last_touched_at_ms,
                },
            );
        }

        self.entries = entries;
        self.ttl_ms = snapshot.ttl_ms;
        self.reset_on_access = snapshot.reset_on_access;
        self.reset_on_add = snapshot.reset_on_add;
        self.stats.set_total_entries(self.entries.len());
        debug!("Restored {} entries from snapshot", self.entries.len());
        Ok(())
    }

    // == Internal ==
    fn fire_will_remove(&self, key: &K, value: &V) {
        if let Some(obs) = &self.observer {
            notify("will_remove", || obs.will_remove(key, value));
        }
    }

    /// Lazy-expiration removal path: notify, delete, count.
    fn evict_expired(&mut self, key: &K) {
        if let Some(entry) = self.entries.get(key) {
            self.fire_will_remove(key, &entry.value);
        }
        self.entries.remove(key);
        self.stats.record_expired();
        self.stats.set_total_entries(self.entries.len());
    }
}

impl<K, V> ObjectCache<K, V>
where
    K: Eq + Hash + Clone + Serialize + DeserializeOwned,
    V: Clone + Serialize + DeserializeOwned,
{
    // == JSON Snapshot Codec ==
    /// Encodes the full cache state as self-describing JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.snapshot())?)
    }

    /// Restores the cache from [`to_json`](Self::to_json) output.
    ///
    /// Decode and validation failures leave the prior state untouched.
    pub fn restore_json(&mut self, json: &str) -> Result<()> {
        let snapshot: CacheSnapshot<K, V> = serde_json::from_str(json)?;
        self.restore(snapshot)
    }
}

// Bulk-set sugar: `cache.extend(mapping)` behaves as repeated `set`, the
// closest Rust rendering of keyed-subscript assignment.
impl<K, V> Extend<(K, V)> for ObjectCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn extend<T: IntoIterator<Item = (K, V)>>(&mut self, iter: T) {
        self.load_from_mapping(iter);
    }
}
