//! Integration Tests for the Cache
//!
//! Exercises the cache through its public surface the way an embedding
//! application would: shared behind `Arc<RwLock<_>>`, with the reaper
//! running, an observer registered, and state persisted across "restarts".

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::json;
use tokio::sync::RwLock;

use tagcache::{
    spawn_reaper, CacheConfig, CacheObserver, Clock, Criteria, ManualClock, ObjectCache,
};

// == Helper Functions ==

type SharedCache = Arc<RwLock<ObjectCache<String, String>>>;

/// Installs a subscriber so `RUST_LOG=debug cargo test` shows reaper activity.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tagcache=warn".into()),
        )
        .try_init();
}

fn shared_cache(ttl: Duration) -> SharedCache {
    Arc::new(RwLock::new(ObjectCache::new(CacheConfig::with_ttl(ttl))))
}

fn frozen_cache(ttl: Duration) -> (ObjectCache<String, String>, ManualClock) {
    let (clock, handle) = Clock::manual(0);
    (
        ObjectCache::with_clock(CacheConfig::with_ttl(ttl), clock),
        handle,
    )
}

// == Concurrency Tests ==

#[tokio::test]
async fn test_concurrent_readers_and_writers() {
    let cache = shared_cache(Duration::from_secs(300));

    let mut handles = Vec::new();
    for task in 0..8 {
        let cache = cache.clone();
        handles.push(tokio::spawn(async move {
            for i in 0..50 {
                let key = format!("key_{}_{}", task, i);
                {
                    let mut guard = cache.write().await;
                    assert!(guard.set(key.clone(), format!("value_{}", i)));
                }
                {
                    let mut guard = cache.write().await;
                    assert_eq!(guard.get(&key), Some(format!("value_{}", i)));
                }
                {
                    let guard = cache.read().await;
                    let _ = guard.export_mapping();
                    let _ = guard.dictionary_matching(&Criteria::new());
                }
            }
        }));
    }

    for handle in handles {
        handle.await.expect("Task should not panic");
    }

    let guard = cache.read().await;
    assert_eq!(guard.len(), 8 * 50);
    let stats = guard.stats();
    assert_eq!(stats.hits, 8 * 50);
    assert_eq!(stats.misses, 0);
}

#[tokio::test]
async fn test_same_key_mutations_serialize_cleanly() {
    let cache = shared_cache(Duration::from_secs(300));

    {
        let mut guard = cache.write().await;
        guard.set("contested".to_string(), "initial".to_string());
    }

    let mut handles = Vec::new();
    for task in 0..10 {
        let cache = cache.clone();
        handles.push(tokio::spawn(async move {
            let mut guard = cache.write().await;
            guard.set("contested".to_string(), format!("writer_{}", task));
        }));
    }
    for handle in handles {
        handle.await.expect("Task should not panic");
    }

    // One complete value from some writer, never a torn or missing one
    let mut guard = cache.write().await;
    let value = guard.get(&"contested".to_string()).expect("key must survive");
    assert!(value.starts_with("writer_"));
    assert_eq!(guard.len(), 1);
}

// == Reaper Tests ==

#[tokio::test]
async fn test_reaper_reclaims_unread_keys() {
    init_tracing();
    let cache = shared_cache(Duration::from_millis(150));

    {
        let mut guard = cache.write().await;
        for i in 0..20 {
            guard.set(format!("ephemeral_{}", i), "value".to_string());
        }
    }

    let reaper = spawn_reaper(cache.clone(), Duration::from_millis(100));
    tokio::time::sleep(Duration::from_millis(600)).await;

    {
        // Nothing ever read these keys; the reaper alone reclaimed them
        let guard = cache.read().await;
        assert!(guard.is_empty());
        assert_eq!(guard.stats().swept, 20);
    }

    reaper.stopped().await;
}

#[tokio::test]
async fn test_foreground_set_wins_against_reaper() {
    let mut config = CacheConfig::with_ttl(Duration::from_millis(250));
    config.reset_on_add = true;
    let cache: SharedCache = Arc::new(RwLock::new(ObjectCache::new(config)));

    let reaper = spawn_reaper(cache.clone(), Duration::from_millis(50));

    // Keep re-adding the key faster than it can expire
    for _ in 0..10 {
        {
            let mut guard = cache.write().await;
            guard.set("refreshed".to_string(), "value".to_string());
        }
        tokio::time::sleep(Duration::from_millis(60)).await;
    }

    {
        let mut guard = cache.write().await;
        assert_eq!(
            guard.get(&"refreshed".to_string()),
            Some("value".to_string())
        );
    }

    reaper.stopped().await;
}

// == Observer Tests ==

#[derive(Default)]
struct EventLog {
    events: Mutex<Vec<String>>,
}

impl CacheObserver<String, String> for EventLog {
    fn did_add(&self, key: &String, _value: &String) {
        self.events.lock().unwrap().push(format!("add:{}", key));
    }
    fn will_remove(&self, key: &String, _value: &String) {
        self.events.lock().unwrap().push(format!("remove:{}", key));
    }
    fn will_access(&self, key: &String, _value: &String) {
        self.events.lock().unwrap().push(format!("access:{}", key));
    }
}

#[tokio::test]
async fn test_observer_sees_reaper_evictions() {
    let cache = shared_cache(Duration::from_millis(100));
    let log = Arc::new(EventLog::default());

    {
        let mut guard = cache.write().await;
        guard.set_observer(log.clone());
        guard.set("doomed".to_string(), "value".to_string());
    }

    let reaper = spawn_reaper(cache.clone(), Duration::from_millis(80));
    tokio::time::sleep(Duration::from_millis(400)).await;
    reaper.stopped().await;

    let events = log.events.lock().unwrap().clone();
    assert_eq!(events, vec!["add:doomed", "remove:doomed"]);
}

// == Persistence Tests ==

#[test]
fn test_full_state_survives_a_restart() {
    let (mut cache, clock) = frozen_cache(Duration::from_secs(60));

    cache.set("stale".to_string(), "old".to_string());
    clock.set(45_000);
    cache.set("fresh".to_string(), "new".to_string());
    cache.set_value_for_tag(&"fresh".to_string(), "color", json!("blue"));

    // "Process restart": serialize, rebuild from scratch, restore
    let saved = cache.to_json().unwrap();
    drop(cache);

    let (mut revived, revived_clock) = frozen_cache(Duration::from_secs(3600));
    revived.restore_json(&saved).unwrap();
    revived_clock.set(45_000);

    // Configuration came back with the data
    assert_eq!(revived.ttl(), Some(Duration::from_secs(60)));

    // Both entries live at the frozen instant, with tags intact
    assert_eq!(revived.get(&"stale".to_string()), Some("old".to_string()));
    assert_eq!(
        revived.value_for_tag(&"fresh".to_string(), "color"),
        Some(json!("blue"))
    );

    // Timers were restored verbatim: "stale" dies at its original deadline
    revived_clock.set(61_000);
    assert_eq!(revived.get(&"stale".to_string()), None);
    assert_eq!(revived.get(&"fresh".to_string()), Some("new".to_string()));
}

#[test]
fn test_plain_mapping_interchange_is_lossy_by_design() {
    let (mut cache, _) = frozen_cache(Duration::from_secs(60));

    cache.set("a".to_string(), "1".to_string());
    cache.set_value_for_tag(&"a".to_string(), "color", json!("blue"));

    let mapping: HashMap<String, String> = cache.export_mapping();

    let (mut other, _) = frozen_cache(Duration::from_secs(60));
    other.load_from_mapping(mapping);

    // Values travel; tags do not
    assert_eq!(other.get(&"a".to_string()), Some("1".to_string()));
    assert_eq!(other.value_for_tag(&"a".to_string(), "color"), None);
}

// == Collaborator-Style Usage ==

/// The discovered-peripheral record a scanning component would store.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
struct DeviceRecord {
    name: String,
    rssi: i32,
}

#[test]
fn test_keyed_store_usage_ages_out_unseen_devices() {
    // A scanner inserts records under a stable identifier and relies on
    // the cache's own expiration to forget devices no longer seen.
    let (clock, handle) = Clock::manual(0);
    let mut devices: ObjectCache<String, DeviceRecord> =
        ObjectCache::with_clock(CacheConfig::with_ttl(Duration::from_secs(30)), clock);

    let beacon = DeviceRecord {
        name: "beacon-17".to_string(),
        rssi: -54,
    };
    assert!(devices.set("D4:3A:2C".to_string(), beacon.clone()));
    assert_eq!(devices.get(&"D4:3A:2C".to_string()), Some(beacon.clone()));

    // Seen again: record refreshed in place, not re-added
    handle.set(20_000);
    assert!(!devices.set("D4:3A:2C".to_string(), DeviceRecord { rssi: -61, ..beacon }));

    // Never seen after that: gone once the TTL lapses
    handle.set(55_000);
    assert_eq!(devices.get(&"D4:3A:2C".to_string()), None);
    assert!(devices.export_mapping().is_empty());
}
