//! Reaper Task
//!
//! Background task that periodically evicts expired cache entries.
//!
//! Lazy expiration already makes stale entries invisible to readers; the
//! reaper exists to reclaim the memory of entries nobody re-reads. It uses
//! the same expiration predicate as the lazy path, collects candidates
//! under a read lock, and evicts in small batches so the write lock is
//! never held across a whole sweep.

use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::ObjectCache;

/// Keys evicted per write-lock acquisition during a sweep.
const SWEEP_BATCH: usize = 64;

// == Reaper Handle ==
/// Controls a running reaper task.
///
/// Dropping the handle also stops the reaper: the shutdown channel closes
/// and the loop exits before its next sweep.
#[derive(Debug)]
pub struct ReaperHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl ReaperHandle {
    /// Signals the reaper to stop. An in-flight sweep finishes; no further
    /// sweeps are scheduled.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }

    /// Signals shutdown and waits for the task to exit.
    pub async fn stopped(self) {
        self.shutdown();
        let _ = self.task.await;
    }

    /// Forcibly aborts the task, in-flight sweep included.
    pub fn abort(&self) {
        self.task.abort();
    }

    /// Whether the reaper task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Spawns a background task that periodically evicts expired cache entries.
///
/// The task sleeps for `interval` between sweeps. Each sweep collects the
/// expired keys under a read lock, then removes them in batches of
/// [`SWEEP_BATCH`], releasing the write lock and yielding between batches
/// so foreground operations are never starved. Every key is re-checked
/// against the expiration predicate under the write lock, since a
/// concurrent `set` or `get` may have refreshed it. `will_remove` fires
/// for each evicted entry.
///
/// # Arguments
/// * `cache` - Shared reference to the cache
/// * `interval` - Time between sweeps (typically coarser than the TTL)
///
/// # Example
/// ```ignore
/// let config = CacheConfig::from_env();
/// let interval = config.sweep_interval;
/// let cache = Arc::new(RwLock::new(ObjectCache::new(config)));
/// let reaper = spawn_reaper(cache.clone(), interval);
/// // Later, during shutdown:
/// reaper.stopped().await;
/// ```
pub fn spawn_reaper<K, V>(
    cache: Arc<RwLock<ObjectCache<K, V>>>,
    interval: Duration,
) -> ReaperHandle
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

    let task = tokio::spawn(async move {
        info!("Starting reaper with interval of {:?}", interval);

        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => break,
                _ = tokio::time::sleep(interval) => {}
            }

            let candidates = { cache.read().await.expired_keys() };
            if candidates.is_empty() {
                debug!("Reaper sweep: no expired entries found");
                continue;
            }

            let mut removed = 0;
            for batch in candidates.chunks(SWEEP_BATCH) {
                {
                    let mut guard = cache.write().await;
                    for key in batch {
                        if guard.remove_if_expired(key) {
                            removed += 1;
                        }
                    }
                }
                // Lock released; let foreground operations in
                tokio::task::yield_now().await;
            }

            info!("Reaper sweep: removed {} expired entries", removed);
        }

        info!("Reaper stopped");
    });

    ReaperHandle {
        shutdown: shutdown_tx,
        task,
    }
}
