//! In-memory TTL cache for idempotent reads.
//!
//! Lives for one process. Expiry is checked on read, so the background sweep
//! only reclaims memory and is never needed for correctness.

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;

/// Sweep interval used by [`TtlCache::with_default_sweeper`].
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Cached read kinds. Keys are per kind, not per repository: one process
/// works on one repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReadKind {
    Labels,
    OpenIssues,
    OpenPullRequests,
    RepoStats,
    Contributors,
}

impl ReadKind {
    pub fn key(self) -> &'static str {
        match self {
            Self::Labels => "labels",
            Self::OpenIssues => "open-issues",
            Self::OpenPullRequests => "open-pull-requests",
            Self::RepoStats => "repo-stats",
            Self::Contributors => "contributors",
        }
    }

    pub fn ttl(self) -> Duration {
        const MINUTE: u64 = 60;
        match self {
            Self::Labels => Duration::from_secs(5 * MINUTE),
            Self::OpenIssues => Duration::from_secs(MINUTE),
            Self::OpenPullRequests => Duration::from_secs(MINUTE),
            Self::RepoStats => Duration::from_secs(5 * MINUTE),
            Self::Contributors => Duration::from_secs(10 * MINUTE),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub total: usize,
    pub valid: usize,
    pub expired: usize,
}

struct Entry {
    value: Arc<dyn Any + Send + Sync>,
    /// `None` when the TTL reaches past what `Instant` can represent.
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_fresh(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| now < at)
    }
}

type Store = Mutex<HashMap<String, Entry>>;

#[derive(Default)]
pub struct TtlCache {
    store: Arc<Store>,
}

impl std::fmt::Debug for TtlCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TtlCache").field("len", &self.len()).finish()
    }
}

impl TtlCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// A cache with a detached sweeper thread. The thread holds only a weak
    /// reference and exits on its next tick after the cache is dropped.
    pub fn with_sweeper(interval: Duration) -> Self {
        let cache = Self::new();
        let weak = Arc::downgrade(&cache.store);
        let spawned = thread::Builder::new()
            .name("agt-cache-sweeper".to_string())
            .spawn(move || sweep_loop(&weak, interval));
        if let Err(err) = spawned {
            debug!(err = %err, "cache sweeper not started");
        }
        cache
    }

    pub fn with_default_sweeper() -> Self {
        Self::with_sweeper(DEFAULT_SWEEP_INTERVAL)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fresh value for `key`, if any. An expired entry is evicted. A stored
    /// value of another type reads as absent.
    pub fn get<T: Clone + 'static>(&self, key: &str) -> Option<T> {
        let mut store = self.lock();
        let now = Instant::now();
        match store.get(key).map(|entry| entry.is_fresh(now)) {
            Some(true) => store
                .get(key)
                .and_then(|entry| entry.value.downcast_ref::<T>().cloned()),
            Some(false) => {
                store.remove(key);
                debug!(key, "cache entry expired");
                None
            }
            None => None,
        }
    }

    pub fn set<T: Send + Sync + 'static>(&self, key: &str, value: T, ttl: Duration) {
        let entry = Entry {
            value: Arc::new(value),
            expires_at: Instant::now().checked_add(ttl),
        };
        self.lock().insert(key.to_string(), entry);
    }

    /// Cached value if fresh; otherwise runs `producer` once and caches its
    /// success. Errors are returned and not cached.
    pub fn get_or_compute<T, E>(
        &self,
        key: &str,
        ttl: Duration,
        producer: impl FnOnce() -> Result<T, E>,
    ) -> Result<T, E>
    where
        T: Clone + Send + Sync + 'static,
    {
        if let Some(hit) = self.get::<T>(key) {
            debug!(key, "cache hit");
            return Ok(hit);
        }
        debug!(key, "cache miss");
        let value = producer()?;
        self.set(key, value.clone(), ttl);
        Ok(value)
    }

    /// Returns whether an entry was removed.
    pub fn invalidate(&self, key: &str) -> bool {
        let removed = self.lock().remove(key).is_some();
        if removed {
            debug!(key, "cache entry invalidated");
        }
        removed
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Stored entries, expired ones included until they are swept or read.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let store = self.lock();
        let now = Instant::now();
        let valid = store.values().filter(|e| e.is_fresh(now)).count();
        CacheStats {
            total: store.len(),
            valid,
            expired: store.len() - valid,
        }
    }

    /// Evicts expired entries; returns how many were removed.
    pub fn sweep(&self) -> usize {
        sweep_store(&self.store)
    }
}

fn sweep_store(store: &Store) -> usize {
    let mut map = store.lock().unwrap_or_else(PoisonError::into_inner);
    let now = Instant::now();
    let before = map.len();
    map.retain(|_, entry| entry.is_fresh(now));
    before - map.len()
}

fn sweep_loop(store: &Weak<Store>, interval: Duration) {
    loop {
        thread::sleep(interval);
        let Some(store) = store.upgrade() else {
            return;
        };
        let removed = sweep_store(&store);
        if removed > 0 {
            debug!(removed, "cache sweep");
        }
    }
}
