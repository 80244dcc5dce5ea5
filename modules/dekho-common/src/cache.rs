//! Time-boxed caches for backend reads.
//!
//! Two shapes: a whole-set snapshot (the active ad set) and a keyed map of
//! query results (per-path SEO records). Both treat an entry as usable until
//! its staleness window runs out; nothing is invalidated by writes.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwapOption;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::error::DekhoError;

/// A loaded value and when it was loaded.
pub struct Snapshot<T> {
    pub value: T,
    pub loaded_at: Instant,
}

/// Holds the latest snapshot of a whole data set. A stale snapshot is
/// reloaded on next access; only one reload runs at a time and readers racing
/// it keep the previous snapshot.
pub struct SnapshotCache<T> {
    inner: ArcSwapOption<Snapshot<T>>,
    reloading: AtomicBool,
    ttl: Duration,
}

impl<T> SnapshotCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: ArcSwapOption::empty(),
            reloading: AtomicBool::new(false),
            ttl,
        }
    }

    fn is_fresh(&self, snap: &Snapshot<T>) -> bool {
        snap.loaded_at.elapsed() < self.ttl
    }

    /// Return the current snapshot, reloading through `load` if it is stale.
    /// A failed reload falls back to the stale snapshot when there is one.
    pub async fn get<F, Fut>(&self, load: F) -> Result<Arc<Snapshot<T>>, DekhoError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, DekhoError>>,
    {
        let current = self.inner.load_full();
        if let Some(snap) = &current {
            if self.is_fresh(snap) {
                return Ok(snap.clone());
            }
        }

        let guard = ReloadGuard::acquire(&self.reloading);
        if guard.is_none() {
            if let Some(snap) = current {
                return Ok(snap);
            }
        }

        let result = load().await;
        drop(guard);

        match result {
            Ok(value) => {
                let snap = Arc::new(Snapshot {
                    value,
                    loaded_at: Instant::now(),
                });
                self.inner.store(Some(snap.clone()));
                info!("Snapshot cache reloaded");
                Ok(snap)
            }
            Err(e) => match current {
                Some(stale) => {
                    warn!(error = %e, "Snapshot reload failed, serving stale data");
                    Ok(stale)
                }
                None => Err(e),
            },
        }
    }

    /// Drop the snapshot so the next access reloads.
    pub fn invalidate(&self) {
        self.inner.store(None);
    }
}

/// Clears the reload flag when dropped, including when the loading request
/// is cancelled mid-await.
struct ReloadGuard<'a>(&'a AtomicBool);

impl<'a> ReloadGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| ReloadGuard(flag))
    }
}

impl Drop for ReloadGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Query results keyed by their parameters, each with its own load time.
pub struct TtlCache<K, V> {
    entries: RwLock<HashMap<K, (Instant, V)>>,
    ttl: Duration,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    pub async fn get(&self, key: &K) -> Option<V> {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|(at, _)| at.elapsed() < self.ttl)
            .map(|(_, v)| v.clone())
    }

    pub async fn insert(&self, key: K, value: V) {
        let mut entries = self.entries.write().await;
        // Sweep expired entries on write so the map stays bounded by live keys.
        let ttl = self.ttl;
        entries.retain(|_, (at, _)| at.elapsed() < ttl);
        entries.insert(key, (Instant::now(), value));
    }

    /// Cached value for `key`, or the result of `load` which is then cached.
    /// Errors are not cached.
    pub async fn get_or_try_insert_with<F, Fut>(&self, key: K, load: F) -> Result<V, DekhoError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, DekhoError>>,
    {
        if let Some(v) = self.get(&key).await {
            return Ok(v);
        }
        let value = load().await?;
        self.insert(key, value.clone()).await;
        Ok(value)
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}
