use artifact_cache_domain::CacheKey;
use dashmap::DashMap;
use rustc_hash::FxBuildHasher;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;

type KeyLock = Arc<Mutex<()>>;

/// One async mutex per key, created on first use and dropped as soon as
/// nobody holds or waits for it. The map never outgrows the set of keys with
/// work in progress.
#[derive(Default)]
pub(crate) struct KeyLocks {
    locks: DashMap<CacheKey, KeyLock, FxBuildHasher>,
}

struct Lease<'a> {
    locks: &'a KeyLocks,
    key: &'a CacheKey,
    lock: KeyLock,
}

impl Drop for Lease<'_> {
    fn drop(&mut self) {
        // Two references left means only the map and this lease: no waiter.
        self.locks
            .locks
            .remove_if(self.key, |_, lock| Arc::strong_count(lock) <= 2);
    }
}

impl KeyLocks {
    /// Runs `work` while holding the lock of `key`.
    pub(crate) async fn run<F, T>(&self, key: &CacheKey, work: F) -> T
    where
        F: Future<Output = T>,
    {
        let lease = Lease {
            locks: self,
            key,
            lock: Arc::clone(self.locks.entry(key.clone()).or_default().value()),
        };
        let _guard = lease.lock.lock().await;
        work.await
    }

    pub(crate) fn len(&self) -> usize {
        self.locks.len()
    }
}
