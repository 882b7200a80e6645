use artifact_cache_application::ports::{
    InvalidationTarget, ResourceWatcher, SchedulerFactory, TaskScheduler,
};
use artifact_cache_domain::{CacheError, CacheKey};
use artifact_cache_jobs::TokioScheduler;
use async_trait::async_trait;
use dashmap::DashMap;
use futures::FutureExt;
use rustc_hash::FxBuildHasher;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock, Weak};
use std::time::Duration;
use tracing::{debug, info, info_span, warn, Instrument, Span};

const SCHEDULER_NAME: &str = "resource-watcher";

/// Baselines kept before the first sweep of evicted keys.
const PRUNE_FLOOR: usize = 64;

/// Computes a fingerprint of the inputs a key's artifact is built from,
/// e.g. a hash over the last-modified stamps of its resources.
#[async_trait]
pub trait Fingerprinter: Send + Sync {
    async fn fingerprint(&self, key: &CacheKey) -> Result<String, CacheError>;
}

/// Resource watcher comparing input fingerprints between checks.
///
/// The first check of a key records a baseline. Later checks that see a
/// different fingerprint invalidate the key on the bound target. Background
/// checks run on the watcher's own scheduler, one at a time per key.
///
/// Baselines of keys the target no longer caches are swept whenever the
/// number of baselines doubles, so memory follows the cache and not the set
/// of keys ever seen.
pub struct FingerprintWatcher {
    fingerprinter: Arc<dyn Fingerprinter>,
    target: OnceLock<Weak<dyn InvalidationTarget>>,
    known: DashMap<CacheKey, String, FxBuildHasher>,
    prune_at: AtomicUsize,
    in_flight: DashMap<CacheKey, (), FxBuildHasher>,
    scheduler: Arc<dyn TaskScheduler>,
    this: Weak<FingerprintWatcher>,
    span: Span,
}

impl FingerprintWatcher {
    pub fn new(fingerprinter: Arc<dyn Fingerprinter>) -> Arc<Self> {
        Self::with_scheduler_factory(fingerprinter, TokioScheduler::factory())
    }

    pub fn with_scheduler_factory(
        fingerprinter: Arc<dyn Fingerprinter>,
        factory: SchedulerFactory,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            fingerprinter,
            target: OnceLock::new(),
            known: DashMap::with_hasher(FxBuildHasher),
            prune_at: AtomicUsize::new(PRUNE_FLOOR),
            in_flight: DashMap::with_hasher(FxBuildHasher),
            scheduler: factory(SCHEDULER_NAME),
            this: this.clone(),
            span: info_span!("resource_watcher"),
        })
    }

    /// Sets the cache notified of changes. Held weakly so the cache can own
    /// the watcher. Only the first binding takes effect.
    pub fn bind<T>(&self, target: &Arc<T>) -> bool
    where
        T: InvalidationTarget + 'static,
    {
        let weak: Weak<T> = Arc::downgrade(target);
        self.target.set(weak).is_ok()
    }

    /// Forgets the baseline of `key`; its next check starts over.
    pub fn forget(&self, key: &CacheKey) {
        self.known.remove(key);
    }

    /// Number of keys with a recorded baseline.
    pub fn tracked_keys(&self) -> usize {
        self.known.len()
    }

    /// Drops baselines of keys the bound target no longer caches. A key
    /// loaded again gets a fresh baseline on its next check. Returns how
    /// many were dropped.
    pub fn prune_uncached(&self) -> usize {
        let before = self.known.len();
        match self.target.get() {
            None => return 0,
            Some(target) => match target.upgrade() {
                Some(target) => self.known.retain(|key, _| target.is_cached(key)),
                None => self.known.clear(),
            },
        }
        let removed = before.saturating_sub(self.known.len());
        if removed > 0 {
            debug!(parent: &self.span, removed, "Pruned baselines of evicted keys");
        }
        removed
    }

    fn maybe_prune(&self) {
        if self.known.len() <= self.prune_at.load(Ordering::Relaxed) {
            return;
        }
        self.prune_uncached();
        self.prune_at
            .store((self.known.len() * 2).max(PRUNE_FLOOR), Ordering::Relaxed);
    }

    pub fn destroy(&self) {
        self.scheduler.destroy();
        self.known.clear();
    }

    fn notify(&self, key: &CacheKey) {
        match self.target.get().and_then(Weak::upgrade) {
            Some(target) => target.invalidate(key),
            None => debug!(parent: &self.span, "No cache bound to resource watcher"),
        }
    }
}

#[async_trait]
impl ResourceWatcher for FingerprintWatcher {
    async fn check(&self, key: &CacheKey) -> Result<bool, CacheError> {
        let current = self.fingerprinter.fingerprint(key).await?;
        let previous = self.known.insert(key.clone(), current.clone());
        if previous.is_none() {
            self.maybe_prune();
        }

        match previous {
            Some(previous) if previous != current => {
                info!(
                    parent: &self.span,
                    group = %key.group_name(),
                    resource_type = %key.resource_type(),
                    "Resource change detected"
                );
                self.notify(key);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn try_async_check(&self, key: &CacheKey) -> Result<bool, CacheError> {
        if self.in_flight.insert(key.clone(), ()).is_some() {
            return Ok(false);
        }
        let Some(this) = self.this.upgrade() else {
            self.in_flight.remove(key);
            return Ok(false);
        };

        let task_key = key.clone();
        let task = async move {
            if let Err(e) = this.check(&task_key).await {
                warn!(
                    group = %task_key.group_name(),
                    resource_type = %task_key.resource_type(),
                    error = %e,
                    "Resource check failed"
                );
            }
            this.in_flight.remove(&task_key);
        }
        .instrument(self.span.clone())
        .boxed();

        match self.scheduler.schedule_once("check", Duration::ZERO, task) {
            Ok(_) => Ok(true),
            Err(e) => {
                self.in_flight.remove(key);
                Err(e)
            }
        }
    }
}
