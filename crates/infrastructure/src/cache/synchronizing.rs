use super::key_locks::KeyLocks;
use super::throttle::CheckThrottle;
use super::CacheMetrics;
use artifact_cache_application::ports::{
    CacheLayer, CacheStore, Clock, InvalidationTarget, ResourceWatcher, SchedulerFactory,
    SystemClock, TaskScheduler,
};
use artifact_cache_domain::{CacheError, CacheKey, CacheValue};
use artifact_cache_jobs::TokioScheduler;
use async_trait::async_trait;
use futures::FutureExt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info_span, warn, Span};

const SCHEDULER_NAME: &str = "synchronizing-cache";

/// Decorator that lets at most one load per key run at a time and drives
/// the resource watcher from the read path.
///
/// Hits are served without touching the per-key lock. A miss takes the lock
/// and asks the decorated store again, so callers queued behind a load get
/// the value it stored instead of loading a second time.
///
/// After every `get`, the watcher's `try_async_check` is called for the key
/// if the watch period is set and has elapsed since the last dispatch.
pub struct SynchronizingCache {
    inner: Arc<dyn CacheStore>,
    locks: KeyLocks,
    throttle: Arc<CheckThrottle>,
    watcher: Option<Arc<dyn ResourceWatcher>>,
    watch_period: Option<Duration>,
    clock: Arc<dyn Clock>,
    scheduler: Arc<dyn TaskScheduler>,
    pruning: AtomicBool,
    destroyed: AtomicBool,
    metrics: Arc<CacheMetrics>,
    span: Span,
}

impl SynchronizingCache {
    pub fn new(inner: Arc<dyn CacheStore>) -> Self {
        Self {
            inner,
            locks: KeyLocks::default(),
            throttle: Arc::new(CheckThrottle::default()),
            watcher: None,
            watch_period: None,
            clock: Arc::new(SystemClock),
            scheduler: Arc::new(TokioScheduler::new(SCHEDULER_NAME)),
            pruning: AtomicBool::new(false),
            destroyed: AtomicBool::new(false),
            metrics: Arc::new(CacheMetrics::default()),
            span: info_span!("synchronizing_cache"),
        }
    }

    /// Wraps `store` unless it already is a `SynchronizingCache`, in which
    /// case the same instance comes back.
    pub fn decorate(store: Arc<dyn CacheStore>) -> Arc<dyn CacheStore> {
        if store.layer() == Some(CacheLayer::Synchronizing) {
            return store;
        }
        Arc::new(Self::new(store))
    }

    pub fn with_watcher(mut self, watcher: Arc<dyn ResourceWatcher>) -> Self {
        self.watcher = Some(watcher);
        self
    }

    /// `None` or a zero duration disables watching.
    pub fn with_watch_period(mut self, period: Option<Duration>) -> Self {
        self.watch_period = period.filter(|p| !p.is_zero());
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_scheduler_factory(mut self, factory: SchedulerFactory) -> Self {
        self.scheduler = factory(SCHEDULER_NAME);
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<CacheMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn metrics(&self) -> Arc<CacheMetrics> {
        Arc::clone(&self.metrics)
    }

    pub fn watch_period(&self) -> Option<Duration> {
        self.watch_period
    }

    /// Number of keys holding throttle or lock state.
    pub fn tracked_keys(&self) -> usize {
        self.throttle.len() + self.locks.len()
    }

    fn after_lookup(&self, key: &CacheKey) {
        let (Some(watcher), Some(period)) = (&self.watcher, self.watch_period) else {
            return;
        };
        self.start_pruning(period);

        if !self.throttle.try_acquire(key, self.clock.now(), period) {
            return;
        }

        CacheMetrics::incr(&self.metrics.watcher_dispatches);
        match watcher.try_async_check(key) {
            Ok(dispatched) => {
                debug!(
                    parent: &self.span,
                    group = %key.group_name(),
                    resource_type = %key.resource_type(),
                    dispatched,
                    "Resource check requested"
                );
            }
            Err(e) => {
                CacheMetrics::incr(&self.metrics.watcher_failures);
                warn!(
                    parent: &self.span,
                    group = %key.group_name(),
                    resource_type = %key.resource_type(),
                    error = %e,
                    "Resource check failed"
                );
            }
        }
    }

    /// Throttle entries older than one period are dropped every period.
    fn start_pruning(&self, period: Duration) {
        if self.pruning.swap(true, Ordering::AcqRel) {
            return;
        }

        let throttle = Arc::clone(&self.throttle);
        let clock = Arc::clone(&self.clock);
        let span = self.span.clone();
        let task = Arc::new(move || {
            let removed = throttle.prune(clock.now(), period);
            if removed > 0 {
                debug!(parent: &span, removed, "Pruned resource check timestamps");
            }
            async {}.boxed()
        });

        if let Err(e) = self.scheduler.schedule("prune-check-timestamps", period, task) {
            debug!(parent: &self.span, error = %e, "Timestamp pruning not scheduled");
        }
    }
}

#[async_trait]
impl CacheStore for SynchronizingCache {
    async fn get(&self, key: &CacheKey) -> Result<CacheValue, CacheError> {
        key.validate()?;

        let result = match self.inner.peek(key)? {
            Some(value) => {
                CacheMetrics::incr(&self.metrics.hits);
                Ok(value)
            }
            None => self.locks.run(key, self.inner.get(key)).await,
        };

        self.after_lookup(key);
        result
    }

    fn peek(&self, key: &CacheKey) -> Result<Option<CacheValue>, CacheError> {
        self.inner.peek(key)
    }

    async fn refresh(&self, key: &CacheKey) -> Result<CacheValue, CacheError> {
        key.validate()?;
        self.locks.run(key, self.inner.refresh(key)).await
    }

    fn contains(&self, key: &CacheKey) -> bool {
        self.inner.contains(key)
    }

    fn put(&self, key: CacheKey, value: CacheValue) -> Result<(), CacheError> {
        self.inner.put(key, value)
    }

    fn remove(&self, key: &CacheKey) -> Option<CacheValue> {
        self.throttle.forget(key);
        self.inner.remove(key)
    }

    fn clear(&self) {
        self.throttle.clear();
        self.inner.clear();
    }

    fn len(&self) -> usize {
        self.inner.len()
    }

    fn destroy(&self) {
        if self.destroyed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.scheduler.destroy();
        self.throttle.clear();
        self.inner.destroy();
        debug!(parent: &self.span, "Synchronizing cache destroyed");
    }

    fn layer(&self) -> Option<CacheLayer> {
        Some(CacheLayer::Synchronizing)
    }

    fn decorated(&self) -> Option<Arc<dyn CacheStore>> {
        Some(Arc::clone(&self.inner))
    }
}

/// Without a stale-aware layer, changed inputs evict the key so the next
/// `get` rebuilds it.
impl InvalidationTarget for SynchronizingCache {
    fn invalidate(&self, key: &CacheKey) {
        if self.remove(key).is_some() {
            debug!(
                parent: &self.span,
                group = %key.group_name(),
                resource_type = %key.resource_type(),
                "Evicted after resource change"
            );
        }
    }

    fn is_cached(&self, key: &CacheKey) -> bool {
        self.inner.contains(key)
    }
}
