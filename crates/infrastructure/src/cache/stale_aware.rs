use super::CacheMetrics;
use artifact_cache_application::ports::{
    CacheLayer, CacheStore, InvalidationTarget, SchedulerFactory, TaskScheduler,
};
use artifact_cache_domain::{CacheError, CacheKey, CacheValue};
use artifact_cache_jobs::TokioScheduler;
use async_trait::async_trait;
use dashmap::DashMap;
use futures::FutureExt;
use rustc_hash::FxBuildHasher;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info_span, warn, Instrument, Span};

const SCHEDULER_NAME: &str = "stale-aware-cache";

/// Freshness of a cached key as seen by [`StaleAwareCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyStatus {
    Fresh,
    Stale,
    Refreshing,
}

/// Control flags of one key. A key without an entry is fresh.
#[derive(Default, Debug)]
struct KeyState {
    stale: AtomicBool,
    refreshing: AtomicBool,
}

impl KeyState {
    fn is_settled(&self) -> bool {
        !self.stale.load(Ordering::Acquire) && !self.refreshing.load(Ordering::Acquire)
    }
}

type StateMap = DashMap<CacheKey, Arc<KeyState>, FxBuildHasher>;

/// Ends a refresh. Dropping it without `succeed` (failure, or the task
/// never ran) puts the key back to stale so a later `get` retries.
struct RefreshLease {
    state: Arc<KeyState>,
    succeeded: bool,
}

impl RefreshLease {
    fn succeed(mut self) {
        self.succeeded = true;
    }
}

impl Drop for RefreshLease {
    fn drop(&mut self) {
        if !self.succeeded {
            self.state.stale.store(true, Ordering::Release);
        }
        self.state.refreshing.store(false, Ordering::Release);
    }
}

/// Stale-while-revalidate decorator.
///
/// `mark_as_stale` flags a cached key. The next `get` still returns the old
/// value right away and starts one background refresh through the decorated
/// store; every `get` until that refresh settles also returns the old value
/// without starting another one. Keys with no cached value load
/// synchronously through the decorated store.
pub struct StaleAwareCache {
    inner: Arc<dyn CacheStore>,
    states: Arc<StateMap>,
    scheduler: Arc<dyn TaskScheduler>,
    destroyed: AtomicBool,
    metrics: Arc<CacheMetrics>,
    span: Span,
}

impl StaleAwareCache {
    pub fn new(inner: Arc<dyn CacheStore>) -> Self {
        Self {
            inner,
            states: Arc::new(DashMap::with_hasher(FxBuildHasher)),
            scheduler: Arc::new(TokioScheduler::new(SCHEDULER_NAME)),
            destroyed: AtomicBool::new(false),
            metrics: Arc::new(CacheMetrics::default()),
            span: info_span!("stale_aware_cache"),
        }
    }

    /// Wraps `store` unless it already is a `StaleAwareCache`.
    pub fn decorate(store: Arc<dyn CacheStore>) -> Arc<dyn CacheStore> {
        if store.layer() == Some(CacheLayer::StaleAware) {
            return store;
        }
        Arc::new(Self::new(store))
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

    /// Flags `key` as outdated without touching its value. Returns false
    /// when nothing is cached for the key, since there is nothing to serve
    /// while revalidating.
    pub fn mark_as_stale(&self, key: &CacheKey) -> Result<bool, CacheError> {
        key.validate()?;
        if self.inner.peek(key)?.is_none() {
            debug!(
                parent: &self.span,
                group = %key.group_name(),
                resource_type = %key.resource_type(),
                "Nothing cached to mark as stale"
            );
            return Ok(false);
        }

        self.states
            .entry(key.clone())
            .or_default()
            .stale
            .store(true, Ordering::Release);
        debug!(
            parent: &self.span,
            group = %key.group_name(),
            resource_type = %key.resource_type(),
            "Marked as stale"
        );

        // More states than cached values means the store evicted some.
        if self.states.len() > self.inner.len() {
            self.prune_evicted();
        }
        Ok(true)
    }

    /// Drops the state of keys the decorated store no longer holds, unless
    /// a refresh is running for them. Returns how many were dropped.
    pub fn prune_evicted(&self) -> usize {
        let before = self.states.len();
        self.states.retain(|key, state| {
            state.refreshing.load(Ordering::Acquire) || self.inner.contains(key)
        });
        let removed = before.saturating_sub(self.states.len());
        if removed > 0 {
            debug!(parent: &self.span, removed, "Pruned state of evicted keys");
        }
        removed
    }

    /// `None` when nothing is cached for `key`.
    pub fn status(&self, key: &CacheKey) -> Result<Option<KeyStatus>, CacheError> {
        if self.inner.peek(key)?.is_none() {
            return Ok(None);
        }
        let status = match self.states.get(key) {
            Some(state) if state.refreshing.load(Ordering::Acquire) => KeyStatus::Refreshing,
            Some(state) if state.stale.load(Ordering::Acquire) => KeyStatus::Stale,
            _ => KeyStatus::Fresh,
        };
        Ok(Some(status))
    }

    /// Number of keys with stale or refreshing state.
    pub fn tracked_keys(&self) -> usize {
        self.states.len()
    }

    fn dispatch_refresh(&self, key: &CacheKey, state: Arc<KeyState>) {
        let lease = RefreshLease {
            state,
            succeeded: false,
        };
        let inner = Arc::clone(&self.inner);
        let states = Arc::clone(&self.states);
        let metrics = Arc::clone(&self.metrics);
        let task_key = key.clone();

        let task = async move {
            lease.state.stale.store(false, Ordering::Release);
            match inner.refresh(&task_key).await {
                Ok(_) => {
                    CacheMetrics::incr(&metrics.refreshes);
                    lease.succeed();
                    debug!(
                        group = %task_key.group_name(),
                        resource_type = %task_key.resource_type(),
                        "Stale value refreshed"
                    );
                }
                Err(e) => {
                    CacheMetrics::incr(&metrics.refresh_failures);
                    drop(lease);
                    warn!(
                        group = %task_key.group_name(),
                        resource_type = %task_key.resource_type(),
                        error = %e,
                        "Background refresh failed, serving stale value"
                    );
                }
            }
            states.remove_if(&task_key, |_, state| state.is_settled());
        }
        .instrument(self.span.clone())
        .boxed();

        // On error the task is dropped, and the lease with it.
        if let Err(e) = self.scheduler.schedule_once("refresh", Duration::ZERO, task) {
            warn!(
                parent: &self.span,
                group = %key.group_name(),
                resource_type = %key.resource_type(),
                error = %e,
                "Could not dispatch refresh"
            );
        }
    }
}

#[async_trait]
impl CacheStore for StaleAwareCache {
    async fn get(&self, key: &CacheKey) -> Result<CacheValue, CacheError> {
        key.validate()?;

        let state = self.states.get(key).map(|s| Arc::clone(s.value()));
        if let Some(state) = state {
            if let Some(cached) = self.inner.peek(key)? {
                if state.refreshing.load(Ordering::Acquire) {
                    CacheMetrics::incr(&self.metrics.stale_hits);
                    return Ok(cached);
                }
                if state.stale.load(Ordering::Acquire) {
                    if state
                        .refreshing
                        .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                        .is_ok()
                    {
                        self.dispatch_refresh(key, state);
                    }
                    CacheMetrics::incr(&self.metrics.stale_hits);
                    return Ok(cached);
                }
            } else {
                // evicted since it was marked; the cold load below is fresh
                self.states
                    .remove_if(key, |_, state| !state.refreshing.load(Ordering::Acquire));
            }
        }

        self.inner.get(key).await
    }

    fn peek(&self, key: &CacheKey) -> Result<Option<CacheValue>, CacheError> {
        self.inner.peek(key)
    }

    async fn refresh(&self, key: &CacheKey) -> Result<CacheValue, CacheError> {
        self.inner.refresh(key).await
    }

    fn contains(&self, key: &CacheKey) -> bool {
        self.inner.contains(key)
    }

    fn put(&self, key: CacheKey, value: CacheValue) -> Result<(), CacheError> {
        self.inner.put(key, value)
    }

    fn remove(&self, key: &CacheKey) -> Option<CacheValue> {
        self.states.remove(key);
        self.inner.remove(key)
    }

    fn clear(&self) {
        self.states.clear();
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
        self.states.clear();
        self.inner.destroy();
        debug!(parent: &self.span, "Stale-aware cache destroyed");
    }

    fn layer(&self) -> Option<CacheLayer> {
        Some(CacheLayer::StaleAware)
    }

    fn decorated(&self) -> Option<Arc<dyn CacheStore>> {
        Some(Arc::clone(&self.inner))
    }
}

impl InvalidationTarget for StaleAwareCache {
    fn invalidate(&self, key: &CacheKey) {
        if let Err(e) = self.mark_as_stale(key) {
            warn!(parent: &self.span, error = %e, "Could not mark changed key as stale");
        }
    }

    fn is_cached(&self, key: &CacheKey) -> bool {
        self.inner.contains(key)
    }
}
