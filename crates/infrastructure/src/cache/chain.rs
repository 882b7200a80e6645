use super::{
    CacheMetrics, KeyStatus, LruStore, MemoryStore, StaleAwareCache, SynchronizingCache,
};
use crate::watcher::{FingerprintWatcher, Fingerprinter};
use artifact_cache_application::ports::{
    CacheStore, Clock, ResourceWatcher, SchedulerFactory, SystemClock, ValueLoader,
};
use artifact_cache_domain::{CacheConfig, CacheError, CacheKey, CacheValue, StoreKind};
use artifact_cache_jobs::TokioScheduler;
use std::sync::Arc;
use tracing::info;

/// Assembles store → `SynchronizingCache` → optional `StaleAwareCache`
/// from configuration.
pub struct CacheChainBuilder {
    config: CacheConfig,
    loader: Arc<dyn ValueLoader>,
    watcher: WatcherSource,
    clock: Arc<dyn Clock>,
    scheduler_factory: SchedulerFactory,
    metrics: Arc<CacheMetrics>,
}

enum WatcherSource {
    None,
    Fingerprint(Arc<dyn Fingerprinter>),
    Custom(Arc<dyn ResourceWatcher>),
}

impl CacheChainBuilder {
    pub fn new(config: CacheConfig, loader: Arc<dyn ValueLoader>) -> Self {
        Self {
            config,
            loader,
            watcher: WatcherSource::None,
            clock: Arc::new(SystemClock),
            scheduler_factory: TokioScheduler::factory(),
            metrics: Arc::new(CacheMetrics::default()),
        }
    }

    /// Watch inputs with a [`FingerprintWatcher`] bound to the chain.
    pub fn with_fingerprinter(mut self, fingerprinter: Arc<dyn Fingerprinter>) -> Self {
        self.watcher = WatcherSource::Fingerprint(fingerprinter);
        self
    }

    /// Use an externally managed watcher instead.
    pub fn with_watcher(mut self, watcher: Arc<dyn ResourceWatcher>) -> Self {
        self.watcher = WatcherSource::Custom(watcher);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_scheduler_factory(mut self, factory: SchedulerFactory) -> Self {
        self.scheduler_factory = factory;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<CacheMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn build(self) -> Result<CacheChain, CacheError> {
        let store: Arc<dyn CacheStore> = match self.config.store {
            StoreKind::Memory => {
                Arc::new(MemoryStore::new(self.loader).with_metrics(Arc::clone(&self.metrics)))
            }
            StoreKind::Lru => Arc::new(
                LruStore::with_capacity(self.config.lru_capacity, self.loader)?
                    .with_metrics(Arc::clone(&self.metrics)),
            ),
        };

        let (watcher, fingerprint_watcher): (Option<Arc<dyn ResourceWatcher>>, _) =
            match self.watcher {
                WatcherSource::None => (None, None),
                WatcherSource::Custom(watcher) => (Some(watcher), None),
                WatcherSource::Fingerprint(fingerprinter) => {
                    let watcher = FingerprintWatcher::with_scheduler_factory(
                        fingerprinter,
                        Arc::clone(&self.scheduler_factory),
                    );
                    (Some(watcher.clone() as Arc<dyn ResourceWatcher>), Some(watcher))
                }
            };

        let mut synchronizing = SynchronizingCache::new(store)
            .with_watch_period(self.config.watch_period())
            .with_clock(self.clock)
            .with_scheduler_factory(Arc::clone(&self.scheduler_factory))
            .with_metrics(Arc::clone(&self.metrics));
        if let Some(watcher) = watcher {
            synchronizing = synchronizing.with_watcher(watcher);
        }
        let synchronizing = Arc::new(synchronizing);

        let stale = self.config.stale_while_revalidate.then(|| {
            Arc::new(
                StaleAwareCache::new(synchronizing.clone())
                    .with_scheduler_factory(Arc::clone(&self.scheduler_factory))
                    .with_metrics(Arc::clone(&self.metrics)),
            )
        });

        if let Some(watcher) = &fingerprint_watcher {
            match &stale {
                Some(stale) => watcher.bind(stale),
                None => watcher.bind(&synchronizing),
            };
        }

        let top: Arc<dyn CacheStore> = match &stale {
            Some(stale) => stale.clone(),
            None => synchronizing.clone(),
        };

        info!(
            store = ?self.config.store,
            watch_period_ms = self.config.watch_period_ms,
            stale_while_revalidate = stale.is_some(),
            "Cache chain built"
        );

        Ok(CacheChain {
            top,
            synchronizing,
            stale,
            watcher: fingerprint_watcher,
            metrics: self.metrics,
        })
    }
}

/// A built decorator chain plus the watcher it owns.
pub struct CacheChain {
    top: Arc<dyn CacheStore>,
    synchronizing: Arc<SynchronizingCache>,
    stale: Option<Arc<StaleAwareCache>>,
    watcher: Option<Arc<FingerprintWatcher>>,
    metrics: Arc<CacheMetrics>,
}

impl CacheChain {
    pub async fn get(&self, key: &CacheKey) -> Result<CacheValue, CacheError> {
        self.top.get(key).await
    }

    pub fn put(&self, key: CacheKey, value: CacheValue) -> Result<(), CacheError> {
        self.top.put(key, value)
    }

    pub fn remove(&self, key: &CacheKey) -> Option<CacheValue> {
        self.top.remove(key)
    }

    pub fn clear(&self) {
        self.top.clear();
    }

    /// Marks `key` stale, or evicts it when the chain has no stale-aware
    /// layer. Returns whether anything was cached for the key.
    pub fn mark_as_stale(&self, key: &CacheKey) -> Result<bool, CacheError> {
        match &self.stale {
            Some(stale) => stale.mark_as_stale(key),
            None => {
                key.validate()?;
                Ok(self.synchronizing.remove(key).is_some())
            }
        }
    }

    /// Freshness of `key`; chains without a stale-aware layer only ever
    /// report `Fresh`.
    pub fn status(&self, key: &CacheKey) -> Result<Option<KeyStatus>, CacheError> {
        match &self.stale {
            Some(stale) => stale.status(key),
            None => Ok(self.top.peek(key)?.map(|_| KeyStatus::Fresh)),
        }
    }

    /// Outermost store of the chain.
    pub fn store(&self) -> Arc<dyn CacheStore> {
        Arc::clone(&self.top)
    }

    pub fn metrics(&self) -> Arc<CacheMetrics> {
        Arc::clone(&self.metrics)
    }

    pub fn len(&self) -> usize {
        self.top.len()
    }

    pub fn is_empty(&self) -> bool {
        self.top.is_empty()
    }

    pub fn destroy(&self) {
        self.top.destroy();
        if let Some(watcher) = &self.watcher {
            watcher.destroy();
        }
    }
}
