use super::memory::load_value;
use super::CacheMetrics;
use artifact_cache_application::ports::{CacheStore, ValueLoader};
use artifact_cache_domain::{CacheError, CacheKey, CacheValue};
use async_trait::async_trait;
use lru::LruCache;
use rustc_hash::FxBuildHasher;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// Store bounded by entry count, evicting the least recently used key.
pub struct LruStore {
    entries: Mutex<LruCache<CacheKey, CacheValue, FxBuildHasher>>,
    loader: Arc<dyn ValueLoader>,
    metrics: Arc<CacheMetrics>,
}

impl LruStore {
    pub fn new(capacity: NonZeroUsize, loader: Arc<dyn ValueLoader>) -> Self {
        Self {
            entries: Mutex::new(LruCache::with_hasher(capacity, FxBuildHasher)),
            loader,
            metrics: Arc::new(CacheMetrics::default()),
        }
    }

    /// Like [`LruStore::new`] but rejects a zero capacity.
    pub fn with_capacity(capacity: usize, loader: Arc<dyn ValueLoader>) -> Result<Self, CacheError> {
        let capacity = NonZeroUsize::new(capacity)
            .ok_or_else(|| CacheError::invalid("LRU capacity must be greater than 0"))?;
        Ok(Self::new(capacity, loader))
    }

    pub fn with_metrics(mut self, metrics: Arc<CacheMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn capacity(&self) -> usize {
        self.entries().cap().get()
    }

    fn entries(&self) -> MutexGuard<'_, LruCache<CacheKey, CacheValue, FxBuildHasher>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn store(&self, key: CacheKey, value: CacheValue) {
        if let Some((evicted, _)) = self.entries().push(key.clone(), value) {
            if evicted != key {
                debug!(group = %evicted.group_name(), resource_type = %evicted.resource_type(), "LRU eviction");
            }
        }
    }
}

#[async_trait]
impl CacheStore for LruStore {
    async fn get(&self, key: &CacheKey) -> Result<CacheValue, CacheError> {
        key.validate()?;
        let cached = self.entries().get(key).cloned();
        if let Some(value) = cached {
            CacheMetrics::incr(&self.metrics.hits);
            return Ok(value);
        }

        CacheMetrics::incr(&self.metrics.misses);
        let value = load_value(self.loader.as_ref(), &self.metrics, key).await?;
        self.store(key.clone(), value.clone());
        Ok(value)
    }

    /// Marks the key as recently used but never loads.
    fn peek(&self, key: &CacheKey) -> Result<Option<CacheValue>, CacheError> {
        key.validate()?;
        Ok(self.entries().get(key).cloned())
    }

    async fn refresh(&self, key: &CacheKey) -> Result<CacheValue, CacheError> {
        key.validate()?;
        let value = load_value(self.loader.as_ref(), &self.metrics, key).await?;
        self.store(key.clone(), value.clone());
        Ok(value)
    }

    fn contains(&self, key: &CacheKey) -> bool {
        self.entries().contains(key)
    }

    fn put(&self, key: CacheKey, value: CacheValue) -> Result<(), CacheError> {
        key.validate()?;
        self.store(key, value);
        Ok(())
    }

    fn remove(&self, key: &CacheKey) -> Option<CacheValue> {
        self.entries().pop(key)
    }

    fn clear(&self) {
        self.entries().clear();
    }

    fn len(&self) -> usize {
        self.entries().len()
    }

    fn destroy(&self) {
        self.entries().clear();
    }
}
