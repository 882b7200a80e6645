use super::CacheMetrics;
use artifact_cache_application::ports::{CacheStore, ValueLoader};
use artifact_cache_domain::{CacheError, CacheKey, CacheValue};
use async_trait::async_trait;
use dashmap::DashMap;
use rustc_hash::FxBuildHasher;
use std::sync::Arc;
use tracing::{debug, warn};

/// Runs the loader for `key`, counting the attempt.
pub(crate) async fn load_value(
    loader: &dyn ValueLoader,
    metrics: &CacheMetrics,
    key: &CacheKey,
) -> Result<CacheValue, CacheError> {
    CacheMetrics::incr(&metrics.loads);
    match loader.load(key).await {
        Ok(value) => {
            debug!(
                group = %key.group_name(),
                resource_type = %key.resource_type(),
                bytes = value.len(),
                "Artifact loaded"
            );
            Ok(value)
        }
        Err(e) => {
            CacheMetrics::incr(&metrics.load_failures);
            warn!(
                group = %key.group_name(),
                resource_type = %key.resource_type(),
                error = %e,
                "Artifact load failed"
            );
            Err(e)
        }
    }
}

/// Unbounded in-memory store.
///
/// Concurrent cold reads of one key may each run the loader; wrap the store
/// in a `SynchronizingCache` to collapse them.
pub struct MemoryStore {
    entries: DashMap<CacheKey, CacheValue, FxBuildHasher>,
    loader: Arc<dyn ValueLoader>,
    metrics: Arc<CacheMetrics>,
}

impl MemoryStore {
    pub fn new(loader: Arc<dyn ValueLoader>) -> Self {
        Self {
            entries: DashMap::with_hasher(FxBuildHasher),
            loader,
            metrics: Arc::new(CacheMetrics::default()),
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<CacheMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn metrics(&self) -> Arc<CacheMetrics> {
        Arc::clone(&self.metrics)
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &CacheKey) -> Result<CacheValue, CacheError> {
        key.validate()?;
        if let Some(value) = self.entries.get(key).map(|e| e.value().clone()) {
            CacheMetrics::incr(&self.metrics.hits);
            return Ok(value);
        }

        CacheMetrics::incr(&self.metrics.misses);
        let value = load_value(self.loader.as_ref(), &self.metrics, key).await?;
        self.entries.insert(key.clone(), value.clone());
        Ok(value)
    }

    fn peek(&self, key: &CacheKey) -> Result<Option<CacheValue>, CacheError> {
        key.validate()?;
        Ok(self.entries.get(key).map(|e| e.value().clone()))
    }

    async fn refresh(&self, key: &CacheKey) -> Result<CacheValue, CacheError> {
        key.validate()?;
        let value = load_value(self.loader.as_ref(), &self.metrics, key).await?;
        self.entries.insert(key.clone(), value.clone());
        Ok(value)
    }

    fn contains(&self, key: &CacheKey) -> bool {
        self.entries.contains_key(key)
    }

    fn put(&self, key: CacheKey, value: CacheValue) -> Result<(), CacheError> {
        key.validate()?;
        self.entries.insert(key, value);
        Ok(())
    }

    fn remove(&self, key: &CacheKey) -> Option<CacheValue> {
        self.entries.remove(key).map(|(_, value)| value)
    }

    fn clear(&self) {
        self.entries.clear();
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn destroy(&self) {
        self.entries.clear();
    }
}
