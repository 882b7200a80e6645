use artifact_cache_domain::{CacheError, CacheKey, CacheValue};
use async_trait::async_trait;
use std::sync::Arc;

/// Marker a decorator reports so that decorating twice can be detected
/// without inspecting concrete types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheLayer {
    Synchronizing,
    StaleAware,
}

/// Key to value store with load-on-miss semantics.
///
/// Plain stores and the decorators wrapping them share this contract, so
/// decorators can be stacked in any order.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Returns the cached value, loading and storing it on a miss.
    ///
    /// # Errors
    ///
    /// * `CacheError::InvalidArgument` - If `key` does not name a group
    /// * `CacheError::Load` - If the loader fails; nothing is stored
    async fn get(&self, key: &CacheKey) -> Result<CacheValue, CacheError>;

    /// Returns the cached value without loading.
    ///
    /// # Errors
    ///
    /// * `CacheError::InvalidArgument` - If `key` does not name a group
    fn peek(&self, key: &CacheKey) -> Result<Option<CacheValue>, CacheError>;

    /// Loads a new value regardless of what is cached and stores it.
    ///
    /// # Errors
    ///
    /// * `CacheError::InvalidArgument` - If `key` does not name a group
    /// * `CacheError::Load` - If the loader fails; the old value is kept
    async fn refresh(&self, key: &CacheKey) -> Result<CacheValue, CacheError>;

    /// Whether a value is cached for `key`. Unlike `peek` it never changes
    /// eviction order.
    fn contains(&self, key: &CacheKey) -> bool {
        matches!(self.peek(key), Ok(Some(_)))
    }

    /// Inserts or overwrites the value for `key`.
    fn put(&self, key: CacheKey, value: CacheValue) -> Result<(), CacheError>;

    /// Evicts `key`, returning the value it held.
    fn remove(&self, key: &CacheKey) -> Option<CacheValue>;

    /// Drops every entry.
    fn clear(&self);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Releases background resources. Must tolerate repeated calls.
    fn destroy(&self);

    /// Which decorator this store is, if any.
    fn layer(&self) -> Option<CacheLayer> {
        None
    }

    /// The store wrapped by this decorator, if any.
    fn decorated(&self) -> Option<Arc<dyn CacheStore>> {
        None
    }
}
