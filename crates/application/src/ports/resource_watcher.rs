use artifact_cache_domain::{CacheError, CacheKey};
use async_trait::async_trait;

/// Detects changes in the inputs an artifact was built from.
#[async_trait]
pub trait ResourceWatcher: Send + Sync {
    /// Compares the key's inputs with the last observation and invalidates
    /// the key when they changed. Returns whether a change was found.
    async fn check(&self, key: &CacheKey) -> Result<bool, CacheError>;

    /// Starts `check` in the background without waiting for it. Returns
    /// whether a check was actually dispatched.
    fn try_async_check(&self, key: &CacheKey) -> Result<bool, CacheError>;
}

/// Receives invalidations from a watcher.
pub trait InvalidationTarget: Send + Sync {
    fn invalidate(&self, key: &CacheKey);

    /// Whether the target still holds a value for `key`. Watchers use it to
    /// drop what they remember about evicted keys.
    fn is_cached(&self, key: &CacheKey) -> bool;
}
