use artifact_cache_domain::{CacheError, CacheKey, CacheValue};
use async_trait::async_trait;
use std::future::Future;
use std::marker::PhantomData;

/// Builds the artifact for a key. Expected to be deterministic and
/// expensive; the cache exists to call it as rarely as possible.
#[async_trait]
pub trait ValueLoader: Send + Sync {
    async fn load(&self, key: &CacheKey) -> Result<CacheValue, CacheError>;
}

/// Adapts an async closure into a [`ValueLoader`].
pub struct FnLoader<F, Fut> {
    f: F,
    _fut: PhantomData<fn() -> Fut>,
}

pub fn loader_fn<F, Fut>(f: F) -> FnLoader<F, Fut>
where
    F: Fn(CacheKey) -> Fut + Send + Sync,
    Fut: Future<Output = Result<CacheValue, CacheError>> + Send,
{
    FnLoader {
        f,
        _fut: PhantomData,
    }
}

#[async_trait]
impl<F, Fut> ValueLoader for FnLoader<F, Fut>
where
    F: Fn(CacheKey) -> Fut + Send + Sync,
    Fut: Future<Output = Result<CacheValue, CacheError>> + Send,
{
    async fn load(&self, key: &CacheKey) -> Result<CacheValue, CacheError> {
        (self.f)(key.clone()).await
    }
}
