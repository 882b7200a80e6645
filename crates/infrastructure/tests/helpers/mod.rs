#![allow(dead_code)]
#![allow(unused_imports)]

pub mod mocks;

pub use mocks::{
    scheduler_factory, CountingLoader, CountingStore, MockFingerprinter, MockScheduler,
    MockWatcher,
};

use artifact_cache_domain::{CacheKey, ResourceType};
use std::future::Future;
use std::time::Duration;

pub fn js_key() -> CacheKey {
    CacheKey::minimized("g1", ResourceType::Js)
}

pub fn css_key() -> CacheKey {
    CacheKey::minimized("g1", ResourceType::Css)
}

pub fn blank_key() -> CacheKey {
    CacheKey::minimized("", ResourceType::Js)
}

/// Polls `condition` until it holds or `timeout` passes.
pub async fn eventually<F, Fut>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    condition().await
}
