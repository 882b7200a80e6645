//! Artifact Cache Infrastructure
//!
//! Concrete stores, the synchronizing and stale-aware decorators, and a
//! fingerprint based resource watcher.
pub mod cache;
pub mod watcher;

pub use cache::{
    CacheChain, CacheChainBuilder, CacheMetrics, KeyStatus, LruStore, MemoryStore,
    MetricsSnapshot, StaleAwareCache, SynchronizingCache,
};
pub use watcher::{FingerprintWatcher, Fingerprinter};
