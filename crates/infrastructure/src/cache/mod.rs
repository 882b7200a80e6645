// Cache module - stores at the bottom, decorators stacked on top

pub mod chain;
mod key_locks;
pub mod lru;
pub mod memory;
pub mod metrics;
pub mod stale_aware;
pub mod synchronizing;
mod throttle;

pub use chain::{CacheChain, CacheChainBuilder};
pub use lru::LruStore;
pub use memory::MemoryStore;
pub use metrics::{CacheMetrics, MetricsSnapshot};
pub use stale_aware::{KeyStatus, StaleAwareCache};
pub use synchronizing::SynchronizingCache;
