use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Backing store used under the decorator chain
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    #[default]
    Memory,
    Lru,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    /// Minimum time between two resource checks of the same key, in
    /// milliseconds. `0` turns resource watching off.
    #[serde(default)]
    pub watch_period_ms: u64,

    #[serde(default)]
    pub store: StoreKind,

    /// Capacity of the LRU store (ignored for `memory`)
    #[serde(default = "default_lru_capacity")]
    pub lru_capacity: usize,

    /// Serve stale values while a background refresh runs
    #[serde(default = "default_true")]
    pub stale_while_revalidate: bool,
}

impl CacheConfig {
    /// `None` when watching is disabled.
    pub fn watch_period(&self) -> Option<Duration> {
        (self.watch_period_ms > 0).then(|| Duration::from_millis(self.watch_period_ms))
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            watch_period_ms: 0,
            store: StoreKind::default(),
            lru_capacity: default_lru_capacity(),
            stale_while_revalidate: true,
        }
    }
}

fn default_lru_capacity() -> usize {
    128
}

fn default_true() -> bool {
    true
}
