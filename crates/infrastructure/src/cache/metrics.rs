use std::sync::atomic::{AtomicU64, Ordering};

/// Counters shared by every layer of one cache chain.
///
/// Each event is counted by exactly one layer: stores count hits, misses and
/// loads; the synchronizing layer counts fast-path hits and watcher
/// dispatches; the stale-aware layer counts stale hits and refreshes.
#[derive(Default, Debug)]
pub struct CacheMetrics {
    pub hits: AtomicU64,
    pub misses: AtomicU64,
    pub loads: AtomicU64,
    pub load_failures: AtomicU64,
    pub stale_hits: AtomicU64,
    pub refreshes: AtomicU64,
    pub refresh_failures: AtomicU64,
    pub watcher_dispatches: AtomicU64,
    pub watcher_failures: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub loads: u64,
    pub load_failures: u64,
    pub stale_hits: u64,
    pub refreshes: u64,
    pub refresh_failures: u64,
    pub watcher_dispatches: u64,
    pub watcher_failures: u64,
}

impl CacheMetrics {
    #[inline]
    pub(crate) fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn hit_rate(&self) -> f64 {
        let hits = (self.hits.load(Ordering::Relaxed) + self.stale_hits.load(Ordering::Relaxed))
            as f64;
        let total = hits + self.misses.load(Ordering::Relaxed) as f64;

        if total > 0.0 {
            (hits / total) * 100.0
        } else {
            0.0
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            loads: self.loads.load(Ordering::Relaxed),
            load_failures: self.load_failures.load(Ordering::Relaxed),
            stale_hits: self.stale_hits.load(Ordering::Relaxed),
            refreshes: self.refreshes.load(Ordering::Relaxed),
            refresh_failures: self.refresh_failures.load(Ordering::Relaxed),
            watcher_dispatches: self.watcher_dispatches.load(Ordering::Relaxed),
            watcher_failures: self.watcher_failures.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_rate_counts_stale_hits() {
        let metrics = CacheMetrics::default();
        assert_eq!(metrics.hit_rate(), 0.0);

        CacheMetrics::incr(&metrics.hits);
        CacheMetrics::incr(&metrics.stale_hits);
        CacheMetrics::incr(&metrics.misses);
        CacheMetrics::incr(&metrics.misses);

        assert_eq!(metrics.hit_rate(), 50.0);
        assert_eq!(metrics.snapshot().stale_hits, 1);
    }
}
