use artifact_cache_domain::CacheKey;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rustc_hash::FxBuildHasher;
use std::time::{Duration, Instant};

/// Last dispatch instant of the resource check, per key.
///
/// An entry older than the period behaves exactly like a missing one, which
/// is what lets `prune` drop it.
#[derive(Default)]
pub(crate) struct CheckThrottle {
    last_checked: DashMap<CacheKey, Instant, FxBuildHasher>,
}

impl CheckThrottle {
    /// Returns true, and records `now`, when at least `period` has passed
    /// since the previous dispatch for `key`.
    pub(crate) fn try_acquire(&self, key: &CacheKey, now: Instant, period: Duration) -> bool {
        match self.last_checked.entry(key.clone()) {
            Entry::Occupied(mut entry) => {
                if now.saturating_duration_since(*entry.get()) >= period {
                    entry.insert(now);
                    true
                } else {
                    false
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(now);
                true
            }
        }
    }

    /// Drops entries that no longer throttle anything. Returns how many.
    pub(crate) fn prune(&self, now: Instant, period: Duration) -> usize {
        let before = self.last_checked.len();
        self.last_checked
            .retain(|_, last| now.saturating_duration_since(*last) < period);
        before.saturating_sub(self.last_checked.len())
    }

    pub(crate) fn forget(&self, key: &CacheKey) {
        self.last_checked.remove(key);
    }

    pub(crate) fn clear(&self) {
        self.last_checked.clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.last_checked.len()
    }
}
