use artifact_cache_application::ports::{
    CacheStore, ResourceWatcher, ScheduledTask, SchedulerFactory, TaskFuture, TaskHandle,
    TaskScheduler, ValueLoader,
};
use artifact_cache_domain::{CacheError, CacheKey, CacheValue};
use artifact_cache_infrastructure::watcher::Fingerprinter;
use artifact_cache_infrastructure::MemoryStore;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

// ============================================================================
// Mock ValueLoader
// ============================================================================

pub struct CountingLoader {
    calls: AtomicUsize,
    values: Vec<CacheValue>,
    first_delay: Duration,
    later_delay: Duration,
    should_fail: AtomicBool,
}

impl CountingLoader {
    /// Loads `"<key>#<call number>"`.
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            values: Vec::new(),
            first_delay: Duration::ZERO,
            later_delay: Duration::ZERO,
            should_fail: AtomicBool::new(false),
        }
    }

    /// Returns `values[n]` on call `n`, repeating the last one.
    pub fn sequence(values: Vec<CacheValue>) -> Self {
        Self {
            values,
            ..Self::new()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.first_delay = delay;
        self.later_delay = delay;
        self
    }

    /// Delay applied from the second call on, to simulate a slow rebuild.
    pub fn with_refresh_delay(mut self, delay: Duration) -> Self {
        self.later_delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_should_fail(&self, fail: bool) {
        self.should_fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl ValueLoader for CountingLoader {
    async fn load(&self, key: &CacheKey) -> Result<CacheValue, CacheError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = if call == 0 {
            self.first_delay
        } else {
            self.later_delay
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.should_fail.load(Ordering::SeqCst) {
            return Err(CacheError::load(key, "processing failed"));
        }
        if self.values.is_empty() {
            return Ok(CacheValue::from_content(format!("{key}#{call}")));
        }
        Ok(self.values[call.min(self.values.len() - 1)].clone())
    }
}

// ============================================================================
// Store counting lifecycle calls
// ============================================================================

pub struct CountingStore {
    inner: MemoryStore,
    destroy_calls: AtomicUsize,
    clear_calls: AtomicUsize,
}

impl CountingStore {
    pub fn new(loader: Arc<dyn ValueLoader>) -> Self {
        Self {
            inner: MemoryStore::new(loader),
            destroy_calls: AtomicUsize::new(0),
            clear_calls: AtomicUsize::new(0),
        }
    }

    pub fn destroy_calls(&self) -> usize {
        self.destroy_calls.load(Ordering::SeqCst)
    }

    pub fn clear_calls(&self) -> usize {
        self.clear_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CacheStore for CountingStore {
    async fn get(&self, key: &CacheKey) -> Result<CacheValue, CacheError> {
        self.inner.get(key).await
    }

    fn peek(&self, key: &CacheKey) -> Result<Option<CacheValue>, CacheError> {
        self.inner.peek(key)
    }

    async fn refresh(&self, key: &CacheKey) -> Result<CacheValue, CacheError> {
        self.inner.refresh(key).await
    }

    fn contains(&self, key: &CacheKey) -> bool {
        self.inner.contains(key)
    }

    fn put(&self, key: CacheKey, value: CacheValue) -> Result<(), CacheError> {
        self.inner.put(key, value)
    }

    fn remove(&self, key: &CacheKey) -> Option<CacheValue> {
        self.inner.remove(key)
    }

    fn clear(&self) {
        self.clear_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.clear();
    }

    fn len(&self) -> usize {
        self.inner.len()
    }

    fn destroy(&self) {
        self.destroy_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.destroy();
    }
}

// ============================================================================
// Mock ResourceWatcher
// ============================================================================

pub struct MockWatcher {
    checks: AtomicUsize,
    async_checks: AtomicUsize,
    checked_keys: Mutex<Vec<CacheKey>>,
    should_fail: AtomicBool,
}

impl MockWatcher {
    pub fn new() -> Self {
        Self {
            checks: AtomicUsize::new(0),
            async_checks: AtomicUsize::new(0),
            checked_keys: Mutex::new(Vec::new()),
            should_fail: AtomicBool::new(false),
        }
    }

    pub fn failing() -> Self {
        let watcher = Self::new();
        watcher.should_fail.store(true, Ordering::SeqCst);
        watcher
    }

    pub fn checks(&self) -> usize {
        self.checks.load(Ordering::SeqCst)
    }

    pub fn async_checks(&self) -> usize {
        self.async_checks.load(Ordering::SeqCst)
    }

    pub fn async_checks_for(&self, key: &CacheKey) -> usize {
        self.checked_keys
            .lock()
            .unwrap()
            .iter()
            .filter(|k| *k == key)
            .count()
    }
}

#[async_trait]
impl ResourceWatcher for MockWatcher {
    async fn check(&self, _key: &CacheKey) -> Result<bool, CacheError> {
        self.checks.fetch_add(1, Ordering::SeqCst);
        Ok(false)
    }

    fn try_async_check(&self, key: &CacheKey) -> Result<bool, CacheError> {
        self.async_checks.fetch_add(1, Ordering::SeqCst);
        self.checked_keys.lock().unwrap().push(key.clone());
        if self.should_fail.load(Ordering::SeqCst) {
            return Err(CacheError::WatcherCheck {
                key: key.to_string(),
                message: "resource unreachable".to_string(),
            });
        }
        Ok(true)
    }
}

// ============================================================================
// Mock TaskScheduler
// ============================================================================

/// Runs one-shot tasks immediately on the test runtime and never runs
/// recurring ones.
pub struct MockScheduler {
    destroy_calls: AtomicUsize,
    recurring: AtomicUsize,
    one_shots: AtomicUsize,
    destroyed: AtomicBool,
}

impl MockScheduler {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            destroy_calls: AtomicUsize::new(0),
            recurring: AtomicUsize::new(0),
            one_shots: AtomicUsize::new(0),
            destroyed: AtomicBool::new(false),
        })
    }

    pub fn destroy_calls(&self) -> usize {
        self.destroy_calls.load(Ordering::SeqCst)
    }

    pub fn recurring(&self) -> usize {
        self.recurring.load(Ordering::SeqCst)
    }

    pub fn one_shots(&self) -> usize {
        self.one_shots.load(Ordering::SeqCst)
    }
}

impl TaskScheduler for MockScheduler {
    fn schedule(
        &self,
        name: &str,
        _period: Duration,
        _task: ScheduledTask,
    ) -> Result<TaskHandle, CacheError> {
        self.recurring.fetch_add(1, Ordering::SeqCst);
        Ok(TaskHandle::new(name, CancellationToken::new()))
    }

    fn schedule_once(
        &self,
        name: &str,
        _delay: Duration,
        task: TaskFuture,
    ) -> Result<TaskHandle, CacheError> {
        if self.is_destroyed() {
            return Err(CacheError::SchedulerDestroyed);
        }
        self.one_shots.fetch_add(1, Ordering::SeqCst);
        tokio::spawn(task);
        Ok(TaskHandle::new(name, CancellationToken::new()))
    }

    fn destroy(&self) {
        self.destroy_calls.fetch_add(1, Ordering::SeqCst);
        self.destroyed.store(true, Ordering::SeqCst);
    }

    fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }
}

pub fn scheduler_factory(scheduler: Arc<MockScheduler>) -> SchedulerFactory {
    Arc::new(move |_name: &str| scheduler.clone() as Arc<dyn TaskScheduler>)
}

// ============================================================================
// Mock Fingerprinter
// ============================================================================

pub struct MockFingerprinter {
    fingerprint: Mutex<String>,
    calls: AtomicUsize,
    should_fail: AtomicBool,
}

impl MockFingerprinter {
    pub fn new(initial: &str) -> Self {
        Self {
            fingerprint: Mutex::new(initial.to_string()),
            calls: AtomicUsize::new(0),
            should_fail: AtomicBool::new(false),
        }
    }

    pub fn set(&self, fingerprint: &str) {
        *self.fingerprint.lock().unwrap() = fingerprint.to_string();
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_should_fail(&self, fail: bool) {
        self.should_fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl Fingerprinter for MockFingerprinter {
    async fn fingerprint(&self, key: &CacheKey) -> Result<String, CacheError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.should_fail.load(Ordering::SeqCst) {
            return Err(CacheError::WatcherCheck {
                key: key.to_string(),
                message: "cannot stat resources".to_string(),
            });
        }
        let fingerprint = self.fingerprint.lock().unwrap().clone();
        Ok(fingerprint)
    }
}
