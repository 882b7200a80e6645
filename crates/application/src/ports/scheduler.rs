use artifact_cache_domain::CacheError;
use futures::future::BoxFuture;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub type TaskFuture = BoxFuture<'static, ()>;

/// Recurring work: called once per period, each call yields one run.
pub type ScheduledTask = Arc<dyn Fn() -> TaskFuture + Send + Sync>;

/// Produces the scheduler a cache component owns. Injected at construction
/// so tests can substitute their own.
pub type SchedulerFactory = Arc<dyn Fn(&str) -> Arc<dyn TaskScheduler> + Send + Sync>;

/// Runs background work on behalf of a cache component.
///
/// `destroy` stops future runs only: work that already started is left to
/// finish, and `destroy` never waits for it.
pub trait TaskScheduler: Send + Sync {
    fn schedule(
        &self,
        name: &str,
        period: Duration,
        task: ScheduledTask,
    ) -> Result<TaskHandle, CacheError>;

    fn schedule_once(
        &self,
        name: &str,
        delay: Duration,
        task: TaskFuture,
    ) -> Result<TaskHandle, CacheError>;

    fn destroy(&self);

    fn is_destroyed(&self) -> bool;
}

/// Handle to one scheduled task.
#[derive(Debug, Clone)]
pub struct TaskHandle {
    name: Arc<str>,
    token: CancellationToken,
}

impl TaskHandle {
    pub fn new(name: impl Into<Arc<str>>, token: CancellationToken) -> Self {
        Self {
            name: name.into(),
            token,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stops future runs of this task only.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}
