use artifact_cache_application::ports::{
    ScheduledTask, SchedulerFactory, TaskFuture, TaskHandle, TaskScheduler,
};
use artifact_cache_domain::CacheError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Background task runner on the ambient tokio runtime.
///
/// Every task gets a child of the scheduler's shutdown token, so `destroy`
/// stops all of them at their next tick. A run that already started is
/// never interrupted.
///
/// # Example
///
/// ```rust,ignore
/// let scheduler = TokioScheduler::new("resource-watcher");
/// scheduler.schedule("prune", Duration::from_secs(5), Arc::new(|| Box::pin(async {})))?;
/// scheduler.destroy();
/// ```
pub struct TokioScheduler {
    name: Arc<str>,
    shutdown: CancellationToken,
    destroyed: AtomicBool,
}

impl TokioScheduler {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            shutdown: CancellationToken::new(),
            destroyed: AtomicBool::new(false),
        }
    }

    /// Factory handing out a fresh `TokioScheduler` per component.
    pub fn factory() -> SchedulerFactory {
        Arc::new(|name: &str| Arc::new(TokioScheduler::new(name)) as Arc<dyn TaskScheduler>)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn prepare(&self, task_name: &str) -> Result<(Handle, CancellationToken), CacheError> {
        if self.is_destroyed() {
            return Err(CacheError::SchedulerDestroyed);
        }
        let runtime =
            Handle::try_current().map_err(|_| CacheError::NoRuntime(task_name.to_string()))?;
        Ok((runtime, self.shutdown.child_token()))
    }
}

impl TaskScheduler for TokioScheduler {
    fn schedule(
        &self,
        name: &str,
        period: Duration,
        task: ScheduledTask,
    ) -> Result<TaskHandle, CacheError> {
        if period.is_zero() {
            return Err(CacheError::invalid(format!(
                "task '{name}' needs a non-zero period"
            )));
        }
        let (runtime, token) = self.prepare(name)?;
        let handle = TaskHandle::new(name, token.clone());
        let scheduler = Arc::clone(&self.name);
        let task_name = handle.name().to_string();

        runtime.spawn(async move {
            debug!(
                scheduler = %scheduler,
                task = %task_name,
                period_ms = period.as_millis() as u64,
                "Recurring task started"
            );

            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => {
                        debug!(scheduler = %scheduler, task = %task_name, "Recurring task stopped");
                        break;
                    }
                    _ = interval.tick() => {
                        task().await;
                    }
                }
            }
        });

        Ok(handle)
    }

    fn schedule_once(
        &self,
        name: &str,
        delay: Duration,
        task: TaskFuture,
    ) -> Result<TaskHandle, CacheError> {
        let (runtime, token) = self.prepare(name)?;
        let handle = TaskHandle::new(name, token.clone());

        runtime.spawn(async move {
            tokio::select! {
                biased;
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    task.await;
                }
            }
        });

        Ok(handle)
    }

    fn destroy(&self) {
        if self.destroyed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.shutdown.cancel();
        info!(scheduler = %self.name, "Scheduler destroyed");
    }

    fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::Acquire)
    }
}

impl Drop for TokioScheduler {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
