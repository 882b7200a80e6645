pub mod cache_store;
pub mod clock;
pub mod resource_watcher;
pub mod scheduler;
pub mod value_loader;

pub use cache_store::{CacheLayer, CacheStore};
pub use clock::{Clock, ManualClock, SystemClock};
pub use resource_watcher::{InvalidationTarget, ResourceWatcher};
pub use scheduler::{
    ScheduledTask, SchedulerFactory, TaskFuture, TaskHandle, TaskScheduler,
};
pub use value_loader::{loader_fn, FnLoader, ValueLoader};
