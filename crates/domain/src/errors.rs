use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Failed to load {key}: {message}")]
    Load { key: String, message: String },

    #[error("Resource check failed for {key}: {message}")]
    WatcherCheck { key: String, message: String },

    #[error("Scheduler has been destroyed")]
    SchedulerDestroyed,

    #[error("No async runtime available to schedule {0}")]
    NoRuntime(String),
}

impl CacheError {
    pub fn load(key: impl ToString, message: impl Into<String>) -> Self {
        CacheError::Load {
            key: key.to_string(),
            message: message.into(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        CacheError::InvalidArgument(message.into())
    }
}
