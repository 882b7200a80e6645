//! Artifact Cache Domain Layer
pub mod cache_key;
pub mod cache_value;
pub mod config;
pub mod errors;

pub use cache_key::{CacheKey, ResourceType};
pub use cache_value::CacheValue;
pub use config::{CacheConfig, Config, ConfigError, LoggingConfig, StoreKind};
pub use errors::CacheError;
