//! Configuration for the artifact cache
//!
//! - `root`: top-level configuration, file loading and validation
//! - `cache`: store selection and watcher period
//! - `logging`: logging settings
//! - `errors`: configuration errors

pub mod cache;
pub mod errors;
pub mod logging;
pub mod root;

pub use cache::{CacheConfig, StoreKind};
pub use errors::ConfigError;
pub use logging::LoggingConfig;
pub use root::Config;
