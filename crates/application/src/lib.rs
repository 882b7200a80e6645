//! Artifact Cache Application Layer
//!
//! Ports through which the cache core talks to its collaborators: the
//! backing store, the artifact loader, the resource watcher, the background
//! scheduler and the clock.
pub mod ports;
