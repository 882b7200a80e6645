pub mod fingerprint;

pub use fingerprint::{FingerprintWatcher, Fingerprinter};
