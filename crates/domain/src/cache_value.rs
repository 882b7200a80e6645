use sha2::{Digest, Sha256};
use std::sync::Arc;

/// A built artifact together with the fingerprint of its content.
///
/// Values are never edited in place: a refresh produces a new `CacheValue`
/// and replaces the old one in the store. Cloning only bumps two reference
/// counts.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheValue {
    content: Arc<str>,
    hash: Arc<str>,
}

impl CacheValue {
    pub fn new(content: impl Into<Arc<str>>, hash: impl Into<Arc<str>>) -> Self {
        Self {
            content: content.into(),
            hash: hash.into(),
        }
    }

    /// Build a value whose hash is the hex SHA-256 of `content`.
    pub fn from_content(content: impl Into<Arc<str>>) -> Self {
        let content: Arc<str> = content.into();
        let hash = format!("{:x}", Sha256::digest(content.as_bytes()));
        Self {
            content,
            hash: Arc::from(hash),
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}
