use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};

use crate::error::Result;

/// Metadata about a stored object.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectMeta {
    pub key: String,
    pub size: u64,
    /// `None` when the backend cannot report it.
    pub last_modified: Option<DateTime<Utc>>,
}

/// Bucketed object storage with whole-object puts.
///
/// A put is atomic at object granularity: readers see either the previous
/// object or the new one, never a partial write.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, bucket: &str, key: &str, data: Bytes) -> Result<()>;

    /// Objects whose key starts with `prefix`, sorted by key. Empty when none match.
    async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<ObjectMeta>>;

    /// Returns `StorageError::NotFound` if the object doesn't exist.
    async fn get(&self, bucket: &str, key: &str) -> Result<Bytes>;
}
