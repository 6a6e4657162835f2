//! In-memory object store for tests. Thread-safe via `RwLock`.

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Mutex, RwLock};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};

use crate::error::{Result, StorageError};
use crate::store::{ObjectMeta, ObjectStore};

#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: RwLock<BTreeMap<(String, String), StoredObject>>,
    put_failures: Mutex<VecDeque<StorageError>>,
}

#[derive(Debug, Clone)]
struct StoredObject {
    data: Bytes,
    last_modified: DateTime<Utc>,
}

fn poisoned() -> StorageError {
    StorageError::Internal("lock poisoned".into())
}

impl MemoryObjectStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys in `bucket`, sorted.
    pub fn keys(&self, bucket: &str) -> Vec<String> {
        let Ok(objects) = self.objects.read() else {
            return Vec::new();
        };
        objects
            .keys()
            .filter(|(b, _)| b == bucket)
            .map(|(_, k)| k.clone())
            .collect()
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl MemoryObjectStore {
    /// Store an object with an explicit modification time.
    pub fn insert_at(&self, bucket: &str, key: &str, data: impl Into<Bytes>, at: DateTime<Utc>) {
        if let Ok(mut objects) = self.objects.write() {
            objects.insert(
                (bucket.to_string(), key.to_string()),
                StoredObject {
                    data: data.into(),
                    last_modified: at,
                },
            );
        }
    }

    /// Queue errors returned by the next `put` calls, one per call.
    pub fn fail_next_puts(&self, errors: impl IntoIterator<Item = StorageError>) {
        if let Ok(mut failures) = self.put_failures.lock() {
            failures.extend(errors);
        }
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put(&self, bucket: &str, key: &str, data: Bytes) -> Result<()> {
        if let Some(err) = self.put_failures.lock().map_err(|_| poisoned())?.pop_front() {
            return Err(err);
        }

        self.objects.write().map_err(|_| poisoned())?.insert(
            (bucket.to_string(), key.to_string()),
            StoredObject {
                data,
                last_modified: Utc::now(),
            },
        );
        Ok(())
    }

    async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<ObjectMeta>> {
        let objects = self.objects.read().map_err(|_| poisoned())?;

        Ok(objects
            .iter()
            .filter(|((b, k), _)| b == bucket && k.starts_with(prefix))
            .map(|((_, key), obj)| ObjectMeta {
                key: key.clone(),
                size: obj.data.len() as u64,
                last_modified: Some(obj.last_modified),
            })
            .collect())
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<Bytes> {
        let objects = self.objects.read().map_err(|_| poisoned())?;

        objects
            .get(&(bucket.to_string(), key.to_string()))
            .map(|o| o.data.clone())
            .ok_or_else(|| StorageError::NotFound(format!("{bucket}/{key}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_get_list() {
        let store = MemoryObjectStore::new();
        store.put("b", "landing/a.csv", Bytes::from("x,y\n")).await.unwrap();
        store.put("b", "staging/c.csv", Bytes::new()).await.unwrap();
        store.put("other", "landing/z.csv", Bytes::new()).await.unwrap();

        assert_eq!(store.get("b", "landing/a.csv").await.unwrap(), Bytes::from("x,y\n"));

        let listed = store.list("b", "landing/").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].key, "landing/a.csv");
        assert_eq!(listed[0].size, 4);
        assert!(listed[0].last_modified.is_some());
    }

    #[tokio::test]
    async fn missing_object_is_not_found() {
        let store = MemoryObjectStore::new();
        assert!(matches!(
            store.get("b", "nope").await,
            Err(StorageError::NotFound(_))
        ));
        assert!(store.list("b", "").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn injected_put_failure_leaves_nothing_behind() {
        let store = MemoryObjectStore::new();
        store.fail_next_puts([StorageError::PermissionDenied("b".into())]);

        assert!(store.put("b", "k", Bytes::from("data")).await.is_err());
        assert!(store.keys("b").is_empty());
        store.put("b", "k", Bytes::from("data")).await.unwrap();
        assert_eq!(store.keys("b"), vec!["k".to_string()]);
    }
}
