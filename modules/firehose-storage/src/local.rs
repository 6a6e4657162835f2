//! Local-filesystem object store: `<root>/<bucket>/<key>`.

use std::io;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use tokio::fs;
use tracing::debug;

use crate::error::{Result, StorageError};
use crate::store::{ObjectMeta, ObjectStore};

const TEMP_MARKER: &str = ".tmp-";

#[derive(Debug, Clone)]
pub struct LocalFsStore {
    root: PathBuf,
}

impl LocalFsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn bucket_dir(&self, bucket: &str) -> Result<PathBuf> {
        check_relative(bucket)?;
        Ok(self.root.join(bucket))
    }

    fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf> {
        check_relative(key)?;
        Ok(self.bucket_dir(bucket)?.join(key))
    }
}

/// Keys are relative paths with no `..` or root components.
fn check_relative(key: &str) -> Result<()> {
    let path = Path::new(key);
    let valid = !key.is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidKey(key.to_string()))
    }
}

fn map_io(err: io::Error, what: String) -> StorageError {
    match err.kind() {
        io::ErrorKind::NotFound => StorageError::NotFound(what),
        io::ErrorKind::PermissionDenied => StorageError::PermissionDenied(what),
        _ => StorageError::Io(err),
    }
}

#[async_trait]
impl ObjectStore for LocalFsStore {
    async fn put(&self, bucket: &str, key: &str, data: Bytes) -> Result<()> {
        let path = self.object_path(bucket, key)?;
        let parent = path
            .parent()
            .ok_or_else(|| StorageError::InvalidKey(key.to_string()))?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| StorageError::InvalidKey(key.to_string()))?;

        fs::create_dir_all(parent)
            .await
            .map_err(|e| map_io(e, parent.display().to_string()))?;

        // Readers never see a half-written object: write aside, then rename.
        let temp = parent.join(format!(
            ".{file_name}{TEMP_MARKER}{}",
            uuid::Uuid::new_v4().simple()
        ));
        if let Err(e) = fs::write(&temp, &data).await {
            let _ = fs::remove_file(&temp).await;
            return Err(map_io(e, format!("{bucket}/{key}")));
        }
        if let Err(e) = fs::rename(&temp, &path).await {
            let _ = fs::remove_file(&temp).await;
            return Err(map_io(e, format!("{bucket}/{key}")));
        }

        debug!(bucket, key, bytes = data.len(), "Wrote object");
        Ok(())
    }

    async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<ObjectMeta>> {
        let bucket_dir = self.bucket_dir(bucket)?;
        let mut objects = Vec::new();
        let mut pending = vec![bucket_dir.clone()];

        while let Some(dir) = pending.pop() {
            let mut entries = match fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(map_io(e, dir.display().to_string())),
            };

            while let Some(entry) = entries.next_entry().await? {
                let meta = entry.metadata().await?;
                let path = entry.path();
                if meta.is_dir() {
                    pending.push(path);
                    continue;
                }

                let name = entry.file_name();
                if name.to_string_lossy().contains(TEMP_MARKER) {
                    continue;
                }

                let Ok(relative) = path.strip_prefix(&bucket_dir) else {
                    continue;
                };
                let key = relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");
                if !key.starts_with(prefix) {
                    continue;
                }

                objects.push(ObjectMeta {
                    key,
                    size: meta.len(),
                    last_modified: meta.modified().ok().map(DateTime::<Utc>::from),
                });
            }
        }

        objects.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(objects)
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<Bytes> {
        let path = self.object_path(bucket, key)?;
        let data = fs::read(&path)
            .await
            .map_err(|e| map_io(e, format!("{bucket}/{key}")))?;
        Ok(Bytes::from(data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_creates_directories_and_lists_by_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFsStore::new(dir.path());

        store
            .put("bucket", "landing/2024/03/05/tweets-101500-abcd0123.csv", Bytes::from("a\n"))
            .await
            .unwrap();
        store
            .put("bucket", "staging/2024/03/05/out.csv", Bytes::from("b\n"))
            .await
            .unwrap();

        let listed = store.list("bucket", "landing/2024/03/05/").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].key, "landing/2024/03/05/tweets-101500-abcd0123.csv");
        assert_eq!(listed[0].size, 2);
        assert!(listed[0].last_modified.is_some());

        let data = store.get("bucket", &listed[0].key).await.unwrap();
        assert_eq!(data, Bytes::from("a\n"));
    }

    #[tokio::test]
    async fn empty_object_and_missing_bucket() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFsStore::new(dir.path());

        assert!(store.list("bucket", "").await.unwrap().is_empty());

        store.put("bucket", "empty.csv", Bytes::new()).await.unwrap();
        assert_eq!(store.get("bucket", "empty.csv").await.unwrap(), Bytes::new());
        assert!(matches!(
            store.get("bucket", "missing.csv").await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn rejects_keys_escaping_the_bucket() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFsStore::new(dir.path());

        for key in ["../escape.csv", "/abs.csv", ""] {
            assert!(matches!(
                store.put("bucket", key, Bytes::new()).await,
                Err(StorageError::InvalidKey(_))
            ));
        }
    }

    #[tokio::test]
    async fn overwrite_replaces_content() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFsStore::new(dir.path());
        store.put("b", "k.csv", Bytes::from("one")).await.unwrap();
        store.put("b", "k.csv", Bytes::from("two")).await.unwrap();

        assert_eq!(store.get("b", "k.csv").await.unwrap(), Bytes::from("two"));
        assert_eq!(store.list("b", "").await.unwrap().len(), 1);
    }
}
