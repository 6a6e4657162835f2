use std::sync::Arc;

use bytes::Bytes;
use firehose_common::{BatchRow, PipelineError, Result};
use tracing::info;

use crate::codec::encode_rows;
use crate::store::ObjectStore;

/// Serializes a batch of rows and stores it with a single put.
#[derive(Clone)]
pub struct BatchWriter {
    store: Arc<dyn ObjectStore>,
}

impl BatchWriter {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Writes `rows` to `bucket/key` and returns the row count. An empty batch
    /// still produces an (empty) object.
    pub async fn write<R: BatchRow + Sync>(
        &self,
        rows: &[R],
        bucket: &str,
        key: &str,
    ) -> Result<usize> {
        let storage_write = |message: String| PipelineError::StorageWrite {
            key: format!("{bucket}/{key}"),
            message,
        };

        let body = encode_rows(rows).map_err(|e| storage_write(e.to_string()))?;
        let bytes = body.len();
        self.store
            .put(bucket, key, Bytes::from(body))
            .await
            .map_err(|e| storage_write(e.to_string()))?;

        info!(bucket, key, rows = rows.len(), bytes, "Wrote batch file");
        Ok(rows.len())
    }
}
