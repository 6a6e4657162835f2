use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use chrono_tz::Tz;
use firehose_common::{BatchRecord, IngestConfig, Result};
use firehose_log::{PartitionedLog, WindowedLogReader};
use firehose_storage::{batch_key, BatchWriter, ObjectStore};
use futures::{pin_mut, TryStreamExt};
use tracing::info;

use crate::filter::PARTITION_KEY;
use crate::summary::{IngestSummary, JobStatus, JobSummary};

/// Drains the log for one window and writes what it read as a landing file.
///
/// Holds no state between runs; the only position is the log's latest
/// position at the moment `run` attaches.
pub struct WindowedIngestJob {
    log: Arc<dyn PartitionedLog>,
    writer: BatchWriter,
    reader: WindowedLogReader,
    bucket: String,
    landing_path: String,
    file_name: String,
    time_zone: Tz,
    window: Duration,
}

impl WindowedIngestJob {
    pub fn new(
        config: &IngestConfig,
        log: Arc<dyn PartitionedLog>,
        store: Arc<dyn ObjectStore>,
    ) -> Self {
        Self {
            log,
            writer: BatchWriter::new(store),
            reader: WindowedLogReader::new()
                .with_poll_interval(config.poll_interval)
                .with_fetch_limit(config.fetch_limit)
                .with_partition_key(PARTITION_KEY),
            bucket: config.bucket.clone(),
            landing_path: config.landing_path.clone(),
            file_name: config.file_name.clone(),
            time_zone: config.time_zone,
            window: config.window(),
        }
    }

    /// The reader always drains the shard the listener appends to.
    pub fn with_reader(mut self, reader: WindowedLogReader) -> Self {
        self.reader = reader.with_partition_key(PARTITION_KEY);
        self
    }

    pub async fn run(&self) -> Result<IngestSummary> {
        let entries = self.reader.drain(self.log.as_ref(), self.window);
        pin_mut!(entries);

        let mut records = Vec::new();
        while let Some(entry) = entries.try_next().await? {
            records.push(BatchRecord::from_payload(
                entry.seq.to_string(),
                entry.arrival,
                &entry.payload,
            )?);
        }

        if records.is_empty() {
            info!(window = ?self.window, "Window drained no records, nothing written");
            return Ok(IngestSummary {
                job: JobSummary::empty(JobStatus::NoRecords),
                entries_read: 0,
            });
        }

        let now = Utc::now().with_timezone(&self.time_zone);
        let key = batch_key(&self.landing_path, &self.file_name, &now);
        let rows = self.writer.write(&records, &self.bucket, &key).await?;

        info!(rows, key = key.as_str(), "Ingest window written");
        Ok(IngestSummary {
            job: JobSummary::completed(rows, key),
            entries_read: records.len(),
        })
    }
}
