use std::sync::Arc;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use firehose_common::{Result, ServiceResultExt, TransformConfig};
use firehose_storage::{
    batch_key, day_prefix, decode_rows, BatchWriter, ObjectSetSelector, ObjectStore,
};
use firehose_transform::{RecordTransformer, SchemaCatalog, SentimentScorer};
use tracing::{info, warn};

use crate::summary::{JobStatus, JobSummary, TransformSummary};

/// Turns today's recent landing files into one staging file.
pub struct TransformJob {
    catalog: Arc<dyn SchemaCatalog>,
    store: Arc<dyn ObjectStore>,
    selector: ObjectSetSelector,
    writer: BatchWriter,
    transformer: RecordTransformer,
    config: TransformConfig,
}

impl TransformJob {
    pub fn new(
        config: TransformConfig,
        catalog: Arc<dyn SchemaCatalog>,
        store: Arc<dyn ObjectStore>,
        scorer: Arc<dyn SentimentScorer>,
    ) -> Self {
        Self {
            catalog,
            selector: ObjectSetSelector::new(store.clone()),
            writer: BatchWriter::new(store.clone()),
            store,
            transformer: RecordTransformer::new(scorer).with_skip_bad_rows(config.skip_bad_rows),
            config,
        }
    }

    /// One run as of `now`. Selection, output key and the processing date all
    /// use `now` in the configured zone.
    pub async fn run(&self, now: DateTime<Utc>) -> Result<TransformSummary> {
        let c = &self.config;
        let tz: Tz = c.time_zone;
        let local = now.with_timezone(&tz);
        let target_table = format!("{}.{}", c.target_db, c.target_table);

        let source_columns = self.catalog.columns(&c.source_db, &c.source_table, false).await?;
        let target_columns = self.catalog.columns(&c.target_db, &c.target_table, true).await?;

        let prefix = day_prefix(&c.landing_path, local.date_naive());
        let files = self
            .selector
            .select(&c.bucket, &prefix, tz, c.time_horizon_hrs, now)
            .await?;

        if files.is_empty() {
            info!(prefix = prefix.as_str(), "No landing files selected, nothing written");
            return Ok(TransformSummary::new(
                JobSummary::empty(JobStatus::NoInput),
                0,
                0,
                target_table,
                local.date_naive(),
            ));
        }

        let mut rows = Vec::new();
        let mut rows_skipped = 0;
        for key in &files {
            let body = self.store.get(&c.bucket, key).await.service("object-store")?;
            let output = decode_rows(&body)
                .and_then(|raw| self.transformer.transform(&raw, &source_columns, &target_columns))
                .inspect_err(|e| warn!(key = key.as_str(), error = %e, "Landing file rejected"))?;
            rows_skipped += output.rows_skipped;
            rows.extend(output.rows);
        }

        let key = batch_key(&c.staging_path, &c.staging_file, &local);
        let written = self.writer.write(&rows, &c.bucket, &key).await?;

        info!(
            files = files.len(),
            rows = written,
            rows_skipped,
            key = key.as_str(),
            target = target_table.as_str(),
            "Transform written"
        );
        Ok(TransformSummary::new(
            JobSummary::completed(written, key),
            files.len(),
            rows_skipped,
            target_table,
            local.date_naive(),
        ))
    }
}
