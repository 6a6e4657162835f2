//! Drains the log for `RUN_SECONDS` and writes one landing file.

use std::sync::Arc;

use anyhow::Result;
use firehose_common::IngestConfig;
use firehose_jobs::WindowedIngestJob;
use firehose_log::PgLog;
use firehose_storage::LocalFsStore;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("firehose=info".parse()?),
        )
        .init();

    let config = IngestConfig::from_env()?;
    config.log_redacted();

    let log = PgLog::connect(
        &config.log_database_url,
        &config.stream_name,
        config.shard_count,
    )
    .await?;
    let store = LocalFsStore::new(&config.object_store_root);

    let job = WindowedIngestJob::new(&config, Arc::new(log), Arc::new(store));
    let summary = job.run().await?;

    info!(summary = %serde_json::to_string(&summary)?, "Ingest complete");
    Ok(())
}
