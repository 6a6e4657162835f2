//! Transforms recent landing files into one staging file.

use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use firehose_common::TransformConfig;
use firehose_jobs::TransformJob;
use firehose_storage::LocalFsStore;
use firehose_transform::{LexiconScorer, StaticCatalog};
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

    let config = TransformConfig::from_env()?;
    config.log_redacted();

    let mut catalog = StaticCatalog::builtin(
        (config.source_db.as_str(), config.source_table.as_str()),
        (config.target_db.as_str(), config.target_table.as_str()),
    );
    if let Some(path) = &config.catalog_path {
        catalog = catalog.merged(StaticCatalog::from_json_file(path).await?);
    }

    let store = LocalFsStore::new(&config.object_store_root);
    let job = TransformJob::new(
        config,
        Arc::new(catalog),
        Arc::new(store),
        Arc::new(LexiconScorer::new()),
    );
    let summary = job.run(Utc::now()).await?;

    info!(summary = %serde_json::to_string(&summary)?, "Transform complete");
    Ok(())
}
