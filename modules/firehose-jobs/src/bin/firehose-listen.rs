//! Listens to the status stream for `STREAM_SECONDS` and appends qualifying
//! reposts to the log.

use std::sync::Arc;

use anyhow::Result;
use firehose_common::{BackoffPolicy, ListenerConfig};
use firehose_jobs::{run_listener, source_error, EventFilter, FilterRules, StreamSource};
use firehose_log::PgLog;
use stream_client::StreamClient;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("firehose=info".parse()?)
                .add_directive("stream_client=info".parse()?),
        )
        .init();

    let config = ListenerConfig::from_env()?;
    config.log_redacted();

    let log = PgLog::connect(
        &config.log_database_url,
        &config.stream_name,
        config.shard_count,
    )
    .await?;

    let client = StreamClient::new(&config.source_stream_url, &config.source_bearer_token);
    let stream = client.connect().await.map_err(source_error)?;
    let mut source = StreamSource::new(stream);

    let rules = FilterRules::from(&config);
    let mut filter = EventFilter::new(rules, Arc::new(log), config.stream_duration())
        .with_retry(BackoffPolicy::default().with_max_attempts(config.append_max_attempts));

    let summary = run_listener(&mut source, &mut filter).await?;
    info!(summary = %serde_json::to_string(&summary)?, "Listen complete");
    Ok(())
}
