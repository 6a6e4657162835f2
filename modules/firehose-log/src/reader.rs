//! Windowed draining of a partitioned log.

use std::time::Duration;

use async_stream::try_stream;
use firehose_common::{
    BackoffPolicy, PipelineError, Result, ServiceError, ServiceResultExt, TransportKind,
};
use futures::Stream;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::log::PartitionedLog;
use crate::types::{IteratorPosition, LogEntry};

/// Drains one shard of a log for a bounded wall-clock window: the shard a
/// configured partition key routes to, or the first shard when none is set.
///
/// Each call attaches at the shard's latest position, so entries appended
/// before the call are not seen and entries seen by an earlier window may be
/// seen again if that window's position was never persisted.
#[derive(Debug, Clone)]
pub struct WindowedLogReader {
    poll_interval: Duration,
    fetch_limit: usize,
    backoff: BackoffPolicy,
    partition_key: Option<String>,
}

impl Default for WindowedLogReader {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(200),
            fetch_limit: 1000,
            backoff: BackoffPolicy {
                base: Duration::from_millis(500),
                max_delay: Duration::from_secs(8),
                max_attempts: u32::MAX,
                jitter: Duration::from_millis(250),
            },
            partition_key: None,
        }
    }
}

impl WindowedLogReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_fetch_limit(mut self, limit: usize) -> Self {
        self.fetch_limit = limit.max(1);
        self
    }

    /// Read the shard that appends under `key` land on.
    pub fn with_partition_key(mut self, key: impl Into<String>) -> Self {
        self.partition_key = Some(key.into());
        self
    }

    /// Delay schedule used while the log reports a throughput limit.
    /// `max_attempts` is ignored; the window deadline bounds retries.
    pub fn with_backoff(mut self, policy: BackoffPolicy) -> Self {
        self.backoff = policy;
        self
    }

    /// Lazily yields every entry appended to the drained shard during `window`.
    ///
    /// The deadline is checked once per fetch cycle, after the cycle's entries
    /// have been yielded. A rate-limited fetch is retried at the same position
    /// after a backoff delay. Any other failure ends the stream with an error.
    pub fn drain<'a, L>(
        &'a self,
        log: &'a L,
        window: Duration,
    ) -> impl Stream<Item = Result<LogEntry>> + 'a
    where
        L: PartitionedLog + ?Sized,
    {
        try_stream! {
            let deadline = Instant::now() + window;

            let shard = match &self.partition_key {
                Some(key) => log.shard_for(key),
                None => log
                    .list_shards()
                    .await
                    .service("log")?
                    .into_iter()
                    .next()
                    .ok_or_else(|| PipelineError::Validation("log has no shards".into()))?,
            };

            let mut iterator = log
                .shard_iterator(&shard, IteratorPosition::Latest)
                .await
                .service("log")?;
            info!(%shard, ?window, "Attached to log at latest position");

            let mut throttled = 0u32;
            loop {
                match log.get_records(&iterator, self.fetch_limit).await {
                    Ok(batch) => {
                        throttled = 0;
                        debug!(%shard, count = batch.entries.len(), "Fetched log entries");
                        for entry in batch.entries {
                            yield entry;
                        }

                        match batch.next_iterator {
                            Some(next) => iterator = next,
                            None => {
                                info!(%shard, "Shard closed, ending window early");
                                break;
                            }
                        }

                        if Instant::now() >= deadline {
                            break;
                        }
                        tokio::time::sleep(self.poll_interval).await;
                    }
                    Err(e) if e.kind() == TransportKind::RateLimited => {
                        let delay = self.backoff.jittered_delay_for(throttled);
                        throttled = throttled.saturating_add(1);
                        warn!(
                            %shard,
                            attempt = throttled,
                            ?delay,
                            error = %e,
                            "Log throughput exceeded, backing off"
                        );
                        tokio::time::sleep(delay).await;

                        if Instant::now() >= deadline {
                            break;
                        }
                    }
                    Err(e) => {
                        Err::<(), _>(e).service("log")?;
                    }
                }
            }

            info!(%shard, "Log window closed");
        }
    }
}
