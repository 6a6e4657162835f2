//! Selection of qualifying reposts and their hand-off to the log.

use std::sync::Arc;
use std::time::Duration;

use chrono::DateTime;
use firehose_common::{
    with_backoff, BackoffPolicy, FilteredEvent, ListenerConfig, PipelineError, Result,
    ServiceResultExt,
};
use firehose_log::PartitionedLog;
use stream_client::Status;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::source::RawEvent;

/// Every accepted event goes to the same shard.
pub const PARTITION_KEY: &str = "111";

#[derive(Debug, Clone)]
pub struct FilterRules {
    pub language: String,
    /// Strictly greater than this is required.
    pub repost_floor: i64,
    /// Reposts of this account's own statuses are rejected.
    pub own_handle: Option<String>,
}

impl Default for FilterRules {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            repost_floor: 99,
            own_handle: None,
        }
    }
}

impl From<&ListenerConfig> for FilterRules {
    fn from(config: &ListenerConfig) -> Self {
        Self {
            language: config.language.clone(),
            repost_floor: config.repost_floor,
            own_handle: config.own_handle.clone(),
        }
    }
}

/// Why an event was not selected. Checked in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    NotARepost,
    OwnRepost,
    Language,
    NoTags,
    BelowFloor,
    EmptyText,
}

impl FilterRules {
    pub fn check(&self, status: &Status) -> std::result::Result<FilteredEvent, Rejection> {
        let original = status
            .retweeted_status
            .as_deref()
            .ok_or(Rejection::NotARepost)?;

        if let (Some(own), Some(author)) = (&self.own_handle, original.screen_name()) {
            if own.eq_ignore_ascii_case(author) {
                return Err(Rejection::OwnRepost);
            }
        }
        if original.lang.as_deref() != Some(self.language.as_str()) {
            return Err(Rejection::Language);
        }

        let tags = original.hashtags();
        if tags.is_empty() {
            return Err(Rejection::NoTags);
        }
        if original.retweet_count <= self.repost_floor {
            return Err(Rejection::BelowFloor);
        }
        let text = original.content();
        if text.is_empty() {
            return Err(Rejection::EmptyText);
        }

        Ok(FilteredEvent {
            created: created_display(original.created_at.as_deref().unwrap_or_default()),
            event_id: original.id_str.clone(),
            author: original.screen_name().unwrap_or_default().to_string(),
            repost_count: original.retweet_count,
            tags,
            text: text.to_string(),
        })
    }
}

/// `created_at` as `YYYY-MM-DD HH:MM:SS+HH:MM` when it parses, else verbatim.
fn created_display(raw: &str) -> String {
    DateTime::parse_from_str(raw, "%a %b %d %H:%M:%S %z %Y")
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S%:z").to_string())
        .unwrap_or_else(|_| raw.to_string())
}

// ---------------------------------------------------------------------------
// EventFilter
// ---------------------------------------------------------------------------

/// Counters over one listening session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterStats {
    pub seen: u64,
    pub accepted: u64,
    pub rejected: u64,
}

/// Evaluates events for a fixed wall-clock duration and appends the
/// accepted ones to the log.
pub struct EventFilter {
    rules: FilterRules,
    log: Arc<dyn PartitionedLog>,
    retry: BackoffPolicy,
    started: Instant,
    duration: Duration,
    stats: FilterStats,
}

impl EventFilter {
    pub fn new(rules: FilterRules, log: Arc<dyn PartitionedLog>, duration: Duration) -> Self {
        Self {
            rules,
            log,
            retry: BackoffPolicy::default(),
            started: Instant::now(),
            duration,
            stats: FilterStats::default(),
        }
    }

    /// Retry schedule for appends that fail transiently.
    pub fn with_retry(mut self, policy: BackoffPolicy) -> Self {
        self.retry = policy;
        self
    }

    pub fn stats(&self) -> FilterStats {
        self.stats
    }

    /// Time left before `on_event` starts returning `false`.
    pub fn remaining(&self) -> Duration {
        self.duration.saturating_sub(self.started.elapsed())
    }

    /// Pure predicate evaluation; no side effects.
    pub fn evaluate(&self, event: &RawEvent) -> Option<FilteredEvent> {
        match self.rules.check(&event.status) {
            Ok(filtered) => Some(filtered),
            Err(reason) => {
                debug!(seq = event.seq, ?reason, "Event rejected");
                None
            }
        }
    }

    /// Handle one event. Returns whether the caller should keep feeding
    /// events; `false` once the configured duration has elapsed, in which
    /// case the event is not evaluated.
    pub async fn on_event(&mut self, event: &RawEvent) -> Result<bool> {
        if self.started.elapsed() >= self.duration {
            return Ok(false);
        }

        self.stats.seen += 1;
        let Some(filtered) = self.evaluate(event) else {
            self.stats.rejected += 1;
            return Ok(true);
        };

        let payload = filtered.to_payload()?;
        let log = &self.log;
        let ack = with_backoff(
            &self.retry,
            "log.append",
            || async { log.append(PARTITION_KEY, &payload).await.service("log") },
            PipelineError::is_retryable,
        )
        .await?;

        self.stats.accepted += 1;
        info!(
            event_id = filtered.event_id.as_str(),
            shard = %ack.shard_id,
            seq = ack.seq,
            "Appended filtered event"
        );
        Ok(true)
    }
}
