//! EventFilter predicates, log hand-off and the listener loop.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use firehose_common::{BackoffPolicy, FilteredEvent, Result};
use firehose_jobs::{
    run_listener, EventFilter, EventSource, FilterRules, RawEvent, Rejection, PARTITION_KEY,
};
use firehose_log::{LogError, MemoryLog};
use serde_json::{json, Value};
use stream_client::Status;

// =========================================================================
// Fixtures
// =========================================================================

fn status(value: Value) -> Status {
    serde_json::from_value(value).unwrap()
}

fn original(lang: &str, tags: &[&str], reposts: i64, text: &str) -> Value {
    json!({
        "id_str": "7",
        "text": text,
        "lang": lang,
        "created_at": "Tue Mar 05 10:00:00 +0000 2024",
        "user": {"screen_name": "author"},
        "retweet_count": reposts,
        "entities": {"hashtags": tags.iter().map(|t| json!({"text": t})).collect::<Vec<_>>()},
    })
}

fn repost_of(original: Value) -> RawEvent {
    RawEvent {
        seq: 1,
        received_at: Utc::now(),
        status: status(json!({
            "id_str": "100",
            "text": "RT @author: ...",
            "lang": "en",
            "user": {"screen_name": "reposter"},
            "retweeted_status": original,
        })),
    }
}

fn qualifying() -> RawEvent {
    repost_of(original("en", &["alpha", "beta"], 150, "big news"))
}

fn rules() -> FilterRules {
    FilterRules::default()
}

fn quick_retry() -> BackoffPolicy {
    BackoffPolicy::default().without_jitter().with_max_attempts(3)
}

// =========================================================================
// Predicates
// =========================================================================

#[test]
fn qualifying_repost_is_reshaped() {
    let filtered = rules().check(&qualifying().status).unwrap();
    assert_eq!(
        filtered,
        FilteredEvent {
            created: "2024-03-05 10:00:00+00:00".into(),
            event_id: "7".into(),
            author: "author".into(),
            repost_count: 150,
            tags: vec!["alpha".into(), "beta".into()],
            text: "big news".into(),
        }
    );
}

#[test]
fn each_predicate_rejects() {
    let plain = RawEvent {
        seq: 1,
        received_at: Utc::now(),
        status: status(json!({"id_str": "1", "text": "hello", "lang": "en"})),
    };
    assert_eq!(rules().check(&plain.status), Err(Rejection::NotARepost));

    let cases = [
        (original("fr", &["a"], 150, "bonjour"), Rejection::Language),
        (original("en", &[], 150, "text"), Rejection::NoTags),
        (original("en", &["a"], 99, "text"), Rejection::BelowFloor),
        (original("en", &["a"], 150, ""), Rejection::EmptyText),
    ];
    for (value, expected) in cases {
        assert_eq!(rules().check(&repost_of(value).status), Err(expected));
    }
}

#[test]
fn floor_is_exclusive() {
    let at_floor = repost_of(original("en", &["a"], 99, "t"));
    let above = repost_of(original("en", &["a"], 100, "t"));
    assert!(rules().check(&at_floor.status).is_err());
    assert!(rules().check(&above.status).is_ok());
}

#[test]
fn extended_body_wins_even_when_empty() {
    let mut value = original("en", &["a"], 150, "truncated…");
    value["extended_tweet"] = json!({"full_text": "the whole long text"});
    let filtered = rules().check(&repost_of(value).status).unwrap();
    assert_eq!(filtered.text, "the whole long text");

    let mut value = original("en", &["a"], 150, "truncated…");
    value["extended_tweet"] = json!({"full_text": ""});
    assert_eq!(
        rules().check(&repost_of(value).status),
        Err(Rejection::EmptyText)
    );
}

#[test]
fn reposts_of_own_statuses_are_rejected() {
    let rules = FilterRules {
        own_handle: Some("Author".into()),
        ..FilterRules::default()
    };
    assert_eq!(rules.check(&qualifying().status), Err(Rejection::OwnRepost));
}

#[test]
fn accepted_implies_every_predicate() {
    for lang in ["en", "de"] {
        for tags in [&[][..], &["x"][..]] {
            for reposts in [0, 99, 100, 5000] {
                for text in ["", "words"] {
                    let event = repost_of(original(lang, tags, reposts, text));
                    let accepted = rules().check(&event.status).is_ok();
                    let expected =
                        lang == "en" && !tags.is_empty() && reposts > 99 && !text.is_empty();
                    assert_eq!(accepted, expected, "{lang} {tags:?} {reposts} {text:?}");
                }
            }
        }
    }
}

// =========================================================================
// Appending
// =========================================================================

#[tokio::test(start_paused = true)]
async fn accepted_events_are_appended_under_the_fixed_key() {
    let log = Arc::new(MemoryLog::new(1));
    let mut filter = EventFilter::new(rules(), log.clone(), Duration::from_secs(60));

    assert!(filter.on_event(&qualifying()).await.unwrap());
    assert!(filter
        .on_event(&repost_of(original("en", &[], 150, "no tags")))
        .await
        .unwrap());

    let entries = log.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].partition_key, PARTITION_KEY);
    let appended = FilteredEvent::from_payload(&entries[0].payload).unwrap();
    assert_eq!(appended.event_id, "7");

    let stats = filter.stats();
    assert_eq!((stats.seen, stats.accepted, stats.rejected), (2, 1, 1));
}

#[tokio::test(start_paused = true)]
async fn transient_append_failures_are_retried() {
    let log = Arc::new(MemoryLog::new(1));
    log.fail_next_appends([
        LogError::Connection("reset".into()),
        LogError::ThroughputExceeded("shard-000000".into()),
    ]);
    let mut filter =
        EventFilter::new(rules(), log.clone(), Duration::from_secs(60)).with_retry(quick_retry());

    assert!(filter.on_event(&qualifying()).await.unwrap());
    assert_eq!(log.entries().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn retry_budget_is_bounded() {
    let log = Arc::new(MemoryLog::new(1));
    log.fail_next_appends((0..3).map(|_| LogError::Connection("reset".into())));
    let mut filter =
        EventFilter::new(rules(), log.clone(), Duration::from_secs(60)).with_retry(quick_retry());

    let err = filter.on_event(&qualifying()).await.unwrap_err();
    assert!(err.is_retryable());
    assert!(log.entries().is_empty());
}

#[tokio::test(start_paused = true)]
async fn permanent_append_failure_is_not_retried() {
    let log = Arc::new(MemoryLog::new(1));
    log.fail_next_appends([LogError::Internal("corrupt".into())]);
    let mut filter =
        EventFilter::new(rules(), log.clone(), Duration::from_secs(60)).with_retry(quick_retry());

    assert!(filter.on_event(&qualifying()).await.is_err());
    // A retry would have succeeded.
    assert!(log.entries().is_empty());
}

#[tokio::test(start_paused = true)]
async fn stops_once_the_duration_has_elapsed() {
    let log = Arc::new(MemoryLog::new(1));
    let mut filter = EventFilter::new(rules(), log.clone(), Duration::from_secs(5));

    assert!(filter.on_event(&qualifying()).await.unwrap());
    tokio::time::advance(Duration::from_secs(5)).await;
    assert!(!filter.on_event(&qualifying()).await.unwrap());
    assert_eq!(log.entries().len(), 1);
}

// =========================================================================
// Listener loop
// =========================================================================

struct ScriptedSource {
    events: VecDeque<RawEvent>,
    /// Once drained, wait forever instead of closing.
    hang: bool,
}

#[async_trait]
impl EventSource for ScriptedSource {
    async fn next_event(&mut self) -> Result<Option<RawEvent>> {
        match self.events.pop_front() {
            Some(event) => Ok(Some(event)),
            None if self.hang => futures::future::pending().await,
            None => Ok(None),
        }
    }
}

#[tokio::test(start_paused = true)]
async fn listener_runs_until_the_source_closes() {
    let log = Arc::new(MemoryLog::new(1));
    let mut filter = EventFilter::new(rules(), log.clone(), Duration::from_secs(60));
    let mut source = ScriptedSource {
        events: VecDeque::from(vec![
            qualifying(),
            repost_of(original("de", &["a"], 150, "hallo")),
            qualifying(),
        ]),
        hang: false,
    };

    let summary = run_listener(&mut source, &mut filter).await.unwrap();
    assert_eq!(summary.job.row_count, 2);
    assert_eq!(summary.events_seen, 3);
    assert_eq!(summary.events_rejected, 1);
    assert_eq!(log.entries().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn quiet_source_cannot_outlive_the_duration() {
    let log = Arc::new(MemoryLog::new(1));
    let mut filter = EventFilter::new(rules(), log.clone(), Duration::from_secs(30));
    let mut source = ScriptedSource {
        events: VecDeque::from(vec![qualifying()]),
        hang: true,
    };

    let started = tokio::time::Instant::now();
    let summary = run_listener(&mut source, &mut filter).await.unwrap();
    assert_eq!(summary.job.row_count, 1);
    assert_eq!(started.elapsed(), Duration::from_secs(30));
}
