//! RecordTransformer over landing-shaped rows.

use std::sync::Arc;

use firehose_common::{PipelineError, Result, LANDING_COLUMNS};
use firehose_transform::{
    content_hash_id, LexiconScorer, RecordTransformer, Sentiment, SentimentScorer,
    PARTITION_COLUMNS,
    STAGING_COLUMNS,
};

fn cols(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

fn landing() -> Vec<String> {
    cols(&LANDING_COLUMNS)
}

fn staging() -> Vec<String> {
    let mut all = cols(&STAGING_COLUMNS);
    all.extend(cols(&PARTITION_COLUMNS));
    all
}

fn row(record_id: &str, timestamp: &str, tweet_id: &str, tags: &str, text: &str) -> Vec<String> {
    cols(&[
        record_id,
        timestamp,
        "Tue Mar 05 09:59:00 +0000 2024",
        tweet_id,
        "someone",
        "150",
        tags,
        text,
    ])
}

fn transformer() -> RecordTransformer {
    RecordTransformer::new(Arc::new(LexiconScorer::new()))
}

struct FailingScorer;

impl SentimentScorer for FailingScorer {
    fn score(&self, text: &str) -> Result<Sentiment> {
        if text.contains("explode") {
            Err(PipelineError::Validation("scorer rejected input".into()))
        } else {
            Ok(Sentiment::NEUTRAL)
        }
    }
}

// =========================================================================
// Fan-out and keys
// =========================================================================

#[test]
fn tags_fan_out_with_a_shared_hash() {
    let rows = vec![
        row("42", "2024-03-05T10:00:00Z", "7", "alpha beta", "good news"),
        row("43", "2024-03-05T10:00:01Z", "8", "", "no tags here"),
    ];
    let output = transformer()
        .transform(&rows, &landing(), &cols(&["hash_id", "hashtag"]))
        .unwrap();

    let expected = content_hash_id("42", "7");
    assert_eq!(
        output.rows,
        vec![
            vec![expected.clone(), "alpha".to_string()],
            vec![expected, "beta".to_string()],
        ]
    );
    assert_eq!(output.rows_skipped, 0);
}

#[test]
fn partitions_come_from_the_raw_timestamp() {
    let rows = vec![row("42", "2024-03-05T10:00:00Z", "7", "alpha", "text")];
    let output = transformer()
        .transform(&rows, &landing(), &cols(&["hash_id", "year", "month", "day"]))
        .unwrap();

    assert_eq!(output.rows.len(), 1);
    assert_eq!(&output.rows[0][1..], &["2024", "3", "5"]);
}

#[test]
fn full_staging_projection() {
    let rows = vec![row(
        "42",
        "2024-03-05T10:00:00.250Z",
        "7",
        "#Rust tokio",
        "RT Very good release!! https://t.co/x",
    )];
    let output = transformer().transform(&rows, &landing(), &staging()).unwrap();

    assert_eq!(output.rows.len(), 2);
    let first = &output.rows[0];
    assert_eq!(first.len(), 13);
    assert_eq!(first[1], "42");
    assert_eq!(first[2], "7");
    assert_eq!(first[3], "2024-03-05 10:00:00");
    assert_eq!(first[4], "someone");
    assert_eq!(first[5], "150");
    assert_eq!(first[6], "Very good release");
    assert!((first[7].parse::<f64>().unwrap() - 0.91).abs() < 1e-9);
    assert_eq!(first[9], "Rust");
    assert_eq!(output.rows[1][9], "tokio");
    assert_eq!(&first[10..], &["2024", "3", "5"]);
}

#[test]
fn output_is_deterministic() {
    let rows = vec![
        row("1", "2024-03-05T10:00:00Z", "10", "a b c", "great day"),
        row("2", "2024-03-05 11:00:00", "11", "d", "terrible day"),
    ];
    let t = transformer();
    let first = t.transform(&rows, &landing(), &staging()).unwrap();
    let second = t.transform(&rows, &landing(), &staging()).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.rows.len(), 4);
}

// =========================================================================
// Failure handling
// =========================================================================

#[test]
fn short_row_aborts_the_batch() {
    let rows = vec![
        row("1", "2024-03-05T10:00:00Z", "10", "a", "fine"),
        cols(&["2", "2024-03-05T10:00:00Z"]),
    ];
    let err = transformer().transform(&rows, &landing(), &staging()).unwrap_err();
    assert!(matches!(err, PipelineError::MalformedRecord { row: 1, .. }));
}

#[test]
fn bad_timestamp_aborts_the_batch() {
    let rows = vec![row("1", "not a time", "10", "a", "fine")];
    let err = transformer().transform(&rows, &landing(), &staging()).unwrap_err();
    assert!(err.is_validation());
    assert!(err.to_string().contains("not a time"));
}

#[test]
fn scorer_failure_aborts_unless_rows_are_isolated() {
    let rows = vec![
        row("1", "2024-03-05T10:00:00Z", "10", "a", "explode here"),
        row("2", "2024-03-05T10:00:00Z", "11", "b", "calm"),
    ];

    let strict = RecordTransformer::new(Arc::new(FailingScorer));
    assert!(strict.transform(&rows, &landing(), &staging()).is_err());

    let lenient = RecordTransformer::new(Arc::new(FailingScorer)).with_skip_bad_rows(true);
    let output = lenient.transform(&rows, &landing(), &staging()).unwrap();
    assert_eq!(output.rows.len(), 1);
    assert_eq!(output.rows[0][1], "2");
    assert_eq!(output.rows_skipped, 1);
}

#[test]
fn isolated_rows_count_every_kind_of_failure() {
    let rows = vec![
        cols(&["short"]),
        row("1", "garbage", "10", "a", "text"),
        row("2", "2024-03-05T10:00:00Z", "11", "b", "text"),
    ];
    let output = transformer()
        .with_skip_bad_rows(true)
        .transform(&rows, &landing(), &staging())
        .unwrap();
    assert_eq!(output.rows.len(), 1);
    assert_eq!(output.rows_skipped, 2);
}

#[test]
fn column_lists_are_validated_before_any_row() {
    let err = transformer()
        .transform(&[], &landing(), &cols(&["hash_id", "favourite_colour"]))
        .unwrap_err();
    assert!(matches!(err, PipelineError::Validation(_)));

    let err = transformer()
        .transform(&[], &cols(&["record_id", "text"]), &staging())
        .unwrap_err();
    assert!(err.to_string().contains("timestamp"));
}
