//! Raw batch rows to canonical, tag-exploded records.

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use firehose_common::{PipelineError, Result};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::clean::{clean_tags, clean_text};
use crate::sentiment::SentimentScorer;
use crate::timestamp::{canonical_timestamp, partition_date};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One (event, tag) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalRecord {
    pub hash_id: String,
    pub record_id: String,
    pub event_id: String,
    pub time_stamp: String,
    pub author: String,
    pub repost_count: String,
    pub text_clean: String,
    pub polarity: f64,
    pub subjectivity: f64,
    pub tag: String,
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

/// Column names a [`CanonicalRecord`] can be projected onto.
pub const CANONICAL_FIELDS: [&str; 13] = [
    "hash_id",
    "record_id",
    "tweet_id",
    "time_stamp",
    "user_name",
    "rt_count",
    "text_clean",
    "polarity",
    "subjectivity",
    "hashtag",
    "year",
    "month",
    "day",
];

impl CanonicalRecord {
    pub fn field(&self, column: &str) -> Option<String> {
        let value = match column {
            "hash_id" => self.hash_id.clone(),
            "record_id" => self.record_id.clone(),
            "tweet_id" => self.event_id.clone(),
            "time_stamp" => self.time_stamp.clone(),
            "user_name" => self.author.clone(),
            "rt_count" => self.repost_count.clone(),
            "text_clean" => self.text_clean.clone(),
            "polarity" => self.polarity.to_string(),
            "subjectivity" => self.subjectivity.to_string(),
            "hashtag" => self.tag.clone(),
            "year" => self.year.to_string(),
            "month" => self.month.to_string(),
            "day" => self.day.to_string(),
            _ => return None,
        };
        Some(value)
    }

    /// Values in `columns` order. Columns must already be validated.
    pub fn project(&self, columns: &[String]) -> Vec<String> {
        columns
            .iter()
            .map(|c| self.field(c).unwrap_or_default())
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransformOutput {
    /// Projected rows, in input order, tags in field order.
    pub rows: Vec<Vec<String>>,
    pub rows_skipped: usize,
}

/// Positions of the fields the transform reads, resolved from the source
/// column list.
#[derive(Debug, Clone, Copy)]
struct SourceLayout {
    arity: usize,
    record_id: usize,
    timestamp: usize,
    event_id: usize,
    author: usize,
    repost_count: usize,
    tags: usize,
    text: usize,
}

impl SourceLayout {
    fn resolve(columns: &[String]) -> Result<Self> {
        let find = |name: &str| {
            columns.iter().position(|c| c == name).ok_or_else(|| {
                PipelineError::Validation(format!("source columns lack required column {name}"))
            })
        };
        Ok(Self {
            arity: columns.len(),
            record_id: find("record_id")?,
            timestamp: find("timestamp")?,
            event_id: find("tweet_id")?,
            author: find("user_name")?,
            repost_count: find("rt_count")?,
            tags: find("hashtags")?,
            text: find("text")?,
        })
    }
}

// ---------------------------------------------------------------------------
// Pure helpers
// ---------------------------------------------------------------------------

/// base64(SHA-256(record_id ‖ event_id)). Identical for every tag row of
/// one event, so reprocessing yields the same keys.
pub fn content_hash_id(record_id: &str, event_id: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(record_id.as_bytes());
    hasher.update(event_id.as_bytes());
    STANDARD.encode(hasher.finalize())
}

/// One record per non-empty tag; the template's own tag is ignored.
pub fn explode(template: &CanonicalRecord, tags: &[String]) -> Vec<CanonicalRecord> {
    tags.iter()
        .filter(|t| !t.trim().is_empty())
        .map(|tag| CanonicalRecord {
            tag: tag.clone(),
            ..template.clone()
        })
        .collect()
}

// ---------------------------------------------------------------------------
// RecordTransformer
// ---------------------------------------------------------------------------

pub struct RecordTransformer {
    scorer: Arc<dyn SentimentScorer>,
    skip_bad_rows: bool,
}

impl RecordTransformer {
    pub fn new(scorer: Arc<dyn SentimentScorer>) -> Self {
        Self {
            scorer,
            skip_bad_rows: false,
        }
    }

    /// Skip rows that fail to parse, carry a bad timestamp, or fail scoring,
    /// instead of failing the batch.
    pub fn with_skip_bad_rows(mut self, skip: bool) -> Self {
        self.skip_bad_rows = skip;
        self
    }

    pub fn transform(
        &self,
        rows: &[Vec<String>],
        source_columns: &[String],
        output_columns: &[String],
    ) -> Result<TransformOutput> {
        let layout = SourceLayout::resolve(source_columns)?;
        if let Some(unknown) = output_columns
            .iter()
            .find(|c| !CANONICAL_FIELDS.contains(&c.as_str()))
        {
            return Err(PipelineError::Validation(format!(
                "output column {unknown} cannot be produced"
            )));
        }

        let mut output = TransformOutput::default();
        for (index, fields) in rows.iter().enumerate() {
            match self.transform_row(index, fields, &layout) {
                Ok(records) => output
                    .rows
                    .extend(records.iter().map(|r| r.project(output_columns))),
                Err(e) if self.skip_bad_rows => {
                    warn!(row = index, error = %e, "Skipping bad row");
                    output.rows_skipped += 1;
                }
                Err(e) => return Err(e),
            }
        }

        debug!(
            input = rows.len(),
            output = output.rows.len(),
            skipped = output.rows_skipped,
            "Transformed batch"
        );
        Ok(output)
    }

    fn transform_row(
        &self,
        row: usize,
        fields: &[String],
        layout: &SourceLayout,
    ) -> Result<Vec<CanonicalRecord>> {
        if fields.len() != layout.arity {
            return Err(PipelineError::MalformedRecord {
                row,
                reason: format!("expected {} fields, found {}", layout.arity, fields.len()),
            });
        }

        let raw_timestamp = &fields[layout.timestamp];
        let malformed_timestamp = || PipelineError::MalformedRecord {
            row,
            reason: format!("unparsable timestamp {raw_timestamp:?}"),
        };
        let time_stamp = canonical_timestamp(raw_timestamp).ok_or_else(malformed_timestamp)?;

        let text_clean = clean_text(&fields[layout.text]);
        let sentiment = self.scorer.score(&text_clean)?;
        let tags = clean_tags(&fields[layout.tags]);

        let record_id = fields[layout.record_id].clone();
        let event_id = fields[layout.event_id].clone();
        let (year, month, day) = partition_date(raw_timestamp).ok_or_else(malformed_timestamp)?;

        let template = CanonicalRecord {
            hash_id: content_hash_id(&record_id, &event_id),
            record_id,
            event_id,
            time_stamp,
            author: fields[layout.author].clone(),
            repost_count: fields[layout.repost_count].clone(),
            text_clean,
            polarity: sentiment.polarity,
            subjectivity: sentiment.subjectivity,
            tag: String::new(),
            year,
            month,
            day,
        };
        Ok(explode(&template, &tags))
    }
}
