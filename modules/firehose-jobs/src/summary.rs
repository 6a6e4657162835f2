//! Structured results returned by each job and logged as JSON.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Completed,
    /// The ingest window drained nothing; no file was written.
    NoRecords,
    /// No landing files were selected; no file was written.
    NoInput,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobSummary {
    pub status: JobStatus,
    pub row_count: usize,
    pub destination_key: Option<String>,
}

impl JobSummary {
    pub fn completed(row_count: usize, destination_key: impl Into<String>) -> Self {
        Self {
            status: JobStatus::Completed,
            row_count,
            destination_key: Some(destination_key.into()),
        }
    }

    pub fn empty(status: JobStatus) -> Self {
        Self {
            status,
            row_count: 0,
            destination_key: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListenSummary {
    #[serde(flatten)]
    pub job: JobSummary,
    pub events_seen: u64,
    pub events_rejected: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestSummary {
    #[serde(flatten)]
    pub job: JobSummary,
    pub entries_read: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransformSummary {
    #[serde(flatten)]
    pub job: JobSummary,
    pub files_selected: usize,
    pub rows_skipped: usize,
    /// `<database>.<table>`
    pub target_table: String,
    #[serde(serialize_with = "iso_date")]
    pub processed_at: NaiveDate,
    pub log_record: String,
}

impl TransformSummary {
    pub fn new(
        job: JobSummary,
        files_selected: usize,
        rows_skipped: usize,
        target_table: String,
        processed_at: NaiveDate,
    ) -> Self {
        let log_record = update_log_record(processed_at, &target_table, job.row_count);
        Self {
            job,
            files_selected,
            rows_skipped,
            target_table,
            processed_at,
            log_record,
        }
    }
}

/// `'<date>', '<db>.<table>', <rows>, <year>, <month>, <day>`, the tuple
/// appended to the operational data log.
pub fn update_log_record(processed_at: NaiveDate, target_table: &str, rows: usize) -> String {
    format!(
        "'{}', '{}', {}, {}, {}, {}",
        processed_at.format("%Y-%m-%d"),
        target_table,
        rows,
        processed_at.year(),
        processed_at.month(),
        processed_at.day()
    )
}

fn iso_date<S: serde::Serializer>(date: &NaiveDate, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(&date.format("%Y-%m-%d"))
}
