//! The three pipeline jobs: listen (source to log), ingest (log to landing
//! files) and transform (landing files to staging records).

pub mod filter;
pub mod ingest;
pub mod listener;
pub mod source;
pub mod summary;
pub mod transform_job;

pub use filter::{EventFilter, FilterRules, FilterStats, Rejection, PARTITION_KEY};
pub use ingest::WindowedIngestJob;
pub use listener::run_listener;
pub use source::{source_error, EventSource, RawEvent, StreamSource};
pub use summary::{IngestSummary, JobStatus, JobSummary, ListenSummary, TransformSummary};
pub use transform_job::TransformJob;
