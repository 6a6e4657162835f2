//! Landing rows to staging rows: parse, clean, score, explode by tag, key,
//! partition and project.

pub mod catalog;
pub mod clean;
pub mod sentiment;
pub mod timestamp;
pub mod transformer;

pub use catalog::{SchemaCatalog, StaticCatalog, TableSchema, PARTITION_COLUMNS, STAGING_COLUMNS};
pub use clean::{clean_tags, clean_text};
pub use sentiment::{LexiconScorer, Sentiment, SentimentScorer};
pub use timestamp::{canonical_timestamp, partition_date};
pub use transformer::{
    content_hash_id, explode, CanonicalRecord, RecordTransformer, TransformOutput, CANONICAL_FIELDS,
};
