//! Sharded append-only log: the durable buffer between the listener and the
//! ingest job.
//!
//! Backends implement [`PartitionedLog`]. [`WindowedLogReader`] drains one for
//! a bounded window.

pub mod error;
pub mod log;
pub mod memory;
pub mod postgres;
pub mod reader;
pub mod types;

pub use error::LogError;
pub use log::{shard_for_key, PartitionedLog};
pub use memory::MemoryLog;
pub use postgres::PgLog;
pub use reader::WindowedLogReader;
pub use types::{AppendAck, IteratorPosition, LogEntry, RecordBatch, ShardId, ShardIterator};
