//! Core types for the partitioned log.

use std::fmt;

use chrono::{DateTime, Utc};

/// Identifier of one ordered, independently-read partition of the log.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ShardId(pub String);

impl ShardId {
    pub fn from_index(index: u32) -> Self {
        ShardId(format!("shard-{index:06}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ShardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where a fresh iterator starts reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IteratorPosition {
    /// Just after the newest committed entry; only later appends are seen.
    Latest,
    /// The oldest retained entry.
    TrimHorizon,
}

/// Read position within one shard. Callers treat it as opaque and pass back
/// whatever the last read returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardIterator {
    pub(crate) shard_id: ShardId,
    pub(crate) after_seq: i64,
}

impl ShardIterator {
    pub fn shard_id(&self) -> &ShardId {
        &self.shard_id
    }
}

/// An appended payload as read back, with log metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub shard_id: ShardId,
    /// Strictly increasing within a shard.
    pub seq: i64,
    pub arrival: DateTime<Utc>,
    pub partition_key: String,
    pub payload: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppendAck {
    pub shard_id: ShardId,
    pub seq: i64,
}

/// One fetch: entries in sequence order plus where to read next.
/// `next_iterator` is `None` once the shard is closed.
#[derive(Debug, Clone)]
pub struct RecordBatch {
    pub entries: Vec<LogEntry>,
    pub next_iterator: Option<ShardIterator>,
}
