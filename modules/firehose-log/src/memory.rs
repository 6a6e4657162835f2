//! In-process log for tests and local runs. Supports injecting failures so
//! callers' retry and backoff paths can be exercised.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use crate::error::{LogError, Result};
use crate::log::{all_shards, shard_for_key, PartitionedLog};
use crate::types::{AppendAck, IteratorPosition, LogEntry, RecordBatch, ShardId, ShardIterator};

pub struct MemoryLog {
    shard_count: u32,
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    shards: BTreeMap<ShardId, Vec<LogEntry>>,
    next_seq: i64,
    closed: Vec<ShardId>,
    read_failures: VecDeque<LogError>,
    append_failures: VecDeque<LogError>,
}

impl MemoryLog {
    pub fn new(shard_count: u32) -> Self {
        let shard_count = shard_count.max(1);
        let shards = all_shards(shard_count)
            .into_iter()
            .map(|id| (id, Vec::new()))
            .collect();
        Self {
            shard_count,
            inner: Mutex::new(Inner {
                shards,
                next_seq: 1,
                ..Inner::default()
            }),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| LogError::Internal("lock poisoned".into()))
    }

    /// Every entry of every shard, in sequence order.
    pub fn entries(&self) -> Vec<LogEntry> {
        let Ok(inner) = self.lock() else {
            return Vec::new();
        };
        let mut all: Vec<LogEntry> = inner.shards.values().flatten().cloned().collect();
        all.sort_by_key(|e| e.seq);
        all
    }

    /// Readers holding an iterator for this shard get `next_iterator: None`.
    pub fn close_shard(&self, shard: &ShardId) {
        if let Ok(mut inner) = self.lock() {
            inner.closed.push(shard.clone());
        }
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl MemoryLog {
    /// Queue errors returned by the next `get_records` calls, one per call.
    pub fn fail_next_reads(&self, errors: impl IntoIterator<Item = LogError>) {
        if let Ok(mut inner) = self.lock() {
            inner.read_failures.extend(errors);
        }
    }

    /// Queue errors returned by the next `append` calls, one per call.
    pub fn fail_next_appends(&self, errors: impl IntoIterator<Item = LogError>) {
        if let Ok(mut inner) = self.lock() {
            inner.append_failures.extend(errors);
        }
    }
}

#[async_trait]
impl PartitionedLog for MemoryLog {
    async fn append(&self, partition_key: &str, payload: &[u8]) -> Result<AppendAck> {
        let mut inner = self.lock()?;
        if let Some(err) = inner.append_failures.pop_front() {
            return Err(err);
        }

        let shard_id = self.shard_for(partition_key);
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner
            .shards
            .entry(shard_id.clone())
            .or_default()
            .push(LogEntry {
                shard_id: shard_id.clone(),
                seq,
                arrival: Utc::now(),
                partition_key: partition_key.to_string(),
                payload: payload.to_vec(),
            });

        Ok(AppendAck { shard_id, seq })
    }

    fn shard_for(&self, partition_key: &str) -> ShardId {
        shard_for_key(partition_key, self.shard_count)
    }

    async fn list_shards(&self) -> Result<Vec<ShardId>> {
        Ok(self.lock()?.shards.keys().cloned().collect())
    }

    async fn shard_iterator(
        &self,
        shard: &ShardId,
        position: IteratorPosition,
    ) -> Result<ShardIterator> {
        let inner = self.lock()?;
        let entries = inner
            .shards
            .get(shard)
            .ok_or_else(|| LogError::UnknownShard(shard.to_string()))?;

        let after_seq = match position {
            IteratorPosition::Latest => entries.last().map_or(0, |e| e.seq),
            IteratorPosition::TrimHorizon => 0,
        };

        Ok(ShardIterator {
            shard_id: shard.clone(),
            after_seq,
        })
    }

    async fn get_records(&self, iterator: &ShardIterator, limit: usize) -> Result<RecordBatch> {
        let mut inner = self.lock()?;
        if let Some(err) = inner.read_failures.pop_front() {
            return Err(err);
        }

        let entries: Vec<LogEntry> = inner
            .shards
            .get(&iterator.shard_id)
            .ok_or_else(|| LogError::UnknownShard(iterator.shard_id.to_string()))?
            .iter()
            .filter(|e| e.seq > iterator.after_seq)
            .take(limit)
            .cloned()
            .collect();

        let caught_up = entries.len() < limit;
        let next_iterator = if caught_up && inner.closed.contains(&iterator.shard_id) {
            None
        } else {
            Some(ShardIterator {
                shard_id: iterator.shard_id.clone(),
                after_seq: entries.last().map_or(iterator.after_seq, |e| e.seq),
            })
        };

        Ok(RecordBatch {
            entries,
            next_iterator,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn latest_iterator_skips_existing_entries() {
        let log = MemoryLog::new(1);
        log.append("111", b"old").await.unwrap();

        let shard = log.list_shards().await.unwrap().remove(0);
        let latest = log.shard_iterator(&shard, IteratorPosition::Latest).await.unwrap();
        let horizon = log
            .shard_iterator(&shard, IteratorPosition::TrimHorizon)
            .await
            .unwrap();

        log.append("111", b"new").await.unwrap();

        let batch = log.get_records(&latest, 10).await.unwrap();
        assert_eq!(batch.entries.len(), 1);
        assert_eq!(batch.entries[0].payload, b"new");

        let batch = log.get_records(&horizon, 10).await.unwrap();
        assert_eq!(batch.entries.len(), 2);
    }

    #[tokio::test]
    async fn limit_and_next_iterator_advance() {
        let log = MemoryLog::new(1);
        let shard = ShardId::from_index(0);
        let mut iterator = log.shard_iterator(&shard, IteratorPosition::Latest).await.unwrap();
        for i in 0..5 {
            log.append("111", format!("e{i}").as_bytes()).await.unwrap();
        }

        let first = log.get_records(&iterator, 3).await.unwrap();
        assert_eq!(first.entries.len(), 3);
        iterator = first.next_iterator.unwrap();

        let second = log.get_records(&iterator, 3).await.unwrap();
        assert_eq!(second.entries.len(), 2);
        assert!(second.entries[0].seq > first.entries[2].seq);

        let empty = log.get_records(&second.next_iterator.unwrap(), 3).await.unwrap();
        assert!(empty.entries.is_empty());
        assert!(empty.next_iterator.is_some());
    }

    #[tokio::test]
    async fn injected_failures_are_consumed_in_order() {
        let log = MemoryLog::new(1);
        log.fail_next_appends([LogError::Connection("reset".into())]);
        assert!(log.append("111", b"x").await.is_err());
        assert!(log.append("111", b"x").await.is_ok());

        let iterator = log
            .shard_iterator(&ShardId::from_index(0), IteratorPosition::TrimHorizon)
            .await
            .unwrap();
        log.fail_next_reads([LogError::ThroughputExceeded("shard-000000".into())]);
        assert!(matches!(
            log.get_records(&iterator, 10).await,
            Err(LogError::ThroughputExceeded(_))
        ));
        assert_eq!(log.get_records(&iterator, 10).await.unwrap().entries.len(), 1);
    }

    #[tokio::test]
    async fn closed_shard_ends_iteration_once_drained() {
        let log = MemoryLog::new(1);
        let shard = ShardId::from_index(0);
        let iterator = log.shard_iterator(&shard, IteratorPosition::Latest).await.unwrap();
        log.append("111", b"last").await.unwrap();
        log.close_shard(&shard);

        let batch = log.get_records(&iterator, 10).await.unwrap();
        assert_eq!(batch.entries.len(), 1);
        assert!(batch.next_iterator.is_none());
    }

    #[tokio::test]
    async fn unknown_shard_is_rejected() {
        let log = MemoryLog::new(1);
        let err = log
            .shard_iterator(&ShardId("nope".into()), IteratorPosition::Latest)
            .await
            .unwrap_err();
        assert!(matches!(err, LogError::UnknownShard(_)));
    }
}
