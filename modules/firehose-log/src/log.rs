use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::error::Result;
use crate::types::{AppendAck, IteratorPosition, RecordBatch, ShardId, ShardIterator};

/// A sharded, append-only log with iterator-based reads.
///
/// The read cursor lives in the iterator the caller holds; the log keeps no
/// per-reader state. Delivery is at-least-once: re-attaching may replay.
#[async_trait]
pub trait PartitionedLog: Send + Sync {
    /// Append one payload. The partition key picks the shard.
    async fn append(&self, partition_key: &str, payload: &[u8]) -> Result<AppendAck>;

    /// The shard `append` routes this partition key to.
    fn shard_for(&self, partition_key: &str) -> ShardId;

    /// Shards in a stable order.
    async fn list_shards(&self) -> Result<Vec<ShardId>>;

    async fn shard_iterator(
        &self,
        shard: &ShardId,
        position: IteratorPosition,
    ) -> Result<ShardIterator>;

    /// Up to `limit` entries after the iterator's position. An empty batch
    /// means nothing new yet, not end of stream.
    async fn get_records(&self, iterator: &ShardIterator, limit: usize) -> Result<RecordBatch>;
}

/// Stable shard assignment: first 8 bytes of SHA-256(partition key), mod count.
pub fn shard_for_key(partition_key: &str, shard_count: u32) -> ShardId {
    let digest = Sha256::digest(partition_key.as_bytes());
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    let index = u64::from_be_bytes(prefix) % u64::from(shard_count.max(1));
    ShardId::from_index(index as u32)
}

pub fn all_shards(shard_count: u32) -> Vec<ShardId> {
    (0..shard_count.max(1)).map(ShardId::from_index).collect()
}
