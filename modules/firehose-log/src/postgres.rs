//! Durable partitioned log backed by Postgres.
//!
//! Every stream shares one `log_entries` table. Sequence numbers come from a
//! single BIGSERIAL, so they are strictly increasing within a shard but not
//! contiguous. Schema lives in `migrations/`.

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::debug;

use crate::error::{LogError, Result};
use crate::log::{all_shards, shard_for_key, PartitionedLog};
use crate::types::{AppendAck, IteratorPosition, LogEntry, RecordBatch, ShardId, ShardIterator};

// ---------------------------------------------------------------------------
// PgLog
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct PgLog {
    pool: PgPool,
    stream_name: String,
    shard_count: u32,
}

impl PgLog {
    pub fn new(pool: PgPool, stream_name: impl Into<String>, shard_count: u32) -> Self {
        Self {
            pool,
            stream_name: stream_name.into(),
            shard_count: shard_count.max(1),
        }
    }

    /// Connect, apply migrations, and register the stream's shard count.
    pub async fn connect(url: &str, stream_name: &str, shard_count: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(url)
            .await
            .map_err(|e| LogError::Connection(e.to_string()))?;
        let log = Self::new(pool, stream_name, shard_count);
        log.migrate().await?;
        log.register().await?;
        Ok(log)
    }

    /// Run the embedded SQL migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| LogError::Database(e.into()))?;
        Ok(())
    }

    /// Record this stream's shard count on first use, and refuse to run with
    /// a different one afterwards. Writers and readers configured apart would
    /// otherwise route the same partition key to different shards.
    pub async fn register(&self) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO log_streams (stream_name, shard_count)
            VALUES ($1, $2)
            ON CONFLICT (stream_name) DO NOTHING
            "#,
        )
        .bind(&self.stream_name)
        .bind(self.shard_count as i32)
        .execute(&self.pool)
        .await?;

        let (registered,) = sqlx::query_as::<_, (i32,)>(
            "SELECT shard_count FROM log_streams WHERE stream_name = $1",
        )
        .bind(&self.stream_name)
        .fetch_one(&self.pool)
        .await?;

        if registered as u32 != self.shard_count {
            return Err(LogError::ShardCountMismatch {
                stream: self.stream_name.clone(),
                registered: registered as u32,
                configured: self.shard_count,
            });
        }
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn stream_name(&self) -> &str {
        &self.stream_name
    }

    fn check_shard(&self, shard: &ShardId) -> Result<()> {
        if all_shards(self.shard_count).contains(shard) {
            Ok(())
        } else {
            Err(LogError::UnknownShard(shard.to_string()))
        }
    }

    /// The newest committed sequence number in a shard, or 0 if it is empty.
    async fn latest_seq(&self, shard: &ShardId) -> Result<i64> {
        let row = sqlx::query_as::<_, (Option<i64>,)>(
            "SELECT MAX(seq) FROM log_entries WHERE stream_name = $1 AND shard_id = $2",
        )
        .bind(&self.stream_name)
        .bind(shard.as_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(row.0.unwrap_or(0))
    }
}

#[async_trait]
impl PartitionedLog for PgLog {
    /// Appends to one shard are serialized by a transaction-scoped advisory
    /// lock, so a shard's sequence numbers become visible in commit order and
    /// a reader past seq N never misses a later commit below N.
    async fn append(&self, partition_key: &str, payload: &[u8]) -> Result<AppendAck> {
        let shard_id = self.shard_for(partition_key);
        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1 || '/' || $2))")
            .bind(&self.stream_name)
            .bind(shard_id.as_str())
            .execute(&mut *tx)
            .await?;

        let row = sqlx::query_as::<_, (i64,)>(
            r#"
            INSERT INTO log_entries (stream_name, shard_id, partition_key, payload)
            VALUES ($1, $2, $3, $4)
            RETURNING seq
            "#,
        )
        .bind(&self.stream_name)
        .bind(shard_id.as_str())
        .bind(partition_key)
        .bind(payload)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(AppendAck {
            shard_id,
            seq: row.0,
        })
    }

    fn shard_for(&self, partition_key: &str) -> ShardId {
        shard_for_key(partition_key, self.shard_count)
    }

    async fn list_shards(&self) -> Result<Vec<ShardId>> {
        Ok(all_shards(self.shard_count))
    }

    async fn shard_iterator(
        &self,
        shard: &ShardId,
        position: IteratorPosition,
    ) -> Result<ShardIterator> {
        self.check_shard(shard)?;
        let after_seq = match position {
            IteratorPosition::Latest => self.latest_seq(shard).await?,
            IteratorPosition::TrimHorizon => 0,
        };
        debug!(stream = %self.stream_name, %shard, after_seq, "Attached shard iterator");

        Ok(ShardIterator {
            shard_id: shard.clone(),
            after_seq,
        })
    }

    async fn get_records(&self, iterator: &ShardIterator, limit: usize) -> Result<RecordBatch> {
        self.check_shard(&iterator.shard_id)?;
        let entries = sqlx::query_as::<_, LogEntry>(
            r#"
            SELECT seq, shard_id, partition_key, ts, payload
            FROM log_entries
            WHERE stream_name = $1 AND shard_id = $2 AND seq > $3
            ORDER BY seq ASC
            LIMIT $4
            "#,
        )
        .bind(&self.stream_name)
        .bind(iterator.shard_id.as_str())
        .bind(iterator.after_seq)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        let after_seq = entries.last().map_or(iterator.after_seq, |e| e.seq);
        Ok(RecordBatch {
            entries,
            next_iterator: Some(ShardIterator {
                shard_id: iterator.shard_id.clone(),
                after_seq,
            }),
        })
    }
}

// ---------------------------------------------------------------------------
// sqlx::FromRow for LogEntry
// ---------------------------------------------------------------------------

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for LogEntry {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> std::result::Result<Self, sqlx::Error> {
        use sqlx::Row;
        let shard_id: String = row.try_get("shard_id")?;
        Ok(LogEntry {
            shard_id: ShardId(shard_id),
            seq: row.try_get("seq")?,
            arrival: row.try_get("ts")?,
            partition_key: row.try_get("partition_key")?,
            payload: row.try_get("payload")?,
        })
    }
}

// ---------------------------------------------------------------------------
// Test utilities
// ---------------------------------------------------------------------------

#[cfg(feature = "test-utils")]
impl PgLog {
    /// Every entry of this stream, in sequence order.
    pub async fn read_all(&self) -> Result<Vec<LogEntry>> {
        let rows = sqlx::query_as::<_, LogEntry>(
            r#"
            SELECT seq, shard_id, partition_key, ts, payload
            FROM log_entries
            WHERE stream_name = $1
            ORDER BY seq ASC
            "#,
        )
        .bind(&self.stream_name)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
