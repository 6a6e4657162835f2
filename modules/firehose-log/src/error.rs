use firehose_common::{ServiceError, TransportKind};

pub type Result<T> = std::result::Result<T, LogError>;

#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("Read throughput exceeded for {0}")]
    ThroughputExceeded(String),

    #[error("Unknown shard: {0}")]
    UnknownShard(String),

    #[error("Stream {stream} has {registered} shards, configured with {configured}")]
    ShardCountMismatch {
        stream: String,
        registered: u32,
        configured: u32,
    },

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServiceError for LogError {
    fn kind(&self) -> TransportKind {
        match self {
            LogError::ThroughputExceeded(_) => TransportKind::RateLimited,
            LogError::Connection(_) => TransportKind::Transient,
            LogError::Database(e) => classify_sqlx(e),
            LogError::UnknownShard(_)
            | LogError::ShardCountMismatch { .. }
            | LogError::Internal(_) => TransportKind::Permanent,
        }
    }
}

/// An exhausted pool means callers are outpacing the database, so it is
/// treated like a throughput limit rather than a failure.
fn classify_sqlx(err: &sqlx::Error) -> TransportKind {
    match err {
        sqlx::Error::PoolTimedOut => TransportKind::RateLimited,
        sqlx::Error::Io(_) | sqlx::Error::Tls(_) | sqlx::Error::PoolClosed => {
            TransportKind::Transient
        }
        _ => TransportKind::Permanent,
    }
}
