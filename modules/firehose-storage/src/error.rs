use std::io;

use firehose_common::{ServiceError, TransportKind};

pub type Result<T> = std::result::Result<T, StorageError>;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Invalid object key: {0}")]
    InvalidKey(String),

    #[error("Access denied: {0}")]
    PermissionDenied(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServiceError for StorageError {
    fn kind(&self) -> TransportKind {
        match self {
            StorageError::Unavailable(_) => TransportKind::Transient,
            StorageError::Io(e) => match e.kind() {
                io::ErrorKind::TimedOut
                | io::ErrorKind::Interrupted
                | io::ErrorKind::WouldBlock => TransportKind::Transient,
                _ => TransportKind::Permanent,
            },
            StorageError::NotFound(_)
            | StorageError::InvalidKey(_)
            | StorageError::PermissionDenied(_)
            | StorageError::Internal(_) => TransportKind::Permanent,
        }
    }
}
