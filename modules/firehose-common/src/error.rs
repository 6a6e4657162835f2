use std::fmt::Display;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, PipelineError>;

/// How an external service failure should be treated by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// The service asked us to slow down. Same request may be retried later.
    RateLimited,
    /// Connection drop, timeout, 5xx. Retryable within a bounded budget.
    Transient,
    /// Bad request, missing permission, missing resource.
    Permanent,
}

/// Implemented by every backend error so call sites can classify it
/// without knowing the backend.
pub trait ServiceError: std::error::Error {
    fn kind(&self) -> TransportKind;
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Transport error ({service}, {kind:?}): {message}")]
    Transport {
        service: &'static str,
        kind: TransportKind,
        message: String,
    },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Malformed record at row {row}: {reason}")]
    MalformedRecord { row: usize, reason: String },

    #[error("Storage write failed for {key}: {message}")]
    StorageWrite { key: String, message: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl PipelineError {
    pub fn transport(service: &'static str, kind: TransportKind, err: impl Display) -> Self {
        PipelineError::Transport {
            service,
            kind,
            message: err.to_string(),
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(
            self,
            PipelineError::Transport {
                kind: TransportKind::RateLimited,
                ..
            }
        )
    }

    /// Rate limits and transient transport failures.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PipelineError::Transport {
                kind: TransportKind::RateLimited | TransportKind::Transient,
                ..
            }
        )
    }

    /// Malformed configuration or input. Fatal for the invocation.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            PipelineError::Validation(_)
                | PipelineError::MalformedRecord { .. }
                | PipelineError::Config(_)
        )
    }
}

/// Maps a backend result into the pipeline taxonomy at the call site.
pub trait ServiceResultExt<T> {
    fn service(self, name: &'static str) -> Result<T>;
}

impl<T, E: ServiceError> ServiceResultExt<T> for std::result::Result<T, E> {
    fn service(self, name: &'static str) -> Result<T> {
        self.map_err(|e| PipelineError::transport(name, e.kind(), e))
    }
}
