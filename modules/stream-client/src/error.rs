use thiserror::Error;

pub type Result<T> = std::result::Result<T, StreamError>;

#[derive(Debug, Error)]
pub enum StreamError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Rate limited by stream endpoint (status {status})")]
    RateLimited { status: u16 },

    #[error("Parse error: {0}")]
    Parse(String),
}

impl StreamError {
    /// 420 is the legacy "enhance your calm" status; 429 is the standard one.
    pub fn is_rate_limit_status(status: u16) -> bool {
        status == 420 || status == 429
    }

    /// Server-side and connection failures that are worth a reconnect.
    pub fn is_transient(&self) -> bool {
        match self {
            StreamError::Network(_) => true,
            StreamError::Api { status, .. } => *status >= 500,
            StreamError::RateLimited { .. } | StreamError::Parse(_) => false,
        }
    }
}

impl From<reqwest::Error> for StreamError {
    fn from(err: reqwest::Error) -> Self {
        StreamError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for StreamError {
    fn from(err: serde_json::Error) -> Self {
        StreamError::Parse(err.to_string())
    }
}
