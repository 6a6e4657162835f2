//! Inbound events for the listener.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use firehose_common::{PipelineError, Result, TransportKind};
use stream_client::{Status, StatusStream, StreamError, StreamMessage};
use tracing::{debug, warn};

/// One status as received, numbered in arrival order.
#[derive(Debug, Clone)]
pub struct RawEvent {
    pub seq: u64,
    pub received_at: DateTime<Utc>,
    pub status: Status,
}

#[async_trait]
pub trait EventSource: Send {
    /// Next event, or `None` when the source has closed.
    async fn next_event(&mut self) -> Result<Option<RawEvent>>;
}

/// Classifies a stream failure for the pipeline.
pub fn source_error(err: StreamError) -> PipelineError {
    let kind = match &err {
        StreamError::RateLimited { .. } => TransportKind::RateLimited,
        e if e.is_transient() => TransportKind::Transient,
        _ => TransportKind::Permanent,
    };
    PipelineError::transport("source", kind, err)
}

/// [`EventSource`] over an open status stream. Limit notices, non-status
/// messages and unparsable lines are logged and skipped.
pub struct StreamSource {
    stream: StatusStream,
    next_seq: u64,
}

impl StreamSource {
    pub fn new(stream: StatusStream) -> Self {
        Self {
            stream,
            next_seq: 0,
        }
    }
}

#[async_trait]
impl EventSource for StreamSource {
    async fn next_event(&mut self) -> Result<Option<RawEvent>> {
        loop {
            let message = match self.stream.next_message().await {
                Ok(Some(message)) => message,
                Ok(None) => return Ok(None),
                Err(StreamError::Parse(e)) => {
                    warn!(error = %e, "Skipping unparsable stream line");
                    continue;
                }
                Err(e) => return Err(source_error(e)),
            };

            match message {
                StreamMessage::Status(status) => {
                    let seq = self.next_seq;
                    self.next_seq += 1;
                    return Ok(Some(RawEvent {
                        seq,
                        received_at: Utc::now(),
                        status: *status,
                    }));
                }
                StreamMessage::Limit { limit } => {
                    warn!(withheld = limit.track, "Stream limit notice");
                }
                StreamMessage::Other(_) => {
                    debug!("Ignoring non-status message");
                }
            }
        }
    }
}
