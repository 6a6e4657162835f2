pub mod config;
pub mod error;
pub mod retry;
pub mod types;

pub use config::{parse_timezone, IngestConfig, ListenerConfig, TransformConfig};
pub use error::{PipelineError, Result, ServiceError, ServiceResultExt, TransportKind};
pub use retry::{with_backoff, BackoffPolicy};
pub use types::{BatchRecord, BatchRow, FilteredEvent, LANDING_COLUMNS};
