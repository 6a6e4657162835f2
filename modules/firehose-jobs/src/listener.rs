use tracing::info;

use firehose_common::Result;

use crate::filter::EventFilter;
use crate::source::EventSource;
use crate::summary::{JobStatus, JobSummary, ListenSummary};

/// Feed events from `source` through `filter` until the filter's duration
/// elapses or the source closes. A quiet source cannot hold the listener
/// past its duration.
pub async fn run_listener<S>(source: &mut S, filter: &mut EventFilter) -> Result<ListenSummary>
where
    S: EventSource + ?Sized,
{
    loop {
        let remaining = filter.remaining();
        if remaining.is_zero() {
            break;
        }
        let event = match tokio::time::timeout(remaining, source.next_event()).await {
            Ok(event) => event?,
            Err(_) => break,
        };
        let Some(event) = event else {
            info!("Source closed");
            break;
        };
        if !filter.on_event(&event).await? {
            break;
        }
    }

    let stats = filter.stats();
    info!(
        seen = stats.seen,
        accepted = stats.accepted,
        rejected = stats.rejected,
        "Listener finished"
    );
    Ok(ListenSummary {
        job: JobSummary {
            status: JobStatus::Completed,
            row_count: stats.accepted as usize,
            destination_key: None,
        },
        events_seen: stats.seen,
        events_rejected: stats.rejected,
    })
}
