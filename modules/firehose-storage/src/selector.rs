use std::sync::Arc;

use chrono::{DateTime, Timelike, Utc};
use chrono_tz::Tz;
use firehose_common::{Result, ServiceResultExt};
use tracing::{debug, info};

use crate::store::{ObjectMeta, ObjectStore};

/// Selects batch files modified within a trailing hour-of-day window.
#[derive(Clone)]
pub struct ObjectSetSelector {
    store: Arc<dyn ObjectStore>,
}

impl ObjectSetSelector {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Keys under `prefix` whose local last-modified hour is at or after
    /// `now`'s local hour minus `lookback_hours`. Sorted by key.
    pub async fn select(
        &self,
        bucket: &str,
        prefix: &str,
        tz: Tz,
        lookback_hours: u32,
        now: DateTime<Utc>,
    ) -> Result<Vec<String>> {
        let listed = self.store.list(bucket, prefix).await.service("object-store")?;
        let total = listed.len();
        let selected = filter_by_hour(listed, tz, lookback_hours, now);

        info!(
            bucket,
            prefix,
            listed = total,
            selected = selected.len(),
            lookback_hours,
            "Selected batch files"
        );
        Ok(selected)
    }
}

/// Hour-of-day comparison only: a window that crosses midnight does not
/// reach back into the previous day.
pub fn filter_by_hour(
    objects: Vec<ObjectMeta>,
    tz: Tz,
    lookback_hours: u32,
    now: DateTime<Utc>,
) -> Vec<String> {
    let floor = i64::from(now.with_timezone(&tz).hour()) - i64::from(lookback_hours);

    let mut keys: Vec<String> = objects
        .into_iter()
        .filter_map(|object| {
            let Some(modified) = object.last_modified else {
                debug!(key = %object.key, "Skipping object without modification time");
                return None;
            };
            let hour = i64::from(modified.with_timezone(&tz).hour());
            (hour >= floor).then_some(object.key)
        })
        .collect();
    keys.sort();
    keys
}
