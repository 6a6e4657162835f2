use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// A reposted status that passed every selection predicate, reshaped into
/// the compact payload appended to the log.
///
/// Serialized field names are the payload's wire names; field order is the
/// payload order and therefore the landing row order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilteredEvent {
    pub created: String,
    #[serde(rename = "tweet_id")]
    pub event_id: String,
    #[serde(rename = "user_name")]
    pub author: String,
    #[serde(rename = "rt_count")]
    pub repost_count: i64,
    #[serde(rename = "hashtags", with = "space_joined")]
    pub tags: Vec<String>,
    pub text: String,
}

impl FilteredEvent {
    pub fn to_payload(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self)
            .map_err(|e| PipelineError::Validation(format!("unserializable event: {e}")))
    }

    pub fn from_payload(payload: &[u8]) -> Result<Self> {
        serde_json::from_slice(payload)
            .map_err(|e| PipelineError::Validation(format!("undecodable log payload: {e}")))
    }
}

mod space_joined {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(tags: &[String], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&tags.join(" "))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
        let joined = String::deserialize(d)?;
        Ok(joined.split_whitespace().map(str::to_string).collect())
    }
}

/// Anything that can be written as one delimited row.
pub trait BatchRow {
    fn to_fields(&self) -> Vec<String>;
}

impl BatchRow for Vec<String> {
    fn to_fields(&self) -> Vec<String> {
        self.clone()
    }
}

/// Column order of a landing row.
pub const LANDING_COLUMNS: [&str; 8] = [
    "record_id",
    "timestamp",
    "created",
    "tweet_id",
    "user_name",
    "rt_count",
    "hashtags",
    "text",
];

/// One row of a drained window: log entry id, arrival time, decoded payload.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchRecord {
    pub entry_id: String,
    pub arrival: DateTime<Utc>,
    pub event: FilteredEvent,
}

impl BatchRecord {
    pub fn from_payload(
        entry_id: impl Into<String>,
        arrival: DateTime<Utc>,
        payload: &[u8],
    ) -> Result<Self> {
        Ok(Self {
            entry_id: entry_id.into(),
            arrival,
            event: FilteredEvent::from_payload(payload)?,
        })
    }
}

impl BatchRow for BatchRecord {
    fn to_fields(&self) -> Vec<String> {
        vec![
            self.entry_id.clone(),
            self.arrival.to_rfc3339_opts(SecondsFormat::Millis, true),
            self.event.created.clone(),
            self.event.event_id.clone(),
            self.event.author.clone(),
            self.event.repost_count.to_string(),
            self.event.tags.join(" "),
            self.event.text.clone(),
        ]
    }
}
