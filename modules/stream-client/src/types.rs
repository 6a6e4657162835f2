use serde::{Deserialize, Serialize};

/// One status object as delivered by the sample stream.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Status {
    pub id_str: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub lang: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub user: Option<StatusUser>,
    #[serde(default)]
    pub retweet_count: i64,
    #[serde(default)]
    pub entities: Entities,
    #[serde(default)]
    pub extended_tweet: Option<ExtendedTweet>,
    #[serde(default)]
    pub retweeted_status: Option<Box<Status>>,
}

impl Status {
    /// Body text. A status carrying an extended body uses its `full_text`,
    /// even when that is empty; otherwise falls back to `text`.
    pub fn content(&self) -> &str {
        match &self.extended_tweet {
            Some(ext) => ext.full_text.as_deref().unwrap_or_default(),
            None => self.text.as_deref().unwrap_or_default(),
        }
    }

    /// Hashtag texts in the order the entities list them.
    pub fn hashtags(&self) -> Vec<String> {
        self.entities
            .hashtags
            .iter()
            .map(|h| h.text.clone())
            .collect()
    }

    pub fn screen_name(&self) -> Option<&str> {
        self.user.as_ref().and_then(|u| u.screen_name.as_deref())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusUser {
    #[serde(default)]
    pub screen_name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Entities {
    #[serde(default)]
    pub hashtags: Vec<Hashtag>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hashtag {
    pub text: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtendedTweet {
    #[serde(default)]
    pub full_text: Option<String>,
}

/// Rate-limit notice interleaved with statuses: how many matching
/// statuses the endpoint withheld since the connection opened.
#[derive(Debug, Clone, Deserialize)]
pub struct LimitNotice {
    pub track: u64,
}

/// Any single line from the stream.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum StreamMessage {
    Status(Box<Status>),
    Limit { limit: LimitNotice },
    /// Deletes, scrub_geo, warnings and anything else we don't act on.
    Other(serde_json::Value),
}
