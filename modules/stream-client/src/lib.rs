pub mod error;
pub mod types;

pub use error::{Result, StreamError};
pub use types::{
    Entities, ExtendedTweet, Hashtag, LimitNotice, Status, StatusUser, StreamMessage,
};

use std::time::Duration;

/// First wait after a 420/429 on connect. Doubles on each further refusal.
const RATE_LIMIT_BACKOFF_BASE: Duration = Duration::from_secs(60);

const DEFAULT_MAX_CONNECT_ATTEMPTS: u32 = 3;

pub struct StreamClient {
    client: reqwest::Client,
    endpoint: String,
    token: String,
    max_connect_attempts: u32,
    backoff_base: Duration,
}

impl StreamClient {
    pub fn new(endpoint: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            token: token.into(),
            max_connect_attempts: DEFAULT_MAX_CONNECT_ATTEMPTS,
            backoff_base: RATE_LIMIT_BACKOFF_BASE,
        }
    }

    pub fn with_max_connect_attempts(mut self, attempts: u32) -> Self {
        self.max_connect_attempts = attempts.max(1);
        self
    }

    pub fn with_backoff_base(mut self, base: Duration) -> Self {
        self.backoff_base = base;
        self
    }

    /// Open the stream. Rate-limit refusals are retried with exponential
    /// backoff; any other non-success status fails immediately.
    pub async fn connect(&self) -> Result<StatusStream> {
        let mut attempt = 0u32;
        loop {
            let resp = self
                .client
                .get(&self.endpoint)
                .bearer_auth(&self.token)
                .send()
                .await?;

            let status = resp.status();
            if status.is_success() {
                tracing::info!(endpoint = %self.endpoint, "Connected to status stream");
                return Ok(StatusStream::new(resp));
            }

            let code = status.as_u16();
            if StreamError::is_rate_limit_status(code) {
                attempt += 1;
                if attempt >= self.max_connect_attempts {
                    return Err(StreamError::RateLimited { status: code });
                }
                let delay = self.backoff_base * 2u32.pow(attempt - 1);
                tracing::warn!(
                    status = code,
                    attempt,
                    ?delay,
                    "Stream connect rate limited, backing off"
                );
                tokio::time::sleep(delay).await;
                continue;
            }

            let body = resp.text().await.unwrap_or_default();
            return Err(StreamError::Api {
                status: code,
                message: body,
            });
        }
    }
}

/// An open connection. Yields one parsed message per non-blank line.
pub struct StatusStream {
    response: reqwest::Response,
    lines: LineBuffer,
}

impl StatusStream {
    fn new(response: reqwest::Response) -> Self {
        Self {
            response,
            lines: LineBuffer::default(),
        }
    }

    /// Next message, or `None` once the server closes the connection.
    pub async fn next_message(&mut self) -> Result<Option<StreamMessage>> {
        loop {
            if let Some(line) = self.lines.next_line() {
                return parse_line(&line).map(Some);
            }
            match self.response.chunk().await? {
                Some(chunk) => self.lines.push(&chunk),
                None => {
                    return match self.lines.finish() {
                        Some(line) => parse_line(&line).map(Some),
                        None => Ok(None),
                    };
                }
            }
        }
    }
}

fn parse_line(line: &str) -> Result<StreamMessage> {
    Ok(serde_json::from_str(line)?)
}

/// Reassembles lines from arbitrarily split chunks. Blank lines are
/// keep-alives and never surface.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buf: Vec<u8>,
}

impl LineBuffer {
    pub fn push(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    pub fn next_line(&mut self) -> Option<String> {
        while let Some(pos) = self.buf.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.buf.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw).trim().to_string();
            if !line.is_empty() {
                return Some(line);
            }
        }
        None
    }

    /// Whatever trails the last newline once the stream has ended.
    pub fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.buf);
        let line = String::from_utf8_lossy(&rest).trim().to_string();
        (!line.is_empty()).then_some(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_buffer_joins_split_chunks() {
        let mut lines = LineBuffer::default();
        lines.push(b"{\"id_str\":\"1\",");
        assert!(lines.next_line().is_none());
        lines.push(b"\"text\":\"hi\"}\r\n\r\n{\"id_str\":\"2\"}\n");
        assert_eq!(lines.next_line().unwrap(), r#"{"id_str":"1","text":"hi"}"#);
        assert_eq!(lines.next_line().unwrap(), r#"{"id_str":"2"}"#);
        assert!(lines.next_line().is_none());
    }

    #[test]
    fn line_buffer_skips_keep_alives() {
        let mut lines = LineBuffer::default();
        lines.push(b"\r\n\r\n\n");
        assert!(lines.next_line().is_none());
        assert!(lines.finish().is_none());
    }

    #[test]
    fn finish_returns_unterminated_tail() {
        let mut lines = LineBuffer::default();
        lines.push(b"{\"id_str\":\"9\"}");
        assert!(lines.next_line().is_none());
        assert_eq!(lines.finish().unwrap(), r#"{"id_str":"9"}"#);
    }

    #[test]
    fn parses_status_with_repost() {
        let line = r#"{
            "id_str": "10",
            "text": "RT @someone: hello",
            "lang": "en",
            "user": {"screen_name": "reposter"},
            "retweeted_status": {
                "id_str": "7",
                "text": "hello #world",
                "lang": "en",
                "created_at": "Tue Mar 05 10:00:00 +0000 2024",
                "user": {"screen_name": "someone"},
                "retweet_count": 150,
                "entities": {"hashtags": [{"text": "world"}]}
            }
        }"#;

        let StreamMessage::Status(status) = parse_line(line).unwrap() else {
            panic!("expected a status");
        };
        let original = status.retweeted_status.as_deref().unwrap();
        assert_eq!(original.id_str, "7");
        assert_eq!(original.retweet_count, 150);
        assert_eq!(original.hashtags(), vec!["world"]);
        assert_eq!(original.screen_name(), Some("someone"));
        assert_eq!(original.content(), "hello #world");
    }

    #[test]
    fn extended_body_wins_even_when_empty() {
        let status: Status = serde_json::from_str(
            r#"{"id_str":"1","text":"short","extended_tweet":{"full_text":""}}"#,
        )
        .unwrap();
        assert_eq!(status.content(), "");

        let status: Status = serde_json::from_str(
            r#"{"id_str":"1","text":"short","extended_tweet":{"full_text":"long body"}}"#,
        )
        .unwrap();
        assert_eq!(status.content(), "long body");
    }

    #[test]
    fn limit_and_delete_notices_are_not_statuses() {
        assert!(matches!(
            parse_line(r#"{"limit":{"track":12}}"#).unwrap(),
            StreamMessage::Limit { limit } if limit.track == 12
        ));
        assert!(matches!(
            parse_line(r#"{"delete":{"status":{"id_str":"1"}}}"#).unwrap(),
            StreamMessage::Other(_)
        ));
    }

    #[test]
    fn rate_limit_statuses() {
        assert!(StreamError::is_rate_limit_status(420));
        assert!(StreamError::is_rate_limit_status(429));
        assert!(!StreamError::is_rate_limit_status(503));
        assert!(StreamError::Api { status: 503, message: String::new() }.is_transient());
        assert!(!StreamError::Parse("bad".into()).is_transient());
    }
}
