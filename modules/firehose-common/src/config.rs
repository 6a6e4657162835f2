use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use chrono_tz::Tz;
use tracing::info;

use crate::error::{PipelineError, Result};

/// Reads named values from some key/value source. `from_env` wraps the
/// process environment; tests pass a map.
struct Vars<'a> {
    get: &'a dyn Fn(&str) -> Option<String>,
}

impl<'a> Vars<'a> {
    fn optional(&self, key: &str) -> Option<String> {
        (self.get)(key).filter(|v| !v.trim().is_empty())
    }

    fn required(&self, key: &str) -> Result<String> {
        self.optional(key)
            .ok_or_else(|| PipelineError::Config(format!("{key} environment variable is required")))
    }

    fn or(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    fn parse<T: FromStr>(&self, key: &str, default: Option<T>) -> Result<T> {
        match self.optional(key) {
            Some(raw) => raw.trim().parse().map_err(|_| {
                PipelineError::Config(format!("{key} has an invalid value: {raw:?}"))
            }),
            None => default.ok_or_else(|| {
                PipelineError::Config(format!("{key} environment variable is required"))
            }),
        }
    }

    fn flag(&self, key: &str) -> Result<bool> {
        match self.optional(key).map(|v| v.trim().to_ascii_lowercase()) {
            None => Ok(false),
            Some(v) if matches!(v.as_str(), "1" | "true" | "yes") => Ok(true),
            Some(v) if matches!(v.as_str(), "0" | "false" | "no") => Ok(false),
            Some(v) => Err(PipelineError::Config(format!("{key} must be a boolean, got {v:?}"))),
        }
    }

    fn timezone(&self, key: &str) -> Result<Tz> {
        let raw = self.required(key)?;
        parse_timezone(&raw)
    }

    /// Storage prefixes always end in exactly one `/`, or are empty.
    fn prefix(&self, key: &str, default: &str) -> String {
        let raw = self.or(key, default);
        let trimmed = raw.trim_matches('/');
        if trimmed.is_empty() {
            String::new()
        } else {
            format!("{trimmed}/")
        }
    }
}

pub fn parse_timezone(raw: &str) -> Result<Tz> {
    raw.trim()
        .parse::<Tz>()
        .map_err(|_| PipelineError::Config(format!("unknown timezone: {raw:?}")))
}

fn from_process_env(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn redact(value: &str) -> &'static str {
    if value.is_empty() {
        "(unset)"
    } else {
        "(redacted)"
    }
}

/// Settings for the stream listener: source, predicates, log destination.
#[derive(Debug, Clone)]
pub struct ListenerConfig {
    pub source_stream_url: String,
    pub source_bearer_token: String,
    pub log_database_url: String,
    pub stream_name: String,
    pub shard_count: u32,
    pub stream_seconds: u64,
    pub language: String,
    /// A repost is kept only when its counter is strictly above this.
    pub repost_floor: i64,
    pub own_handle: Option<String>,
    pub append_max_attempts: u32,
}

impl ListenerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(&from_process_env)
    }

    pub fn from_lookup(get: &dyn Fn(&str) -> Option<String>) -> Result<Self> {
        let vars = Vars { get };
        Ok(Self {
            source_stream_url: vars.required("SOURCE_STREAM_URL")?,
            source_bearer_token: vars.required("SOURCE_BEARER_TOKEN")?,
            log_database_url: vars.required("LOG_DATABASE_URL")?,
            stream_name: vars.required("STREAM_NAME")?,
            shard_count: vars.parse("SHARD_COUNT", Some(1))?.max(1),
            stream_seconds: vars.parse("STREAM_SECONDS", None)?,
            language: vars.or("LANGUAGE", "en"),
            repost_floor: vars.parse("REPOST_FLOOR", Some(99))?,
            own_handle: vars.optional("OWN_HANDLE"),
            append_max_attempts: vars.parse("APPEND_MAX_ATTEMPTS", Some(3))?,
        })
    }

    pub fn stream_duration(&self) -> Duration {
        Duration::from_secs(self.stream_seconds)
    }

    pub fn log_redacted(&self) {
        info!(
            source_stream_url = self.source_stream_url.as_str(),
            source_bearer_token = redact(&self.source_bearer_token),
            log_database_url = redact(&self.log_database_url),
            stream_name = self.stream_name.as_str(),
            shard_count = self.shard_count,
            stream_seconds = self.stream_seconds,
            language = self.language.as_str(),
            repost_floor = self.repost_floor,
            own_handle = self.own_handle.as_deref().unwrap_or("-"),
            "Listener config loaded"
        );
    }
}

/// Settings for draining the log into landing batch files.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub log_database_url: String,
    pub stream_name: String,
    pub shard_count: u32,
    pub object_store_root: PathBuf,
    pub bucket: String,
    pub landing_path: String,
    pub file_name: String,
    pub time_zone: Tz,
    pub run_seconds: u64,
    pub poll_interval: Duration,
    pub fetch_limit: usize,
}

impl IngestConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(&from_process_env)
    }

    pub fn from_lookup(get: &dyn Fn(&str) -> Option<String>) -> Result<Self> {
        let vars = Vars { get };
        Ok(Self {
            log_database_url: vars.required("LOG_DATABASE_URL")?,
            stream_name: vars.required("STREAM_NAME")?,
            shard_count: vars.parse("SHARD_COUNT", Some(1))?.max(1),
            object_store_root: PathBuf::from(vars.required("OBJECT_STORE_ROOT")?),
            bucket: vars.required("BUCKET_NAME")?,
            landing_path: vars.prefix("LANDING_PATH", "landing/"),
            file_name: vars.required("FILE_NAME")?,
            time_zone: vars.timezone("TIME_ZONE")?,
            run_seconds: vars.parse("RUN_SECONDS", None)?,
            poll_interval: Duration::from_millis(vars.parse("POLL_INTERVAL_MS", Some(200))?),
            fetch_limit: vars.parse("FETCH_LIMIT", Some(1000))?,
        })
    }

    pub fn window(&self) -> Duration {
        Duration::from_secs(self.run_seconds)
    }

    pub fn log_redacted(&self) {
        info!(
            log_database_url = redact(&self.log_database_url),
            stream_name = self.stream_name.as_str(),
            shard_count = self.shard_count,
            object_store_root = %self.object_store_root.display(),
            bucket = self.bucket.as_str(),
            landing_path = self.landing_path.as_str(),
            file_name = self.file_name.as_str(),
            time_zone = %self.time_zone,
            run_seconds = self.run_seconds,
            poll_interval_ms = self.poll_interval.as_millis() as u64,
            "Ingest config loaded"
        );
    }
}

/// Settings for turning landing files into staging records.
#[derive(Debug, Clone)]
pub struct TransformConfig {
    pub object_store_root: PathBuf,
    pub bucket: String,
    pub landing_path: String,
    pub staging_path: String,
    pub staging_file: String,
    pub time_zone: Tz,
    pub time_horizon_hrs: u32,
    pub source_db: String,
    pub source_table: String,
    pub target_db: String,
    pub target_table: String,
    pub catalog_path: Option<PathBuf>,
    pub skip_bad_rows: bool,
}

impl TransformConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(&from_process_env)
    }

    pub fn from_lookup(get: &dyn Fn(&str) -> Option<String>) -> Result<Self> {
        let vars = Vars { get };
        Ok(Self {
            object_store_root: PathBuf::from(vars.required("OBJECT_STORE_ROOT")?),
            bucket: vars.required("BUCKET_NAME")?,
            landing_path: vars.prefix("LANDING_PATH", "landing/"),
            staging_path: vars.prefix("STAGING_PATH", "staging/"),
            staging_file: vars.required("STAGING_FILE")?,
            time_zone: vars.timezone("TIME_ZONE")?,
            time_horizon_hrs: vars.parse("TIME_HORIZON_HRS", None)?,
            source_db: vars.or("SOURCE_DB", "landing"),
            source_table: vars.or("SOURCE_TABLE", "tweet_data"),
            target_db: vars.or("TARGET_DB", "staging"),
            target_table: vars.or("TARGET_TABLE", "hashtag_data"),
            catalog_path: vars.optional("CATALOG_PATH").map(PathBuf::from),
            skip_bad_rows: vars.flag("SKIP_BAD_ROWS")?,
        })
    }

    pub fn log_redacted(&self) {
        info!(
            object_store_root = %self.object_store_root.display(),
            bucket = self.bucket.as_str(),
            landing_path = self.landing_path.as_str(),
            staging_path = self.staging_path.as_str(),
            staging_file = self.staging_file.as_str(),
            time_zone = %self.time_zone,
            time_horizon_hrs = self.time_horizon_hrs,
            source = %format!("{}.{}", self.source_db, self.source_table),
            target = %format!("{}.{}", self.target_db, self.target_table),
            skip_bad_rows = self.skip_bad_rows,
            "Transform config loaded"
        );
    }
}
