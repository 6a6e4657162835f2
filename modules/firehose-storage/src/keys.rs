//! Object key conventions for batch files.

use chrono::{DateTime, Datelike, NaiveDate, TimeZone};

/// `<prefix><YYYY>/<MM>/<DD>/<base>-<HHMMSS>-<suffix>.csv`, using the local
/// time of `now`. The random suffix keeps two writes in the same second apart.
pub fn batch_key<Tz: TimeZone>(prefix: &str, base_name: &str, now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!(
        "{}{}-{}-{}.csv",
        day_prefix(prefix, now.date_naive()),
        base_name,
        now.format("%H%M%S"),
        &suffix[..8]
    )
}

/// `<prefix><YYYY>/<MM>/<DD>/`
pub fn day_prefix(prefix: &str, day: NaiveDate) -> String {
    format!(
        "{}{:04}/{:02}/{:02}/",
        normalize_prefix(prefix),
        day.year(),
        day.month(),
        day.day()
    )
}

/// Empty stays empty; anything else ends with exactly one `/`.
pub fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim_end_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{trimmed}/")
    }
}
