//! Parsing for the optional per-URL metadata fields
//!
//! Every function here is lenient: a value that cannot be understood is
//! reported as absent, never as an error, so that one bad field cannot stop
//! the `loc` of its entry from being extracted.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Change frequency hints from sitemap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeFrequency {
    Always,
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Yearly,
    Never,
}

/// Error returned for a `changefreq` value outside the sitemap vocabulary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownChangeFrequency(pub String);

impl FromStr for ChangeFrequency {
    type Err = UnknownChangeFrequency;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "always" => Ok(Self::Always),
            "hourly" => Ok(Self::Hourly),
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            "yearly" => Ok(Self::Yearly),
            "never" => Ok(Self::Never),
            _ => Err(UnknownChangeFrequency(s.to_string())),
        }
    }
}

/// Offset-carrying layouts tried after RFC 3339
const ZONED_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M:%S%z",
    "%Y-%m-%dT%H:%M%:z",
    "%Y-%m-%dT%H:%M%z",
];

/// Layouts without an offset, interpreted as UTC
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
];

/// Parses a `lastmod` value into a UTC timestamp
///
/// Accepted shapes:
/// - `2024-01-15T10:30:00Z` / `2024-01-15T10:30:00+08:00` (RFC 3339, optional fraction)
/// - `2024-01-15T10:30:00` (no zone, assumed UTC)
/// - `2024-01-15T10:30+00:00` (W3C minute precision)
/// - `2024-01-15` (date only, midnight UTC)
pub fn parse_lastmod(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in ZONED_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, format) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    for format in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(dt.and_utc());
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
    }

    tracing::debug!("Ignoring unparseable lastmod '{}'", s);
    None
}

/// Parses a `priority` value; anything outside `[0.0, 1.0]` is absent
pub fn parse_priority(raw: &str) -> Option<f32> {
    let value: f32 = raw.trim().parse().ok()?;
    (0.0..=1.0).contains(&value).then_some(value)
}

/// Parses a `changefreq` value; unknown words are absent
pub fn parse_changefreq(raw: &str) -> Option<ChangeFrequency> {
    raw.parse().ok()
}
