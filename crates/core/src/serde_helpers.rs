//! Deserialization helpers for request payloads.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer};

/// Distinguishes an absent field (`None`) from an explicit `null` (`Some(None)`).
///
/// Use together with `#[serde(default)]`.
pub fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Parse a date sent by a client.
///
/// Accepts RFC 3339 timestamps and plain `YYYY-MM-DD` dates (midnight UTC).
/// An empty string means "no date".
pub fn parse_date(raw: &str) -> Result<Option<DateTime<Utc>>, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    if let Ok(value) = DateTime::parse_from_rfc3339(raw) {
        return Ok(Some(value.with_timezone(&Utc)));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|value| Some(value.and_utc()))
        .ok_or_else(|| format!("Invalid date '{}'", raw))
}

/// `Option<DateTime<Utc>>` field accepting `null`, `""`, RFC 3339 or `YYYY-MM-DD`.
pub fn flexible_date<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(raw) => parse_date(&raw).map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

/// `Option<Option<DateTime<Utc>>>` variant of [`flexible_date`] for patches.
pub fn nullable_date<'de, D>(deserializer: D) -> Result<Option<Option<DateTime<Utc>>>, D::Error>
where
    D: Deserializer<'de>,
{
    flexible_date(deserializer).map(Some)
}
