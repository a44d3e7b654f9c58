//! ISO-8601 timestamp decoding.
//!
//! Strings are tried against RFC 3339 first (offset required, fractional
//! seconds optional), then against a lenient profile with neither offset nor
//! fractional seconds, read as UTC. Anything else is rejected.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serializer};

const LENIENT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Parse an ISO-8601 date-time string, or `None` if neither profile matches.
pub fn parse(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, LENIENT_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

/// Format as RFC 3339 in UTC, keeping sub-second digits only when present.
pub fn format(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Serde helpers for `Option<DateTime<Utc>>` fields.
///
/// Use together with `#[serde(default)]`: an absent key or `null` gives
/// `None`, while a present string that does not parse fails the decode.
pub mod optional {
    use super::*;

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(value) => serializer.serialize_str(&format(value)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        match raw {
            None => Ok(None),
            Some(raw) => parse(&raw)
                .map(Some)
                .ok_or_else(|| <D::Error as serde::de::Error>::custom(format_args!("invalid date format: {raw}"))),
        }
    }
}
