//! UTC timestamp codec for the persisted record.
//!
//! Timestamps are always written as RFC 3339 with a `Z` suffix. Reading is
//! lenient about the zone notation (`Z`, `+00:00`, ` UTC`, other explicit
//! offsets) but always yields an instant in UTC; text without any offset is
//! taken as UTC, never as local time.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, TimeZone, Utc};

const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

pub fn format_utc(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

pub fn parse_utc(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    let trimmed = raw.trim();
    let normalized = match trimmed.strip_suffix(" UTC") {
        Some(stripped) => format!("{stripped}+00:00"),
        None => match trimmed.strip_suffix(|c: char| c == 'Z' || c == 'z') {
            Some(stripped) => format!("{stripped}+00:00"),
            None => trimmed.to_string(),
        },
    };

    let rfc_err = match DateTime::parse_from_rfc3339(&normalized) {
        Ok(parsed) => return Ok(parsed.with_timezone(&Utc)),
        Err(err) => err,
    };

    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(&normalized, format).ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
        .ok_or(rfc_err)
}

/// `serde(with = ...)` adapter for optional timestamps.
pub mod option {
    use chrono::{DateTime, Utc};
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(ts) => serializer.serialize_some(&super::format_utc(ts)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        raw.map(|text| {
            super::parse_utc(&text)
                .map_err(|err| D::Error::custom(format!("invalid timestamp `{text}`: {err}")))
        })
        .transpose()
    }
}
