//! UTC timestamps and calendar dates in canonical form.
//!
//! Timestamps render as `YYYY-MM-DDTHH:MM:SS.ffffffZ`: always UTC, always
//! six fractional digits. Input may carry any RFC 3339 offset and any
//! fractional precision; offsets are folded into UTC and digits past the
//! microsecond are truncated.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Timelike, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

const CANONICAL_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Error parsing a timestamp or date.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind}: {value:?}")]
pub struct TimestampParseError {
    kind: &'static str,
    value: String,
}

/// A UTC instant with microsecond precision.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CanonicalTimestamp(DateTime<Utc>);

impl CanonicalTimestamp {
    /// Wrap an instant, truncating it to microseconds.
    pub fn new(instant: DateTime<Utc>) -> Self {
        let micros = instant.nanosecond() / 1_000 * 1_000;
        // with_nanosecond only fails for values >= 2e9, which truncation cannot produce
        Self(instant.with_nanosecond(micros).unwrap_or(instant))
    }

    /// The current time.
    pub fn now() -> Self {
        Self::new(Utc::now())
    }

    /// Parse an RFC 3339 string. A missing offset is read as UTC.
    pub fn parse(s: &str) -> Result<Self, TimestampParseError> {
        let s = s.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(Self::new(dt.with_timezone(&Utc)));
        }
        NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
            .map(|naive| Self::new(naive.and_utc()))
            .map_err(|_| TimestampParseError {
                kind: "timestamp",
                value: s.to_string(),
            })
    }

    /// The canonical string form.
    pub fn to_canonical_string(&self) -> String {
        self.0.format(CANONICAL_FORMAT).to_string()
    }

    /// The wrapped instant.
    pub fn as_datetime(&self) -> DateTime<Utc> {
        self.0
    }
}

impl From<DateTime<Utc>> for CanonicalTimestamp {
    fn from(instant: DateTime<Utc>) -> Self {
        Self::new(instant)
    }
}

impl FromStr for CanonicalTimestamp {
    type Err = TimestampParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for CanonicalTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_canonical_string())
    }
}

impl fmt::Debug for CanonicalTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({})", self.0.to_rfc3339_opts(SecondsFormat::Micros, true))
    }
}

impl Serialize for CanonicalTimestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_canonical_string())
    }
}

impl<'de> Deserialize<'de> for CanonicalTimestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// A calendar date rendered as `YYYY-MM-DD`. Defaults to 1970-01-01.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct CivicDate(NaiveDate);

impl CivicDate {
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self)
    }

    pub fn parse(s: &str) -> Result<Self, TimestampParseError> {
        NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
            .map(Self)
            .map_err(|_| TimestampParseError {
                kind: "date",
                value: s.to_string(),
            })
    }

    pub fn to_canonical_string(&self) -> String {
        self.0.format(DATE_FORMAT).to_string()
    }
}

impl fmt::Display for CivicDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_canonical_string())
    }
}

impl fmt::Debug for CivicDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Date({})", self.to_canonical_string())
    }
}

impl Serialize for CivicDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_canonical_string())
    }
}

impl<'de> Deserialize<'de> for CivicDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
