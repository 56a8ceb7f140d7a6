//! Fixed-decimal numeric fields.
//!
//! Monetary amounts, confidence scores and participation shares are
//! carried as `f64` and rendered with a fixed number of fractional digits,
//! `.` as the decimal point and no grouping. Input may be a JSON number or
//! a numeric string.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::error::CanonicalizationError;

/// Largest magnitude rendered without losing cent precision in an `f64`.
const MAX_EXACT_MAGNITUDE: f64 = 1e15;

/// Render `value` with exactly `places` fractional digits.
///
/// Negative zero renders as positive zero. Non-finite values and values
/// too large to hold `places` exact digits are rejected.
pub fn format_fixed(value: f64, places: usize, field: &str) -> Result<String, CanonicalizationError> {
    if !value.is_finite() {
        return Err(CanonicalizationError::NonFinite {
            field: field.to_string(),
        });
    }
    if value.abs() >= MAX_EXACT_MAGNITUDE {
        return Err(CanonicalizationError::OutOfRange {
            field: field.to_string(),
            value: value.to_string(),
        });
    }
    let rendered = format!("{value:.places$}");
    match rendered.strip_prefix('-') {
        Some(rest) if rest.bytes().all(|b| b == b'0' || b == b'.') => Ok(rest.to_string()),
        _ => Ok(rendered),
    }
}

fn deserialize_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(f64),
        Text(String),
    }

    match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(n) => Ok(n),
        NumberOrString::Text(s) => s.trim().parse::<f64>().map_err(serde::de::Error::custom),
    }
}

macro_rules! fixed_decimal {
    ($(#[$meta:meta])* $name:ident, $places:expr, $field:expr) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, PartialOrd, Default)]
        pub struct $name(pub f64);

        impl $name {
            /// Fractional digits in the canonical rendering.
            pub const PLACES: usize = $places;

            pub const fn new(value: f64) -> Self {
                Self(value)
            }

            pub const fn value(&self) -> f64 {
                self.0
            }

            /// The canonical string rendering.
            pub fn to_canonical_string(&self) -> Result<String, CanonicalizationError> {
                format_fixed(self.0, $places, $field)
            }
        }

        impl From<f64> for $name {
            fn from(value: f64) -> Self {
                Self(value)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_f64(self.0)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                deserialize_number(deserializer).map(Self)
            }
        }
    };
}

fixed_decimal!(
    /// A monetary amount, two fractional digits.
    Amount,
    2,
    "amount"
);

fixed_decimal!(
    /// An entity-resolution confidence score, two fractional digits.
    ConfidenceScore,
    2,
    "score"
);

fixed_decimal!(
    /// A multilateral participation share, four fractional digits.
    ParticipationShare,
    4,
    "participationShare"
);
