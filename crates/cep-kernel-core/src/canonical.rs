//! Canonical JSON encoding for deterministic serialization.
//!
//! Records are lowered into a [`CanonicalValue`] tree and written as compact
//! JSON:
//! - Object keys sorted by ordinal byte comparison
//! - No whitespace, no trailing separators, UTF-8 throughout
//! - Absent optional fields omitted; nullable fields emitted as `null`
//! - Timestamps, amounts, scores and shares pre-rendered as fixed strings
//!
//! The same logical record always produces the same bytes, regardless of
//! the field order it arrived in.

use std::collections::BTreeMap;
use std::fmt;

use crate::amount::{Amount, ConfidenceScore, ParticipationShare};
use crate::error::CanonicalizationError;
use crate::timestamp::{CanonicalTimestamp, CivicDate};

/// Key under which a record carries its attestation block.
pub const ATTESTATION_KEY: &str = "attestation";

/// A node of the canonical value tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CanonicalValue {
    Null,
    Bool(bool),
    Integer(u64),
    Text(String),
    Array(Vec<CanonicalValue>),
    Object(BTreeMap<String, CanonicalValue>),
}

impl CanonicalValue {
    /// Write the compact JSON form into `out`.
    pub fn write_json(&self, out: &mut String) {
        match self {
            Self::Null => out.push_str("null"),
            Self::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
            Self::Integer(n) => out.push_str(&n.to_string()),
            Self::Text(s) => write_json_string(s, out),
            Self::Array(items) => {
                out.push('[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    item.write_json(out);
                }
                out.push(']');
            }
            Self::Object(map) => {
                out.push('{');
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    write_json_string(key, out);
                    out.push(':');
                    value.write_json(out);
                }
                out.push('}');
            }
        }
    }

    /// The compact JSON form.
    pub fn to_json(&self) -> String {
        let mut out = String::new();
        self.write_json(&mut out);
        out
    }
}

const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";

/// Write `s` as a JSON string literal. Only `"`, `\` and control
/// characters are escaped; everything else is emitted as UTF-8.
fn write_json_string(s: &str, out: &mut String) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0c}' => out.push_str("\\f"),
            c if c < '\u{20}' => {
                let byte = c as usize;
                out.push_str("\\u00");
                out.push(char::from(HEX_DIGITS[byte >> 4]));
                out.push(char::from(HEX_DIGITS[byte & 0xf]));
            }
            c => out.push(c),
        }
    }
    out.push('"');
}

impl From<&str> for CanonicalValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for CanonicalValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&String> for CanonicalValue {
    fn from(s: &String) -> Self {
        Self::Text(s.clone())
    }
}

impl From<u64> for CanonicalValue {
    fn from(n: u64) -> Self {
        Self::Integer(n)
    }
}

impl From<bool> for CanonicalValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<&CanonicalTimestamp> for CanonicalValue {
    fn from(ts: &CanonicalTimestamp) -> Self {
        Self::Text(ts.to_canonical_string())
    }
}

impl From<&CivicDate> for CanonicalValue {
    fn from(d: &CivicDate) -> Self {
        Self::Text(d.to_canonical_string())
    }
}

/// Types that lower into a canonical value tree.
pub trait Canonicalize {
    fn to_canonical_value(&self) -> Result<CanonicalValue, CanonicalizationError>;
}

impl Canonicalize for Amount {
    fn to_canonical_value(&self) -> Result<CanonicalValue, CanonicalizationError> {
        self.to_canonical_string().map(CanonicalValue::Text)
    }
}

impl Canonicalize for ConfidenceScore {
    fn to_canonical_value(&self) -> Result<CanonicalValue, CanonicalizationError> {
        self.to_canonical_string().map(CanonicalValue::Text)
    }
}

impl Canonicalize for ParticipationShare {
    fn to_canonical_value(&self) -> Result<CanonicalValue, CanonicalizationError> {
        self.to_canonical_string().map(CanonicalValue::Text)
    }
}

/// Builder for a canonical object.
///
/// Insertion order is irrelevant; keys are ordered on output.
#[derive(Debug, Default)]
pub struct CanonicalObject {
    fields: BTreeMap<String, CanonicalValue>,
}

impl CanonicalObject {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a field that is always present.
    pub fn required(mut self, key: &str, value: impl Into<CanonicalValue>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    /// Insert a field only when it is present.
    pub fn optional<V: Into<CanonicalValue>>(mut self, key: &str, value: Option<V>) -> Self {
        if let Some(v) = value {
            self.fields.insert(key.to_string(), v.into());
        }
        self
    }

    /// Insert a nullable field: absent renders as explicit `null`.
    pub fn nullable<V: Into<CanonicalValue>>(mut self, key: &str, value: Option<V>) -> Self {
        let v = value.map_or(CanonicalValue::Null, Into::into);
        self.fields.insert(key.to_string(), v);
        self
    }

    /// Insert a nested value that may fail to canonicalize.
    pub fn nested<T: Canonicalize + ?Sized>(
        mut self,
        key: &str,
        value: &T,
    ) -> Result<Self, CanonicalizationError> {
        self.fields.insert(key.to_string(), value.to_canonical_value()?);
        Ok(self)
    }

    /// Insert a nested value only when present.
    pub fn nested_optional<T: Canonicalize>(
        self,
        key: &str,
        value: Option<&T>,
    ) -> Result<Self, CanonicalizationError> {
        match value {
            Some(v) => self.nested(key, v),
            None => Ok(self),
        }
    }

    /// Insert an array in input order. Absent or empty arrays are omitted.
    pub fn array<T: Canonicalize>(
        mut self,
        key: &str,
        items: Option<&[T]>,
    ) -> Result<Self, CanonicalizationError> {
        if let Some(items) = items.filter(|items| !items.is_empty()) {
            let values = items
                .iter()
                .map(Canonicalize::to_canonical_value)
                .collect::<Result<Vec<_>, _>>()?;
            self.fields.insert(key.to_string(), CanonicalValue::Array(values));
        }
        Ok(self)
    }

    /// Insert an array sorted by `sort_key`. Absent or empty arrays are omitted.
    ///
    /// Ties on the sort key fall back to the canonical bytes of the element,
    /// so the output never depends on input order.
    pub fn sorted_array<T, K, F>(
        mut self,
        key: &str,
        items: Option<&[T]>,
        sort_key: F,
    ) -> Result<Self, CanonicalizationError>
    where
        T: Canonicalize,
        K: Ord,
        F: Fn(&T) -> K,
    {
        if let Some(items) = items.filter(|items| !items.is_empty()) {
            let mut keyed = items
                .iter()
                .map(|item| {
                    let value = item.to_canonical_value()?;
                    let json = value.to_json();
                    Ok((sort_key(item), json, value))
                })
                .collect::<Result<Vec<_>, CanonicalizationError>>()?;
            keyed.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
            let values = keyed.into_iter().map(|(_, _, value)| value).collect();
            self.fields.insert(key.to_string(), CanonicalValue::Array(values));
        }
        Ok(self)
    }

    pub fn build(self) -> CanonicalValue {
        CanonicalValue::Object(self.fields)
    }
}

/// Whether the attestation block takes part in the canonical form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttestationMode {
    /// The signing form: attestation removed.
    Exclude,
    /// The full artifact, attestation included.
    Include,
}

/// The canonical string of a record.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct CanonicalForm(String);

impl CanonicalForm {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for CanonicalForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for CanonicalForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CanonicalForm({} bytes)", self.0.len())
    }
}

/// Produce the canonical form of any canonicalizable value.
///
/// With [`AttestationMode::Exclude`] a top-level `attestation` key is dropped.
pub fn canonicalize<T: Canonicalize + ?Sized>(
    value: &T,
    mode: AttestationMode,
) -> Result<CanonicalForm, CanonicalizationError> {
    let mut tree = value.to_canonical_value()?;
    if mode == AttestationMode::Exclude {
        if let CanonicalValue::Object(map) = &mut tree {
            map.remove(ATTESTATION_KEY);
        }
    }
    Ok(CanonicalForm(tree.to_json()))
}
