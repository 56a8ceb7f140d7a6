//! Identifier sets and the format rules of the enumerated schemes.
//!
//! Values are carried as the author wrote them; format checks live on
//! [`KnownScheme`] so that a malformed value surfaces as a verdict rather
//! than a parse failure.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::canonical::{CanonicalObject, CanonicalValue, Canonicalize};
use crate::error::CanonicalizationError;

/// The enumerated identifier schemes with first-class fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KnownScheme {
    /// SAM.gov Unique Entity Identifier.
    SamUei,
    /// ISO 17442 Legal Entity Identifier.
    Lei,
    /// Sub-National Federated Entity Identifier.
    Snfei,
    /// Canadian Business Number with program account.
    CanadianBn,
}

impl KnownScheme {
    pub const ALL: [KnownScheme; 4] = [Self::Lei, Self::SamUei, Self::Snfei, Self::CanadianBn];

    /// The JSON field name.
    pub fn field(&self) -> &'static str {
        match self {
            Self::SamUei => "samUei",
            Self::Lei => "lei",
            Self::Snfei => "snfei",
            Self::CanadianBn => "canadianBn",
        }
    }

    /// The segment used in `cep-entity:<segment>:<value>` identifiers.
    pub fn segment(&self) -> &'static str {
        match self {
            Self::SamUei => "sam-uei",
            Self::Lei => "lei",
            Self::Snfei => "snfei",
            Self::CanadianBn => "canadian-bn",
        }
    }

    /// Check the format rule and return the normalized value.
    pub fn normalize(&self, value: &str) -> Option<String> {
        match self {
            Self::SamUei => (value.len() == 12
                && value.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()))
            .then(|| value.to_string()),
            Self::Lei => (value.len() == 20 && value.chars().all(|c| c.is_ascii_alphanumeric()))
                .then(|| value.to_ascii_uppercase()),
            Self::Snfei => (value.len() == 64 && value.chars().all(|c| c.is_ascii_hexdigit()))
                .then(|| value.to_ascii_lowercase()),
            Self::CanadianBn => {
                let bytes = value.as_bytes();
                (bytes.len() == 15
                    && bytes[..9].iter().all(u8::is_ascii_digit)
                    && bytes[9..11].iter().all(u8::is_ascii_uppercase)
                    && bytes[11..].iter().all(u8::is_ascii_digit))
                .then(|| value.to_string())
            }
        }
    }
}

impl fmt::Display for KnownScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field())
    }
}

/// A free-form identifier under a scheme URI.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdditionalScheme {
    pub scheme_uri: String,
    pub value: String,
}

impl Canonicalize for AdditionalScheme {
    fn to_canonical_value(&self) -> Result<CanonicalValue, CanonicalizationError> {
        Ok(CanonicalObject::new()
            .required("schemeUri", &self.scheme_uri)
            .required("value", &self.value)
            .build())
    }
}

/// One entry of an identifier set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierEntry<'a> {
    Known { scheme: KnownScheme, value: &'a str },
    Additional { scheme_uri: &'a str, value: &'a str },
}

/// The identifiers a record carries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identifiers {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sam_uei: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lei: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snfei: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canadian_bn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_schemes: Option<Vec<AdditionalScheme>>,
}

impl Identifiers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sam_uei(mut self, value: impl Into<String>) -> Self {
        self.sam_uei = Some(value.into());
        self
    }

    pub fn with_lei(mut self, value: impl Into<String>) -> Self {
        self.lei = Some(value.into());
        self
    }

    pub fn with_snfei(mut self, value: impl Into<String>) -> Self {
        self.snfei = Some(value.into());
        self
    }

    pub fn with_canadian_bn(mut self, value: impl Into<String>) -> Self {
        self.canadian_bn = Some(value.into());
        self
    }

    pub fn with_additional(mut self, scheme_uri: impl Into<String>, value: impl Into<String>) -> Self {
        self.additional_schemes
            .get_or_insert_with(Vec::new)
            .push(AdditionalScheme {
                scheme_uri: scheme_uri.into(),
                value: value.into(),
            });
        self
    }

    /// The value stored under a known scheme.
    pub fn get(&self, scheme: KnownScheme) -> Option<&str> {
        match scheme {
            KnownScheme::SamUei => self.sam_uei.as_deref(),
            KnownScheme::Lei => self.lei.as_deref(),
            KnownScheme::Snfei => self.snfei.as_deref(),
            KnownScheme::CanadianBn => self.canadian_bn.as_deref(),
        }
    }

    pub fn has_any(&self) -> bool {
        KnownScheme::ALL.iter().any(|s| self.get(*s).is_some())
            || self.additional_schemes.as_ref().is_some_and(|v| !v.is_empty())
    }

    /// All entries, known schemes first.
    pub fn entries(&self) -> Vec<IdentifierEntry<'_>> {
        let mut out: Vec<_> = KnownScheme::ALL
            .iter()
            .filter_map(|scheme| {
                self.get(*scheme).map(|value| IdentifierEntry::Known {
                    scheme: *scheme,
                    value,
                })
            })
            .collect();
        if let Some(additional) = &self.additional_schemes {
            out.extend(additional.iter().map(|a| IdentifierEntry::Additional {
                scheme_uri: &a.scheme_uri,
                value: &a.value,
            }));
        }
        out
    }

    /// The preferred external identifier.
    ///
    /// Priority: LEI, SAM UEI, SNFEI, Canadian BN, then the first
    /// additional scheme.
    pub fn primary_identifier(&self) -> Option<String> {
        for scheme in KnownScheme::ALL {
            if let Some(value) = self.get(scheme) {
                return Some(format!("cep-entity:{}:{}", scheme.segment(), value));
            }
        }
        self.additional_schemes
            .as_ref()
            .and_then(|v| v.first())
            .map(|a| format!("cep-entity:{}:{}", a.scheme_uri, a.value))
    }
}

impl Canonicalize for Identifiers {
    fn to_canonical_value(&self) -> Result<CanonicalValue, CanonicalizationError> {
        CanonicalObject::new()
            .sorted_array(
                "additionalSchemes",
                self.additional_schemes.as_deref(),
                |a| a.scheme_uri.clone(),
            )
            .map(|obj| {
                obj.optional("canadianBn", self.canadian_bn.as_ref())
                    .optional("lei", self.lei.as_ref())
                    .optional("samUei", self.sam_uei.as_ref())
                    .optional("snfei", self.snfei.as_ref())
                    .build()
            })
    }
}
