//! SNFEI: Sub-National Federated Entity Identifier.
//!
//! An SNFEI is the SHA-256 of four normalized entity attributes joined by
//! `|`:
//!
//! ```text
//! legal_name_normalized | address_normalized | COUNTRY | YYYY-MM-DD
//! ```
//!
//! Absent attributes contribute an empty field. Normalization makes
//! formatting variants of one name ("SPRINGFIELD USD",
//! "springfield unified sch. dist.") hash identically.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::amount::ConfidenceScore;
use crate::crypto::Sha256Hash;
use crate::identifiers::KnownScheme;

/// Field separator of the hash input.
pub const SNFEI_SEPARATOR: char = '|';

const NAME_ABBREVIATIONS: &[(&str, &str)] = &[
    ("assn", "association"),
    ("co", "company"),
    ("corp", "corporation"),
    ("ctr", "center"),
    ("cty", "county"),
    ("dept", "department"),
    ("dist", "district"),
    ("govt", "government"),
    ("hosp", "hospital"),
    ("inc", "incorporated"),
    ("intl", "international"),
    ("isd", "independent school district"),
    ("llc", "limited liability company"),
    ("ltd", "limited"),
    ("natl", "national"),
    ("sch", "school"),
    ("twp", "township"),
    ("univ", "university"),
    ("usd", "unified school district"),
];

const ADDRESS_ABBREVIATIONS: &[(&str, &str)] = &[
    ("apt", "apartment"),
    ("ave", "avenue"),
    ("blvd", "boulevard"),
    ("ct", "court"),
    ("dr", "drive"),
    ("e", "east"),
    ("hwy", "highway"),
    ("ln", "lane"),
    ("n", "north"),
    ("ne", "northeast"),
    ("nw", "northwest"),
    ("pkwy", "parkway"),
    ("pl", "place"),
    ("rd", "road"),
    ("s", "south"),
    ("se", "southeast"),
    ("st", "street"),
    ("ste", "suite"),
    ("sw", "southwest"),
    ("w", "west"),
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"];

/// Lowercase, drop punctuation and expand abbreviations token by token.
fn normalize_tokens(raw: &str, abbreviations: &[(&str, &str)]) -> String {
    let cleaned: String = raw
        .to_lowercase()
        .replace('&', " and ")
        .chars()
        .filter(|c| *c != '\'' && *c != '\u{2019}')
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();

    cleaned
        .split_whitespace()
        .map(|token| {
            abbreviations
                .binary_search_by_key(&token, |&(short, _)| short)
                .map_or(token, |i| abbreviations[i].1)
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Normalize a legal name: lowercase, punctuation-free, abbreviations expanded.
pub fn normalize_legal_name(legal_name: &str) -> String {
    normalize_tokens(legal_name, NAME_ABBREVIATIONS)
}

/// Normalize a street address. Blank addresses normalize to `None`.
pub fn normalize_address(address: &str) -> Option<String> {
    Some(normalize_tokens(address, ADDRESS_ABBREVIATIONS)).filter(|a| !a.is_empty())
}

/// Normalize a registration date to `YYYY-MM-DD`.
///
/// Accepts ISO dates, `MM/DD/YYYY`, `YYYY/MM/DD` and `YYYYMMDD`.
/// Unparseable dates normalize to `None`.
pub fn normalize_registration_date(date: &str) -> Option<String> {
    let date = date.trim();
    if date.len() == 8 && date.bytes().all(|b| b.is_ascii_digit()) {
        let dashed = format!("{}-{}-{}", &date[..4], &date[4..6], &date[6..]);
        return NaiveDate::parse_from_str(&dashed, "%Y-%m-%d")
            .ok()
            .map(|d| d.format("%Y-%m-%d").to_string());
    }
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(date, format).ok())
        .map(|d| d.format("%Y-%m-%d").to_string())
}

/// Raw entity attributes an SNFEI is derived from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntityAttributes<'a> {
    pub legal_name: &'a str,
    /// ISO 3166-1 alpha-2.
    pub country_code: &'a str,
    pub address: Option<&'a str>,
    pub registration_date: Option<&'a str>,
    pub lei: Option<&'a str>,
    pub sam_uei: Option<&'a str>,
}

impl<'a> EntityAttributes<'a> {
    pub fn new(legal_name: &'a str, country_code: &'a str) -> Self {
        Self {
            legal_name,
            country_code,
            ..Self::default()
        }
    }

    pub fn address(mut self, address: &'a str) -> Self {
        self.address = Some(address);
        self
    }

    pub fn registration_date(mut self, date: &'a str) -> Self {
        self.registration_date = Some(date);
        self
    }

    pub fn lei(mut self, lei: &'a str) -> Self {
        self.lei = Some(lei);
        self
    }

    pub fn sam_uei(mut self, sam_uei: &'a str) -> Self {
        self.sam_uei = Some(sam_uei);
        self
    }

    /// Apply normalization to every hashed attribute.
    pub fn canonical_input(&self) -> CanonicalInput {
        CanonicalInput {
            legal_name_normalized: normalize_legal_name(self.legal_name),
            address_normalized: self.address.and_then(normalize_address),
            country_code: self.country_code.trim().to_ascii_uppercase(),
            registration_date: self.registration_date.and_then(normalize_registration_date),
        }
    }
}

/// The normalized attributes behind an SNFEI, kept for verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalInput {
    pub legal_name_normalized: String,
    pub address_normalized: Option<String>,
    pub country_code: String,
    pub registration_date: Option<String>,
}

impl CanonicalInput {
    /// The exact string that is hashed.
    pub fn to_hash_string(&self) -> String {
        [
            self.legal_name_normalized.as_str(),
            self.address_normalized.as_deref().unwrap_or_default(),
            self.country_code.as_str(),
            self.registration_date.as_deref().unwrap_or_default(),
        ]
        .join(&SNFEI_SEPARATOR.to_string())
    }
}

/// A validated SNFEI: 64 lowercase hex characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snfei(String);

impl Snfei {
    /// Hash normalized attributes.
    pub fn compute(canonical: &CanonicalInput) -> Self {
        Self(Sha256Hash::hash(canonical.to_hash_string().as_bytes()).to_hex())
    }

    /// Normalize and hash raw attributes. Identifier fields are ignored.
    pub fn generate(attributes: &EntityAttributes<'_>) -> (Self, CanonicalInput) {
        let canonical = attributes.canonical_input();
        (Self::compute(&canonical), canonical)
    }

    /// The SNFEI hex of a name, country and optional address.
    pub fn generate_simple(legal_name: &str, country_code: &str, address: Option<&str>) -> String {
        let attributes = EntityAttributes {
            address,
            ..EntityAttributes::new(legal_name, country_code)
        };
        Self::generate(&attributes).0.into_string()
    }

    /// Parse an existing SNFEI, normalizing hex case.
    pub fn from_hash(hash: &str) -> Option<Self> {
        KnownScheme::Snfei.normalize(hash).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// The first `length` characters followed by `...`.
    pub fn short(&self, length: usize) -> String {
        if self.0.len() <= length {
            self.0.clone()
        } else {
            format!("{}...", &self.0[..length])
        }
    }
}

impl fmt::Display for Snfei {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How strongly an entity is identified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IdentifierTier {
    /// Carries a global LEI.
    Lei = 1,
    /// Carries a SAM.gov UEI.
    SamUei = 2,
    /// Identified by the computed SNFEI alone.
    Computed = 3,
}

impl IdentifierTier {
    pub fn number(self) -> u8 {
        self as u8
    }
}

/// An SNFEI with its resolution confidence.
#[derive(Debug, Clone, PartialEq)]
pub struct SnfeiResult {
    pub snfei: Snfei,
    pub canonical: CanonicalInput,
    pub confidence: ConfidenceScore,
    pub tier: IdentifierTier,
    /// Attributes that contributed, strongest identifier first.
    pub fields_used: Vec<&'static str>,
}

impl Snfei {
    /// Generate an SNFEI and score how reliably it identifies the entity.
    ///
    /// A well-formed LEI gives tier 1 at 1.0 and a well-formed SAM UEI tier
    /// 2 at 0.95. Otherwise the score starts at 0.5 for name and country,
    /// adds 0.2 each for an address and a registration date and 0.1 for a
    /// normalized name of more than three words, capped at 0.9.
    pub fn generate_with_confidence(attributes: &EntityAttributes<'_>) -> SnfeiResult {
        let (snfei, canonical) = Self::generate(attributes);
        let mut fields_used = vec!["legal_name", "country_code"];

        let well_formed =
            |scheme: KnownScheme, value: Option<&str>| value.and_then(|v| scheme.normalize(v.trim())).is_some();

        let (tier, confidence) = if well_formed(KnownScheme::Lei, attributes.lei) {
            fields_used.insert(0, "lei");
            (IdentifierTier::Lei, 1.0)
        } else if well_formed(KnownScheme::SamUei, attributes.sam_uei) {
            fields_used.insert(0, "sam_uei");
            (IdentifierTier::SamUei, 0.95)
        } else {
            let mut score: f64 = 0.5;
            if canonical.address_normalized.is_some() {
                fields_used.push("address");
                score += 0.2;
            }
            if canonical.registration_date.is_some() {
                fields_used.push("registration_date");
                score += 0.2;
            }
            if canonical.legal_name_normalized.split_whitespace().count() > 3 {
                score += 0.1;
            }
            (IdentifierTier::Computed, score.min(0.9))
        };

        SnfeiResult {
            snfei,
            canonical,
            confidence: ConfidenceScore(confidence),
            tier,
            fields_used,
        }
    }
}
