//! Controlled vocabularies.
//!
//! A vocabulary is a versioned list of terms, each addressed by a term URI
//! and a short code. Deprecated terms stay valid for existing records.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{RegistryError, Result};

/// The vocabularies the kernel consults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VocabularyName {
    RelationshipType,
    ExchangeType,
    PartyRole,
    ExchangeRole,
    IdentifierScheme,
}

impl VocabularyName {
    pub const ALL: [VocabularyName; 5] = [
        Self::RelationshipType,
        Self::ExchangeType,
        Self::PartyRole,
        Self::ExchangeRole,
        Self::IdentifierScheme,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RelationshipType => "relationship-type",
            Self::ExchangeType => "exchange-type",
            Self::PartyRole => "party-role",
            Self::ExchangeRole => "exchange-role",
            Self::IdentifierScheme => "identifier-scheme",
        }
    }
}

impl fmt::Display for VocabularyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VocabularyName {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| RegistryError::UnknownVocabulary(s.to_string()))
    }
}

/// Lifecycle state of a term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TermStatus {
    #[default]
    Active,
    Deprecated,
    Experimental,
}

/// One controlled term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VocabularyTerm {
    pub term_uri: String,
    pub code: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definition: Option<String>,
    #[serde(default)]
    pub status: TermStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_term_uri: Option<String>,
}

impl VocabularyTerm {
    pub fn new(term_uri: impl Into<String>, code: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            term_uri: term_uri.into(),
            code: code.into(),
            label: label.into(),
            definition: None,
            status: TermStatus::Active,
            parent_term_uri: None,
        }
    }

    pub fn with_status(mut self, status: TermStatus) -> Self {
        self.status = status;
        self
    }
}

/// A versioned vocabulary document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vocabulary {
    pub vocabulary_uri: String,
    pub version: String,
    pub title: String,
    #[serde(default)]
    pub terms: Vec<VocabularyTerm>,
}

impl Vocabulary {
    pub fn new(vocabulary_uri: impl Into<String>, version: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            vocabulary_uri: vocabulary_uri.into(),
            version: version.into(),
            title: title.into(),
            terms: Vec::new(),
        }
    }

    pub fn with_term(mut self, term: VocabularyTerm) -> Self {
        self.terms.push(term);
        self
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Check version format, code and URI uniqueness, and that every term
    /// URI lives under the vocabulary URI.
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: String| RegistryError::InvalidVocabulary {
            uri: self.vocabulary_uri.clone(),
            reason,
        };

        let parts: Vec<_> = self.version.split('.').collect();
        if parts.len() != 3 || parts.iter().any(|p| p.is_empty() || !p.bytes().all(|b| b.is_ascii_digit())) {
            return Err(invalid(format!("version {} is not MAJOR.MINOR.PATCH", self.version)));
        }

        let mut codes = HashSet::new();
        let mut uris = HashSet::new();
        for term in &self.terms {
            if !codes.insert(term.code.as_str()) {
                return Err(invalid(format!("duplicate code {}", term.code)));
            }
            if !uris.insert(term.term_uri.as_str()) {
                return Err(invalid(format!("duplicate termUri {}", term.term_uri)));
            }
            if !term.term_uri.starts_with(&self.vocabulary_uri) {
                return Err(invalid(format!(
                    "termUri {} is outside the vocabulary",
                    term.term_uri
                )));
            }
        }
        Ok(())
    }

    pub fn term_by_uri(&self, term_uri: &str) -> Option<&VocabularyTerm> {
        self.terms.iter().find(|t| t.term_uri == term_uri)
    }

    pub fn term_by_code(&self, code: &str) -> Option<&VocabularyTerm> {
        self.terms.iter().find(|t| t.code == code)
    }

    pub fn active_codes(&self) -> Vec<&str> {
        self.terms
            .iter()
            .filter(|t| t.status == TermStatus::Active)
            .map(|t| t.code.as_str())
            .collect()
    }
}

/// An immutable view of every loaded vocabulary.
#[derive(Debug, Clone, Default)]
pub struct VocabularySet {
    vocabularies: HashMap<VocabularyName, Vocabulary>,
    term_index: HashMap<VocabularyName, HashMap<String, usize>>,
}

impl VocabularySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a vocabulary after validating it. Replaces any earlier one.
    pub fn insert(&mut self, name: VocabularyName, vocabulary: Vocabulary) -> Result<()> {
        vocabulary.validate()?;
        let index = vocabulary
            .terms
            .iter()
            .enumerate()
            .map(|(i, t)| (t.term_uri.clone(), i))
            .collect();
        self.term_index.insert(name, index);
        self.vocabularies.insert(name, vocabulary);
        Ok(())
    }

    pub fn with(mut self, name: VocabularyName, vocabulary: Vocabulary) -> Result<Self> {
        self.insert(name, vocabulary)?;
        Ok(self)
    }

    pub fn get(&self, name: VocabularyName) -> Option<&Vocabulary> {
        self.vocabularies.get(&name)
    }

    /// Look a term up by URI.
    pub fn term(&self, name: VocabularyName, term_uri: &str) -> Option<&VocabularyTerm> {
        let index = *self.term_index.get(&name)?.get(term_uri)?;
        self.vocabularies.get(&name)?.terms.get(index)
    }

    /// Whether `term_uri` is a valid term of `name`. Deprecated terms count.
    pub fn contains(&self, name: VocabularyName, term_uri: &str) -> bool {
        self.term(name, term_uri).is_some()
    }

    pub fn len(&self) -> usize {
        self.vocabularies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vocabularies.is_empty()
    }
}
