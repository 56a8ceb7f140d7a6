//! Controlled-term checks.
//!
//! Relationship types, exchange types and party roles are term URIs drawn
//! from the `relationship-type`, `exchange-type`, `party-role` and
//! `exchange-role` vocabularies. Deprecated terms still count as members.

use std::sync::Arc;

use cep_kernel_core::{Record, VerificationError};

use crate::cache::VocabularyCache;
use crate::vocabulary::{VocabularyName, VocabularySet};

/// How term URIs outside their vocabulary are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VocabularyMode {
    /// Log unknown terms and accept the record.
    #[default]
    Permissive,
    /// Reject unknown terms.
    Strict,
}

/// One controlled field of a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermRef<'a> {
    pub vocabulary: VocabularyName,
    /// JSON field path, e.g. `bilateralParties.partyA.roleUri`.
    pub field: String,
    pub term_uri: &'a str,
}

impl<'a> TermRef<'a> {
    fn new(vocabulary: VocabularyName, field: impl Into<String>, term_uri: &'a str) -> Self {
        Self {
            vocabulary,
            field: field.into(),
            term_uri,
        }
    }
}

/// Every controlled term URI a record carries, in field order.
pub fn record_terms(record: &Record) -> Vec<TermRef<'_>> {
    let mut terms = Vec::new();
    match record {
        Record::Entity(_) => {}
        Record::Relationship(r) => {
            terms.push(TermRef::new(
                VocabularyName::RelationshipType,
                "relationshipTypeUri",
                &r.relationship_type_uri,
            ));
            if let Some(parties) = &r.bilateral_parties {
                for (name, party) in [("partyA", &parties.party_a), ("partyB", &parties.party_b)] {
                    terms.push(TermRef::new(
                        VocabularyName::PartyRole,
                        format!("bilateralParties.{name}.roleUri"),
                        &party.role_uri,
                    ));
                }
            }
            for (i, member) in r.multilateral_members.iter().flatten().enumerate() {
                terms.push(TermRef::new(
                    VocabularyName::PartyRole,
                    format!("multilateralMembers[{i}].roleUri"),
                    &member.role_uri,
                ));
            }
        }
        Record::Exchange(x) => {
            terms.push(TermRef::new(
                VocabularyName::ExchangeType,
                "exchangeTypeUri",
                &x.exchange_type_uri,
            ));
            for (name, party) in [("sourceEntity", &x.source_entity), ("recipientEntity", &x.recipient_entity)] {
                if let Some(role) = &party.role_uri {
                    terms.push(TermRef::new(
                        VocabularyName::ExchangeRole,
                        format!("{name}.roleUri"),
                        role,
                    ));
                }
            }
            let intermediaries = x
                .provenance_chain
                .as_ref()
                .and_then(|p| p.intermediary_entities.as_deref())
                .unwrap_or_default();
            for (i, intermediary) in intermediaries.iter().enumerate() {
                if let Some(role) = &intermediary.role_uri {
                    terms.push(TermRef::new(
                        VocabularyName::ExchangeRole,
                        format!("provenanceChain.intermediaryEntities[{i}].roleUri"),
                        role,
                    ));
                }
            }
        }
    }
    terms
}

/// Checks the controlled terms of incoming records against the vocabulary cache.
///
/// Without a vocabulary attached, a permissive checker accepts everything
/// and a strict one rejects every controlled term.
#[derive(Debug, Clone, Default)]
pub struct TermChecker {
    mode: VocabularyMode,
    vocabulary: Option<Arc<VocabularyCache>>,
}

impl TermChecker {
    pub fn new(mode: VocabularyMode) -> Self {
        Self {
            mode,
            vocabulary: None,
        }
    }

    pub fn with_vocabulary(mut self, vocabulary: Arc<VocabularyCache>) -> Self {
        self.vocabulary = Some(vocabulary);
        self
    }

    pub fn mode(&self) -> VocabularyMode {
        self.mode
    }

    /// Check every controlled term of `record`.
    ///
    /// Returns the terms that are not members of their vocabulary; in
    /// strict mode the first such term is an error instead.
    pub async fn check_record<'a>(
        &self,
        record: &'a Record,
    ) -> Result<Vec<TermRef<'a>>, VerificationError> {
        let terms = record_terms(record);
        if terms.is_empty() {
            return Ok(Vec::new());
        }
        if self.vocabulary.is_none() && self.mode == VocabularyMode::Permissive {
            return Ok(Vec::new());
        }

        let snapshot = self.snapshot().await;
        let mut unknown = Vec::new();
        for term in terms {
            let known = snapshot
                .as_deref()
                .is_some_and(|set| set.contains(term.vocabulary, term.term_uri));
            if known {
                continue;
            }
            match self.mode {
                VocabularyMode::Strict => {
                    return Err(VerificationError::UnknownVocabularyTerm {
                        vocabulary: term.vocabulary.to_string(),
                        field: term.field,
                        term_uri: term.term_uri.to_string(),
                    });
                }
                VocabularyMode::Permissive => {
                    tracing::warn!(
                        logical_id = %record.logical_id(),
                        vocabulary = %term.vocabulary,
                        field = %term.field,
                        term = %term.term_uri,
                        "term not in vocabulary"
                    );
                    unknown.push(term);
                }
            }
        }
        Ok(unknown)
    }

    async fn snapshot(&self) -> Option<Arc<VocabularySet>> {
        let vocabulary = self.vocabulary.as_ref()?;
        match vocabulary.snapshot().await {
            Ok(set) => Some(set),
            Err(err) => {
                tracing::warn!(error = %err, "term vocabularies unavailable");
                None
            }
        }
    }
}
