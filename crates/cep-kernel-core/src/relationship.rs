//! Relationship records: agreements linking two or more entities.
//!
//! A relationship names its parties in exactly one of two forms:
//! `bilateralParties` (party A and party B) or `multilateralMembers`.

use serde::{Deserialize, Serialize};

use crate::amount::{Amount, ParticipationShare};
use crate::attestation::Attestation;
use crate::canonical::{CanonicalObject, CanonicalValue, Canonicalize};
use crate::crypto::Sha256Hash;
use crate::error::CanonicalizationError;
use crate::identifiers::Identifiers;
use crate::record::{builder_header_methods, header_fields, BuilderHeader, RecordType, SourceReference};
use crate::timestamp::CanonicalTimestamp;
use crate::version::{default_schema_version, SCHEMA_VERSION};

pub(crate) fn default_currency() -> String {
    "USD".to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationshipStatusCode {
    Pending,
    Active,
    Suspended,
    Completed,
    Terminated,
    Amended,
}

impl RelationshipStatusCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Active => "ACTIVE",
            Self::Suspended => "SUSPENDED",
            Self::Completed => "COMPLETED",
            Self::Terminated => "TERMINATED",
            Self::Amended => "AMENDED",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipStatus {
    pub status_code: RelationshipStatusCode,
    pub status_effective_timestamp: CanonicalTimestamp,
}

impl Canonicalize for RelationshipStatus {
    fn to_canonical_value(&self) -> Result<CanonicalValue, CanonicalizationError> {
        Ok(CanonicalObject::new()
            .required("statusCode", self.status_code.as_str())
            .required("statusEffectiveTimestamp", &self.status_effective_timestamp)
            .build())
    }
}

/// One side of a bilateral relationship.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Party {
    pub entity_id: String,
    pub role_uri: String,
}

impl Party {
    pub fn new(entity_id: impl Into<String>, role_uri: impl Into<String>) -> Self {
        Self {
            entity_id: entity_id.into(),
            role_uri: role_uri.into(),
        }
    }
}

impl Canonicalize for Party {
    fn to_canonical_value(&self) -> Result<CanonicalValue, CanonicalizationError> {
        Ok(CanonicalObject::new()
            .required("entityId", &self.entity_id)
            .required("roleUri", &self.role_uri)
            .build())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BilateralParties {
    pub party_a: Party,
    pub party_b: Party,
}

impl Canonicalize for BilateralParties {
    fn to_canonical_value(&self) -> Result<CanonicalValue, CanonicalizationError> {
        CanonicalObject::new()
            .nested("partyA", &self.party_a)?
            .nested("partyB", &self.party_b)
            .map(CanonicalObject::build)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultilateralMember {
    pub entity_id: String,
    pub role_uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub participation_share: Option<ParticipationShare>,
}

impl Canonicalize for MultilateralMember {
    fn to_canonical_value(&self) -> Result<CanonicalValue, CanonicalizationError> {
        CanonicalObject::new()
            .required("entityId", &self.entity_id)
            .required("roleUri", &self.role_uri)
            .nested_optional("participationShare", self.participation_share.as_ref())
            .map(CanonicalObject::build)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialTerms {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_value: Option<Amount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub obligated_value: Option<Amount>,
    #[serde(default = "default_currency")]
    pub currency_code: String,
}

impl Canonicalize for FinancialTerms {
    fn to_canonical_value(&self) -> Result<CanonicalValue, CanonicalizationError> {
        CanonicalObject::new()
            .nested_optional("totalValue", self.total_value.as_ref())?
            .nested_optional("obligatedValue", self.obligated_value.as_ref())
            .map(|obj| obj.required("currencyCode", &self.currency_code).build())
    }
}

/// A free-form key/value term of the agreement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermsAttribute {
    pub key: String,
    pub value: String,
}

impl Canonicalize for TermsAttribute {
    fn to_canonical_value(&self) -> Result<CanonicalValue, CanonicalizationError> {
        Ok(CanonicalObject::new()
            .required("key", &self.key)
            .required("value", &self.value)
            .build())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipRecord {
    pub verifiable_id: String,
    #[serde(default = "default_schema_version")]
    pub schema_version: String,
    pub revision_number: u64,
    #[serde(default)]
    pub previous_record_hash: Option<Sha256Hash>,
    pub relationship_type_uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bilateral_parties: Option<BilateralParties>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multilateral_members: Option<Vec<MultilateralMember>>,
    pub effective_timestamp: CanonicalTimestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_timestamp: Option<CanonicalTimestamp>,
    pub status: RelationshipStatus,
    pub jurisdiction_iso: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_relationship_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub financial_terms: Option<FinancialTerms>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terms_attributes: Option<Vec<TermsAttribute>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_references: Option<Vec<SourceReference>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifiers: Option<Identifiers>,
    pub attestation: Attestation,
}

impl RelationshipRecord {
    /// Entity ids of every party, in declaration order.
    pub fn party_entity_ids(&self) -> Vec<&str> {
        let mut ids = Vec::new();
        if let Some(parties) = &self.bilateral_parties {
            ids.push(parties.party_a.entity_id.as_str());
            ids.push(parties.party_b.entity_id.as_str());
        }
        if let Some(members) = &self.multilateral_members {
            ids.extend(members.iter().map(|m| m.entity_id.as_str()));
        }
        ids
    }
}

impl Canonicalize for RelationshipRecord {
    fn to_canonical_value(&self) -> Result<CanonicalValue, CanonicalizationError> {
        let obj = header_fields(
            CanonicalObject::new(),
            RecordType::Relationship,
            &self.verifiable_id,
            &self.schema_version,
            self.revision_number,
            self.previous_record_hash.as_ref(),
            &self.attestation,
        )?;
        Ok(obj
            .required("relationshipTypeUri", &self.relationship_type_uri)
            .nested_optional("bilateralParties", self.bilateral_parties.as_ref())?
            .array("multilateralMembers", self.multilateral_members.as_deref())?
            .required("effectiveTimestamp", &self.effective_timestamp)
            .optional("expirationTimestamp", self.expiration_timestamp.as_ref())
            .nested("status", &self.status)?
            .required("jurisdictionIso", &self.jurisdiction_iso)
            .optional("parentRelationshipId", self.parent_relationship_id.as_ref())
            .nested_optional("financialTerms", self.financial_terms.as_ref())?
            .sorted_array("termsAttributes", self.terms_attributes.as_deref(), |t| t.key.clone())?
            .array("sourceReferences", self.source_references.as_deref())?
            .nested_optional("identifiers", self.identifiers.as_ref())?
            .build())
    }
}

/// Builder for relationship records.
#[derive(Debug, Clone)]
pub struct RelationshipBuilder {
    header: BuilderHeader,
    relationship_type_uri: String,
    bilateral_parties: Option<BilateralParties>,
    multilateral_members: Option<Vec<MultilateralMember>>,
    effective_timestamp: CanonicalTimestamp,
    expiration_timestamp: Option<CanonicalTimestamp>,
    status: RelationshipStatus,
    jurisdiction_iso: String,
    parent_relationship_id: Option<String>,
    financial_terms: Option<FinancialTerms>,
    terms_attributes: Option<Vec<TermsAttribute>>,
    source_references: Option<Vec<SourceReference>>,
    identifiers: Option<Identifiers>,
}

impl RelationshipBuilder {
    /// Start a relationship effective at `effective`, status ACTIVE from the same instant.
    pub fn new(
        verifiable_id: impl Into<String>,
        relationship_type_uri: impl Into<String>,
        jurisdiction_iso: impl Into<String>,
        effective: CanonicalTimestamp,
    ) -> Self {
        Self {
            header: BuilderHeader::new(verifiable_id.into()),
            relationship_type_uri: relationship_type_uri.into(),
            bilateral_parties: None,
            multilateral_members: None,
            effective_timestamp: effective,
            expiration_timestamp: None,
            status: RelationshipStatus {
                status_code: RelationshipStatusCode::Active,
                status_effective_timestamp: effective,
            },
            jurisdiction_iso: jurisdiction_iso.into(),
            parent_relationship_id: None,
            financial_terms: None,
            terms_attributes: None,
            source_references: None,
            identifiers: None,
        }
    }

    builder_header_methods!();

    pub fn bilateral(mut self, party_a: Party, party_b: Party) -> Self {
        self.bilateral_parties = Some(BilateralParties { party_a, party_b });
        self
    }

    pub fn member(mut self, member: MultilateralMember) -> Self {
        self.multilateral_members.get_or_insert_with(Vec::new).push(member);
        self
    }

    pub fn expires(mut self, at: CanonicalTimestamp) -> Self {
        self.expiration_timestamp = Some(at);
        self
    }

    pub fn status(mut self, code: RelationshipStatusCode, effective: CanonicalTimestamp) -> Self {
        self.status = RelationshipStatus {
            status_code: code,
            status_effective_timestamp: effective,
        };
        self
    }

    pub fn parent(mut self, parent_relationship_id: impl Into<String>) -> Self {
        self.parent_relationship_id = Some(parent_relationship_id.into());
        self
    }

    pub fn financial_terms(mut self, terms: FinancialTerms) -> Self {
        self.financial_terms = Some(terms);
        self
    }

    pub fn term(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.terms_attributes.get_or_insert_with(Vec::new).push(TermsAttribute {
            key: key.into(),
            value: value.into(),
        });
        self
    }

    pub fn source_reference(mut self, reference: SourceReference) -> Self {
        self.source_references.get_or_insert_with(Vec::new).push(reference);
        self
    }

    pub fn identifiers(mut self, identifiers: Identifiers) -> Self {
        self.identifiers = Some(identifiers);
        self
    }

    /// Build with an unsigned attestation.
    pub fn build(self) -> RelationshipRecord {
        RelationshipRecord {
            attestation: self.header.attestation(),
            verifiable_id: self.header.verifiable_id,
            schema_version: SCHEMA_VERSION.to_string(),
            revision_number: self.header.revision_number,
            previous_record_hash: self.header.previous_record_hash,
            relationship_type_uri: self.relationship_type_uri,
            bilateral_parties: self.bilateral_parties,
            multilateral_members: self.multilateral_members,
            effective_timestamp: self.effective_timestamp,
            expiration_timestamp: self.expiration_timestamp,
            status: self.status,
            jurisdiction_iso: self.jurisdiction_iso,
            parent_relationship_id: self.parent_relationship_id,
            financial_terms: self.financial_terms,
            terms_attributes: self.terms_attributes,
            source_references: self.source_references,
            identifiers: self.identifiers,
        }
    }
}
