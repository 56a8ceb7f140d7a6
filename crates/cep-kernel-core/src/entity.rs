//! Entity records: organizations and civic bodies.

use serde::{Deserialize, Serialize};

use crate::amount::ConfidenceScore;
use crate::attestation::Attestation;
use crate::canonical::{CanonicalObject, CanonicalValue, Canonicalize};
use crate::crypto::Sha256Hash;
use crate::error::CanonicalizationError;
use crate::identifiers::Identifiers;
use crate::record::{builder_header_methods, header_fields, BuilderHeader, RecordType};
use crate::timestamp::CivicDate;
use crate::version::{default_schema_version, SCHEMA_VERSION};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityStatusCode {
    Active,
    Inactive,
    Suspended,
    Dissolved,
    Merged,
}

impl EntityStatusCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Inactive => "INACTIVE",
            Self::Suspended => "SUSPENDED",
            Self::Dissolved => "DISSOLVED",
            Self::Merged => "MERGED",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityStatus {
    pub status_code: EntityStatusCode,
    pub status_effective_date: CivicDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_termination_date: Option<CivicDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub successor_entity_id: Option<String>,
}

impl Canonicalize for EntityStatus {
    fn to_canonical_value(&self) -> Result<CanonicalValue, CanonicalizationError> {
        Ok(CanonicalObject::new()
            .required("statusCode", self.status_code.as_str())
            .required("statusEffectiveDate", &self.status_effective_date)
            .optional("statusTerminationDate", self.status_termination_date.as_ref())
            .optional("successorEntityId", self.successor_entity_id.as_ref())
            .build())
    }
}

/// How confidently upstream entity resolution matched this entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionConfidence {
    pub score: ConfidenceScore,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_record_count: Option<u64>,
}

impl Canonicalize for ResolutionConfidence {
    fn to_canonical_value(&self) -> Result<CanonicalValue, CanonicalizationError> {
        Ok(CanonicalObject::new()
            .nested("score", &self.score)?
            .optional("methodUri", self.method_uri.as_ref())
            .optional("sourceRecordCount", self.source_record_count)
            .build())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityRecord {
    pub verifiable_id: String,
    #[serde(default = "default_schema_version")]
    pub schema_version: String,
    pub revision_number: u64,
    #[serde(default)]
    pub previous_record_hash: Option<Sha256Hash>,
    pub identifiers: Identifiers,
    pub legal_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legal_name_normalized: Option<String>,
    pub jurisdiction_iso: String,
    pub status: EntityStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_type_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub naics_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution_confidence: Option<ResolutionConfidence>,
    pub attestation: Attestation,
}

impl Canonicalize for EntityRecord {
    fn to_canonical_value(&self) -> Result<CanonicalValue, CanonicalizationError> {
        let obj = header_fields(
            CanonicalObject::new(),
            RecordType::Entity,
            &self.verifiable_id,
            &self.schema_version,
            self.revision_number,
            self.previous_record_hash.as_ref(),
            &self.attestation,
        )?;
        Ok(obj
            .nested("identifiers", &self.identifiers)?
            .required("legalName", &self.legal_name)
            .optional("legalNameNormalized", self.legal_name_normalized.as_ref())
            .required("jurisdictionIso", &self.jurisdiction_iso)
            .nested("status", &self.status)?
            .optional("entityTypeUri", self.entity_type_uri.as_ref())
            .optional("naicsCode", self.naics_code.as_ref())
            .nested_optional("resolutionConfidence", self.resolution_confidence.as_ref())?
            .build())
    }
}

/// Builder for entity records.
#[derive(Debug, Clone)]
pub struct EntityBuilder {
    header: BuilderHeader,
    identifiers: Identifiers,
    legal_name: String,
    legal_name_normalized: Option<String>,
    jurisdiction_iso: String,
    status: EntityStatus,
    entity_type_uri: Option<String>,
    naics_code: Option<String>,
    resolution_confidence: Option<ResolutionConfidence>,
}

impl EntityBuilder {
    pub fn new(
        verifiable_id: impl Into<String>,
        legal_name: impl Into<String>,
        jurisdiction_iso: impl Into<String>,
    ) -> Self {
        Self {
            header: BuilderHeader::new(verifiable_id.into()),
            identifiers: Identifiers::default(),
            legal_name: legal_name.into(),
            legal_name_normalized: None,
            jurisdiction_iso: jurisdiction_iso.into(),
            status: EntityStatus {
                status_code: EntityStatusCode::Active,
                status_effective_date: CivicDate::default(),
                status_termination_date: None,
                successor_entity_id: None,
            },
            entity_type_uri: None,
            naics_code: None,
            resolution_confidence: None,
        }
    }

    builder_header_methods!();

    pub fn identifiers(mut self, identifiers: Identifiers) -> Self {
        self.identifiers = identifiers;
        self
    }

    pub fn legal_name_normalized(mut self, name: impl Into<String>) -> Self {
        self.legal_name_normalized = Some(name.into());
        self
    }

    pub fn status(mut self, code: EntityStatusCode, effective: CivicDate) -> Self {
        self.status.status_code = code;
        self.status.status_effective_date = effective;
        self
    }

    pub fn successor(mut self, terminated: CivicDate, successor_entity_id: impl Into<String>) -> Self {
        self.status.status_termination_date = Some(terminated);
        self.status.successor_entity_id = Some(successor_entity_id.into());
        self
    }

    pub fn entity_type_uri(mut self, uri: impl Into<String>) -> Self {
        self.entity_type_uri = Some(uri.into());
        self
    }

    pub fn naics_code(mut self, code: impl Into<String>) -> Self {
        self.naics_code = Some(code.into());
        self
    }

    pub fn resolution_confidence(mut self, confidence: ResolutionConfidence) -> Self {
        self.resolution_confidence = Some(confidence);
        self
    }

    /// Build with an unsigned attestation.
    pub fn build(self) -> EntityRecord {
        EntityRecord {
            attestation: self.header.attestation(),
            verifiable_id: self.header.verifiable_id,
            schema_version: SCHEMA_VERSION.to_string(),
            revision_number: self.header.revision_number,
            previous_record_hash: self.header.previous_record_hash,
            identifiers: self.identifiers,
            legal_name: self.legal_name,
            legal_name_normalized: self.legal_name_normalized,
            jurisdiction_iso: self.jurisdiction_iso,
            status: self.status,
            entity_type_uri: self.entity_type_uri,
            naics_code: self.naics_code,
            resolution_confidence: self.resolution_confidence,
        }
    }
}
