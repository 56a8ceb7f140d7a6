//! The record envelope shared by entities, relationships and exchanges.
//!
//! A [`Record`] is tagged by `recordType` on the wire. Every variant carries
//! the same chain header (`verifiableId`, `schemaVersion`, `revisionNumber`,
//! `previousRecordHash`) and an attestation block.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::attestation::{Attestation, ProofPurpose};
use crate::canonical::{AttestationMode, CanonicalObject, CanonicalValue, Canonicalize};
use crate::crypto::{Keypair, Sha256Hash};
use crate::entity::EntityRecord;
use crate::error::CanonicalizationError;
use crate::exchange::ExchangeRecord;
use crate::hash::hash_record;
use crate::identifiers::Identifiers;
use crate::relationship::RelationshipRecord;
use crate::timestamp::CanonicalTimestamp;

/// Discriminator for the three record kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordType {
    Entity,
    Relationship,
    Exchange,
}

impl RecordType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Entity => "entity",
            Self::Relationship => "relationship",
            Self::Exchange => "exchange",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Index key of one revision: (logical id, revision number).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordKey {
    pub logical_id: String,
    pub revision: u64,
}

impl RecordKey {
    pub fn new(logical_id: impl Into<String>, revision: u64) -> Self {
        Self {
            logical_id: logical_id.into(),
            revision,
        }
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.logical_id, self.revision)
    }
}

/// Pointer to the upstream system a record was derived from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceReference {
    pub source_system_uri: String,
    pub source_record_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
}

impl Canonicalize for SourceReference {
    fn to_canonical_value(&self) -> Result<CanonicalValue, CanonicalizationError> {
        Ok(CanonicalObject::new()
            .required("sourceRecordId", &self.source_record_id)
            .required("sourceSystemUri", &self.source_system_uri)
            .optional("sourceUrl", self.source_url.as_ref())
            .build())
    }
}

/// Insert the chain header every record shares.
pub(crate) fn header_fields(
    obj: CanonicalObject,
    record_type: RecordType,
    verifiable_id: &str,
    schema_version: &str,
    revision_number: u64,
    previous_record_hash: Option<&Sha256Hash>,
    attestation: &Attestation,
) -> Result<CanonicalObject, CanonicalizationError> {
    obj.required("recordType", record_type.as_str())
        .required("verifiableId", verifiable_id)
        .required("schemaVersion", schema_version)
        .required("revisionNumber", revision_number)
        .nullable("previousRecordHash", previous_record_hash.map(Sha256Hash::to_hex))
        .nested("attestation", attestation)
}

/// A CEP record of any type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "recordType", rename_all = "lowercase")]
pub enum Record {
    Entity(EntityRecord),
    Relationship(RelationshipRecord),
    Exchange(ExchangeRecord),
}

impl Record {
    /// Parse a record from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize to (non-canonical) JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn record_type(&self) -> RecordType {
        match self {
            Self::Entity(_) => RecordType::Entity,
            Self::Relationship(_) => RecordType::Relationship,
            Self::Exchange(_) => RecordType::Exchange,
        }
    }

    pub fn logical_id(&self) -> &str {
        match self {
            Self::Entity(r) => &r.verifiable_id,
            Self::Relationship(r) => &r.verifiable_id,
            Self::Exchange(r) => &r.verifiable_id,
        }
    }

    pub fn schema_version(&self) -> &str {
        match self {
            Self::Entity(r) => &r.schema_version,
            Self::Relationship(r) => &r.schema_version,
            Self::Exchange(r) => &r.schema_version,
        }
    }

    pub fn revision_number(&self) -> u64 {
        match self {
            Self::Entity(r) => r.revision_number,
            Self::Relationship(r) => r.revision_number,
            Self::Exchange(r) => r.revision_number,
        }
    }

    pub fn previous_record_hash(&self) -> Option<&Sha256Hash> {
        match self {
            Self::Entity(r) => r.previous_record_hash.as_ref(),
            Self::Relationship(r) => r.previous_record_hash.as_ref(),
            Self::Exchange(r) => r.previous_record_hash.as_ref(),
        }
    }

    pub fn key(&self) -> RecordKey {
        RecordKey::new(self.logical_id(), self.revision_number())
    }

    pub fn attestation(&self) -> &Attestation {
        match self {
            Self::Entity(r) => &r.attestation,
            Self::Relationship(r) => &r.attestation,
            Self::Exchange(r) => &r.attestation,
        }
    }

    pub fn attestation_mut(&mut self) -> &mut Attestation {
        match self {
            Self::Entity(r) => &mut r.attestation,
            Self::Relationship(r) => &mut r.attestation,
            Self::Exchange(r) => &mut r.attestation,
        }
    }

    /// The identifier set, if the record carries one.
    pub fn identifiers(&self) -> Option<&Identifiers> {
        match self {
            Self::Entity(r) => Some(&r.identifiers),
            Self::Relationship(r) => r.identifiers.as_ref(),
            Self::Exchange(r) => r.identifiers.as_ref(),
        }
    }

    /// Sign the attestation-excluded canonical form with Ed25519.
    pub fn sign(mut self, keypair: &Keypair) -> Result<Self, CanonicalizationError> {
        let digest = hash_record(&self, AttestationMode::Exclude)?.digest;
        let attestation = self.attestation_mut();
        *attestation = attestation.clone().sign_ed25519(keypair, &digest);
        Ok(self)
    }
}

impl Canonicalize for Record {
    fn to_canonical_value(&self) -> Result<CanonicalValue, CanonicalizationError> {
        match self {
            Self::Entity(r) => r.to_canonical_value(),
            Self::Relationship(r) => r.to_canonical_value(),
            Self::Exchange(r) => r.to_canonical_value(),
        }
    }
}

impl From<EntityRecord> for Record {
    fn from(r: EntityRecord) -> Self {
        Self::Entity(r)
    }
}

impl From<RelationshipRecord> for Record {
    fn from(r: RelationshipRecord) -> Self {
        Self::Relationship(r)
    }
}

impl From<ExchangeRecord> for Record {
    fn from(r: ExchangeRecord) -> Self {
        Self::Exchange(r)
    }
}

/// Chain header and attestor settings shared by the record builders.
#[derive(Debug, Clone)]
pub(crate) struct BuilderHeader {
    pub verifiable_id: String,
    pub revision_number: u64,
    pub previous_record_hash: Option<Sha256Hash>,
    pub attestor_id: String,
    pub verification_method_uri: String,
    pub attested_at: Option<CanonicalTimestamp>,
    pub purpose: ProofPurpose,
}

impl BuilderHeader {
    pub fn new(verifiable_id: String) -> Self {
        Self {
            verifiable_id,
            revision_number: 1,
            previous_record_hash: None,
            attestor_id: String::new(),
            verification_method_uri: String::new(),
            attested_at: None,
            purpose: ProofPurpose::default(),
        }
    }

    pub fn attestation(&self) -> Attestation {
        Attestation::unsigned(
            self.attestor_id.clone(),
            self.verification_method_uri.clone(),
            self.attested_at.unwrap_or_else(CanonicalTimestamp::now),
        )
        .with_purpose(self.purpose)
    }
}

/// Builder methods shared by every record builder.
macro_rules! builder_header_methods {
    () => {
        /// Set revision number and predecessor digest.
        pub fn revision(mut self, revision_number: u64, previous: Option<$crate::crypto::Sha256Hash>) -> Self {
            self.header.revision_number = revision_number;
            self.header.previous_record_hash = previous;
            self
        }

        /// Set who attests and where their key is found.
        pub fn attestor(mut self, attestor_id: impl Into<String>, verification_method_uri: impl Into<String>) -> Self {
            self.header.attestor_id = attestor_id.into();
            self.header.verification_method_uri = verification_method_uri.into();
            self
        }

        /// Set the attestation time. Defaults to now.
        pub fn attested_at(mut self, ts: $crate::timestamp::CanonicalTimestamp) -> Self {
            self.header.attested_at = Some(ts);
            self
        }

        pub fn purpose(mut self, purpose: $crate::attestation::ProofPurpose) -> Self {
            self.header.purpose = purpose;
            self
        }

        /// Build and sign with Ed25519.
        pub fn sign(
            self,
            keypair: &$crate::crypto::Keypair,
        ) -> Result<$crate::record::Record, $crate::error::CanonicalizationError> {
            $crate::record::Record::from(self.build()).sign(keypair)
        }
    };
}

pub(crate) use builder_header_methods;
