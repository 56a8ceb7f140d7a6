//! Exchange records: transfers of value under a relationship.

use serde::{Deserialize, Serialize};

use crate::amount::Amount;
use crate::attestation::Attestation;
use crate::canonical::{CanonicalObject, CanonicalValue, Canonicalize};
use crate::crypto::Sha256Hash;
use crate::error::CanonicalizationError;
use crate::identifiers::Identifiers;
use crate::record::{builder_header_methods, header_fields, BuilderHeader, RecordType, SourceReference};
use crate::relationship::default_currency;
use crate::timestamp::CanonicalTimestamp;
use crate::version::{default_schema_version, SCHEMA_VERSION};

/// Value type term applied when an exchange does not name one.
pub const DEFAULT_VALUE_TYPE_URI: &str = "https://raw.githubusercontent.com/civic-interconnect/civic-exchange-protocol/main/vocabulary/value-type.json#monetary";

fn default_value_type_uri() -> String {
    DEFAULT_VALUE_TYPE_URI.to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExchangeStatusCode {
    Pending,
    Completed,
    Reversed,
    Canceled,
    Disputed,
}

impl ExchangeStatusCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Completed => "COMPLETED",
            Self::Reversed => "REVERSED",
            Self::Canceled => "CANCELED",
            Self::Disputed => "DISPUTED",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeStatus {
    pub status_code: ExchangeStatusCode,
    pub status_effective_timestamp: CanonicalTimestamp,
}

impl Canonicalize for ExchangeStatus {
    fn to_canonical_value(&self) -> Result<CanonicalValue, CanonicalizationError> {
        Ok(CanonicalObject::new()
            .required("statusCode", self.status_code.as_str())
            .required("statusEffectiveTimestamp", &self.status_effective_timestamp)
            .build())
    }
}

/// Source or recipient of an exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeParty {
    pub entity_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_identifier: Option<String>,
}

impl ExchangeParty {
    pub fn new(entity_id: impl Into<String>) -> Self {
        Self {
            entity_id: entity_id.into(),
            role_uri: None,
            account_identifier: None,
        }
    }

    pub fn with_role(mut self, role_uri: impl Into<String>) -> Self {
        self.role_uri = Some(role_uri.into());
        self
    }
}

impl Canonicalize for ExchangeParty {
    fn to_canonical_value(&self) -> Result<CanonicalValue, CanonicalizationError> {
        Ok(CanonicalObject::new()
            .required("entityId", &self.entity_id)
            .optional("roleUri", self.role_uri.as_ref())
            .optional("accountIdentifier", self.account_identifier.as_ref())
            .build())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeValue {
    pub amount: Amount,
    #[serde(default = "default_currency")]
    pub currency_code: String,
    #[serde(default = "default_value_type_uri")]
    pub value_type_uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_kind_description: Option<String>,
}

impl ExchangeValue {
    /// A monetary value in US dollars.
    pub fn usd(amount: f64) -> Self {
        Self {
            amount: Amount(amount),
            currency_code: default_currency(),
            value_type_uri: default_value_type_uri(),
            in_kind_description: None,
        }
    }
}

impl Canonicalize for ExchangeValue {
    fn to_canonical_value(&self) -> Result<CanonicalValue, CanonicalizationError> {
        Ok(CanonicalObject::new()
            .nested("amount", &self.amount)?
            .required("currencyCode", &self.currency_code)
            .required("valueTypeUri", &self.value_type_uri)
            .optional("inKindDescription", self.in_kind_description.as_ref())
            .build())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntermediaryEntity {
    pub entity_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_uri: Option<String>,
}

impl Canonicalize for IntermediaryEntity {
    fn to_canonical_value(&self) -> Result<CanonicalValue, CanonicalizationError> {
        Ok(CanonicalObject::new()
            .required("entityId", &self.entity_id)
            .optional("roleUri", self.role_uri.as_ref())
            .build())
    }
}

/// Where the money in an exchange came from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvenanceChain {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub funding_chain_tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ultimate_source_entity_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intermediary_entities: Option<Vec<IntermediaryEntity>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_exchange_id: Option<String>,
}

impl ProvenanceChain {
    /// True when no field carries a value.
    pub fn is_empty(&self) -> bool {
        self.funding_chain_tag.is_none()
            && self.ultimate_source_entity_id.is_none()
            && self.intermediary_entities.as_ref().map_or(true, Vec::is_empty)
            && self.parent_exchange_id.is_none()
    }
}

impl Canonicalize for ProvenanceChain {
    fn to_canonical_value(&self) -> Result<CanonicalValue, CanonicalizationError> {
        CanonicalObject::new()
            .optional("fundingChainTag", self.funding_chain_tag.as_ref())
            .optional("ultimateSourceEntityId", self.ultimate_source_entity_id.as_ref())
            .array("intermediaryEntities", self.intermediary_entities.as_deref())
            .map(|obj| {
                obj.optional("parentExchangeId", self.parent_exchange_id.as_ref())
                    .build()
            })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Categorization {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cfda_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub naics_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gtas_account_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_category_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_category_label: Option<String>,
}

impl Categorization {
    /// True when no field carries a value.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl Canonicalize for Categorization {
    fn to_canonical_value(&self) -> Result<CanonicalValue, CanonicalizationError> {
        Ok(CanonicalObject::new()
            .optional("cfdaNumber", self.cfda_number.as_ref())
            .optional("naicsCode", self.naics_code.as_ref())
            .optional("gtasAccountCode", self.gtas_account_code.as_ref())
            .optional("localCategoryCode", self.local_category_code.as_ref())
            .optional("localCategoryLabel", self.local_category_label.as_ref())
            .build())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeRecord {
    pub verifiable_id: String,
    #[serde(default = "default_schema_version")]
    pub schema_version: String,
    pub revision_number: u64,
    #[serde(default)]
    pub previous_record_hash: Option<Sha256Hash>,
    pub relationship_id: String,
    pub exchange_type_uri: String,
    pub source_entity: ExchangeParty,
    pub recipient_entity: ExchangeParty,
    pub value: ExchangeValue,
    pub occurred_timestamp: CanonicalTimestamp,
    pub status: ExchangeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provenance_chain: Option<ProvenanceChain>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categorization: Option<Categorization>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_references: Option<Vec<SourceReference>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifiers: Option<Identifiers>,
    pub attestation: Attestation,
}

impl ExchangeRecord {
    pub fn parent_exchange_id(&self) -> Option<&str> {
        self.provenance_chain
            .as_ref()
            .and_then(|p| p.parent_exchange_id.as_deref())
    }

    pub fn funding_chain_tag(&self) -> Option<&str> {
        self.provenance_chain
            .as_ref()
            .and_then(|p| p.funding_chain_tag.as_deref())
    }

    /// Entity ids of source, recipient and intermediaries.
    pub fn party_entity_ids(&self) -> Vec<&str> {
        let mut ids = vec![
            self.source_entity.entity_id.as_str(),
            self.recipient_entity.entity_id.as_str(),
        ];
        if let Some(chain) = &self.provenance_chain {
            if let Some(id) = &chain.ultimate_source_entity_id {
                ids.push(id);
            }
            if let Some(intermediaries) = &chain.intermediary_entities {
                ids.extend(intermediaries.iter().map(|i| i.entity_id.as_str()));
            }
        }
        ids
    }
}

impl Canonicalize for ExchangeRecord {
    fn to_canonical_value(&self) -> Result<CanonicalValue, CanonicalizationError> {
        let obj = header_fields(
            CanonicalObject::new(),
            RecordType::Exchange,
            &self.verifiable_id,
            &self.schema_version,
            self.revision_number,
            self.previous_record_hash.as_ref(),
            &self.attestation,
        )?;
        Ok(obj
            .required("relationshipId", &self.relationship_id)
            .required("exchangeTypeUri", &self.exchange_type_uri)
            .nested("sourceEntity", &self.source_entity)?
            .nested("recipientEntity", &self.recipient_entity)?
            .nested("value", &self.value)?
            .required("occurredTimestamp", &self.occurred_timestamp)
            .nested("status", &self.status)?
            .nested_optional(
                "provenanceChain",
                self.provenance_chain.as_ref().filter(|p| !p.is_empty()),
            )?
            .nested_optional(
                "categorization",
                self.categorization.as_ref().filter(|c| !c.is_empty()),
            )?
            .array("sourceReferences", self.source_references.as_deref())?
            .nested_optional("identifiers", self.identifiers.as_ref())?
            .build())
    }
}

/// Builder for exchange records.
#[derive(Debug, Clone)]
pub struct ExchangeBuilder {
    header: BuilderHeader,
    relationship_id: String,
    exchange_type_uri: String,
    source_entity: ExchangeParty,
    recipient_entity: ExchangeParty,
    value: ExchangeValue,
    occurred_timestamp: CanonicalTimestamp,
    status: ExchangeStatus,
    provenance_chain: Option<ProvenanceChain>,
    categorization: Option<Categorization>,
    source_references: Option<Vec<SourceReference>>,
    identifiers: Option<Identifiers>,
}

impl ExchangeBuilder {
    /// Start a completed exchange that occurred at `occurred`.
    pub fn new(
        verifiable_id: impl Into<String>,
        relationship_id: impl Into<String>,
        exchange_type_uri: impl Into<String>,
        source: ExchangeParty,
        recipient: ExchangeParty,
        value: ExchangeValue,
        occurred: CanonicalTimestamp,
    ) -> Self {
        Self {
            header: BuilderHeader::new(verifiable_id.into()),
            relationship_id: relationship_id.into(),
            exchange_type_uri: exchange_type_uri.into(),
            source_entity: source,
            recipient_entity: recipient,
            value,
            occurred_timestamp: occurred,
            status: ExchangeStatus {
                status_code: ExchangeStatusCode::Completed,
                status_effective_timestamp: occurred,
            },
            provenance_chain: None,
            categorization: None,
            source_references: None,
            identifiers: None,
        }
    }

    builder_header_methods!();

    pub fn status(mut self, code: ExchangeStatusCode, effective: CanonicalTimestamp) -> Self {
        self.status = ExchangeStatus {
            status_code: code,
            status_effective_timestamp: effective,
        };
        self
    }

    pub fn parent_exchange(mut self, parent_exchange_id: impl Into<String>) -> Self {
        self.provenance_chain
            .get_or_insert_with(ProvenanceChain::default)
            .parent_exchange_id = Some(parent_exchange_id.into());
        self
    }

    pub fn funding_chain_tag(mut self, tag: impl Into<String>) -> Self {
        self.provenance_chain
            .get_or_insert_with(ProvenanceChain::default)
            .funding_chain_tag = Some(tag.into());
        self
    }

    pub fn ultimate_source(mut self, entity_id: impl Into<String>) -> Self {
        self.provenance_chain
            .get_or_insert_with(ProvenanceChain::default)
            .ultimate_source_entity_id = Some(entity_id.into());
        self
    }

    pub fn intermediary(mut self, entity: IntermediaryEntity) -> Self {
        self.provenance_chain
            .get_or_insert_with(ProvenanceChain::default)
            .intermediary_entities
            .get_or_insert_with(Vec::new)
            .push(entity);
        self
    }

    pub fn categorization(mut self, categorization: Categorization) -> Self {
        self.categorization = Some(categorization);
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
    pub fn build(self) -> ExchangeRecord {
        ExchangeRecord {
            attestation: self.header.attestation(),
            verifiable_id: self.header.verifiable_id,
            schema_version: SCHEMA_VERSION.to_string(),
            revision_number: self.header.revision_number,
            previous_record_hash: self.header.previous_record_hash,
            relationship_id: self.relationship_id,
            exchange_type_uri: self.exchange_type_uri,
            source_entity: self.source_entity,
            recipient_entity: self.recipient_entity,
            value: self.value,
            occurred_timestamp: self.occurred_timestamp,
            status: self.status,
            provenance_chain: self.provenance_chain,
            categorization: self.categorization,
            source_references: self.source_references,
            identifiers: self.identifiers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payment(amount: f64) -> ExchangeRecord {
        let at: CanonicalTimestamp = "2025-03-01T12:00:00Z".parse().unwrap();
        ExchangeBuilder::new(
            "cep-exchange:1",
            "cep-relationship:grant:1",
            "urn:exchange-type:payment",
            ExchangeParty::new("e1"),
            ExchangeParty::new("e2"),
            ExchangeValue::usd(amount),
            at,
        )
        .build()
    }

    #[test]
    fn test_monetary_value_ten() {
        let json = payment(10.0).to_canonical_value().unwrap().to_json();
        assert!(json.contains(r#""amount":"10.00""#), "{json}");
        assert!(json.contains(r#""currencyCode":"USD""#));
        assert!(json.contains(DEFAULT_VALUE_TYPE_URI));
    }

    #[test]
    fn test_nan_amount_fails() {
        let result = payment(f64::NAN).to_canonical_value();
        assert!(matches!(result, Err(CanonicalizationError::NonFinite { .. })));
    }

    #[test]
    fn test_defaults_on_parse() {
        let json = r#"{"amount": 5}"#;
        let value: ExchangeValue = serde_json::from_str(json).unwrap();
        assert_eq!(value.currency_code, "USD");
        assert_eq!(value.value_type_uri, DEFAULT_VALUE_TYPE_URI);
    }

    #[test]
    fn test_provenance_helpers() {
        let mut x = payment(1.0);
        assert_eq!(x.parent_exchange_id(), None);
        x.provenance_chain = Some(ProvenanceChain {
            funding_chain_tag: Some("US>US-IL".into()),
            parent_exchange_id: Some("cep-exchange:0".into()),
            ultimate_source_entity_id: Some("e0".into()),
            intermediary_entities: None,
        });
        assert_eq!(x.parent_exchange_id(), Some("cep-exchange:0"));
        assert_eq!(x.funding_chain_tag(), Some("US>US-IL"));
        assert_eq!(x.party_entity_ids(), vec!["e1", "e2", "e0"]);
    }

    #[test]
    fn test_empty_sub_objects_omitted() {
        let bare = payment(1.0);
        let expected = bare.to_canonical_value().unwrap().to_json();

        let mut x = payment(1.0);
        x.provenance_chain = Some(ProvenanceChain {
            intermediary_entities: Some(vec![]),
            ..ProvenanceChain::default()
        });
        x.categorization = Some(Categorization::default());
        let json = x.to_canonical_value().unwrap().to_json();
        assert!(!json.contains("provenanceChain"), "{json}");
        assert!(!json.contains("categorization"), "{json}");
        assert_eq!(json, expected);

        x.categorization = Some(Categorization {
            naics_code: Some("921130".into()),
            ..Categorization::default()
        });
        let json = x.to_canonical_value().unwrap().to_json();
        assert!(json.contains(r#""categorization":{"naicsCode":"921130"}"#), "{json}");
    }
}
