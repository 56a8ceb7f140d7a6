//! Conformance vectors for canonicalization, hashing and signing.
//!
//! Every implementation of the record format must reproduce these byte for
//! byte. Each vector fixes the attestation-excluded canonical string, its
//! SHA-256 digest, the Ed25519 proof over that digest (seed `[0x42; 32]`)
//! and the attestation-included record digest a successor revision links to.

use cep_kernel_core::entity::ResolutionConfidence;
use cep_kernel_core::relationship::FinancialTerms;
use cep_kernel_core::{
    hash_record, Amount, AttestationMode, CanonicalTimestamp, CanonicalizationError, CivicDate,
    ConfidenceScore, EntityBuilder, EntityStatusCode, ExchangeBuilder, ExchangeParty,
    ExchangeValue, Identifiers, Keypair, Party, Record, RelationshipBuilder, Sha256Hash,
};

use crate::fixtures::{
    fixed_timestamp, GRANTEE_ROLE, GRANTOR_ROLE, GRANT_DISBURSEMENT_TYPE, GRANT_RELATIONSHIP_TYPE,
    PAYER_ROLE,
};

pub const VECTOR_SEED: [u8; 32] = [0x42; 32];
pub const VECTOR_ATTESTOR: &str = "cep-node:springfield";
pub const VECTOR_METHOD: &str = "did:web:springfield.gov#key-1";

const DISTRICT: &str = "cep-entity:sam-uei:J6H4FB3N5YK7";
const FEDERAL_AGENCY: &str = "cep-entity:sam-uei:FEDAGENCY001";
const GRANT_ID: &str = "cep-relationship:grant:2025-001";

/// Which record a vector builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorRecord {
    /// A minimal entity, revision 1.
    EntityInitial,
    /// Revision 2 of the same entity, linked to the initial vector.
    EntityRevision,
    /// An entity with non-ASCII text in its legal name.
    EntityNonAscii,
    /// A bilateral grant with financial terms and unsorted terms attributes.
    Relationship,
    /// A disbursement of exactly ten dollars.
    Exchange,
}

/// A conformance vector.
#[derive(Debug, Clone)]
pub struct ConformanceVector {
    pub name: &'static str,
    pub record: VectorRecord,
    /// Attestation-excluded canonical form.
    pub expected_canonical: &'static str,
    /// SHA-256 of `expected_canonical`, lowercase hex.
    pub expected_content_digest: &'static str,
    /// Multibase base58btc Ed25519 signature over the content digest bytes.
    pub expected_proof_value: &'static str,
    /// SHA-256 of the attestation-included canonical form.
    pub expected_record_digest: &'static str,
}

/// All conformance vectors.
pub fn all_vectors() -> Vec<ConformanceVector> {
    vec![
        ConformanceVector {
            name: "entity revision 1",
            record: VectorRecord::EntityInitial,
            expected_canonical: concat!(
                r#"{"identifiers":{"samUei":"J6H4FB3N5YK7"},"jurisdictionIso":"US-IL","#,
                r#""legalName":"Springfield Unified School District","previousRecordHash":null,"#,
                r#""recordType":"entity","revisionNumber":1,"schemaVersion":"1.0.0","#,
                r#""status":{"statusCode":"ACTIVE","statusEffectiveDate":"2020-07-01"},"#,
                r#""verifiableId":"cep-entity:sam-uei:J6H4FB3N5YK7"}"#
            ),
            expected_content_digest: "5f9efd785f07b19e921cec88056c6f3fb27f0ea0f4915ae89dff00e288413893",
            expected_proof_value: "z4hBxYbjKEvqc9omavcCg6EDZZDFsvtUsc9myufGu5t8sGjVZjhHvHaSeGUfKnd5eAsrVJRuV5mEF3ykt8yYY271q",
            expected_record_digest: "f871fddf2dfc9e5cee6e6ff0cf5746c7e0acbdfdf340eba04a09e4840b730ba3",
        },
        ConformanceVector {
            name: "entity revision 2 with sorted additional schemes",
            record: VectorRecord::EntityRevision,
            expected_canonical: concat!(
                r#"{"identifiers":{"additionalSchemes":["#,
                r#"{"schemeUri":"https://example.org/schemes/district","value":"D-186"},"#,
                r#"{"schemeUri":"https://example.org/schemes/state-vendor","value":"IL-00042"}],"#,
                r#""samUei":"J6H4FB3N5YK7"},"jurisdictionIso":"US-IL","#,
                r#""legalName":"Springfield Unified School District","#,
                r#""legalNameNormalized":"springfield unified school district","#,
                r#""previousRecordHash":"f871fddf2dfc9e5cee6e6ff0cf5746c7e0acbdfdf340eba04a09e4840b730ba3","#,
                r#""recordType":"entity","resolutionConfidence":{"score":"0.90","sourceRecordCount":3},"#,
                r#""revisionNumber":2,"schemaVersion":"1.0.0","#,
                r#""status":{"statusCode":"ACTIVE","statusEffectiveDate":"2020-07-01"},"#,
                r#""verifiableId":"cep-entity:sam-uei:J6H4FB3N5YK7"}"#
            ),
            expected_content_digest: "bf67bf8ddbd8d92c9b1962275e2e49bd45ccc12d5a05569413968dfa8c0cd11b",
            expected_proof_value: "z2csggEpPAap1ZbK9zJLvN6cETfZthQQYsiC7XwUC9w57UQ6jahAYHpTnmncnFxP4iaeNALJw4SWeh9wBdu5j9EHn",
            expected_record_digest: "dfca9f9c4d60c2054be7cb296e21a5b69a25bd424014b327a67339c9b6f2408f",
        },
        ConformanceVector {
            name: "entity with non-ASCII legal name",
            record: VectorRecord::EntityNonAscii,
            expected_canonical: concat!(
                r#"{"identifiers":{"canadianBn":"123456789RC0001"},"jurisdictionIso":"CA-QC","#,
                r#""legalName":"Société de transport de Montréal","previousRecordHash":null,"#,
                r#""recordType":"entity","revisionNumber":1,"schemaVersion":"1.0.0","#,
                r#""status":{"statusCode":"ACTIVE","statusEffectiveDate":"1970-01-01"},"#,
                r#""verifiableId":"cep-entity:canadian-bn:123456789RC0001"}"#
            ),
            expected_content_digest: "42d8879bdb7e82daf44c31e83f6bb1d1668ee0ce257d9fe3951160832e044c1a",
            expected_proof_value: "z2fMPWMiNWJdcXKsEkU58G4NwU4p7V44fHp7GSy6CxQ7J2Qoy63BVXAcPbTuYAsR4fhYv9Wek3Hr6K5rEvWxD2bFH",
            expected_record_digest: "3fda92fa5e72c0d51df629da6e52d4b8c7bf79afec5eb2f351c18d0c239c6703",
        },
        ConformanceVector {
            name: "bilateral grant with financial terms",
            record: VectorRecord::Relationship,
            expected_canonical: concat!(
                r#"{"bilateralParties":{"#,
                r#""partyA":{"entityId":"cep-entity:sam-uei:FEDAGENCY001","roleUri":"https://example.org/vocab/party-role#grantor"},"#,
                r#""partyB":{"entityId":"cep-entity:sam-uei:J6H4FB3N5YK7","roleUri":"https://example.org/vocab/party-role#grantee"}},"#,
                r#""effectiveTimestamp":"2025-09-15T14:03:22.500000Z","#,
                r#""financialTerms":{"currencyCode":"USD","obligatedValue":"10.00","totalValue":"250000.00"},"#,
                r#""jurisdictionIso":"US-IL","previousRecordHash":null,"recordType":"relationship","#,
                r#""relationshipTypeUri":"https://example.org/vocab/relationship-type#grant","#,
                r#""revisionNumber":1,"schemaVersion":"1.0.0","#,
                r#""status":{"statusCode":"ACTIVE","statusEffectiveTimestamp":"2025-09-15T14:03:22.500000Z"},"#,
                r#""termsAttributes":[{"key":"awardType","value":"formula"},{"key":"programCode","value":"84.010"}],"#,
                r#""verifiableId":"cep-relationship:grant:2025-001"}"#
            ),
            expected_content_digest: "7edee3bbe69c2bbefb0b8189ab9d5b4b33030b27993b2debd16c9ce7fed06a3c",
            expected_proof_value: "zTHhAb7Wy2ZKBEF9wdYDKSXgCAbDFAsV69WQLodETyKWJiumSKcUMoVsJ1esrr9mdYSwhzZArEf5LiMWcrBS5Gk4",
            expected_record_digest: "4b01e3e8a9d96462418694b93996099c783e6b77eab0e30a3019bea7deecefa9",
        },
        ConformanceVector {
            name: "ten dollar disbursement",
            record: VectorRecord::Exchange,
            expected_canonical: concat!(
                r#"{"exchangeTypeUri":"https://example.org/vocab/exchange-type#grant-disbursement","#,
                r#""occurredTimestamp":"2025-09-15T14:03:22.500000Z","previousRecordHash":null,"#,
                r#""provenanceChain":{"fundingChainTag":"US"},"#,
                r#""recipientEntity":{"entityId":"cep-entity:sam-uei:J6H4FB3N5YK7"},"#,
                r#""recordType":"exchange","relationshipId":"cep-relationship:grant:2025-001","#,
                r#""revisionNumber":1,"schemaVersion":"1.0.0","#,
                r#""sourceEntity":{"entityId":"cep-entity:sam-uei:FEDAGENCY001","roleUri":"https://example.org/vocab/exchange-role#payer"},"#,
                r#""status":{"statusCode":"COMPLETED","statusEffectiveTimestamp":"2025-09-15T14:03:22.500000Z"},"#,
                r#""value":{"amount":"10.00","currencyCode":"USD","#,
                r#""valueTypeUri":"https://raw.githubusercontent.com/civic-interconnect/civic-exchange-protocol/main/vocabulary/value-type.json#monetary"},"#,
                r#""verifiableId":"cep-exchange:grant:2025-001:0001"}"#
            ),
            expected_content_digest: "20f6789eebadf55fe4fbd3a80bed560fddf2a6fd3e5452049822d03b9e8382ca",
            expected_proof_value: "z5haRrC5iK8xVqJkqF72Lm21F9p6aet85G9VDZPpXw5QUW17iQkewusQsxCRveAh5uaouAeyfkFzpKMpVcvAxbJx8",
            expected_record_digest: "b3e59fa7dae4a8a148725bdb9540532180b8f64808102b6aea5a8108d3604f15",
        },
    ]
}

/// Digest the revision-2 vector names as its predecessor.
fn initial_entity_digest() -> Result<Sha256Hash, CanonicalizationError> {
    let initial = record_from_vector(VectorRecord::EntityInitial)?;
    Ok(hash_record(&initial, AttestationMode::Include)?.digest)
}

fn date(year: i32, month: u32, day: u32) -> CivicDate {
    CivicDate::from_ymd(year, month, day).unwrap_or_default()
}

/// Build and sign the record a vector describes.
pub fn record_from_vector(record: VectorRecord) -> Result<Record, CanonicalizationError> {
    let keypair = Keypair::from_seed(&VECTOR_SEED);
    let at: CanonicalTimestamp = fixed_timestamp();

    match record {
        VectorRecord::EntityInitial => EntityBuilder::new(
            DISTRICT,
            "Springfield Unified School District",
            "US-IL",
        )
        .identifiers(Identifiers::new().with_sam_uei("J6H4FB3N5YK7"))
        .status(EntityStatusCode::Active, date(2020, 7, 1))
        .attestor(VECTOR_ATTESTOR, VECTOR_METHOD)
        .attested_at(at)
        .sign(&keypair),

        VectorRecord::EntityRevision => EntityBuilder::new(
            DISTRICT,
            "Springfield Unified School District",
            "US-IL",
        )
        .identifiers(
            Identifiers::new()
                .with_sam_uei("J6H4FB3N5YK7")
                .with_additional("https://example.org/schemes/state-vendor", "IL-00042")
                .with_additional("https://example.org/schemes/district", "D-186"),
        )
        .legal_name_normalized("springfield unified school district")
        .status(EntityStatusCode::Active, date(2020, 7, 1))
        .resolution_confidence(ResolutionConfidence {
            score: ConfidenceScore::new(0.9),
            method_uri: None,
            source_record_count: Some(3),
        })
        .revision(2, Some(initial_entity_digest()?))
        .attestor(VECTOR_ATTESTOR, VECTOR_METHOD)
        .attested_at(at)
        .sign(&keypair),

        VectorRecord::EntityNonAscii => EntityBuilder::new(
            "cep-entity:canadian-bn:123456789RC0001",
            "Société de transport de Montréal",
            "CA-QC",
        )
        .identifiers(Identifiers::new().with_canadian_bn("123456789RC0001"))
        .attestor(VECTOR_ATTESTOR, VECTOR_METHOD)
        .attested_at(at)
        .sign(&keypair),

        VectorRecord::Relationship => {
            RelationshipBuilder::new(GRANT_ID, GRANT_RELATIONSHIP_TYPE, "US-IL", at)
                .bilateral(
                    Party::new(FEDERAL_AGENCY, GRANTOR_ROLE),
                    Party::new(DISTRICT, GRANTEE_ROLE),
                )
                .financial_terms(FinancialTerms {
                    total_value: Some(Amount::new(250_000.0)),
                    obligated_value: Some(Amount::new(10.0)),
                    currency_code: "USD".to_string(),
                })
                .term("programCode", "84.010")
                .term("awardType", "formula")
                .attestor(VECTOR_ATTESTOR, VECTOR_METHOD)
                .attested_at(at)
                .sign(&keypair)
        }

        VectorRecord::Exchange => ExchangeBuilder::new(
            "cep-exchange:grant:2025-001:0001",
            GRANT_ID,
            GRANT_DISBURSEMENT_TYPE,
            ExchangeParty::new(FEDERAL_AGENCY).with_role(PAYER_ROLE),
            ExchangeParty::new(DISTRICT),
            ExchangeValue::usd(10.0),
            at,
        )
        .funding_chain_tag("US")
        .attestor(VECTOR_ATTESTOR, VECTOR_METHOD)
        .attested_at(at)
        .sign(&keypair),
    }
}

/// Check every vector against this implementation.
///
/// Returns `(name, matches, content digest or error)` per vector.
pub fn verify_all_vectors() -> Vec<(String, bool, String)> {
    all_vectors()
        .iter()
        .map(|v| match check_vector(v) {
            Ok((matches, digest)) => (v.name.to_string(), matches, digest),
            Err(err) => (v.name.to_string(), false, err.to_string()),
        })
        .collect()
}

fn check_vector(vector: &ConformanceVector) -> Result<(bool, String), CanonicalizationError> {
    let record = record_from_vector(vector.record)?;
    let signed = hash_record(&record, AttestationMode::Exclude)?;
    let linked = hash_record(&record, AttestationMode::Include)?;

    let matches = signed.canonical.as_str() == vector.expected_canonical
        && signed.digest_hex() == vector.expected_content_digest
        && record.attestation().proof_value == vector.expected_proof_value
        && linked.digest_hex() == vector.expected_record_digest;
    Ok((matches, signed.digest_hex()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cep_kernel_core::{decode_proof_value, Ed25519Signature};

    #[test]
    fn test_all_vectors_match() {
        for (name, matches, digest) in verify_all_vectors() {
            assert!(matches, "vector '{name}' diverged: {digest}");
        }
    }

    #[test]
    fn test_canonical_strings_individually() {
        for vector in all_vectors() {
            let record = record_from_vector(vector.record).unwrap();
            let signed = hash_record(&record, AttestationMode::Exclude).unwrap();
            assert_eq!(signed.canonical.as_str(), vector.expected_canonical, "{}", vector.name);
            assert_eq!(signed.digest_hex(), vector.expected_content_digest, "{}", vector.name);
        }
    }

    #[test]
    fn test_proofs_verify_under_vector_key() {
        let public = Keypair::from_seed(&VECTOR_SEED).public_key();
        for vector in all_vectors() {
            let digest = Sha256Hash::from_hex(vector.expected_content_digest).unwrap();
            let bytes = decode_proof_value(vector.expected_proof_value).unwrap();
            let sig = Ed25519Signature::from_slice(&bytes).unwrap();
            assert!(public.verify(digest.as_bytes(), &sig).is_ok(), "{}", vector.name);
        }
    }

    #[test]
    fn test_revision_links_to_initial_record_digest() {
        let vectors = all_vectors();
        let revision = record_from_vector(VectorRecord::EntityRevision).unwrap();
        assert_eq!(
            revision.previous_record_hash().map(Sha256Hash::to_hex).as_deref(),
            Some(vectors[0].expected_record_digest)
        );
    }

    #[test]
    fn test_vectors_are_deterministic() {
        for vector in all_vectors() {
            let a = record_from_vector(vector.record).unwrap();
            let b = record_from_vector(vector.record).unwrap();
            assert_eq!(a, b, "{}", vector.name);
        }
    }
}
