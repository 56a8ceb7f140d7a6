//! Proptest generators for property-based testing.

use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde_json::Value;

use cep_kernel_core::entity::ResolutionConfidence;
use cep_kernel_core::{
    CanonicalTimestamp, CanonicalizationError, ConfidenceScore, EntityBuilder, ExchangeBuilder,
    ExchangeParty, ExchangeValue, Identifiers, Keypair, Record, Sha256Hash,
};

use crate::fixtures::GRANT_DISBURSEMENT_TYPE;

/// Generate a random keypair.
pub fn keypair() -> impl Strategy<Value = Keypair> {
    any::<[u8; 32]>().prop_map(|seed| Keypair::from_seed(&seed))
}

pub fn sha256_hash() -> impl Strategy<Value = Sha256Hash> {
    any::<[u8; 32]>().prop_map(Sha256Hash::from_bytes)
}

/// ISO 3166 country, optionally with a subdivision.
pub fn jurisdiction() -> impl Strategy<Value = String> {
    "[A-Z]{2}(-[A-Z0-9]{1,3})?".prop_map(String::from)
}

/// Printable text, including non-ASCII.
pub fn legal_name() -> impl Strategy<Value = String> {
    "\\PC{1,48}".prop_filter("legal name must not be blank", |s| !s.trim().is_empty())
}

pub fn sam_uei() -> impl Strategy<Value = String> {
    "[A-Z0-9]{12}".prop_map(String::from)
}

/// Amounts inside the exactly representable range, cent resolution.
pub fn amount() -> impl Strategy<Value = f64> {
    (-1_000_000_000_000i64..1_000_000_000_000i64).prop_map(|cents| cents as f64 / 100.0)
}

/// Seconds since the epoch through 2100, with microseconds.
pub fn timestamp() -> impl Strategy<Value = CanonicalTimestamp> {
    (0i64..4_102_444_800i64, 0u32..1_000_000u32).prop_map(|(secs, micros)| {
        let instant = chrono::DateTime::from_timestamp(secs, micros * 1_000).unwrap_or_default();
        CanonicalTimestamp::new(instant)
    })
}

/// Parameters for generating an entity.
#[derive(Debug, Clone)]
pub struct EntityParams {
    pub seed: [u8; 32],
    pub verifiable_id: String,
    pub legal_name: String,
    pub jurisdiction_iso: String,
    pub sam_uei: String,
    pub additional: Vec<(String, String)>,
    pub revision: u64,
    pub previous: Option<Sha256Hash>,
    pub confidence: Option<f64>,
    pub attested_at: CanonicalTimestamp,
}

impl Arbitrary for EntityParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            any::<[u8; 32]>(),
            "cep-entity:[a-z-]{3,12}:[A-Za-z0-9]{4,20}",
            legal_name(),
            jurisdiction(),
            sam_uei(),
            prop::collection::vec(
                ("https://example\\.org/schemes/[a-z]{1,8}", "[A-Za-z0-9-]{1,12}"),
                0..4,
            ),
            1u64..=1000u64,
            proptest::option::of(sha256_hash()),
            proptest::option::of((0u32..=100u32).prop_map(|n| f64::from(n) / 100.0)),
            timestamp(),
        )
            .prop_map(
                |(seed, id, name, jurisdiction, uei, additional, revision, previous, confidence, at)| {
                    EntityParams {
                        seed,
                        verifiable_id: id,
                        legal_name: name,
                        jurisdiction_iso: jurisdiction,
                        sam_uei: uei,
                        additional,
                        revision,
                        previous,
                        confidence,
                        attested_at: at,
                    }
                },
            )
            .boxed()
    }
}

/// Build and sign an entity from parameters.
pub fn entity_from_params(params: &EntityParams) -> Result<Record, CanonicalizationError> {
    let keypair = Keypair::from_seed(&params.seed);
    let identifiers = params.additional.iter().fold(
        Identifiers::new().with_sam_uei(&params.sam_uei),
        |ids, (uri, value)| ids.with_additional(uri, value),
    );

    let mut builder = EntityBuilder::new(
        &params.verifiable_id,
        &params.legal_name,
        &params.jurisdiction_iso,
    )
    .identifiers(identifiers)
    .revision(params.revision, params.previous)
    .attestor("cep-node:generated", "did:web:generated.example#key-1")
    .attested_at(params.attested_at);

    if let Some(score) = params.confidence {
        builder = builder.resolution_confidence(ResolutionConfidence {
            score: ConfidenceScore::new(score),
            method_uri: None,
            source_record_count: None,
        });
    }
    builder.sign(&keypair)
}

/// Parameters for generating an exchange.
#[derive(Debug, Clone)]
pub struct ExchangeParams {
    pub seed: [u8; 32],
    pub verifiable_id: String,
    pub relationship_id: String,
    pub source: String,
    pub recipient: String,
    pub amount: f64,
    pub occurred: CanonicalTimestamp,
}

impl Arbitrary for ExchangeParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            any::<[u8; 32]>(),
            "cep-exchange:[a-z0-9:-]{1,24}",
            "cep-relationship:[a-z0-9:-]{1,24}",
            "cep-entity:[a-z0-9:-]{1,24}",
            "cep-entity:[a-z0-9:-]{1,24}",
            amount(),
            timestamp(),
        )
            .prop_map(|(seed, id, rel, source, recipient, amount, occurred)| ExchangeParams {
                seed,
                verifiable_id: id,
                relationship_id: rel,
                source,
                recipient,
                amount,
                occurred,
            })
            .boxed()
    }
}

/// Build and sign an exchange from parameters.
pub fn exchange_from_params(params: &ExchangeParams) -> Result<Record, CanonicalizationError> {
    ExchangeBuilder::new(
        &params.verifiable_id,
        &params.relationship_id,
        GRANT_DISBURSEMENT_TYPE,
        ExchangeParty::new(&params.source),
        ExchangeParty::new(&params.recipient),
        ExchangeValue::usd(params.amount),
        params.occurred,
    )
    .attestor("cep-node:generated", "did:web:generated.example#key-1")
    .attested_at(params.occurred)
    .sign(&Keypair::from_seed(&params.seed))
}

/// Serialize `value` with every object's keys in a seeded random order.
///
/// Array order is kept. Scalars are written by `serde_json`.
pub fn permuted_json(value: &Value, seed: u64) -> String {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut out = String::new();
    write_permuted(value, &mut rng, &mut out);
    out
}

fn write_permuted(value: &Value, rng: &mut StdRng, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.shuffle(rng);
            out.push('{');
            for (i, (key, value)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push_str(": ");
                write_permuted(value, rng, out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_permuted(item, rng, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

/// A record's JSON with object keys shuffled under each generated seed.
pub fn shuffled_record_json(record: &Record) -> impl Strategy<Value = String> {
    let value = serde_json::to_value(record).unwrap_or(Value::Null);
    any::<u64>().prop_map(move |seed| permuted_json(&value, seed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cep_kernel_core::{canonicalize, AttestationMode};

    proptest! {
        #[test]
        fn test_entity_canonical_form_deterministic(params: EntityParams) {
            let r1 = entity_from_params(&params).unwrap();
            let r2 = entity_from_params(&params).unwrap();

            let c1 = canonicalize(&r1, AttestationMode::Include).unwrap();
            let c2 = canonicalize(&r2, AttestationMode::Include).unwrap();
            prop_assert_eq!(c1, c2);
        }

        #[test]
        fn test_permuted_json_parses_to_same_value(params: EntityParams, seed: u64) {
            let record = entity_from_params(&params).unwrap();
            let value = serde_json::to_value(&record).unwrap();
            let permuted: Value = serde_json::from_str(&permuted_json(&value, seed)).unwrap();
            prop_assert_eq!(permuted, value);
        }

        #[test]
        fn test_exchange_amount_has_two_decimals(params: ExchangeParams) {
            let record = exchange_from_params(&params).unwrap();
            let canonical = canonicalize(&record, AttestationMode::Exclude).unwrap();
            let expected = format!(r#""amount":"{:.2}""#, params.amount);
            prop_assert!(canonical.as_str().contains(&expected), "{}", canonical.as_str());
        }
    }
}
