//! Controlled-term checks through the kernel: relationship types, exchange
//! types and party roles against their vocabularies.

use std::sync::Arc;

use cep_kernel::core::{
    ExchangeBuilder, ExchangeParty, ExchangeValue, Party, RelationshipBuilder,
};
use cep_kernel::registry::{TermChecker, VocabularyCache, VocabularyMode};
use cep_kernel::store::MemoryStore;
use cep_kernel::{Kernel, KernelConfig, RejectCode};
use cep_kernel_testkit::fixtures::{
    fixed_timestamp, fixture_vocabularies, TestFixture, GRANTEE_ROLE, GRANTOR_ROLE,
    GRANT_DISBURSEMENT_TYPE, PAYEE_ROLE, PAYER_ROLE, VOCAB_BASE,
};

const FED: &str = "cep-entity:fed";
const CITY: &str = "cep-entity:springfield";

fn kernel(fx: &TestFixture, mode: VocabularyMode) -> Kernel<MemoryStore> {
    let vocabulary = Arc::new(VocabularyCache::fixed(fixture_vocabularies()));
    fx.kernel_with(KernelConfig {
        vocabulary_mode: mode,
        ..KernelConfig::default()
    })
    .with_term_checker(TermChecker::new(mode).with_vocabulary(vocabulary))
}

fn relationship(fx: &TestFixture, type_uri: &str, party_a: Party, party_b: Party) -> RelationshipBuilder {
    RelationshipBuilder::new("r1", type_uri, "US", fixed_timestamp())
        .bilateral(party_a, party_b)
        .attestor(&fx.attestor_id, &fx.verification_method_uri)
        .attested_at(fixed_timestamp())
}

fn payment(fx: &TestFixture, recipient_role: &str) -> ExchangeBuilder {
    ExchangeBuilder::new(
        "x1",
        "r1",
        GRANT_DISBURSEMENT_TYPE,
        ExchangeParty::new(FED).with_role(PAYER_ROLE),
        ExchangeParty::new(CITY).with_role(recipient_role),
        ExchangeValue::usd(1000.0),
        fixed_timestamp(),
    )
    .attestor(&fx.attestor_id, &fx.verification_method_uri)
    .attested_at(fixed_timestamp())
}

async fn seed_entities(fx: &TestFixture, kernel: &Kernel<MemoryStore>) -> anyhow::Result<()> {
    for (id, name, jurisdiction) in [(FED, "Federal Agency", "US"), (CITY, "City of Springfield", "US-IL")] {
        let outcome = kernel.submit(fx.entity(id, name, jurisdiction).sign(&fx.keypair)?).await?;
        anyhow::ensure!(outcome.is_accepted(), "seed rejected: {:?}", outcome.verdict);
    }
    Ok(())
}

#[tokio::test]
async fn test_strict_accepts_fixture_terms() -> anyhow::Result<()> {
    let fx = TestFixture::new().await;
    let kernel = kernel(&fx, VocabularyMode::Strict);
    seed_entities(&fx, &kernel).await?;

    let grant = fx.grant("r1", FED, CITY).sign(&fx.keypair)?;
    assert!(kernel.submit(grant).await?.is_accepted());

    let disbursement = payment(&fx, PAYEE_ROLE).sign(&fx.keypair)?;
    let outcome = kernel.submit(disbursement).await?;
    assert!(outcome.is_accepted(), "{:?}", outcome.verdict);
    Ok(())
}

#[tokio::test]
async fn test_strict_rejects_unknown_relationship_type() -> anyhow::Result<()> {
    let fx = TestFixture::new().await;
    let kernel = kernel(&fx, VocabularyMode::Strict);
    seed_entities(&fx, &kernel).await?;

    let lease = format!("{VOCAB_BASE}relationship-type#lease");
    let record = relationship(
        &fx,
        &lease,
        Party::new(FED, GRANTOR_ROLE),
        Party::new(CITY, GRANTEE_ROLE),
    )
    .sign(&fx.keypair)?;
    let outcome = kernel.submit(record).await?;
    assert_eq!(outcome.verdict.reject_code(), Some(RejectCode::Structural));
    assert!(format!("{:?}", outcome.verdict).contains(&lease));
    assert!(kernel.latest("r1").await?.is_none());
    Ok(())
}

#[tokio::test]
async fn test_strict_rejects_role_from_other_vocabulary() -> anyhow::Result<()> {
    let fx = TestFixture::new().await;
    let kernel = kernel(&fx, VocabularyMode::Strict);
    seed_entities(&fx, &kernel).await?;

    // An exchange role on a relationship party
    let record = fx
        .grant("r1", FED, CITY)
        .bilateral(Party::new(FED, PAYER_ROLE), Party::new(CITY, GRANTEE_ROLE))
        .sign(&fx.keypair)?;
    let outcome = kernel.submit(record).await?;
    assert_eq!(outcome.verdict.reject_code(), Some(RejectCode::Structural));

    // A party role on an exchange recipient
    assert!(kernel.submit(fx.grant("r1", FED, CITY).sign(&fx.keypair)?).await?.is_accepted());
    let record = payment(&fx, GRANTEE_ROLE).sign(&fx.keypair)?;
    let outcome = kernel.submit(record).await?;
    assert_eq!(outcome.verdict.reject_code(), Some(RejectCode::Structural));
    Ok(())
}

#[tokio::test]
async fn test_permissive_accepts_unknown_terms() -> anyhow::Result<()> {
    let fx = TestFixture::new().await;
    let kernel = kernel(&fx, VocabularyMode::Permissive);
    seed_entities(&fx, &kernel).await?;

    let record = relationship(
        &fx,
        "urn:example:relationship:lease",
        Party::new(FED, GRANTOR_ROLE),
        Party::new(CITY, GRANTEE_ROLE),
    )
    .sign(&fx.keypair)?;
    assert!(kernel.submit(record).await?.is_accepted());
    Ok(())
}

#[tokio::test]
async fn test_default_kernel_skips_term_checks() -> anyhow::Result<()> {
    let fx = TestFixture::new().await;
    let kernel = fx.kernel();
    seed_entities(&fx, &kernel).await?;

    let record = relationship(
        &fx,
        "urn:example:relationship:lease",
        Party::new(FED, "urn:role:lessor"),
        Party::new(CITY, "urn:role:lessee"),
    )
    .sign(&fx.keypair)?;
    assert!(kernel.submit(record).await?.is_accepted());
    Ok(())
}
