//! End-to-end admission tests: revision chains, attestation, provenance
//! and concurrent submission through the public kernel API.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use cep_kernel::attest::{KeyLookup, KeyResolutionError, KeyResolver, PublicKeyMaterial};
use cep_kernel::core::{EntityBuilder, Identifiers, ProofPurpose};
use cep_kernel::store::{AppendResult, MemoryStore, RevisionEntry, RevisionStore};
use cep_kernel::{
    hash_record, AttestationMode, ChainHashMode, Kernel, KernelConfig, KernelError, Keypair,
    Record, RecordKey, RejectCode, Verdict,
};
use cep_kernel_testkit::fixtures::{fixed_timestamp, multi_party_fixtures, TestFixture};

const FED: &str = "cep-entity:fed";
const STATE: &str = "cep-entity:state-il";
const CITY: &str = "cep-entity:springfield";

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// Admit the fed, state and city entities plus a grant between each level.
async fn seed_graph(fx: &TestFixture, kernel: &Kernel<MemoryStore>) -> anyhow::Result<()> {
    let records = vec![
        fx.entity(FED, "Federal Agency", "US").sign(&fx.keypair)?,
        fx.entity(STATE, "State of Illinois", "us-il").sign(&fx.keypair)?,
        fx.entity(CITY, "City of Springfield", "US-IL").sign(&fx.keypair)?,
        fx.grant("r-fed-state", FED, STATE).sign(&fx.keypair)?,
        fx.grant("r-state-city", STATE, CITY).sign(&fx.keypair)?,
    ];
    for record in records {
        let outcome = kernel.submit(record).await?;
        anyhow::ensure!(outcome.is_accepted(), "seed rejected: {:?}", outcome.verdict);
    }
    Ok(())
}

fn code(verdict: &Verdict) -> Option<RejectCode> {
    verdict.reject_code()
}

// ─────────────────────────────────────────────────────────────────────────────
// Revision chains
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_entity_revision_chain() -> anyhow::Result<()> {
    init_tracing();
    let fx = TestFixture::new().await;
    let kernel = fx.kernel();

    let r1 = fx.entity(CITY, "City of Springfield", "US-IL").sign(&fx.keypair)?;
    let o1 = kernel.submit(r1).await?;
    assert!(o1.is_accepted());
    let d1 = o1.record_digest.expect("accepted outcome carries a record digest");

    let r2 = fx
        .entity(CITY, "City of Springfield, Illinois", "US-IL")
        .revision(2, Some(d1))
        .sign(&fx.keypair)?;
    let o2 = kernel.submit(r2.clone()).await?;
    assert!(o2.is_accepted(), "{:?}", o2.verdict);
    let d2 = o2.record_digest.expect("accepted outcome carries a record digest");

    // A rival revision 2 after the chain moved on.
    let rival = fx
        .entity(CITY, "Springfield Township", "US-IL")
        .revision(2, Some(d1))
        .sign(&fx.keypair)?;
    let outcome = kernel.submit(rival).await?;
    assert_eq!(code(&outcome.verdict), Some(RejectCode::RevisionSequence));

    // Resubmitting an accepted revision is also out of sequence.
    let outcome = kernel.submit(r2).await?;
    assert_eq!(code(&outcome.verdict), Some(RejectCode::RevisionSequence));

    // Revision 3 naming the wrong predecessor.
    let stale = fx
        .entity(CITY, "City of Springfield", "US-IL")
        .revision(3, Some(d1))
        .sign(&fx.keypair)?;
    let outcome = kernel.submit(stale).await?;
    assert_eq!(code(&outcome.verdict), Some(RejectCode::HashMismatch));
    assert!(outcome.record_digest.is_none());
    assert!(outcome.canonical.is_some());

    // Skipping revision 3.
    let skipped = fx
        .entity(CITY, "City of Springfield", "US-IL")
        .revision(4, Some(d2))
        .sign(&fx.keypair)?;
    let outcome = kernel.submit(skipped).await?;
    assert_eq!(code(&outcome.verdict), Some(RejectCode::RevisionSequence));

    let r3 = fx
        .entity(CITY, "City of Springfield", "US-IL")
        .revision(3, Some(d2))
        .sign(&fx.keypair)?;
    assert!(kernel.submit(r3).await?.is_accepted());

    let history = kernel.history(CITY).await?;
    let revisions: Vec<u64> = history.iter().map(RevisionEntry::revision).collect();
    assert_eq!(revisions, vec![1, 2, 3]);
    assert_eq!(history[1].previous_record_hash, Some(history[0].record_digest));
    assert_eq!(history[2].previous_record_hash, Some(history[1].record_digest));
    assert_eq!(kernel.latest(CITY).await?.map(|e| e.revision()), Some(3));
    Ok(())
}

#[tokio::test]
async fn test_out_of_order_revision_is_resubmittable() -> anyhow::Result<()> {
    let fx = TestFixture::new().await;
    let kernel = fx.kernel();

    let r1 = fx.entity(CITY, "City of Springfield", "US-IL").sign(&fx.keypair)?;
    let d1 = hash_record(&r1, AttestationMode::Include)?.digest;
    let r2 = fx
        .entity(CITY, "City of Springfield", "US-IL")
        .revision(2, Some(d1))
        .sign(&fx.keypair)?;

    let early = kernel.submit(r2.clone()).await?;
    assert_eq!(code(&early.verdict), Some(RejectCode::RevisionSequence));

    assert!(kernel.submit(r1).await?.is_accepted());
    assert!(kernel.submit(r2).await?.is_accepted());
    Ok(())
}

#[tokio::test]
async fn test_revision_rules_from_structure() -> anyhow::Result<()> {
    let fx = TestFixture::new().await;
    let kernel = fx.kernel();

    let zero = fx
        .entity(CITY, "City of Springfield", "US-IL")
        .revision(0, None)
        .sign(&fx.keypair)?;
    assert_eq!(
        code(&kernel.submit(zero).await?.verdict),
        Some(RejectCode::RevisionSequence)
    );

    let first_with_parent = fx
        .entity(CITY, "City of Springfield", "US-IL")
        .revision(1, Some(cep_kernel::Sha256Hash::hash(b"nothing")))
        .sign(&fx.keypair)?;
    assert_eq!(
        code(&kernel.submit(first_with_parent).await?.verdict),
        Some(RejectCode::HashMismatch)
    );

    let orphan = fx
        .entity(CITY, "City of Springfield", "US-IL")
        .revision(2, None)
        .sign(&fx.keypair)?;
    assert_eq!(
        code(&kernel.submit(orphan).await?.verdict),
        Some(RejectCode::Structural)
    );
    assert!(kernel.latest(CITY).await?.is_none());
    Ok(())
}

#[tokio::test]
async fn test_exclude_attestation_chain_mode() -> anyhow::Result<()> {
    let fx = TestFixture::new().await;
    let kernel = fx.kernel_with(KernelConfig {
        chain_hash_mode: ChainHashMode::ExcludeAttestation,
        ..KernelConfig::default()
    });

    let r1 = fx.entity(CITY, "City of Springfield", "US-IL").sign(&fx.keypair)?;
    let included = hash_record(&r1, AttestationMode::Include)?.digest;
    let o1 = kernel.submit(r1).await?;
    assert_eq!(o1.record_digest, o1.content_digest);

    let wrong = fx
        .entity(CITY, "City of Springfield", "US-IL")
        .revision(2, Some(included))
        .sign(&fx.keypair)?;
    assert_eq!(
        code(&kernel.submit(wrong).await?.verdict),
        Some(RejectCode::HashMismatch)
    );

    let right = fx
        .entity(CITY, "City of Springfield", "US-IL")
        .revision(2, o1.content_digest)
        .sign(&fx.keypair)?;
    assert!(kernel.submit(right).await?.is_accepted());
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Attestation
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_tampered_record_rejected() -> anyhow::Result<()> {
    let fx = TestFixture::new().await;
    let kernel = fx.kernel();

    let mut record = fx.entity(CITY, "City of Springfield", "US-IL").sign(&fx.keypair)?;
    if let Record::Entity(entity) = &mut record {
        entity.legal_name.push_str(" (forged)");
    }

    let outcome = kernel.submit(record).await?;
    assert_eq!(code(&outcome.verdict), Some(RejectCode::SignatureMismatch));
    assert!(kernel.latest(CITY).await?.is_none());
    assert_eq!(kernel.graph_len().await, 0);
    Ok(())
}

#[tokio::test]
async fn test_unknown_and_pending_keys() -> anyhow::Result<()> {
    let fx = TestFixture::new().await;
    let kernel = fx.kernel();
    let late = Keypair::from_seed(&[0x07; 32]);
    let late_uri = "did:web:late.gov#key-1";

    let build = |uri: &str| {
        EntityBuilder::new(CITY, "City of Springfield", "US-IL")
            .identifiers(Identifiers::new().with_sam_uei("J6H4FB3N5YK7"))
            .attestor("cep-node:late", uri)
            .attested_at(fixed_timestamp())
            .sign(&late)
    };

    let unknown = kernel.submit(build("did:web:nobody.gov#key-1")?).await?;
    assert_eq!(code(&unknown.verdict), Some(RejectCode::KeyResolution));

    fx.resolver.mark_pending(late_uri).await;
    let pending = kernel.submit(build(late_uri)?).await?;
    assert_eq!(
        pending.verdict,
        Verdict::Pending {
            verification_method_uri: late_uri.to_string()
        }
    );
    assert!(kernel.latest(CITY).await?.is_none());

    fx.resolver
        .insert(late_uri, PublicKeyMaterial::ed25519(&late.public_key()))
        .await;
    assert!(kernel.submit(build(late_uri)?).await?.is_accepted());
    Ok(())
}

struct SlowResolver;

#[async_trait]
impl KeyResolver for SlowResolver {
    async fn resolve(&self, uri: &str) -> cep_kernel::attest::Result<KeyLookup> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Err(KeyResolutionError::NotFound(uri.to_string()))
    }
}

#[tokio::test(start_paused = true)]
async fn test_key_resolution_timeout_is_pending() -> anyhow::Result<()> {
    let fx = TestFixture::new().await;
    let kernel = Kernel::new(MemoryStore::new(), Arc::new(SlowResolver), KernelConfig::default());

    let record = fx.entity(CITY, "City of Springfield", "US-IL").sign(&fx.keypair)?;
    let outcome = kernel.submit(record).await?;
    assert!(outcome.verdict.is_pending());
    Ok(())
}

#[tokio::test]
async fn test_wrong_purpose_violates_policy() -> anyhow::Result<()> {
    let fx = TestFixture::new().await;
    let kernel = fx.kernel();

    let record = fx
        .entity(CITY, "City of Springfield", "US-IL")
        .purpose(ProofPurpose::Authentication)
        .sign(&fx.keypair)?;
    let outcome = kernel.submit(record).await?;
    assert_eq!(code(&outcome.verdict), Some(RejectCode::AttestationPolicy));
    Ok(())
}

#[tokio::test]
async fn test_multi_party_attestation() -> anyhow::Result<()> {
    let parties = multi_party_fixtures(3).await;
    let kernel = parties[0].kernel();

    for (i, party) in parties.iter().enumerate() {
        let id = format!("cep-entity:party-{i}");
        let record = party.entity(&id, &format!("Party {i}"), "US").sign(&party.keypair)?;
        assert!(kernel.submit(record).await?.is_accepted());
    }

    // Signed by party 1 under party 0's verification method.
    let forged = parties[0]
        .entity("cep-entity:forged", "Forged", "US")
        .sign(&parties[1].keypair)?;
    let outcome = kernel.submit(forged).await?;
    assert_eq!(code(&outcome.verdict), Some(RejectCode::SignatureMismatch));
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Provenance
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_dangling_relationship_then_resubmit() -> anyhow::Result<()> {
    let fx = TestFixture::new().await;
    let kernel = fx.kernel();
    for record in [
        fx.entity(FED, "Federal Agency", "US").sign(&fx.keypair)?,
        fx.entity(STATE, "State of Illinois", "US-IL").sign(&fx.keypair)?,
    ] {
        kernel.submit(record).await?;
    }

    let exchange = fx
        .disbursement("x1", "r-fed-state", FED, STATE, 10.0)
        .sign(&fx.keypair)?;
    let outcome = kernel.submit(exchange.clone()).await?;
    assert_eq!(code(&outcome.verdict), Some(RejectCode::ReferentialIntegrity));

    let grant = fx.grant("r-fed-state", FED, STATE).sign(&fx.keypair)?;
    assert!(kernel.submit(grant).await?.is_accepted());

    let outcome = kernel.submit(exchange).await?;
    assert!(outcome.is_accepted(), "{:?}", outcome.verdict);
    let canonical = outcome.canonical.expect("canonical form is reported");
    assert!(canonical.as_str().contains(r#""amount":"10.00""#));
    Ok(())
}

#[tokio::test]
async fn test_unknown_party_entity() -> anyhow::Result<()> {
    let fx = TestFixture::new().await;

    let strict = fx.kernel();
    let grant = fx.grant("r1", FED, STATE).sign(&fx.keypair)?;
    let outcome = strict.submit(grant.clone()).await?;
    assert_eq!(code(&outcome.verdict), Some(RejectCode::ReferentialIntegrity));

    let lenient = fx.kernel_with(KernelConfig {
        enforce_entity_references: false,
        ..KernelConfig::default()
    });
    assert!(lenient.submit(grant).await?.is_accepted());
    Ok(())
}

#[tokio::test]
async fn test_self_parent_is_cyclic() -> anyhow::Result<()> {
    let fx = TestFixture::new().await;
    let kernel = fx.kernel();
    seed_graph(&fx, &kernel).await?;

    let exchange = fx
        .disbursement("x1", "r-fed-state", FED, STATE, 100.0)
        .parent_exchange("x1")
        .sign(&fx.keypair)?;
    let outcome = kernel.submit(exchange).await?;
    assert_eq!(code(&outcome.verdict), Some(RejectCode::CyclicProvenance));

    let relationship = fx
        .grant("r-loop", FED, STATE)
        .parent("r-loop")
        .sign(&fx.keypair)?;
    let outcome = kernel.submit(relationship).await?;
    assert_eq!(code(&outcome.verdict), Some(RejectCode::CyclicProvenance));
    Ok(())
}

#[tokio::test]
async fn test_revision_closing_a_cycle() -> anyhow::Result<()> {
    let fx = TestFixture::new().await;
    let kernel = fx.kernel();
    seed_graph(&fx, &kernel).await?;

    let x1 = fx
        .disbursement("x1", "r-fed-state", FED, STATE, 100.0)
        .sign(&fx.keypair)?;
    let d1 = kernel.submit(x1).await?.record_digest;
    let x2 = fx
        .disbursement("x2", "r-state-city", STATE, CITY, 40.0)
        .parent_exchange("x1")
        .sign(&fx.keypair)?;
    assert!(kernel.submit(x2).await?.is_accepted());

    let x1_rev2 = fx
        .disbursement("x1", "r-fed-state", FED, STATE, 100.0)
        .parent_exchange("x2")
        .revision(2, d1)
        .sign(&fx.keypair)?;
    let outcome = kernel.submit(x1_rev2).await?;
    match &outcome.verdict {
        Verdict::Rejected { code, detail } => {
            assert_eq!(*code, RejectCode::CyclicProvenance);
            assert!(detail.contains("x1 -> x2 -> x1"), "{detail}");
        }
        other => panic!("expected a cycle rejection, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn test_funding_chain_derivation() -> anyhow::Result<()> {
    init_tracing();
    let fx = TestFixture::new().await;
    let kernel = fx.kernel();
    seed_graph(&fx, &kernel).await?;

    let x1 = fx
        .disbursement("x1", "r-fed-state", FED, STATE, 1_000.0)
        .sign(&fx.keypair)?;
    let o1 = kernel.submit(x1).await?;
    assert_eq!(o1.funding_chain_tag.as_deref(), Some("US"));

    let x2 = fx
        .disbursement("x2", "r-state-city", STATE, CITY, 250.0)
        .parent_exchange("x1")
        .funding_chain_tag("US>US-IL")
        .ultimate_source(FED)
        .sign(&fx.keypair)?;
    let o2 = kernel.submit(x2).await?;
    assert!(o2.is_accepted(), "{:?}", o2.verdict);
    assert_eq!(o2.funding_chain_tag.as_deref(), Some("US>US-IL"));
    assert_eq!(kernel.funding_chain_tag("x2").await.as_deref(), Some("US>US-IL"));
    assert_eq!(
        kernel.lineage("x2").await,
        vec![RecordKey::new("x1", 1), RecordKey::new("x2", 1)]
    );

    let mislabeled = fx
        .disbursement("x3", "r-state-city", STATE, CITY, 5.0)
        .parent_exchange("x1")
        .funding_chain_tag("US")
        .sign(&fx.keypair)?;
    let outcome = kernel.submit(mislabeled).await?;
    assert_eq!(code(&outcome.verdict), Some(RejectCode::FundingChainTagMismatch));

    let wrong_source = fx
        .disbursement("x4", "r-state-city", STATE, CITY, 5.0)
        .parent_exchange("x1")
        .ultimate_source(STATE)
        .sign(&fx.keypair)?;
    let outcome = kernel.submit(wrong_source).await?;
    assert_eq!(code(&outcome.verdict), Some(RejectCode::Structural));
    Ok(())
}

#[tokio::test]
async fn test_rebuild_graph_from_store() -> anyhow::Result<()> {
    let fx = TestFixture::new().await;
    let kernel = fx.kernel();
    seed_graph(&fx, &kernel).await?;
    let x1 = fx
        .disbursement("x1", "r-fed-state", FED, STATE, 1_000.0)
        .sign(&fx.keypair)?;
    kernel.submit(x1).await?;

    let before = kernel.graph_len().await;
    assert_eq!(before, 6);
    assert_eq!(kernel.rebuild_graph().await?, before);
    assert_eq!(kernel.graph_len().await, before);
    assert_eq!(kernel.funding_chain_tag("x1").await.as_deref(), Some("US"));
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Input handling and verdicts
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_submit_json() -> anyhow::Result<()> {
    let fx = TestFixture::new().await;
    let kernel = fx.kernel();
    seed_graph(&fx, &kernel).await?;

    let garbage = kernel.submit_json("{\"recordType\":\"entity\"").await?;
    assert_eq!(code(&garbage.verdict), Some(RejectCode::Structural));
    assert!(garbage.key.is_none());
    assert!(garbage.canonical.is_none());

    // A numeric-string amount canonicalizes the same as the number it names.
    let exchange = fx
        .disbursement("x1", "r-fed-state", FED, STATE, 10.0)
        .sign(&fx.keypair)?;
    let mut value = serde_json::to_value(&exchange)?;
    value["value"]["amount"] = serde_json::Value::String("10".into());
    let outcome = kernel.submit_json(&value.to_string()).await?;
    assert!(outcome.is_accepted(), "{:?}", outcome.verdict);
    assert_eq!(outcome.key, Some(RecordKey::new("x1", 1)));
    Ok(())
}

#[test]
fn test_verdict_json_shape() -> anyhow::Result<()> {
    let rejected = Verdict::Rejected {
        code: RejectCode::RevisionSequence,
        detail: "expected revision 3, got 2".into(),
    };
    assert_eq!(
        serde_json::to_value(&rejected)?,
        serde_json::json!({
            "status": "REJECTED",
            "code": "REVISION_SEQUENCE",
            "detail": "expected revision 3, got 2"
        })
    );

    let pending = Verdict::Pending {
        verification_method_uri: "did:web:late.gov#key-1".into(),
    };
    assert_eq!(
        serde_json::to_value(&pending)?,
        serde_json::json!({
            "status": "PENDING",
            "verificationMethodUri": "did:web:late.gov#key-1"
        })
    );
    assert_eq!(
        serde_json::to_value(&Verdict::Accepted)?,
        serde_json::json!({ "status": "ACCEPTED" })
    );
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Concurrency
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_first_revisions() -> anyhow::Result<()> {
    let fx = TestFixture::new().await;
    let kernel = Arc::new(fx.kernel());

    let mut records = Vec::new();
    for i in 0..8 {
        records.push(
            fx.entity(CITY, &format!("Springfield claim {i}"), "US-IL")
                .sign(&fx.keypair)?,
        );
    }
    let outcomes = kernel.submit_all(records).await;

    let mut accepted = 0;
    for outcome in outcomes {
        let outcome = outcome?;
        match outcome.verdict.reject_code() {
            None => accepted += 1,
            Some(code) => assert_eq!(code, RejectCode::RevisionSequence),
        }
    }
    assert_eq!(accepted, 1);
    assert_eq!(kernel.history(CITY).await?.len(), 1);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_batch_preserves_input_order() -> anyhow::Result<()> {
    let fx = TestFixture::new().await;
    let kernel = Arc::new(fx.kernel());

    let mut records = Vec::new();
    for i in 0..16 {
        let id = format!("cep-entity:batch-{i}");
        records.push(fx.entity(&id, &format!("Entity {i}"), "US").sign(&fx.keypair)?);
    }
    let outcomes = kernel.submit_all(records).await;

    for (i, outcome) in outcomes.into_iter().enumerate() {
        let outcome = outcome?;
        assert!(outcome.is_accepted());
        assert_eq!(outcome.key, Some(RecordKey::new(format!("cep-entity:batch-{i}"), 1)));
    }
    assert_eq!(kernel.graph_len().await, 16);
    Ok(())
}

/// A store whose log head always moves before the kernel can append.
#[derive(Default)]
struct ContestedStore {
    inner: MemoryStore,
}

#[async_trait]
impl RevisionStore for ContestedStore {
    async fn latest(&self, logical_id: &str) -> cep_kernel::store::Result<Option<RevisionEntry>> {
        self.inner.latest(logical_id).await
    }

    async fn get(&self, key: &RecordKey) -> cep_kernel::store::Result<Option<RevisionEntry>> {
        self.inner.get(key).await
    }

    async fn history(&self, logical_id: &str) -> cep_kernel::store::Result<Vec<RevisionEntry>> {
        self.inner.history(logical_id).await
    }

    async fn logical_ids(&self) -> cep_kernel::store::Result<Vec<String>> {
        self.inner.logical_ids().await
    }

    async fn append(
        &self,
        _entry: RevisionEntry,
        _expected_latest: Option<u64>,
    ) -> cep_kernel::store::Result<AppendResult> {
        Ok(AppendResult::Conflict { current: Some(99) })
    }
}

#[tokio::test]
async fn test_commit_contention_is_an_error() -> anyhow::Result<()> {
    let fx = TestFixture::new().await;
    let kernel = Kernel::new(
        ContestedStore::default(),
        fx.resolver.clone(),
        KernelConfig::default(),
    );

    let record = fx.entity(CITY, "City of Springfield", "US-IL").sign(&fx.keypair)?;
    match kernel.submit(record).await {
        Err(KernelError::Contention { logical_id, attempts }) => {
            assert_eq!(logical_id, CITY);
            assert_eq!(attempts, 3);
        }
        other => panic!("expected contention, got {other:?}"),
    }
    assert_eq!(kernel.graph_len().await, 0);
    Ok(())
}
