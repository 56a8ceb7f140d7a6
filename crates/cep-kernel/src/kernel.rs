//! The Kernel: the record admission pipeline.
//!
//! ```text
//! record ─> structure ─> identifiers ─> terms ─> attestation ─┐ (parallel across records)
//!                                                              │
//!            ┌────────── admission lock ───────────────────────┘
//!            └─> chain check ─> graph check ─> CAS append ─> graph insert
//! ```
//!
//! Every verification failure is terminal for that record only.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{Mutex, RwLock};

use cep_kernel_attest::{AttestationVerdict, AttestationVerifier, KeyResolver, SchemeRegistry};
use cep_kernel_core::{
    hash_record, validate_structure, AttestationMode, CanonicalForm, HashedRecord, Record,
    RecordKey, RejectCode, Sha256Hash, VerificationError,
};
use cep_kernel_registry::{IdentifierResolver, ResolvedIdentifier, TermChecker};
use cep_kernel_store::{AppendResult, RevisionEntry, RevisionStore, RevisionStoreExt};

use crate::chain::RevisionChainValidator;
use crate::config::KernelConfig;
use crate::error::{KernelError, Result};
use crate::provenance::ProvenanceGraph;

/// Verification verdict for one submitted record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Accepted,
    Rejected {
        code: RejectCode,
        detail: String,
    },
    Pending {
        #[serde(rename = "verificationMethodUri")]
        verification_method_uri: String,
    },
}

impl Verdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending { .. })
    }

    pub fn reject_code(&self) -> Option<RejectCode> {
        match self {
            Self::Rejected { code, .. } => Some(*code),
            _ => None,
        }
    }
}

impl From<&VerificationError> for Verdict {
    fn from(err: &VerificationError) -> Self {
        Verdict::Rejected {
            code: err.code(),
            detail: err.to_string(),
        }
    }
}

/// Everything the kernel reports about one submission.
#[derive(Debug, Clone)]
pub struct Outcome {
    /// (logical id, revision), when the input parsed.
    pub key: Option<RecordKey>,
    /// Attestation-excluded canonical form, for hash-mismatch triage.
    pub canonical: Option<CanonicalForm>,
    /// Digest of `canonical`; the signed digest.
    pub content_digest: Option<Sha256Hash>,
    /// Digest a successor revision must name as `previousRecordHash`.
    pub record_digest: Option<Sha256Hash>,
    /// Derived funding-chain tag of an accepted exchange.
    pub funding_chain_tag: Option<String>,
    /// Resolved identifiers of an accepted record.
    pub identifiers: Vec<ResolvedIdentifier>,
    pub verdict: Verdict,
}

impl Outcome {
    /// An outcome whose verdict the pipeline overwrites on rejection.
    fn for_key(key: Option<RecordKey>) -> Self {
        Self {
            key,
            canonical: None,
            content_digest: None,
            record_digest: None,
            funding_chain_tag: None,
            identifiers: Vec::new(),
            verdict: Verdict::Accepted,
        }
    }

    fn with_canonical(mut self, hashed: &HashedRecord) -> Self {
        self.canonical = Some(hashed.canonical.clone());
        self.content_digest = Some(hashed.digest);
        self
    }

    pub fn is_accepted(&self) -> bool {
        self.verdict.is_accepted()
    }

    /// Lowercase hex of the content digest.
    pub fn content_digest_hex(&self) -> Option<String> {
        self.content_digest.map(|d| d.to_hex())
    }
}

/// The main Kernel struct.
///
/// Owns the provenance graph and the admission lock. Storage, key material
/// and vocabularies belong to injected collaborators.
pub struct Kernel<S: RevisionStore> {
    store: Arc<S>,
    verifier: AttestationVerifier,
    identifiers: IdentifierResolver,
    terms: TermChecker,
    chain: RevisionChainValidator,
    graph: RwLock<ProvenanceGraph>,
    admission: Mutex<()>,
    config: KernelConfig,
}

impl<S: RevisionStore> Kernel<S> {
    /// Create a kernel over `store`, resolving keys with `resolver`.
    pub fn new(store: S, resolver: Arc<dyn KeyResolver>, config: KernelConfig) -> Self {
        let verifier = AttestationVerifier::new(resolver, config.attestation.clone())
            .with_resolution_timeout(config.key_resolution_timeout);
        Self {
            store: Arc::new(store),
            verifier,
            identifiers: IdentifierResolver::new(config.identifier_mode),
            terms: TermChecker::new(config.vocabulary_mode),
            chain: RevisionChainValidator::new(config.chain_hash_mode),
            graph: RwLock::new(ProvenanceGraph::new()),
            admission: Mutex::new(()),
            config,
        }
    }

    /// Replace the identifier resolver, e.g. to attach a vocabulary cache.
    pub fn with_identifier_resolver(mut self, identifiers: IdentifierResolver) -> Self {
        self.identifiers = identifiers;
        self
    }

    /// Replace the controlled-term checker, e.g. to attach a vocabulary cache.
    pub fn with_term_checker(mut self, terms: TermChecker) -> Self {
        self.terms = terms;
        self
    }

    /// Replace the signature schemes the verifier accepts.
    pub fn with_schemes(mut self, schemes: SchemeRegistry) -> Self {
        self.verifier = self.verifier.with_schemes(schemes);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Submission
    // ─────────────────────────────────────────────────────────────────────────

    /// Parse and submit a JSON record. Parse failures are STRUCTURAL rejections.
    pub async fn submit_json(&self, json: &str) -> Result<Outcome> {
        match Record::from_json(json) {
            Ok(record) => self.submit(record).await,
            Err(err) => {
                let err = VerificationError::Structural(format!("invalid record JSON: {err}"));
                tracing::warn!(code = %err.code(), error = %err, "record rejected");
                Ok(Outcome {
                    verdict: Verdict::from(&err),
                    ..Outcome::for_key(None)
                })
            }
        }
    }

    /// Verify a record and, if it holds, chain it and add it to the graph.
    ///
    /// Returns `Err` only for infrastructure failures.
    pub async fn submit(&self, record: Record) -> Result<Outcome> {
        let key = record.key();
        let outcome = Outcome::for_key(Some(key.clone()));

        let signed = match hash_record(&record, AttestationMode::Exclude) {
            Ok(signed) => signed,
            Err(err) => return Ok(self.reject(&key, outcome, err.into())),
        };
        let outcome = outcome.with_canonical(&signed);

        if let Err(err) = validate_structure(&record) {
            return Ok(self.reject(&key, outcome, err));
        }

        let identifiers = match self.identifiers.resolve_record(&record).await {
            Ok(identifiers) => identifiers,
            Err(err) => return Ok(self.reject(&key, outcome, err)),
        };

        if let Err(err) = self.terms.check_record(&record).await {
            return Ok(self.reject(&key, outcome, err));
        }

        match self.verifier.verify(&record).await {
            AttestationVerdict::Accepted(_) => {}
            AttestationVerdict::Rejected(err) => return Ok(self.reject(&key, outcome, err)),
            AttestationVerdict::Pending {
                verification_method_uri,
            } => {
                tracing::debug!(%key, uri = %verification_method_uri, "record pending key resolution");
                return Ok(Outcome {
                    verdict: Verdict::Pending {
                        verification_method_uri,
                    },
                    ..outcome
                });
            }
        }

        let entry = match self.chain.entry(&record, &signed) {
            Ok(entry) => entry,
            Err(err) => return Ok(self.reject(&key, outcome, err.into())),
        };
        let record_digest = entry.record_digest;

        match self.admit(record, entry).await? {
            Ok(funding_chain_tag) => {
                tracing::debug!(%key, digest = %record_digest, "record accepted");
                Ok(Outcome {
                    record_digest: Some(record_digest),
                    funding_chain_tag,
                    identifiers,
                    ..outcome
                })
            }
            Err(err) => Ok(self.reject(&key, outcome, err)),
        }
    }

    /// Submit records concurrently. Outcomes are returned in input order.
    pub async fn submit_all(self: &Arc<Self>, records: Vec<Record>) -> Vec<Result<Outcome>>
    where
        S: 'static,
    {
        let mut tasks = tokio::task::JoinSet::new();
        for (index, record) in records.into_iter().enumerate() {
            let kernel = Arc::clone(self);
            tasks.spawn(async move { (index, kernel.submit(record).await) });
        }

        let mut outcomes: Vec<Option<Result<Outcome>>> = Vec::new();
        outcomes.resize_with(tasks.len(), || None);
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, outcome)) => outcomes[index] = Some(outcome),
                Err(err) => tracing::warn!(error = %err, "submission task failed"),
            }
        }

        outcomes
            .into_iter()
            .map(|o| o.unwrap_or_else(|| Err(KernelError::Task("task did not complete".into()))))
            .collect()
    }

    /// Chain and graph checks plus commit, under the admission lock.
    ///
    /// The outer `Result` is infrastructure; the inner one is the verdict.
    async fn admit(
        &self,
        record: Record,
        entry: RevisionEntry,
    ) -> Result<std::result::Result<Option<String>, VerificationError>> {
        let _admission = self.admission.lock().await;
        let logical_id = record.logical_id().to_string();

        for attempt in 1..=self.config.max_commit_attempts.max(1) {
            let latest = self.store.latest(&logical_id).await?;
            if let Err(err) = self.chain.check(&record, latest.as_ref()) {
                return Ok(Err(err));
            }

            let check = match self
                .graph
                .read()
                .await
                .check(&record, self.config.enforce_entity_references)
            {
                Ok(check) => check,
                Err(err) => return Ok(Err(err)),
            };

            let expected = latest.as_ref().map(RevisionEntry::revision);
            match self.store.append(entry.clone(), expected).await? {
                AppendResult::Appended | AppendResult::AlreadyExists => {
                    self.graph.write().await.insert(record);
                    return Ok(Ok(check.funding_chain_tag));
                }
                AppendResult::Conflict { current } => {
                    tracing::debug!(
                        logical_id = %logical_id,
                        attempt,
                        ?expected,
                        ?current,
                        "log head moved, re-checking chain"
                    );
                }
            }
        }

        Err(KernelError::Contention {
            logical_id,
            attempts: self.config.max_commit_attempts.max(1),
        })
    }

    fn reject(&self, key: &RecordKey, outcome: Outcome, err: VerificationError) -> Outcome {
        tracing::warn!(
            logical_id = %key.logical_id,
            revision = key.revision,
            code = %err.code(),
            error = %err,
            "record rejected"
        );
        Outcome {
            verdict: Verdict::from(&err),
            ..outcome
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────────

    /// The latest accepted revision of a logical id.
    pub async fn latest(&self, logical_id: &str) -> Result<Option<RevisionEntry>> {
        Ok(self.store.latest(logical_id).await?)
    }

    /// Every accepted revision of a logical id, oldest first.
    pub async fn history(&self, logical_id: &str) -> Result<Vec<RevisionEntry>> {
        Ok(self.store.history(logical_id).await?)
    }

    /// Derived funding-chain tag of an admitted exchange.
    pub async fn funding_chain_tag(&self, exchange_id: &str) -> Option<String> {
        self.graph.read().await.funding_chain_tag(exchange_id)
    }

    /// Keys from the root of the parent chain down to `logical_id`.
    pub async fn lineage(&self, logical_id: &str) -> Vec<RecordKey> {
        self.graph
            .read()
            .await
            .lineage(logical_id)
            .unwrap_or_default()
    }

    /// Number of revisions in the provenance graph.
    pub async fn graph_len(&self) -> usize {
        self.graph.read().await.len()
    }

    /// Rebuild the provenance graph from the store's revision logs.
    pub async fn rebuild_graph(&self) -> Result<usize> {
        let _admission = self.admission.lock().await;
        let entries = self.store.all_entries().await?;

        let mut graph = ProvenanceGraph::new();
        for entry in entries {
            if entry.record.key() != entry.key {
                return Err(KernelError::Inconsistent(format!(
                    "entry {} holds record {}",
                    entry.key,
                    entry.record.key()
                )));
            }
            graph.insert(entry.record);
        }

        let count = graph.len();
        *self.graph.write().await = graph;
        tracing::debug!(revisions = count, "provenance graph rebuilt");
        Ok(count)
    }
}
