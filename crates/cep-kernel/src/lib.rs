//! # CEP Kernel
//!
//! Deterministic hashing, chaining and verification of civic records
//! (entities, relationships and exchanges).
//!
//! ## Overview
//!
//! The kernel admits one revision at a time. Each submission is canonicalized,
//! hashed, checked for identifier validity and attestation, then chained
//! onto its logical id's revision log and linked into the provenance graph.
//! The result is an [`Outcome`] carrying the canonical string, its digest and
//! a [`Verdict`]: accepted, rejected with a reason code, or pending key
//! resolution.
//!
//! ## Key Concepts
//!
//! - **Revision chain**: revisions of one logical id are numbered from 1 and
//!   each names its predecessor's digest. Nothing is overwritten.
//! - **Provenance graph**: relationships link entities, exchanges bind to
//!   relationships, parent pointers form a forest with derived funding-chain
//!   tags.
//! - **Isolation**: a rejection affects only the record that caused it.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use cep_kernel::{Kernel, KernelConfig};
//! use cep_kernel::attest::StaticKeyResolver;
//! use cep_kernel::store::MemoryStore;
//!
//! async fn example(json: &str) {
//!     let resolver = Arc::new(StaticKeyResolver::new());
//!     let kernel = Kernel::new(MemoryStore::new(), resolver, KernelConfig::default());
//!
//!     let outcome = kernel.submit_json(json).await.unwrap();
//!     println!("{:?} {:?}", outcome.verdict, outcome.content_digest_hex());
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `cep_kernel::core` - Record model, canonicalization and hashing
//! - `cep_kernel::store` - Revision-log storage abstraction
//! - `cep_kernel::attest` - Attestation verification and key resolution
//! - `cep_kernel::registry` - Vocabularies and identifier resolution

pub mod chain;
pub mod config;
pub mod error;
pub mod kernel;
pub mod provenance;

// Re-export component crates
pub use cep_kernel_attest as attest;
pub use cep_kernel_core as core;
pub use cep_kernel_registry as registry;
pub use cep_kernel_store as store;

// Re-export main types for convenience
pub use chain::RevisionChainValidator;
pub use config::{ChainHashMode, KernelConfig};
pub use error::{KernelError, Result};
pub use kernel::{Kernel, Outcome, Verdict};
pub use provenance::{ProvenanceCheck, ProvenanceGraph, FUNDING_CHAIN_SEPARATOR};

// Re-export commonly used core types
pub use cep_kernel_core::{
    canonicalize, hash_record, AttestationMode, CanonicalForm, Keypair, Record, RecordKey,
    RecordType, RejectCode, Sha256Hash, VerificationError,
};
pub use cep_kernel_registry::{IdentifierMode, VocabularyMode};
