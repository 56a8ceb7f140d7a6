//! # CEP Kernel Core
//!
//! Pure primitives for the CEP kernel: civic records, canonicalization and
//! content hashing.
//!
//! This crate contains no I/O, no storage, no networking. It is pure
//! computation over the record model.
//!
//! ## Key Types
//!
//! - [`Record`] - An entity, relationship or exchange revision
//! - [`CanonicalForm`] - The deterministic byte string of a record
//! - [`Sha256Hash`] - Content digest of a canonical form
//! - [`VerificationError`] - Why a record was rejected
//!
//! ## Canonicalization
//!
//! Records are encoded as key-sorted compact JSON with fixed-format
//! timestamps and amounts. See the [`canonical`] module.

pub mod amount;
pub mod attestation;
pub mod canonical;
pub mod crypto;
pub mod entity;
pub mod error;
pub mod exchange;
pub mod hash;
pub mod identifiers;
pub mod record;
pub mod relationship;
pub mod snfei;
pub mod timestamp;
pub mod validation;
pub mod version;

pub use amount::{Amount, ConfidenceScore, ParticipationShare};
pub use attestation::{Attestation, ProofAlgorithm, ProofPurpose};
pub use canonical::{canonicalize, AttestationMode, CanonicalForm, CanonicalValue, Canonicalize};
pub use crypto::{decode_proof_value, Ed25519PublicKey, Ed25519Signature, Keypair, Sha256Hash};
pub use entity::{EntityBuilder, EntityRecord, EntityStatusCode};
pub use error::{CanonicalizationError, CryptoError, RejectCode, VerificationError};
pub use exchange::{ExchangeBuilder, ExchangeParty, ExchangeRecord, ExchangeValue};
pub use hash::{hash_canonical, hash_record, HashedRecord};
pub use identifiers::{AdditionalScheme, IdentifierEntry, Identifiers, KnownScheme};
pub use record::{Record, RecordKey, RecordType, SourceReference};
pub use relationship::{MultilateralMember, Party, RelationshipBuilder, RelationshipRecord};
pub use snfei::{CanonicalInput, EntityAttributes, IdentifierTier, Snfei, SnfeiResult};
pub use timestamp::{CanonicalTimestamp, CivicDate};
pub use validation::validate_structure;
pub use version::SCHEMA_VERSION;
