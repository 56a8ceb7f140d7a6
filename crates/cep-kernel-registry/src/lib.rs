//! # CEP Kernel Registry
//!
//! Controlled vocabularies and identifier resolution.
//!
//! ## Overview
//!
//! Vocabularies are loaded from a caller-supplied [`VocabularySource`] into
//! an explicitly constructed [`VocabularyCache`] with a load/refresh
//! lifecycle. The [`IdentifierResolver`] consults that cache (and, when
//! configured, an [`IdentifierRegistry`]) to classify each identifier of a
//! record as known, recognized or unverified. The [`TermChecker`] holds
//! relationship types, exchange types and roles to their vocabularies.
//!
//! ## Key Types
//!
//! - [`VocabularyCache`] - TTL cache of [`VocabularySet`] snapshots
//! - [`IdentifierResolver`] - Validates identifier sets
//! - [`ResolvedIdentifier`] - Per-identifier trust level
//! - [`IdentifierMode`] - Permissive or strict handling of unknown schemes
//! - [`TermChecker`] - Validates controlled term URIs

pub mod cache;
pub mod error;
pub mod identifier;
pub mod term;
pub mod vocabulary;

pub use cache::{StaticVocabularySource, VocabularyCache, VocabularyCacheConfig, VocabularySource};
pub use error::{RegistryError, Result};
pub use identifier::{
    IdentifierMode, IdentifierRegistry, IdentifierResolver, RegistryCheck, ResolvedIdentifier,
    OCD_DIVISION_CODE,
};
pub use term::{record_terms, TermChecker, TermRef, VocabularyMode};
pub use vocabulary::{TermStatus, Vocabulary, VocabularyName, VocabularySet, VocabularyTerm};
