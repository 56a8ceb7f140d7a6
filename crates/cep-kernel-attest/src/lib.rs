//! # CEP Kernel Attest
//!
//! Attestation verification for CEP records.
//!
//! ## Overview
//!
//! Every record carries an attestation: a signature over the SHA-256 digest
//! of its attestation-excluded canonical form, plus the URI of the key that
//! made it. The [`AttestationVerifier`] resolves that key, recomputes the
//! digest, checks the signature and applies the [`AttestationPolicy`].
//!
//! ## Verification Flow
//!
//! ```text
//! resolve key ──> canonicalize ──> verify signature ──> policy check ──> Accepted
//!      │                                  │                   │
//!      ├── Pending                        └── Rejected        └── Rejected
//!      └── Rejected (KEY_RESOLUTION)
//! ```
//!
//! ## Key Resolution
//!
//! Keys come from a caller-supplied [`KeyResolver`]. Wrap it in a
//! [`CachingKeyResolver`] to bound repeated lookups by TTL.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use cep_kernel_attest::{
//!     AttestationPolicy, AttestationVerifier, CachingKeyResolver, KeyCacheConfig,
//!     StaticKeyResolver,
//! };
//!
//! let resolver = CachingKeyResolver::new(StaticKeyResolver::new(), KeyCacheConfig::default());
//! let verifier = AttestationVerifier::new(Arc::new(resolver), AttestationPolicy::default());
//! ```

pub mod cache;
pub mod error;
pub mod policy;
pub mod resolver;
pub mod scheme;
pub mod verifier;

pub use cache::{CachingKeyResolver, KeyCacheConfig};
pub use error::{KeyResolutionError, Result, SchemeError};
pub use policy::AttestationPolicy;
pub use resolver::{KeyLookup, KeyResolver, PublicKeyMaterial, StaticKeyResolver};
pub use scheme::{EcdsaP256Scheme, Ed25519Scheme, RsaPssScheme, SchemeRegistry, SignatureScheme};
pub use verifier::{AttestationVerdict, AttestationVerifier};
