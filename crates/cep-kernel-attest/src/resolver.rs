//! Key resolution: locating public key material for a verification method.
//!
//! Transport (DID documents, JWKS endpoints, files) is owned by the caller.
//! The kernel only sees the [`KeyResolver`] trait, which may suspend.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use cep_kernel_core::{Ed25519PublicKey, ProofAlgorithm};

use crate::error::{KeyResolutionError, Result};

/// Public key bytes tagged with the algorithm they belong to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKeyMaterial {
    pub algorithm: ProofAlgorithm,
    pub key: Vec<u8>,
}

impl PublicKeyMaterial {
    pub fn new(algorithm: ProofAlgorithm, key: impl Into<Vec<u8>>) -> Self {
        Self {
            algorithm,
            key: key.into(),
        }
    }

    pub fn ed25519(key: &Ed25519PublicKey) -> Self {
        Self::new(ProofAlgorithm::Ed25519, key.as_bytes().to_vec())
    }
}

/// Outcome of a lookup that did not fail outright.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyLookup {
    /// The key is available.
    Resolved(PublicKeyMaterial),
    /// The key is not available yet; verification should be retried later.
    Pending,
}

/// Resolves `verificationMethodUri` to key material.
///
/// Implementations own their timeout and retry policy. Returning
/// [`KeyLookup::Pending`] yields a PENDING verdict instead of a rejection.
#[async_trait]
pub trait KeyResolver: Send + Sync {
    async fn resolve(&self, verification_method_uri: &str) -> Result<KeyLookup>;
}

#[async_trait]
impl<R: KeyResolver + ?Sized> KeyResolver for Arc<R> {
    async fn resolve(&self, verification_method_uri: &str) -> Result<KeyLookup> {
        (**self).resolve(verification_method_uri).await
    }
}

/// A resolver over keys pinned in memory.
///
/// URIs marked pending report [`KeyLookup::Pending`]; unknown URIs fail
/// with [`KeyResolutionError::NotFound`].
#[derive(Debug, Default)]
pub struct StaticKeyResolver {
    keys: RwLock<HashMap<String, PublicKeyMaterial>>,
    pending: RwLock<Vec<String>>,
}

impl StaticKeyResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin key material at a URI.
    pub async fn insert(&self, uri: impl Into<String>, material: PublicKeyMaterial) {
        let uri = uri.into();
        self.pending.write().await.retain(|p| p != &uri);
        self.keys.write().await.insert(uri, material);
    }

    /// Remove the key at a URI.
    pub async fn remove(&self, uri: &str) {
        self.keys.write().await.remove(uri);
    }

    /// Report a URI as not yet resolvable.
    pub async fn mark_pending(&self, uri: impl Into<String>) {
        self.pending.write().await.push(uri.into());
    }
}

#[async_trait]
impl KeyResolver for StaticKeyResolver {
    async fn resolve(&self, verification_method_uri: &str) -> Result<KeyLookup> {
        if let Some(material) = self.keys.read().await.get(verification_method_uri) {
            return Ok(KeyLookup::Resolved(material.clone()));
        }
        if self
            .pending
            .read()
            .await
            .iter()
            .any(|p| p == verification_method_uri)
        {
            return Ok(KeyLookup::Pending);
        }
        Err(KeyResolutionError::NotFound(verification_method_uri.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cep_kernel_core::Keypair;

    #[tokio::test]
    async fn test_static_resolver() {
        let resolver = StaticKeyResolver::new();
        let kp = Keypair::from_seed(&[0x42; 32]);
        resolver
            .insert("did:web:a#k", PublicKeyMaterial::ed25519(&kp.public_key()))
            .await;
        resolver.mark_pending("did:web:b#k").await;

        assert!(matches!(
            resolver.resolve("did:web:a#k").await,
            Ok(KeyLookup::Resolved(_))
        ));
        assert_eq!(resolver.resolve("did:web:b#k").await, Ok(KeyLookup::Pending));
        assert_eq!(
            resolver.resolve("did:web:c#k").await,
            Err(KeyResolutionError::NotFound("did:web:c#k".into()))
        );
    }

    #[tokio::test]
    async fn test_insert_clears_pending() {
        let resolver = StaticKeyResolver::new();
        resolver.mark_pending("did:web:b#k").await;
        let kp = Keypair::from_seed(&[1; 32]);
        resolver
            .insert("did:web:b#k", PublicKeyMaterial::ed25519(&kp.public_key()))
            .await;
        assert!(matches!(
            resolver.resolve("did:web:b#k").await,
            Ok(KeyLookup::Resolved(_))
        ));
    }
}
