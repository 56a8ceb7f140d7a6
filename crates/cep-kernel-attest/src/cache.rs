//! TTL cache in front of a key resolver.
//!
//! Reads are concurrent. Refreshes are serialized per URI: a waiting miss
//! re-checks the cache before calling the inner resolver, so one lookup
//! serves every concurrent miss on the same URI. Misses on different URIs
//! never wait for each other.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;

use crate::error::Result;
use crate::resolver::{KeyLookup, KeyResolver, PublicKeyMaterial};

/// Configuration for [`CachingKeyResolver`].
#[derive(Debug, Clone)]
pub struct KeyCacheConfig {
    /// How long a resolved key is served without asking the inner resolver.
    pub ttl: Duration,
    /// Maximum cached keys; the oldest entry is evicted first.
    pub capacity: usize,
}

impl Default for KeyCacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(10 * 60),
            capacity: 1024,
        }
    }
}

#[derive(Debug, Clone)]
struct CachedKey {
    material: PublicKeyMaterial,
    fetched_at: Instant,
}

/// A [`KeyResolver`] that caches resolved keys for a bounded time.
///
/// Pending lookups and failures are never cached.
pub struct CachingKeyResolver<R> {
    inner: R,
    config: KeyCacheConfig,
    entries: RwLock<HashMap<String, CachedKey>>,
    /// In-flight refreshes, one lock per URI.
    refreshing: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl<R: KeyResolver> CachingKeyResolver<R> {
    pub fn new(inner: R, config: KeyCacheConfig) -> Self {
        Self {
            inner,
            config,
            entries: RwLock::new(HashMap::new()),
            refreshing: Mutex::new(HashMap::new()),
        }
    }

    /// Number of cached keys, fresh or stale.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Drop the cached key for one URI, e.g. after a key rotation notice.
    pub async fn invalidate(&self, uri: &str) {
        self.entries.write().await.remove(uri);
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    async fn fresh(&self, uri: &str) -> Option<PublicKeyMaterial> {
        let entries = self.entries.read().await;
        entries
            .get(uri)
            .filter(|cached| cached.fetched_at.elapsed() < self.config.ttl)
            .map(|cached| cached.material.clone())
    }

    async fn refresh_lock(&self, uri: &str) -> Arc<Mutex<()>> {
        let mut refreshing = self.refreshing.lock().await;
        Arc::clone(refreshing.entry(uri.to_string()).or_default())
    }

    /// Forget the URI's refresh lock once no other miss is waiting on it.
    async fn release_lock(&self, uri: &str, lock: &Arc<Mutex<()>>) {
        let mut refreshing = self.refreshing.lock().await;
        // One reference is the map's, one is ours
        if Arc::strong_count(lock) <= 2 {
            refreshing.remove(uri);
        }
    }

    async fn refresh(&self, uri: &str) -> Result<KeyLookup> {
        // Another miss may have refreshed while we waited
        if let Some(material) = self.fresh(uri).await {
            return Ok(KeyLookup::Resolved(material));
        }

        tracing::debug!(uri = %uri, "refreshing key cache entry");
        let lookup = self.inner.resolve(uri).await?;
        if let KeyLookup::Resolved(material) = &lookup {
            self.store(uri, material.clone()).await;
        }
        Ok(lookup)
    }

    async fn store(&self, uri: &str, material: PublicKeyMaterial) {
        let mut entries = self.entries.write().await;
        if !entries.contains_key(uri) && entries.len() >= self.config.capacity {
            let oldest = entries
                .iter()
                .min_by_key(|(_, cached)| cached.fetched_at)
                .map(|(key, _)| key.clone());
            if let Some(oldest) = oldest {
                entries.remove(&oldest);
            }
        }
        if self.config.capacity > 0 {
            entries.insert(
                uri.to_string(),
                CachedKey {
                    material,
                    fetched_at: Instant::now(),
                },
            );
        }
    }
}

#[async_trait]
impl<R: KeyResolver> KeyResolver for CachingKeyResolver<R> {
    async fn resolve(&self, verification_method_uri: &str) -> Result<KeyLookup> {
        if let Some(material) = self.fresh(verification_method_uri).await {
            return Ok(KeyLookup::Resolved(material));
        }

        let lock = self.refresh_lock(verification_method_uri).await;
        let lookup = {
            let _refreshing = lock.lock().await;
            self.refresh(verification_method_uri).await
        };
        self.release_lock(verification_method_uri, &lock).await;
        lookup
    }
}
