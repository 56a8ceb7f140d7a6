//! The process-wide vocabulary cache.
//!
//! Constructed explicitly, loaded once with [`VocabularyCache::load`], then
//! refreshed when its snapshot is older than the configured TTL. Readers get
//! an `Arc` snapshot and never block a refresh.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;

use crate::error::{RegistryError, Result};
use crate::vocabulary::{Vocabulary, VocabularyName, VocabularySet};

/// Supplies vocabulary documents (files, HTTP, a database).
#[async_trait]
pub trait VocabularySource: Send + Sync {
    async fn fetch(&self) -> Result<Vec<(VocabularyName, Vocabulary)>>;
}

/// A source over documents held in memory.
#[derive(Debug, Default)]
pub struct StaticVocabularySource {
    vocabularies: RwLock<Vec<(VocabularyName, Vocabulary)>>,
}

impl StaticVocabularySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: VocabularyName, vocabulary: Vocabulary) -> Self {
        self.vocabularies.get_mut().push((name, vocabulary));
        self
    }

    /// Replace the vocabulary published under `name`.
    pub async fn publish(&self, name: VocabularyName, vocabulary: Vocabulary) {
        let mut vocabularies = self.vocabularies.write().await;
        vocabularies.retain(|(n, _)| *n != name);
        vocabularies.push((name, vocabulary));
    }
}

#[async_trait]
impl VocabularySource for StaticVocabularySource {
    async fn fetch(&self) -> Result<Vec<(VocabularyName, Vocabulary)>> {
        Ok(self.vocabularies.read().await.clone())
    }
}

/// Configuration for [`VocabularyCache`].
#[derive(Debug, Clone)]
pub struct VocabularyCacheConfig {
    /// Age after which the next read triggers a refresh.
    pub ttl: Duration,
}

impl Default for VocabularyCacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(60 * 60),
        }
    }
}

#[derive(Debug, Clone)]
struct Loaded {
    set: Arc<VocabularySet>,
    loaded_at: Instant,
}

/// TTL cache of every vocabulary, keyed by [`VocabularyName`].
pub struct VocabularyCache {
    source: Arc<dyn VocabularySource>,
    config: VocabularyCacheConfig,
    state: RwLock<Option<Loaded>>,
    refresh: Mutex<()>,
}

impl VocabularyCache {
    pub fn new(source: Arc<dyn VocabularySource>, config: VocabularyCacheConfig) -> Self {
        Self {
            source,
            config,
            state: RwLock::new(None),
            refresh: Mutex::new(()),
        }
    }

    /// A cache pre-populated with `set` that never refreshes from a source.
    pub fn fixed(set: VocabularySet) -> Self {
        Self {
            source: Arc::new(StaticVocabularySource::new()),
            config: VocabularyCacheConfig { ttl: Duration::MAX },
            state: RwLock::new(Some(Loaded {
                set: Arc::new(set),
                loaded_at: Instant::now(),
            })),
            refresh: Mutex::new(()),
        }
    }

    /// Initial load. Fails if the source fails or a vocabulary is invalid.
    pub async fn load(&self) -> Result<Arc<VocabularySet>> {
        let _writer = self.refresh.lock().await;
        self.reload().await
    }

    /// Force a refresh regardless of age.
    pub async fn refresh(&self) -> Result<Arc<VocabularySet>> {
        self.load().await
    }

    pub async fn is_loaded(&self) -> bool {
        self.state.read().await.is_some()
    }

    /// The current snapshot, refreshing it first if stale.
    ///
    /// A failed refresh keeps serving the previous snapshot.
    pub async fn snapshot(&self) -> Result<Arc<VocabularySet>> {
        if let Some(set) = self.fresh().await {
            return Ok(set);
        }

        let _writer = self.refresh.lock().await;
        if let Some(set) = self.fresh().await {
            return Ok(set);
        }

        let stale = self.state.read().await.as_ref().map(|l| Arc::clone(&l.set));
        match (self.reload().await, stale) {
            (Ok(set), _) => Ok(set),
            (Err(err), Some(stale)) => {
                tracing::warn!(error = %err, "vocabulary refresh failed, serving stale snapshot");
                Ok(stale)
            }
            (Err(RegistryError::Source(_)), None) => Err(RegistryError::NotLoaded),
            (Err(err), None) => Err(err),
        }
    }

    /// Whether `term_uri` belongs to vocabulary `name`.
    pub async fn contains(&self, name: VocabularyName, term_uri: &str) -> Result<bool> {
        Ok(self.snapshot().await?.contains(name, term_uri))
    }

    async fn fresh(&self) -> Option<Arc<VocabularySet>> {
        self.state
            .read()
            .await
            .as_ref()
            .filter(|l| l.loaded_at.elapsed() < self.config.ttl)
            .map(|l| Arc::clone(&l.set))
    }

    async fn reload(&self) -> Result<Arc<VocabularySet>> {
        let mut set = VocabularySet::new();
        for (name, vocabulary) in self.source.fetch().await? {
            set.insert(name, vocabulary)?;
        }
        tracing::debug!(vocabularies = set.len(), "vocabulary cache refreshed");

        let set = Arc::new(set);
        *self.state.write().await = Some(Loaded {
            set: Arc::clone(&set),
            loaded_at: Instant::now(),
        });
        Ok(set)
    }
}

impl std::fmt::Debug for VocabularyCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VocabularyCache")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
