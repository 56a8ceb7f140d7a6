//! Identifier resolution.
//!
//! Every identifier on a record resolves to a [`ResolvedIdentifier`] that
//! states how far it can be trusted. Known schemes are format-checked and,
//! when a registry is wired in, checked for existence. Additional schemes
//! are matched against the `identifier-scheme` vocabulary; unrecognized ones
//! pass as [`ResolvedIdentifier::Unverified`] unless the mode is strict.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;

use cep_kernel_core::{IdentifierEntry, Identifiers, KnownScheme, Record, VerificationError};

use crate::cache::VocabularyCache;
use crate::error::Result;
use crate::vocabulary::VocabularyName;

/// Vocabulary code of the Open Civic Data division identifier scheme.
pub const OCD_DIVISION_CODE: &str = "ocd-division";

/// How unrecognized additional schemes are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdentifierMode {
    /// Accept well-formed unknown schemes as unverified.
    #[default]
    Permissive,
    /// Reject unknown schemes with `UNKNOWN_IDENTIFIER_SCHEME`.
    Strict,
}

/// Outcome of an external registry lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryCheck {
    /// The registry knows the identifier.
    Confirmed,
    /// No registry is configured.
    Skipped,
    /// The registry could not be reached; the format check still holds.
    Unavailable,
}

/// Existence checks against authoritative identifier registries.
#[async_trait]
pub trait IdentifierRegistry: Send + Sync {
    /// `Ok(false)` means the registry answered and does not know the value.
    async fn exists(&self, scheme: KnownScheme, value: &str) -> Result<bool>;
}

/// One identifier after resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedIdentifier {
    /// An enumerated scheme with a normalized, format-checked value.
    Known {
        scheme: KnownScheme,
        value: String,
        registry_check: RegistryCheck,
    },
    /// An additional scheme listed in the identifier-scheme vocabulary.
    Recognized { scheme_uri: String, code: String, value: String },
    /// A structurally valid additional scheme nobody vouches for.
    Unverified { scheme_uri: String, value: String },
}

impl ResolvedIdentifier {
    pub fn is_verified(&self) -> bool {
        !matches!(self, Self::Unverified { .. })
    }
}

/// Validates the identifier sets of incoming records.
#[derive(Clone, Default)]
pub struct IdentifierResolver {
    mode: IdentifierMode,
    vocabulary: Option<Arc<VocabularyCache>>,
    registry: Option<Arc<dyn IdentifierRegistry>>,
}

impl IdentifierResolver {
    pub fn new(mode: IdentifierMode) -> Self {
        Self {
            mode,
            vocabulary: None,
            registry: None,
        }
    }

    pub fn with_vocabulary(mut self, vocabulary: Arc<VocabularyCache>) -> Self {
        self.vocabulary = Some(vocabulary);
        self
    }

    pub fn with_registry(mut self, registry: Arc<dyn IdentifierRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn mode(&self) -> IdentifierMode {
        self.mode
    }

    /// Resolve the identifiers carried by `record`, if any.
    pub async fn resolve_record(
        &self,
        record: &Record,
    ) -> std::result::Result<Vec<ResolvedIdentifier>, VerificationError> {
        match record.identifiers() {
            Some(identifiers) => self.resolve(identifiers).await,
            None => Ok(Vec::new()),
        }
    }

    /// Resolve every entry of an identifier set.
    pub async fn resolve(
        &self,
        identifiers: &Identifiers,
    ) -> std::result::Result<Vec<ResolvedIdentifier>, VerificationError> {
        let mut seen = HashSet::new();
        let mut resolved = Vec::new();

        for entry in identifiers.entries() {
            let identifier = match entry {
                IdentifierEntry::Known { scheme, value } => self.resolve_known(scheme, value).await?,
                IdentifierEntry::Additional { scheme_uri, value } => {
                    self.resolve_additional(scheme_uri, value).await?
                }
            };

            let (scheme, value) = match &identifier {
                ResolvedIdentifier::Known { scheme, value, .. } => (scheme.field().to_string(), value),
                ResolvedIdentifier::Recognized { scheme_uri, value, .. }
                | ResolvedIdentifier::Unverified { scheme_uri, value } => (scheme_uri.clone(), value),
            };
            if !seen.insert((scheme.clone(), value.clone())) {
                return Err(VerificationError::DuplicateIdentifier {
                    scheme,
                    value: value.clone(),
                });
            }
            resolved.push(identifier);
        }

        Ok(resolved)
    }

    async fn resolve_known(
        &self,
        scheme: KnownScheme,
        value: &str,
    ) -> std::result::Result<ResolvedIdentifier, VerificationError> {
        let value = scheme
            .normalize(value)
            .ok_or_else(|| VerificationError::InvalidIdentifier {
                scheme: scheme.field().to_string(),
                value: value.to_string(),
            })?;

        let registry_check = match &self.registry {
            None => RegistryCheck::Skipped,
            Some(registry) => match registry.exists(scheme, &value).await {
                Ok(true) => RegistryCheck::Confirmed,
                Ok(false) => {
                    return Err(VerificationError::InvalidIdentifier {
                        scheme: scheme.field().to_string(),
                        value,
                    })
                }
                Err(err) => {
                    tracing::warn!(%scheme, %value, error = %err, "identifier registry unavailable");
                    RegistryCheck::Unavailable
                }
            },
        };

        Ok(ResolvedIdentifier::Known {
            scheme,
            value,
            registry_check,
        })
    }

    async fn resolve_additional(
        &self,
        scheme_uri: &str,
        value: &str,
    ) -> std::result::Result<ResolvedIdentifier, VerificationError> {
        let invalid = || VerificationError::InvalidIdentifier {
            scheme: scheme_uri.to_string(),
            value: value.to_string(),
        };

        if !is_well_formed_uri(scheme_uri) || !is_well_formed_value(value) {
            return Err(invalid());
        }

        if let Some(code) = self.recognized_code(scheme_uri).await {
            if code == OCD_DIVISION_CODE && !is_ocd_division_id(value) {
                return Err(invalid());
            }
            return Ok(ResolvedIdentifier::Recognized {
                scheme_uri: scheme_uri.to_string(),
                code,
                value: value.to_string(),
            });
        }

        match self.mode {
            IdentifierMode::Permissive => Ok(ResolvedIdentifier::Unverified {
                scheme_uri: scheme_uri.to_string(),
                value: value.to_string(),
            }),
            IdentifierMode::Strict => Err(VerificationError::UnknownIdentifierScheme(
                scheme_uri.to_string(),
            )),
        }
    }

    async fn recognized_code(&self, scheme_uri: &str) -> Option<String> {
        let vocabulary = self.vocabulary.as_ref()?;
        match vocabulary.snapshot().await {
            Ok(set) => set
                .term(VocabularyName::IdentifierScheme, scheme_uri)
                .map(|term| term.code.clone()),
            Err(err) => {
                tracing::warn!(error = %err, "identifier-scheme vocabulary unavailable");
                None
            }
        }
    }
}

impl std::fmt::Debug for IdentifierResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentifierResolver")
            .field("mode", &self.mode)
            .field("vocabulary", &self.vocabulary.is_some())
            .field("registry", &self.registry.is_some())
            .finish()
    }
}

/// `scheme:rest` with an RFC 3986 scheme and no whitespace.
fn is_well_formed_uri(uri: &str) -> bool {
    let Some((scheme, rest)) = uri.split_once(':') else {
        return false;
    };
    let mut chars = scheme.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        && !rest.is_empty()
        && !uri.chars().any(|c| c.is_whitespace() || c.is_control())
}

fn is_well_formed_value(value: &str) -> bool {
    !value.trim().is_empty() && !value.chars().any(char::is_control)
}

/// `ocd-division/country:us/state:il/place:springfield`
fn is_ocd_division_id(value: &str) -> bool {
    let Some(path) = value.strip_prefix("ocd-division/") else {
        return false;
    };
    let mut segments = path.split('/').peekable();
    segments.peek().is_some()
        && segments.all(|segment| {
            segment.split_once(':').is_some_and(|(kind, id)| {
                !kind.is_empty()
                    && !id.is_empty()
                    && kind.chars().all(|c| c.is_ascii_lowercase() || c == '_')
                    && id
                        .chars()
                        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '_' | '-' | '.' | '~'))
            })
        })
}
