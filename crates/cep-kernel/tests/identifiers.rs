//! Identifier resolution through the kernel: format rules, duplicate
//! detection, strict-mode vocabularies and external registry lookups.

use std::sync::Arc;

use async_trait::async_trait;

use cep_kernel::core::{Identifiers, KnownScheme};
use cep_kernel::registry::{
    IdentifierMode, IdentifierRegistry, IdentifierResolver, RegistryCheck, RegistryError,
    ResolvedIdentifier, Vocabulary, VocabularyCache, VocabularyName, VocabularySet,
    VocabularyTerm,
};
use cep_kernel::store::MemoryStore;
use cep_kernel::{Kernel, KernelConfig, RejectCode};
use cep_kernel_testkit::fixtures::TestFixture;

const SCHEMES: &str = "https://example.org/vocab/identifier-scheme#";
const CITY: &str = "cep-entity:springfield";

fn scheme_vocabulary() -> anyhow::Result<Arc<VocabularyCache>> {
    let vocabulary = Vocabulary::new(SCHEMES, "1.0.0", "Identifier schemes")
        .with_term(VocabularyTerm::new(
            format!("{SCHEMES}ocd-division"),
            "ocd-division",
            "OCD division",
        ))
        .with_term(VocabularyTerm::new(
            format!("{SCHEMES}state-charity"),
            "state-charity",
            "State charity registration",
        ));
    let set = VocabularySet::new().with(VocabularyName::IdentifierScheme, vocabulary)?;
    Ok(Arc::new(VocabularyCache::fixed(set)))
}

fn strict_kernel(fx: &TestFixture) -> anyhow::Result<Kernel<MemoryStore>> {
    let resolver = IdentifierResolver::new(IdentifierMode::Strict).with_vocabulary(scheme_vocabulary()?);
    Ok(fx
        .kernel_with(KernelConfig {
            identifier_mode: IdentifierMode::Strict,
            ..KernelConfig::default()
        })
        .with_identifier_resolver(resolver))
}

async fn submit_with(
    fx: &TestFixture,
    kernel: &Kernel<MemoryStore>,
    identifiers: Identifiers,
) -> anyhow::Result<cep_kernel::Outcome> {
    let record = fx
        .entity(CITY, "City of Springfield", "US-IL")
        .identifiers(identifiers)
        .sign(&fx.keypair)?;
    Ok(kernel.submit(record).await?)
}

#[tokio::test]
async fn test_known_scheme_format_rules() -> anyhow::Result<()> {
    let fx = TestFixture::new().await;
    let kernel = fx.kernel();

    let outcome = submit_with(&fx, &kernel, Identifiers::new().with_sam_uei("j6h4fb3n5yk7")).await?;
    assert_eq!(outcome.verdict.reject_code(), Some(RejectCode::InvalidIdentifier));
    assert!(kernel.latest(CITY).await?.is_none());

    let outcome = submit_with(&fx, &kernel, Identifiers::new().with_sam_uei("J6H4FB3N5YK7")).await?;
    assert!(outcome.is_accepted());
    assert_eq!(
        outcome.identifiers,
        vec![ResolvedIdentifier::Known {
            scheme: KnownScheme::SamUei,
            value: "J6H4FB3N5YK7".into(),
            registry_check: RegistryCheck::Skipped,
        }]
    );
    Ok(())
}

#[tokio::test]
async fn test_duplicate_additional_scheme() -> anyhow::Result<()> {
    let fx = TestFixture::new().await;
    let kernel = fx.kernel();

    let identifiers = Identifiers::new()
        .with_additional("urn:example:registry", "4411")
        .with_additional("urn:example:registry", "4411");
    let outcome = submit_with(&fx, &kernel, identifiers).await?;
    assert_eq!(outcome.verdict.reject_code(), Some(RejectCode::DuplicateIdentifier));
    Ok(())
}

#[tokio::test]
async fn test_permissive_mode_accepts_unverified() -> anyhow::Result<()> {
    let fx = TestFixture::new().await;
    let kernel = fx.kernel();

    let outcome = submit_with(
        &fx,
        &kernel,
        Identifiers::new().with_additional("urn:example:registry", "4411"),
    )
    .await?;
    assert!(outcome.is_accepted());
    assert!(outcome.identifiers.iter().all(|i| !i.is_verified()));

    let outcome = submit_with(
        &fx,
        &kernel,
        Identifiers::new().with_additional("not a uri", "4411"),
    )
    .await?;
    assert_eq!(outcome.verdict.reject_code(), Some(RejectCode::InvalidIdentifier));
    Ok(())
}

#[tokio::test]
async fn test_strict_mode_uses_scheme_vocabulary() -> anyhow::Result<()> {
    let fx = TestFixture::new().await;
    let kernel = strict_kernel(&fx)?;

    let outcome = submit_with(
        &fx,
        &kernel,
        Identifiers::new().with_additional("urn:example:registry", "4411"),
    )
    .await?;
    assert_eq!(
        outcome.verdict.reject_code(),
        Some(RejectCode::UnknownIdentifierScheme)
    );

    let outcome = submit_with(
        &fx,
        &kernel,
        Identifiers::new().with_additional(format!("{SCHEMES}ocd-division"), "Springfield"),
    )
    .await?;
    assert_eq!(outcome.verdict.reject_code(), Some(RejectCode::InvalidIdentifier));

    let outcome = submit_with(
        &fx,
        &kernel,
        Identifiers::new()
            .with_additional(
                format!("{SCHEMES}ocd-division"),
                "ocd-division/country:us/state:il/place:springfield",
            )
            .with_additional(format!("{SCHEMES}state-charity"), "IL-77810"),
    )
    .await?;
    assert!(outcome.is_accepted(), "{:?}", outcome.verdict);
    let codes: Vec<&str> = outcome
        .identifiers
        .iter()
        .filter_map(|i| match i {
            ResolvedIdentifier::Recognized { code, .. } => Some(code.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(codes, vec!["ocd-division", "state-charity"]);
    Ok(())
}

/// Registry that knows one SAM UEI and fails for LEIs.
struct SamRegistry;

#[async_trait]
impl IdentifierRegistry for SamRegistry {
    async fn exists(&self, scheme: KnownScheme, value: &str) -> cep_kernel::registry::Result<bool> {
        match scheme {
            KnownScheme::SamUei => Ok(value == "J6H4FB3N5YK7"),
            _ => Err(RegistryError::Unavailable("registry offline".into())),
        }
    }
}

#[tokio::test]
async fn test_registry_lookups() -> anyhow::Result<()> {
    let fx = TestFixture::new().await;
    let resolver =
        IdentifierResolver::new(IdentifierMode::Permissive).with_registry(Arc::new(SamRegistry));
    let kernel = fx.kernel().with_identifier_resolver(resolver);

    let outcome = submit_with(&fx, &kernel, Identifiers::new().with_sam_uei("ZQGGHJH74DW7")).await?;
    assert_eq!(outcome.verdict.reject_code(), Some(RejectCode::InvalidIdentifier));

    let identifiers = Identifiers::new()
        .with_sam_uei("J6H4FB3N5YK7")
        .with_lei("5493001KJTIIGC8Y1R12");
    let outcome = submit_with(&fx, &kernel, identifiers).await?;
    assert!(outcome.is_accepted(), "{:?}", outcome.verdict);

    let checks: Vec<RegistryCheck> = outcome
        .identifiers
        .iter()
        .filter_map(|i| match i {
            ResolvedIdentifier::Known { registry_check, .. } => Some(*registry_check),
            _ => None,
        })
        .collect();
    assert!(checks.contains(&RegistryCheck::Confirmed));
    assert!(checks.contains(&RegistryCheck::Unavailable));
    Ok(())
}
