//! Test fixtures and helpers.
//!
//! Common setup code for integration tests: attestors with pinned keys,
//! kernels over a memory store, and record builders pre-filled with the
//! attestation header.

use std::sync::Arc;

use cep_kernel::registry::{Vocabulary, VocabularyName, VocabularySet, VocabularyTerm};
use cep_kernel::{Kernel, KernelConfig};
use cep_kernel_attest::{PublicKeyMaterial, StaticKeyResolver};
use cep_kernel_core::{
    CanonicalTimestamp, Ed25519PublicKey, EntityBuilder, ExchangeBuilder, ExchangeParty,
    ExchangeValue, Identifiers, Keypair, Party, RelationshipBuilder, Snfei,
};
use cep_kernel_store::MemoryStore;

/// Vocabulary base used by fixture type and role URIs.
pub const VOCAB_BASE: &str = "https://example.org/vocab/";
pub const GRANT_RELATIONSHIP_TYPE: &str = "https://example.org/vocab/relationship-type#grant";
pub const GRANT_DISBURSEMENT_TYPE: &str = "https://example.org/vocab/exchange-type#grant-disbursement";
pub const GRANTOR_ROLE: &str = "https://example.org/vocab/party-role#grantor";
pub const GRANTEE_ROLE: &str = "https://example.org/vocab/party-role#grantee";
pub const PAYER_ROLE: &str = "https://example.org/vocab/exchange-role#payer";
pub const PAYEE_ROLE: &str = "https://example.org/vocab/exchange-role#payee";

/// Attestation time shared by every fixture record.
pub const FIXED_TIMESTAMP: &str = "2025-09-15T14:03:22.500000Z";

/// The fixed attestation time.
pub fn fixed_timestamp() -> CanonicalTimestamp {
    CanonicalTimestamp::parse(FIXED_TIMESTAMP).expect("fixed timestamp is canonical")
}

/// Type and role vocabularies holding every fixture term URI.
pub fn fixture_vocabularies() -> VocabularySet {
    let vocabularies = [
        (VocabularyName::RelationshipType, &[("grant", "Grant")][..]),
        (VocabularyName::ExchangeType, &[("grant-disbursement", "Grant disbursement")][..]),
        (VocabularyName::PartyRole, &[("grantor", "Grantor"), ("grantee", "Grantee")][..]),
        (VocabularyName::ExchangeRole, &[("payer", "Payer"), ("payee", "Payee")][..]),
    ];

    let mut set = VocabularySet::new();
    for (name, terms) in vocabularies {
        let base = format!("{VOCAB_BASE}{name}#");
        let vocabulary = terms.iter().fold(
            Vocabulary::new(base.clone(), "1.0.0", name.as_str()),
            |v, (code, label)| v.with_term(VocabularyTerm::new(format!("{base}{code}"), *code, *label)),
        );
        set.insert(name, vocabulary).expect("fixture vocabulary is valid");
    }
    set
}

/// An attestor: a keypair registered with a shared key resolver.
pub struct TestFixture {
    pub keypair: Keypair,
    pub attestor_id: String,
    pub verification_method_uri: String,
    pub resolver: Arc<StaticKeyResolver>,
}

impl TestFixture {
    /// The default attestor, seed `[0x42; 32]`, registered with a fresh resolver.
    pub async fn new() -> Self {
        Self::join(Arc::new(StaticKeyResolver::new()), [0x42; 32], "springfield").await
    }

    /// An attestor named `name` with a deterministic key, registered with `resolver`.
    pub async fn join(resolver: Arc<StaticKeyResolver>, seed: [u8; 32], name: &str) -> Self {
        let keypair = Keypair::from_seed(&seed);
        let verification_method_uri = format!("did:web:{name}.gov#key-1");
        resolver
            .insert(
                verification_method_uri.clone(),
                PublicKeyMaterial::ed25519(&keypair.public_key()),
            )
            .await;
        Self {
            keypair,
            attestor_id: format!("cep-node:{name}"),
            verification_method_uri,
            resolver,
        }
    }

    pub fn public_key(&self) -> Ed25519PublicKey {
        self.keypair.public_key()
    }

    /// A kernel over a memory store with the default configuration.
    pub fn kernel(&self) -> Kernel<MemoryStore> {
        self.kernel_with(KernelConfig::default())
    }

    pub fn kernel_with(&self, config: KernelConfig) -> Kernel<MemoryStore> {
        Kernel::new(MemoryStore::new(), self.resolver.clone(), config)
    }

    /// An entity builder carrying an SNFEI derived from its name and country.
    pub fn entity(&self, id: &str, legal_name: &str, jurisdiction_iso: &str) -> EntityBuilder {
        let country = jurisdiction_iso.split('-').next().unwrap_or(jurisdiction_iso);
        let snfei = Snfei::generate_simple(legal_name, country, None);
        EntityBuilder::new(id, legal_name, jurisdiction_iso)
            .identifiers(Identifiers::new().with_snfei(snfei))
            .attestor(&self.attestor_id, &self.verification_method_uri)
            .attested_at(fixed_timestamp())
    }

    /// A bilateral grant from `grantor` to `grantee`.
    pub fn grant(&self, id: &str, grantor: &str, grantee: &str) -> RelationshipBuilder {
        RelationshipBuilder::new(id, GRANT_RELATIONSHIP_TYPE, "US", fixed_timestamp())
            .bilateral(Party::new(grantor, GRANTOR_ROLE), Party::new(grantee, GRANTEE_ROLE))
            .attestor(&self.attestor_id, &self.verification_method_uri)
            .attested_at(fixed_timestamp())
    }

    /// A USD disbursement under `relationship_id`.
    pub fn disbursement(
        &self,
        id: &str,
        relationship_id: &str,
        source: &str,
        recipient: &str,
        amount: f64,
    ) -> ExchangeBuilder {
        ExchangeBuilder::new(
            id,
            relationship_id,
            GRANT_DISBURSEMENT_TYPE,
            ExchangeParty::new(source).with_role(PAYER_ROLE),
            ExchangeParty::new(recipient),
            ExchangeValue::usd(amount),
            fixed_timestamp(),
        )
        .attestor(&self.attestor_id, &self.verification_method_uri)
        .attested_at(fixed_timestamp())
    }
}

/// Attestors sharing one resolver, for multi-party tests.
pub async fn multi_party_fixtures(count: usize) -> Vec<TestFixture> {
    let resolver = Arc::new(StaticKeyResolver::new());
    let mut fixtures = Vec::with_capacity(count);
    for i in 0..count {
        let mut seed = [0u8; 32];
        seed[0] = i as u8;
        fixtures.push(TestFixture::join(resolver.clone(), seed, &format!("party-{i}")).await);
    }
    fixtures
}
