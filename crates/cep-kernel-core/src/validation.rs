//! Structural checks a record must pass before it is canonicalized.
//!
//! These are the shape rules the core can decide from the record alone.
//! Chain linkage, signatures and graph references are checked elsewhere.

use crate::error::VerificationError;
use crate::exchange::ExchangeRecord;
use crate::record::Record;
use crate::relationship::RelationshipRecord;
use crate::version;

/// Tolerance on the sum of multilateral participation shares.
pub const SHARE_SUM_TOLERANCE: f64 = 0.0001;

/// Validate a record's structure.
///
/// This performs:
/// - Schema version check
/// - Logical id and revision number checks
/// - Revision 1 / previous hash pairing
/// - Type-specific rules (identifiers, party form, shares, currency)
pub fn validate_structure(record: &Record) -> Result<(), VerificationError> {
    // 1. Schema version
    if !version::is_supported(record.schema_version()) {
        return Err(VerificationError::Structural(format!(
            "unsupported schema version {:?}",
            record.schema_version()
        )));
    }

    // 2. Logical id
    if record.logical_id().trim().is_empty() {
        return Err(VerificationError::Structural("verifiableId is empty".into()));
    }

    // 3. Revision numbers start at 1
    let revision = record.revision_number();
    if revision == 0 {
        return Err(VerificationError::RevisionSequence {
            logical_id: record.logical_id().to_string(),
            expected: 1,
            got: 0,
        });
    }

    // 4. Revision 1 has no predecessor; later revisions must name one
    match (revision, record.previous_record_hash()) {
        (1, Some(hash)) => {
            return Err(VerificationError::HashMismatch {
                logical_id: record.logical_id().to_string(),
                expected: None,
                got: Some(*hash),
            });
        }
        (n, None) if n > 1 => {
            return Err(VerificationError::Structural(
                "revision > 1 requires previousRecordHash".into(),
            ));
        }
        _ => {}
    }

    if record.attestation().verification_method_uri.trim().is_empty() {
        return Err(VerificationError::Structural(
            "attestation.verificationMethodUri is empty".into(),
        ));
    }

    // 5. Type-specific rules
    match record {
        Record::Entity(entity) => {
            if !entity.identifiers.has_any() {
                return Err(VerificationError::Structural(
                    "entity must carry at least one identifier".into(),
                ));
            }
            if entity.legal_name.trim().is_empty() {
                return Err(VerificationError::Structural("legalName is empty".into()));
            }
            Ok(())
        }
        Record::Relationship(relationship) => validate_relationship(relationship),
        Record::Exchange(exchange) => validate_exchange(exchange),
    }
}

fn validate_relationship(relationship: &RelationshipRecord) -> Result<(), VerificationError> {
    let members = relationship
        .multilateral_members
        .as_deref()
        .filter(|m| !m.is_empty());

    match (&relationship.bilateral_parties, members) {
        (Some(_), None) => {}
        (None, Some(members)) => {
            let shares: Vec<_> = members.iter().filter_map(|m| m.participation_share).collect();
            if !shares.is_empty() {
                if shares.len() != members.len() {
                    return Err(VerificationError::Structural(
                        "participationShare must be set on every member or none".into(),
                    ));
                }
                if shares.iter().any(|s| !(0.0..=1.0).contains(&s.value())) {
                    return Err(VerificationError::Structural(
                        "participationShare must lie in [0, 1]".into(),
                    ));
                }
                let total: f64 = shares.iter().map(|s| s.value()).sum();
                if (total - 1.0).abs() > SHARE_SUM_TOLERANCE {
                    return Err(VerificationError::Structural(format!(
                        "participation shares sum to {total}, expected 1.0"
                    )));
                }
            }
        }
        (Some(_), Some(_)) => {
            return Err(VerificationError::Structural(
                "relationship declares both bilateralParties and multilateralMembers".into(),
            ));
        }
        (None, None) => {
            return Err(VerificationError::Structural(
                "relationship declares no parties".into(),
            ));
        }
    }

    if let Some(terms) = &relationship.financial_terms {
        validate_currency(&terms.currency_code)?;
    }
    Ok(())
}

fn validate_exchange(exchange: &ExchangeRecord) -> Result<(), VerificationError> {
    if exchange.relationship_id.trim().is_empty() {
        return Err(VerificationError::Structural("relationshipId is empty".into()));
    }
    validate_currency(&exchange.value.currency_code)
}

fn validate_currency(code: &str) -> Result<(), VerificationError> {
    if code.len() == 3 && code.bytes().all(|b| b.is_ascii_uppercase()) {
        Ok(())
    } else {
        Err(VerificationError::Structural(format!(
            "currencyCode {code:?} is not an ISO 4217 code"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amount::ParticipationShare;
    use crate::crypto::Sha256Hash;
    use crate::entity::EntityBuilder;
    use crate::error::RejectCode;
    use crate::exchange::{ExchangeBuilder, ExchangeParty, ExchangeValue};
    use crate::identifiers::Identifiers;
    use crate::relationship::{MultilateralMember, Party, RelationshipBuilder};
    use crate::timestamp::CanonicalTimestamp;

    fn at() -> CanonicalTimestamp {
        "2025-01-01T00:00:00Z".parse().unwrap()
    }

    fn entity() -> EntityBuilder {
        EntityBuilder::new("e1", "Springfield", "US-IL")
            .identifiers(Identifiers::new().with_sam_uei("J6H4FB3N5YK7"))
            .attestor("node", "did:web:x#k")
    }

    fn member(id: &str, share: Option<f64>) -> MultilateralMember {
        MultilateralMember {
            entity_id: id.into(),
            role_uri: "urn:role:member".into(),
            participation_share: share.map(ParticipationShare),
        }
    }

    #[test]
    fn test_valid_entity() {
        assert!(validate_structure(&entity().build().into()).is_ok());
    }

    #[test]
    fn test_entity_without_identifiers() {
        let r: Record = entity().identifiers(Identifiers::new()).build().into();
        assert_eq!(validate_structure(&r).unwrap_err().code(), RejectCode::Structural);
    }

    #[test]
    fn test_revision_one_with_previous_hash() {
        let r: Record = entity()
            .revision(1, Some(Sha256Hash::hash(b"x")))
            .build()
            .into();
        assert_eq!(validate_structure(&r).unwrap_err().code(), RejectCode::HashMismatch);
    }

    #[test]
    fn test_revision_zero() {
        let r: Record = entity().revision(0, None).build().into();
        assert_eq!(
            validate_structure(&r).unwrap_err().code(),
            RejectCode::RevisionSequence
        );
    }

    #[test]
    fn test_later_revision_requires_previous_hash() {
        let r: Record = entity().revision(2, None).build().into();
        assert_eq!(validate_structure(&r).unwrap_err().code(), RejectCode::Structural);
    }

    #[test]
    fn test_unsupported_schema_version() {
        let mut e = entity().build();
        e.schema_version = "2.0.0".into();
        assert!(validate_structure(&e.into()).is_err());
    }

    #[test]
    fn test_party_forms() {
        let base = || RelationshipBuilder::new("r1", "urn:t", "US", at()).attestor("n", "did:web:x#k");
        let party = |id: &str| Party {
            entity_id: id.into(),
            role_uri: "urn:role".into(),
        };

        let none: Record = base().build().into();
        assert!(validate_structure(&none).is_err());

        let both: Record = base()
            .bilateral(party("a"), party("b"))
            .member(member("c", None))
            .build()
            .into();
        assert!(validate_structure(&both).is_err());

        let bilateral: Record = base().bilateral(party("a"), party("b")).build().into();
        assert!(validate_structure(&bilateral).is_ok());
    }

    #[test]
    fn test_share_sum() {
        let base = || RelationshipBuilder::new("r1", "urn:t", "US", at()).attestor("n", "did:web:x#k");

        let ok: Record = base()
            .member(member("a", Some(0.6)))
            .member(member("b", Some(0.4)))
            .build()
            .into();
        assert!(validate_structure(&ok).is_ok());

        let near: Record = base()
            .member(member("a", Some(0.33335)))
            .member(member("b", Some(0.33335)))
            .member(member("c", Some(0.3333)))
            .build()
            .into();
        assert!(validate_structure(&near).is_ok());

        let short: Record = base()
            .member(member("a", Some(0.5)))
            .member(member("b", Some(0.4)))
            .build()
            .into();
        assert!(validate_structure(&short).is_err());

        let partial: Record = base()
            .member(member("a", Some(1.0)))
            .member(member("b", None))
            .build()
            .into();
        assert!(validate_structure(&partial).is_err());

        let unshared: Record = base()
            .member(member("a", None))
            .member(member("b", None))
            .build()
            .into();
        assert!(validate_structure(&unshared).is_ok());
    }

    #[test]
    fn test_exchange_currency() {
        let mut value = ExchangeValue::usd(10.0);
        value.currency_code = "usd".into();
        let r: Record = ExchangeBuilder::new(
            "x1",
            "r1",
            "urn:exchange-type:payment",
            ExchangeParty::new("a"),
            ExchangeParty::new("b"),
            value,
            at(),
        )
        .attestor("n", "did:web:x#k")
        .build()
        .into();
        assert_eq!(validate_structure(&r).unwrap_err().code(), RejectCode::Structural);
    }
}
