//! The provenance graph.
//!
//! Entities are nodes, relationships link entities, exchanges hang off
//! relationships. Parent pointers (`parentRelationshipId`,
//! `parentExchangeId`) form a forest. Records live in an index keyed by
//! (logical id, revision); walks follow the latest admitted revision of each
//! logical id and carry a visited set.

use std::collections::{HashMap, HashSet};

use cep_kernel_core::{ExchangeRecord, Record, RecordKey, RecordType, VerificationError};

/// Separator between funding-chain segments.
pub const FUNDING_CHAIN_SEPARATOR: &str = ">";

/// What admission of a record would add to the graph.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProvenanceCheck {
    /// Derived funding-chain tag, for exchanges whose lineage resolves.
    pub funding_chain_tag: Option<String>,
    /// Resolved parent, as its latest revision key.
    pub parent: Option<RecordKey>,
}

/// Index of admitted records plus the parent edges between them.
#[derive(Debug, Default)]
pub struct ProvenanceGraph {
    records: HashMap<RecordKey, Record>,
    latest: HashMap<String, u64>,
    parents: HashMap<RecordKey, RecordKey>,
}

struct ParentPointer<'a> {
    field: &'static str,
    target: &'a str,
    record_type: RecordType,
}

fn parent_pointer(record: &Record) -> Option<ParentPointer<'_>> {
    match record {
        Record::Entity(_) => None,
        Record::Relationship(r) => r.parent_relationship_id.as_deref().map(|target| ParentPointer {
            field: "parentRelationshipId",
            target,
            record_type: RecordType::Relationship,
        }),
        Record::Exchange(e) => e.parent_exchange_id().map(|target| ParentPointer {
            field: "parentExchangeId",
            target,
            record_type: RecordType::Exchange,
        }),
    }
}

impl ProvenanceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of indexed revisions.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
        self.latest.clear();
        self.parents.clear();
    }

    pub fn get(&self, key: &RecordKey) -> Option<&Record> {
        self.records.get(key)
    }

    /// The latest admitted revision of a logical id.
    pub fn latest(&self, logical_id: &str) -> Option<&Record> {
        let revision = *self.latest.get(logical_id)?;
        self.records.get(&RecordKey::new(logical_id, revision))
    }

    /// The parent edge recorded when `key` was admitted.
    pub fn parent_of(&self, key: &RecordKey) -> Option<&RecordKey> {
        self.parents.get(key)
    }

    /// Index an admitted record. No checks are performed.
    pub fn insert(&mut self, record: Record) -> RecordKey {
        let key = record.key();
        if let Some(parent) = parent_pointer(&record)
            .and_then(|p| self.latest.get(p.target).map(|rev| RecordKey::new(p.target, *rev)))
        {
            self.parents.insert(key.clone(), parent);
        }

        let head = self.latest.entry(key.logical_id.clone()).or_insert(key.revision);
        if key.revision > *head {
            *head = key.revision;
        }
        self.records.insert(key.clone(), record);
        key
    }

    /// Check that `record` can join the graph.
    ///
    /// With `enforce_entities`, every referenced entity id must resolve to an
    /// admitted entity.
    pub fn check(
        &self,
        record: &Record,
        enforce_entities: bool,
    ) -> Result<ProvenanceCheck, VerificationError> {
        let logical_id = record.logical_id();

        match record {
            Record::Entity(_) => return Ok(ProvenanceCheck::default()),
            Record::Relationship(r) if enforce_entities => {
                for id in r.party_entity_ids() {
                    self.require(logical_id, "entityId", id, RecordType::Entity)?;
                }
            }
            Record::Relationship(_) => {}
            Record::Exchange(e) => {
                self.require(
                    logical_id,
                    "relationshipId",
                    &e.relationship_id,
                    RecordType::Relationship,
                )?;
                if enforce_entities {
                    for id in e.party_entity_ids() {
                        self.require(logical_id, "entityId", id, RecordType::Entity)?;
                    }
                }
            }
        }

        let ancestors = self.ancestors(record)?;
        let parent = ancestors.first().map(|r| r.key());

        let funding_chain_tag = match record {
            Record::Exchange(e) => self.check_funding_chain(e, &ancestors)?,
            _ => None,
        };

        Ok(ProvenanceCheck {
            funding_chain_tag,
            parent,
        })
    }

    /// Funding-chain tag of an admitted exchange, derived from the graph.
    pub fn funding_chain_tag(&self, exchange_id: &str) -> Option<String> {
        let record = self.latest(exchange_id)?;
        let Record::Exchange(exchange) = record else {
            return None;
        };
        let ancestors = self.ancestors(record).ok()?;
        self.derive_tag(exchange, &ancestors).ok()
    }

    /// Latest keys from the root of the parent chain down to `logical_id`.
    pub fn lineage(&self, logical_id: &str) -> Result<Vec<RecordKey>, VerificationError> {
        let Some(record) = self.latest(logical_id) else {
            return Ok(Vec::new());
        };
        let mut keys: Vec<_> = self.ancestors(record)?.iter().map(|r| r.key()).collect();
        keys.reverse();
        keys.push(record.key());
        Ok(keys)
    }

    fn require(
        &self,
        owner: &str,
        field: &'static str,
        target: &str,
        record_type: RecordType,
    ) -> Result<&Record, VerificationError> {
        self.latest(target)
            .filter(|r| r.record_type() == record_type)
            .ok_or_else(|| VerificationError::ReferentialIntegrity {
                logical_id: owner.to_string(),
                field,
                missing: target.to_string(),
            })
    }

    /// Parent chain of `record`, nearest first.
    fn ancestors<'a>(&'a self, record: &'a Record) -> Result<Vec<&'a Record>, VerificationError> {
        let origin = record.logical_id();
        let mut path = vec![origin.to_string()];
        let mut visited = HashSet::from([origin]);
        let mut ancestors = Vec::new();
        let mut current = record;

        while let Some(pointer) = parent_pointer(current) {
            path.push(pointer.target.to_string());
            if !visited.insert(pointer.target) {
                return Err(VerificationError::CyclicProvenance {
                    logical_id: origin.to_string(),
                    path,
                });
            }
            let parent = self.require(
                current.logical_id(),
                pointer.field,
                pointer.target,
                pointer.record_type,
            )?;
            ancestors.push(parent);
            current = parent;
        }

        Ok(ancestors)
    }

    fn check_funding_chain(
        &self,
        exchange: &ExchangeRecord,
        ancestors: &[&Record],
    ) -> Result<Option<String>, VerificationError> {
        let root_source = match ancestors.last() {
            Some(Record::Exchange(root)) => root.source_entity.entity_id.as_str(),
            _ => exchange.source_entity.entity_id.as_str(),
        };

        let ultimate = exchange
            .provenance_chain
            .as_ref()
            .and_then(|p| p.ultimate_source_entity_id.as_deref());
        if let Some(ultimate) = ultimate {
            if ultimate != root_source {
                return Err(VerificationError::Structural(format!(
                    "ultimateSourceEntityId {ultimate} is not the root source {root_source}"
                )));
            }
        }

        let derived = self.derive_tag(exchange, ancestors);
        match (exchange.funding_chain_tag(), derived) {
            (None, Ok(tag)) => Ok(Some(tag)),
            (None, Err(_)) => Ok(None),
            (Some(declared), Ok(tag)) if declared == tag => Ok(Some(tag)),
            (Some(declared), Ok(tag)) => Err(VerificationError::FundingChainTagMismatch {
                declared: declared.to_string(),
                derived: tag,
            }),
            (Some(_), Err(missing)) => Err(VerificationError::ReferentialIntegrity {
                logical_id: exchange.verifiable_id.clone(),
                field: "sourceEntity",
                missing,
            }),
        }
    }

    /// Segments from root to `exchange`; `Err` names an unresolved source entity.
    fn derive_tag(&self, exchange: &ExchangeRecord, ancestors: &[&Record]) -> Result<String, String> {
        let chain = ancestors
            .iter()
            .rev()
            .filter_map(|r| match r {
                Record::Exchange(e) => Some(e),
                _ => None,
            })
            .chain(std::iter::once(exchange));

        let mut segments = Vec::new();
        for link in chain {
            let source = link.source_entity.entity_id.as_str();
            match self.latest(source) {
                Some(Record::Entity(entity)) => segments.push(entity.jurisdiction_iso.to_uppercase()),
                _ => return Err(source.to_string()),
            }
        }
        Ok(segments.join(FUNDING_CHAIN_SEPARATOR))
    }
}
