//! Minimal catalog: relations, their attributes, storage blocks, and
//! partition schemes.
//!
//! The enforcer only ever touches the catalog to attach a freshly created
//! block to its relation (and partition). Everything else here exists so that
//! predicates can be written against names and resolved to ids.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::expr::ColumnRef;
use crate::id::{AttributeId, BlockId, PartitionId, RelationId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub id: AttributeId,
    pub name: String,
}

/// Physical subdivision of a relation's blocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionScheme {
    partitions: Vec<Vec<BlockId>>,
}

impl PartitionScheme {
    pub fn new(num_partitions: usize) -> Self {
        Self {
            partitions: vec![Vec::new(); num_partitions],
        }
    }

    pub fn num_partitions(&self) -> usize {
        self.partitions.len()
    }

    pub fn add_block_to_partition(&mut self, block: BlockId, partition: PartitionId) -> Result<()> {
        let n = self.partitions.len();
        let slot = usize::try_from(partition.get())
            .ok()
            .and_then(|p| self.partitions.get_mut(p))
            .ok_or_else(|| {
                Error::Catalog(format!(
                    "partition {partition} out of range (scheme has {n} partitions)"
                ))
            })?;
        if !slot.contains(&block) {
            slot.push(block);
        }
        Ok(())
    }

    pub fn blocks_in_partition(&self, partition: PartitionId) -> &[BlockId] {
        usize::try_from(partition.get())
            .ok()
            .and_then(|p| self.partitions.get(p))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    pub id: RelationId,
    pub name: String,
    pub attributes: Vec<Attribute>,
    blocks: Vec<BlockId>,
    partition_scheme: Option<PartitionScheme>,
}

impl Relation {
    pub fn new(id: RelationId, name: impl Into<String>, attribute_names: &[&str]) -> Self {
        let attributes = attribute_names
            .iter()
            .enumerate()
            .map(|(i, n)| Attribute {
                id: AttributeId::new(i as u32),
                name: (*n).to_string(),
            })
            .collect();
        Self {
            id,
            name: name.into(),
            attributes,
            blocks: Vec::new(),
            partition_scheme: None,
        }
    }

    pub fn with_partitions(mut self, num_partitions: usize) -> Self {
        self.partition_scheme = Some(PartitionScheme::new(num_partitions));
        self
    }

    pub fn attribute_by_name(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn attribute(&self, id: AttributeId) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.id == id)
    }

    /// Attach a storage block. Adding the same block twice is a no-op.
    pub fn add_block(&mut self, block: BlockId) {
        if !self.blocks.contains(&block) {
            self.blocks.push(block);
        }
    }

    pub fn blocks(&self) -> &[BlockId] {
        &self.blocks
    }

    pub fn partition_scheme(&self) -> Option<&PartitionScheme> {
        self.partition_scheme.as_ref()
    }

    pub fn partition_scheme_mut(&mut self) -> Option<&mut PartitionScheme> {
        self.partition_scheme.as_mut()
    }
}

/// Catalog access needed by predicate parsing and block registration.
pub trait Catalog {
    fn relation_by_id(&self, id: RelationId) -> Option<&Relation>;

    fn relation_by_id_mut(&mut self, id: RelationId) -> Option<&mut Relation>;

    fn relation_by_name(&self, name: &str) -> Option<&Relation>;

    /// Resolve `relation.attribute` into ids.
    fn resolve_column(&self, qualified: &str) -> Result<ColumnRef> {
        let (rel_name, attr_name) = qualified.trim().split_once('.').ok_or_else(|| {
            Error::Catalog(format!(
                "column '{qualified}' must be qualified as relation.attribute"
            ))
        })?;
        let relation = self
            .relation_by_name(rel_name)
            .ok_or_else(|| Error::Catalog(format!("unknown relation '{rel_name}'")))?;
        let attribute = relation.attribute_by_name(attr_name).ok_or_else(|| {
            Error::Catalog(format!(
                "unknown attribute '{attr_name}' in relation '{rel_name}'"
            ))
        })?;
        Ok(ColumnRef::new(relation.id, attribute.id))
    }

    /// Render a column reference back into `relation.attribute` form.
    fn column_name(&self, column: ColumnRef) -> String {
        match self.relation_by_id(column.relation) {
            Some(rel) => match rel.attribute(column.attribute) {
                Some(attr) => format!("{}.{}", rel.name, attr.name),
                None => format!("{}.#{}", rel.name, column.attribute),
            },
            None => format!("#{}.#{}", column.relation, column.attribute),
        }
    }
}

/// In-memory catalog database keyed by relation id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogDatabase {
    pub name: String,
    relations: BTreeMap<RelationId, Relation>,
}

impl CatalogDatabase {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            relations: BTreeMap::new(),
        }
    }

    /// Register a relation, assigning the next free id.
    pub fn add_relation(
        &mut self,
        name: &str,
        attribute_names: &[&str],
        num_partitions: Option<usize>,
    ) -> Result<RelationId> {
        if self.relation_by_name(name).is_some() {
            return Err(Error::Catalog(format!("relation '{name}' already exists")));
        }
        let id = RelationId::new(
            self.relations
                .keys()
                .next_back()
                .map(|r| r.get() + 1)
                .unwrap_or(0),
        );
        let mut relation = Relation::new(id, name, attribute_names);
        if let Some(n) = num_partitions {
            relation = relation.with_partitions(n);
        }
        self.relations.insert(id, relation);
        Ok(id)
    }

    pub fn relations(&self) -> impl Iterator<Item = &Relation> {
        self.relations.values()
    }
}

impl Catalog for CatalogDatabase {
    fn relation_by_id(&self, id: RelationId) -> Option<&Relation> {
        self.relations.get(&id)
    }

    fn relation_by_id_mut(&mut self, id: RelationId) -> Option<&mut Relation> {
        self.relations.get_mut(&id)
    }

    fn relation_by_name(&self, name: &str) -> Option<&Relation> {
        self.relations.values().find(|r| r.name == name)
    }
}
