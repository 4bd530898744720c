//! Per-owning-type attribute index.
//!
//! # Responsibility
//! - Enumerate an owning type's attributes once and index them by name.
//!
//! # Invariants
//! - An owning type is enumerated at most once until `clear()` is called.
//! - Names are matched case-insensitively; the first-seen duplicate wins.
//! - Enumeration failures are cached as an empty index.
//!
//! Entries are never invalidated mid-run. Reusing a cache across runs is
//! unsafe unless `clear()` is called between them, since attribute shapes
//! may change in the document.

use crate::attribute::accessor::DocumentAccessor;
use crate::attribute::model::{AttributeHandle, TypeKey};
use log::{debug, warn};
use std::collections::HashMap;

/// Name → handle index for one owning type.
#[derive(Debug, Clone, Default)]
pub struct TypeAttributeIndex {
    by_name: HashMap<String, AttributeHandle>,
}

impl TypeAttributeIndex {
    pub fn from_handles(handles: impl IntoIterator<Item = AttributeHandle>) -> Self {
        let mut by_name = HashMap::new();
        for handle in handles {
            by_name
                .entry(normalize_name(handle.name()))
                .or_insert(handle);
        }
        Self { by_name }
    }

    pub fn get(&self, name: &str) -> Option<&AttributeHandle> {
        self.by_name.get(&normalize_name(name))
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

/// Lazily built arena of type indexes keyed by owning type identity.
#[derive(Debug, Default)]
pub struct AttributeCache {
    indexes: HashMap<TypeKey, TypeAttributeIndex>,
}

impl AttributeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the index for `owning_type`, building it on first access.
    pub fn index_for<D>(&mut self, doc: &D, owning_type: TypeKey) -> &TypeAttributeIndex
    where
        D: DocumentAccessor + ?Sized,
    {
        self.indexes
            .entry(owning_type)
            .or_insert_with(|| build_index(doc, owning_type))
    }

    /// Looks up a type-level attribute by case-insensitive name.
    pub fn type_attribute<D>(
        &mut self,
        doc: &D,
        owning_type: TypeKey,
        name: &str,
    ) -> Option<AttributeHandle>
    where
        D: DocumentAccessor + ?Sized,
    {
        self.index_for(doc, owning_type).get(name).cloned()
    }

    pub fn is_indexed(&self, owning_type: TypeKey) -> bool {
        self.indexes.contains_key(&owning_type)
    }

    /// Number of owning types indexed so far.
    pub fn len(&self) -> usize {
        self.indexes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indexes.is_empty()
    }

    /// Drops every index; required before reusing the cache for a new run.
    pub fn clear(&mut self) {
        self.indexes.clear();
    }
}

fn build_index<D>(doc: &D, owning_type: TypeKey) -> TypeAttributeIndex
where
    D: DocumentAccessor + ?Sized,
{
    match doc.type_attributes(owning_type) {
        Ok(handles) => {
            let index = TypeAttributeIndex::from_handles(handles);
            debug!(
                "event=type_index_build module=attribute status=ok type={} attributes={}",
                owning_type,
                index.len()
            );
            index
        }
        Err(err) => {
            warn!(
                "event=type_index_build module=attribute status=error type={} error={}",
                owning_type, err
            );
            TypeAttributeIndex::default()
        }
    }
}

fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}
