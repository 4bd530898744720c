//! Attribute resolution through the instance → type → collection chain.
//!
//! # Invariants
//! - Instance lookup is exactly one accessor call.
//! - Type lookup goes through `AttributeCache`, so each owning type is
//!   enumerated at most once per run.
//! - Accessor failures read as "not found" and are never propagated.

use crate::attribute::accessor::DocumentAccessor;
use crate::attribute::cache::AttributeCache;
use crate::attribute::model::{AttributeHandle, EntityId};
use log::debug;

/// Resolves named attributes for entities, memoizing type-level indexes.
#[derive(Debug, Default)]
pub struct AttributeResolver {
    cache: AttributeCache,
}

impl AttributeResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cache(cache: AttributeCache) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &AttributeCache {
        &self.cache
    }

    /// Forgets all type indexes. Call between runs over a changed document.
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    /// Instance attribute, else the cached owning-type attribute.
    pub fn resolve_instance_or_type<D>(
        &mut self,
        doc: &D,
        entity: EntityId,
        name: &str,
    ) -> Option<AttributeHandle>
    where
        D: DocumentAccessor + ?Sized,
    {
        if name.trim().is_empty() {
            return None;
        }
        self.resolve_instance(doc, entity, name)
            .or_else(|| self.resolve_type(doc, entity, name))
    }

    /// Full chain: instance, owning type, then owning collection default.
    pub fn resolve<D>(&mut self, doc: &D, entity: EntityId, name: &str) -> Option<AttributeHandle>
    where
        D: DocumentAccessor + ?Sized,
    {
        self.resolve_instance_or_type(doc, entity, name)
            .or_else(|| self.resolve_collection(doc, entity, name))
    }

    pub fn resolve_instance<D>(
        &self,
        doc: &D,
        entity: EntityId,
        name: &str,
    ) -> Option<AttributeHandle>
    where
        D: DocumentAccessor + ?Sized,
    {
        doc.instance_attribute(entity, name)
            .unwrap_or_else(|err| {
                debug!(
                    "event=attribute_resolve module=attribute status=error level=instance entity={} error={}",
                    entity, err
                );
                None
            })
    }

    /// Type-level attribute of the entity's owning type.
    pub fn resolve_type<D>(
        &mut self,
        doc: &D,
        entity: EntityId,
        name: &str,
    ) -> Option<AttributeHandle>
    where
        D: DocumentAccessor + ?Sized,
    {
        let owning_type = match doc.owning_type(entity) {
            Ok(Some(owning_type)) => owning_type,
            Ok(None) => return None,
            Err(err) => {
                debug!(
                    "event=attribute_resolve module=attribute status=error level=type entity={} error={}",
                    entity, err
                );
                return None;
            }
        };
        self.cache.type_attribute(doc, owning_type, name)
    }

    pub fn resolve_collection<D>(
        &self,
        doc: &D,
        entity: EntityId,
        name: &str,
    ) -> Option<AttributeHandle>
    where
        D: DocumentAccessor + ?Sized,
    {
        doc.collection_attribute(entity, name)
            .unwrap_or_else(|err| {
                debug!(
                    "event=attribute_resolve module=attribute status=error level=collection entity={} error={}",
                    entity, err
                );
                None
            })
    }
}
