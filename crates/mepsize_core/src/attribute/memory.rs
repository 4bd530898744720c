//! In-memory document backend.
//!
//! # Responsibility
//! - Implement `DocumentAccessor` over plain collections for tests and the
//!   CLI batch mode.
//! - Load from / export to a JSON-friendly `DocumentSnapshot`.
//!
//! # Invariants
//! - Instance lookups match names exactly; case folding is the type cache's job.
//! - Writes clear the slot's display form, which would otherwise be stale.
//! - `type_enumerations()` counts every `type_attributes` call.

use crate::attribute::accessor::{AccessError, AccessResult, DocumentAccessor};
use crate::attribute::coercion::convert_value;
use crate::attribute::model::{
    AttributeHandle, AttributeOwner, AttributeValue, CollectionKey, EntityId, StorageKind,
    StoredValue, TypeKey,
};
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::collections::BTreeMap;

/// Declaration of one attribute slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeSpec {
    pub name: String,
    pub kind: StorageKind,
    #[serde(default)]
    pub read_only: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<AttributeValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

impl AttributeSpec {
    pub fn empty(name: impl Into<String>, kind: StorageKind) -> Self {
        Self {
            name: name.into(),
            kind,
            read_only: false,
            value: None,
            display: None,
        }
    }

    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            value: Some(AttributeValue::Text(value.into())),
            ..Self::empty(name, StorageKind::Text)
        }
    }

    pub fn number(name: impl Into<String>, value: f64) -> Self {
        Self {
            value: Some(AttributeValue::Number(value)),
            ..Self::empty(name, StorageKind::Number)
        }
    }

    pub fn integer(name: impl Into<String>, value: i64) -> Self {
        Self {
            value: Some(AttributeValue::Integer(value)),
            ..Self::empty(name, StorageKind::Integer)
        }
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    pub fn with_display(mut self, display: impl Into<String>) -> Self {
        self.display = Some(display.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeSnapshot {
    pub key: TypeKey,
    #[serde(default)]
    pub attributes: Vec<AttributeSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionSnapshot {
    pub key: CollectionKey,
    #[serde(default)]
    pub attributes: Vec<AttributeSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    pub id: EntityId,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub owning_type: Option<TypeKey>,
    #[serde(default)]
    pub collection: Option<CollectionKey>,
    #[serde(default)]
    pub attributes: Vec<AttributeSpec>,
}

/// Serializable document contents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentSnapshot {
    #[serde(default)]
    pub types: Vec<TypeSnapshot>,
    #[serde(default)]
    pub collections: Vec<CollectionSnapshot>,
    #[serde(default)]
    pub entities: Vec<EntitySnapshot>,
}

#[derive(Debug, Clone)]
struct Slot {
    owner: AttributeOwner,
    spec: AttributeSpec,
    locked: bool,
}

#[derive(Debug, Clone, Default)]
struct EntityRecord {
    category: Option<String>,
    owning_type: Option<TypeKey>,
    collection: Option<CollectionKey>,
    slots: Vec<usize>,
}

/// `DocumentAccessor` backed by in-process collections.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDocument {
    slots: Vec<Slot>,
    entities: BTreeMap<EntityId, EntityRecord>,
    types: BTreeMap<TypeKey, Vec<usize>>,
    collections: BTreeMap<CollectionKey, Vec<usize>>,
    type_enumerations: Cell<usize>,
    writes: usize,
}

impl InMemoryDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a document from a snapshot, coercing declared values to the
    /// declared storage kind.
    pub fn from_snapshot(snapshot: DocumentSnapshot) -> AccessResult<Self> {
        let mut doc = Self::new();
        for owning_type in snapshot.types {
            doc.add_type(owning_type.key);
            for spec in owning_type.attributes {
                doc.add_type_attribute(owning_type.key, normalize_spec(spec)?)?;
            }
        }
        for collection in snapshot.collections {
            doc.collections.entry(collection.key).or_default();
            for spec in collection.attributes {
                doc.add_collection_attribute(collection.key, normalize_spec(spec)?);
            }
        }
        for entity in snapshot.entities {
            doc.add_entity(entity.id, entity.category.as_deref(), entity.owning_type);
            if let Some(collection) = entity.collection {
                doc.set_entity_collection(entity.id, collection)?;
            }
            for spec in entity.attributes {
                doc.add_instance_attribute(entity.id, normalize_spec(spec)?)?;
            }
        }
        Ok(doc)
    }

    /// Exports the current contents, including written values.
    pub fn snapshot(&self) -> DocumentSnapshot {
        let specs = |slots: &[usize]| -> Vec<AttributeSpec> {
            slots
                .iter()
                .map(|index| self.slots[*index].spec.clone())
                .collect()
        };
        DocumentSnapshot {
            types: self
                .types
                .iter()
                .map(|(key, slots)| TypeSnapshot {
                    key: *key,
                    attributes: specs(slots),
                })
                .collect(),
            collections: self
                .collections
                .iter()
                .map(|(key, slots)| CollectionSnapshot {
                    key: *key,
                    attributes: specs(slots),
                })
                .collect(),
            entities: self
                .entities
                .iter()
                .map(|(id, record)| EntitySnapshot {
                    id: *id,
                    category: record.category.clone(),
                    owning_type: record.owning_type,
                    collection: record.collection,
                    attributes: specs(&record.slots),
                })
                .collect(),
        }
    }

    pub fn add_type(&mut self, key: TypeKey) {
        self.types.entry(key).or_default();
    }

    pub fn add_entity(&mut self, id: EntityId, category: Option<&str>, owning_type: Option<TypeKey>) {
        if let Some(key) = owning_type {
            self.add_type(key);
        }
        self.entities.insert(
            id,
            EntityRecord {
                category: category.map(str::to_string),
                owning_type,
                ..EntityRecord::default()
            },
        );
    }

    pub fn set_entity_collection(
        &mut self,
        id: EntityId,
        collection: CollectionKey,
    ) -> AccessResult<()> {
        self.collections.entry(collection).or_default();
        let record = self
            .entities
            .get_mut(&id)
            .ok_or(AccessError::EntityNotFound(id))?;
        record.collection = Some(collection);
        Ok(())
    }

    pub fn add_instance_attribute(
        &mut self,
        id: EntityId,
        spec: AttributeSpec,
    ) -> AccessResult<AttributeHandle> {
        if !self.entities.contains_key(&id) {
            return Err(AccessError::EntityNotFound(id));
        }
        let index = self.push_slot(AttributeOwner::Instance(id), spec);
        if let Some(record) = self.entities.get_mut(&id) {
            record.slots.push(index);
        }
        Ok(self.handle(index))
    }

    pub fn add_type_attribute(
        &mut self,
        key: TypeKey,
        spec: AttributeSpec,
    ) -> AccessResult<AttributeHandle> {
        if !self.types.contains_key(&key) {
            return Err(AccessError::TypeNotFound(key));
        }
        let index = self.push_slot(AttributeOwner::Type(key), spec);
        self.types.entry(key).or_default().push(index);
        Ok(self.handle(index))
    }

    pub fn add_collection_attribute(
        &mut self,
        key: CollectionKey,
        spec: AttributeSpec,
    ) -> AttributeHandle {
        let index = self.push_slot(AttributeOwner::Collection(key), spec);
        self.collections.entry(key).or_default().push(index);
        self.handle(index)
    }

    /// Makes every write to `handle` fail with a backend error.
    pub fn lock(&mut self, handle: &AttributeHandle) {
        if let Some(slot) = self.slots.get_mut(slot_index(handle)) {
            slot.locked = true;
        }
    }

    /// Current native value of a slot.
    pub fn value(&self, handle: &AttributeHandle) -> Option<&AttributeValue> {
        self.slots
            .get(slot_index(handle))
            .and_then(|slot| slot.spec.value.as_ref())
    }

    /// Number of `type_attributes` calls served so far.
    pub fn type_enumerations(&self) -> usize {
        self.type_enumerations.get()
    }

    /// Number of successful writes.
    pub fn writes(&self) -> usize {
        self.writes
    }

    pub fn entity_ids(&self) -> Vec<EntityId> {
        self.entities.keys().copied().collect()
    }

    fn push_slot(&mut self, owner: AttributeOwner, spec: AttributeSpec) -> usize {
        self.slots.push(Slot {
            owner,
            spec,
            locked: false,
        });
        self.slots.len() - 1
    }

    fn handle(&self, index: usize) -> AttributeHandle {
        let slot = &self.slots[index];
        AttributeHandle::new(
            slot.owner,
            index as u64,
            slot.spec.name.clone(),
            slot.spec.kind,
            slot.spec.read_only,
        )
    }

    fn find_named(&self, slots: &[usize], name: &str) -> Option<AttributeHandle> {
        slots
            .iter()
            .find(|index| self.slots[**index].spec.name == name)
            .map(|index| self.handle(*index))
    }

    fn entity(&self, id: EntityId) -> AccessResult<&EntityRecord> {
        self.entities.get(&id).ok_or(AccessError::EntityNotFound(id))
    }

    fn live_slot(&self, handle: &AttributeHandle) -> AccessResult<&Slot> {
        self.slots
            .get(slot_index(handle))
            .filter(|slot| slot.owner == handle.owner())
            .ok_or_else(|| AccessError::StaleHandle(handle.name().to_string()))
    }
}

impl DocumentAccessor for InMemoryDocument {
    fn category_name(&self, entity: EntityId) -> AccessResult<Option<String>> {
        Ok(self.entity(entity)?.category.clone())
    }

    fn owning_type(&self, entity: EntityId) -> AccessResult<Option<TypeKey>> {
        Ok(self.entity(entity)?.owning_type)
    }

    fn instance_attribute(
        &self,
        entity: EntityId,
        name: &str,
    ) -> AccessResult<Option<AttributeHandle>> {
        let record = self.entity(entity)?;
        Ok(self.find_named(&record.slots, name))
    }

    fn type_attributes(&self, owning_type: TypeKey) -> AccessResult<Vec<AttributeHandle>> {
        self.type_enumerations.set(self.type_enumerations.get() + 1);
        let slots = self
            .types
            .get(&owning_type)
            .ok_or(AccessError::TypeNotFound(owning_type))?;
        Ok(slots.iter().map(|index| self.handle(*index)).collect())
    }

    fn collection_attribute(
        &self,
        entity: EntityId,
        name: &str,
    ) -> AccessResult<Option<AttributeHandle>> {
        let Some(collection) = self.entity(entity)?.collection else {
            return Ok(None);
        };
        Ok(self
            .collections
            .get(&collection)
            .and_then(|slots| self.find_named(slots, name)))
    }

    fn read_value(&self, handle: &AttributeHandle) -> AccessResult<StoredValue> {
        let slot = self.live_slot(handle)?;
        Ok(StoredValue {
            value: slot.spec.value.clone(),
            display: slot.spec.display.clone(),
        })
    }

    fn write_value(&mut self, handle: &AttributeHandle, value: AttributeValue) -> AccessResult<()> {
        let slot = self.live_slot(handle)?;
        if slot.spec.read_only {
            return Err(AccessError::ReadOnly(handle.name().to_string()));
        }
        if slot.locked {
            return Err(AccessError::Backend(format!(
                "attribute `{}` is locked",
                handle.name()
            )));
        }
        if value.kind() != slot.spec.kind {
            return Err(AccessError::KindMismatch {
                attribute: handle.name().to_string(),
                expected: slot.spec.kind,
                actual: value.kind(),
            });
        }

        let index = slot_index(handle);
        let slot = &mut self.slots[index];
        slot.spec.value = Some(value);
        slot.spec.display = None;
        self.writes += 1;
        Ok(())
    }
}

fn slot_index(handle: &AttributeHandle) -> usize {
    usize::try_from(handle.slot()).unwrap_or(usize::MAX)
}

fn normalize_spec(mut spec: AttributeSpec) -> AccessResult<AttributeSpec> {
    if let Some(value) = spec.value.take() {
        let converted =
            convert_value(&value, spec.kind, 2).ok_or_else(|| AccessError::Unconvertible {
                attribute: spec.name.clone(),
                kind: spec.kind,
            })?;
        spec.value = Some(converted);
    }
    Ok(spec)
}
