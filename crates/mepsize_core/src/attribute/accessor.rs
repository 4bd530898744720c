//! Document accessor contract.
//!
//! # Responsibility
//! - Describe the host document operations the core relies on.
//!
//! # Invariants
//! - Every accessor call returns `AccessResult`; implementations must not
//!   panic. Callers in this crate convert failures to "not found" or
//!   "no update" and never propagate them further.

use crate::attribute::model::{
    AttributeHandle, AttributeValue, EntityId, StorageKind, StoredValue, TypeKey,
};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type AccessResult<T> = Result<T, AccessError>;

/// Failure reported by a document accessor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessError {
    EntityNotFound(EntityId),
    TypeNotFound(TypeKey),
    /// Handle no longer points at a live slot.
    StaleHandle(String),
    ReadOnly(String),
    KindMismatch {
        attribute: String,
        expected: StorageKind,
        actual: StorageKind,
    },
    /// Value cannot be represented in the slot's storage kind.
    Unconvertible {
        attribute: String,
        kind: StorageKind,
    },
    /// Host-side failure such as a locked or detached element.
    Backend(String),
}

impl Display for AccessError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EntityNotFound(id) => write!(f, "entity not found: {id}"),
            Self::TypeNotFound(key) => write!(f, "owning type not found: {key}"),
            Self::StaleHandle(name) => write!(f, "attribute handle is stale: {name}"),
            Self::ReadOnly(name) => write!(f, "attribute is read-only: {name}"),
            Self::KindMismatch {
                attribute,
                expected,
                actual,
            } => write!(
                f,
                "attribute `{attribute}` stores {} but got {}",
                expected.as_str(),
                actual.as_str()
            ),
            Self::Unconvertible { attribute, kind } => write!(
                f,
                "value for `{attribute}` cannot be stored as {}",
                kind.as_str()
            ),
            Self::Backend(message) => write!(f, "document backend error: {message}"),
        }
    }
}

impl Error for AccessError {}

/// Host document operations consumed by resolution and updates.
pub trait DocumentAccessor {
    fn category_name(&self, entity: EntityId) -> AccessResult<Option<String>>;

    fn owning_type(&self, entity: EntityId) -> AccessResult<Option<TypeKey>>;

    /// Direct instance-level lookup; name matching rules are the host's.
    fn instance_attribute(
        &self,
        entity: EntityId,
        name: &str,
    ) -> AccessResult<Option<AttributeHandle>>;

    /// Every attribute exposed by an owning type, in host order.
    fn type_attributes(&self, owning_type: TypeKey) -> AccessResult<Vec<AttributeHandle>>;

    /// Default attribute from the entity's owning collection.
    ///
    /// Hosts without collection defaults keep the provided implementation.
    fn collection_attribute(
        &self,
        _entity: EntityId,
        _name: &str,
    ) -> AccessResult<Option<AttributeHandle>> {
        Ok(None)
    }

    fn read_value(&self, handle: &AttributeHandle) -> AccessResult<StoredValue>;

    fn write_value(&mut self, handle: &AttributeHandle, value: AttributeValue)
        -> AccessResult<()>;
}
