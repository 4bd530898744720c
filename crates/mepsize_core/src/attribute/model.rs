//! Attribute identity and storage model.
//!
//! # Responsibility
//! - Define the ids, storage kinds and values exchanged with a document.
//!
//! # Invariants
//! - `AttributeHandle` is opaque to callers; only document accessors build it.
//! - `StorageKind` is closed: every kind pair is handled exhaustively.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Stable identity of one entity (element) in a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub u64);

/// Stable identity of an owning type shared by many entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeKey(pub u64);

/// Stable identity of an owning collection that carries default attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CollectionKey(pub u64);

impl Display for EntityId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Display for TypeKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Native storage of an attribute slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageKind {
    Text,
    /// Floating point.
    Number,
    Integer,
}

impl StorageKind {
    /// Lowercase name, as used in snapshots and log lines.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Number => "number",
            Self::Integer => "integer",
        }
    }
}

/// Value held in, or written to, a slot.
///
/// Serialized untagged; `Integer` is tried before `Number` so whole JSON
/// numbers decode as integers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Text(String),
    Integer(i64),
    Number(f64),
}

impl AttributeValue {
    /// Storage kind this value natively belongs to.
    pub fn kind(&self) -> StorageKind {
        match self {
            Self::Text(_) => StorageKind::Text,
            Self::Number(_) => StorageKind::Number,
            Self::Integer(_) => StorageKind::Integer,
        }
    }
}

/// Raw read result: native value plus the document's display form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoredValue {
    /// `None` when the slot has never been assigned.
    pub value: Option<AttributeValue>,
    /// Formatted value as the host would show it (units, rounding).
    pub display: Option<String>,
}

impl StoredValue {
    /// Assigned value without a display form.
    pub fn new(value: AttributeValue) -> Self {
        Self {
            value: Some(value),
            display: None,
        }
    }

    /// Attaches the host's display form.
    pub fn with_display(mut self, display: impl Into<String>) -> Self {
        self.display = Some(display.into());
        self
    }
}

/// Where an attribute slot lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeOwner {
    Instance(EntityId),
    Type(TypeKey),
    Collection(CollectionKey),
}

/// Opaque reference to a named, typed storage slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AttributeHandle {
    owner: AttributeOwner,
    slot: u64,
    name: String,
    kind: StorageKind,
    read_only: bool,
}

impl AttributeHandle {
    /// Builds a handle; `slot` is meaningful only to the issuing accessor.
    pub fn new(
        owner: AttributeOwner,
        slot: u64,
        name: impl Into<String>,
        kind: StorageKind,
        read_only: bool,
    ) -> Self {
        Self {
            owner,
            slot,
            name: name.into(),
            kind,
            read_only,
        }
    }

    /// Instance, type or collection that holds the slot.
    pub fn owner(&self) -> AttributeOwner {
        self.owner
    }

    /// Accessor-private slot key.
    pub fn slot(&self) -> u64 {
        self.slot
    }

    /// Attribute name as declared by the host.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Native storage of the slot.
    pub fn kind(&self) -> StorageKind {
        self.kind
    }

    /// `true` when the host refuses writes to this slot.
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// `true` for slots shared by every entity of an owning type.
    pub fn is_type_level(&self) -> bool {
        matches!(self.owner, AttributeOwner::Type(_))
    }
}
