//! Core logic for MEP size normalization.
//! Formats free-form pipe/duct size strings and writes them back to entity
//! attributes idempotently.

pub mod attribute;
pub mod config;
pub mod logging;
pub mod service;
pub mod size;

pub use attribute::accessor::{AccessError, AccessResult, DocumentAccessor};
pub use attribute::cache::{AttributeCache, TypeAttributeIndex};
pub use attribute::coercion::{
    convert_value, read_number, read_text, stored_number, stored_text, UpdateOutcome,
    ValueUpdater,
};
pub use attribute::memory::{
    AttributeSpec, CollectionSnapshot, DocumentSnapshot, EntitySnapshot, InMemoryDocument,
    TypeSnapshot,
};
pub use attribute::model::{
    AttributeHandle, AttributeOwner, AttributeValue, CollectionKey, EntityId, StorageKind,
    StoredValue, TypeKey,
};
pub use attribute::resolver::AttributeResolver;
pub use config::{BatchConfig, ConfigError, CoreConfig, FormatterConfig, QuantityConfig, UpdatePolicy};
pub use logging::{default_log_level, init_logging, logging_status};
pub use service::batch_service::{BatchReport, BatchService, EntityReport, FieldOutcome, FieldTally};
pub use size::classify::{classify, SizeKind};
pub use size::format::{format_size, split_dimensions, Dimension, SizeFormatter};
pub use size::nominal::DEFAULT_NOMINAL_TOLERANCE_MM;
pub use size::number::parse_number;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
