//! Attribute resolution and idempotent value updates.
//!
//! # Responsibility
//! - Resolve named attributes on entities via instance → type → collection.
//! - Read typed values from heterogeneous storage and write them only when
//!   they actually change.
//!
//! # Invariants
//! - Single-threaded: caches are mutated in place during a run and are not
//!   synchronized.
//! - No accessor failure crosses this module's public API.

pub mod accessor;
pub mod cache;
pub mod coercion;
pub mod memory;
pub mod model;
pub mod resolver;
