//! Size classification and canonical formatting.
//!
//! # Responsibility
//! - Parse numeric size tokens, including fractions and decimal commas.
//! - Decide round vs rectangular shape and render a canonical string.
//!
//! # Invariants
//! - All functions here are pure and never fail; bad input degrades to
//!   passthrough text.

pub mod classify;
pub mod format;
pub mod nominal;
pub mod number;
