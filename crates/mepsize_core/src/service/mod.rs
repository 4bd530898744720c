//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate formatting, resolution and updates into batch use cases.
//! - Keep CLI/host layers decoupled from accessor details.

pub mod batch_service;
