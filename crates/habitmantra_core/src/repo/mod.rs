//! Persistence contracts and implementations.
//!
//! # Responsibility
//! - Define the slot contract the session layer persists through.
//! - Isolate SQLite and JSON encoding details from orchestration code.
//!
//! # Invariants
//! - Writes validate before touching storage.
//! - Corrupt persisted state is discarded, never surfaced as an error.

pub mod habit_store;
