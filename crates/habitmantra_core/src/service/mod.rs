//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate the state machine, persistence and generation into
//!   intent-level APIs.
//! - Keep UI/FFI layers decoupled from storage and transport details.

pub mod habit_service;
