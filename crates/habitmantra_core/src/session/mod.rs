//! Session state machine and time source.
//!
//! # Responsibility
//! - Model the idle/generating/active/celebrating lifecycle as a pure
//!   transition function over an owned `Session` value.
//! - Abstract "now" and "today" so transitions stay deterministic in tests.

pub mod clock;
pub mod machine;
