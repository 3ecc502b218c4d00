//! Domain model for the single active habit.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//! - Own the check-in counting rule shared by every caller.
//!
//! # Invariants
//! - At most one `HabitRecord` is live per session.
//! - Check-ins are counted per distinct calendar day.

pub mod habit;
