//! Flutter-facing bridge for HabitMantra core.

pub mod api;
