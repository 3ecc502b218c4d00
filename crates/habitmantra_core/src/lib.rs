//! Core domain logic for HabitMantra.
//! This crate is the single source of truth for session and habit invariants.

pub mod config;
pub mod db;
pub mod generator;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod session;

pub use config::{ConfigError, CoreConfig};
pub use generator::{
    GeminiMantraGenerator, GeminiSettings, GenerationError, GenerationResult, MantraGenerator,
};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::habit::{CheckInOutcome, HabitId, HabitRecord, HabitValidationError, MantraParts};
pub use repo::habit_store::{HabitStore, SqliteHabitStore, StoreError, StoreResult, HABIT_SLOT_KEY};
pub use service::habit_service::{HabitService, SessionSnapshot, SessionUpdate};
pub use session::clock::{Clock, SystemClock};
pub use session::machine::{
    transition, AppState, EventKind, Session, SessionEffect, SessionEvent, SessionNotice,
    Transition, TransitionError,
};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
