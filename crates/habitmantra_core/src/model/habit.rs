//! Habit domain model.
//!
//! # Responsibility
//! - Define the mantra triple and the single active habit record.
//! - Provide the check-in mutation used by the session state machine.
//!
//! # Invariants
//! - `id` is stable for the lifetime of a habit and never nil.
//! - `check_ins` grows by exactly one per distinct calendar day.
//! - `last_check_in_date` has day granularity only.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier of a habit record.
pub type HabitId = Uuid;

/// Generated three-part affirmation for one micro-habit.
///
/// Content conventions (identity/benefit/emotion phrasing) are owned by the
/// generator; core only checks that every part is present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MantraParts {
    /// "I am a person who ..." with a drastically reduced action.
    pub identity: String,
    /// Why the small consistent action compounds.
    pub benefit: String,
    /// Emotional consequence, conventionally starting with "So I feel ...".
    pub emotion: String,
}

impl MantraParts {
    pub fn new(
        identity: impl Into<String>,
        benefit: impl Into<String>,
        emotion: impl Into<String>,
    ) -> Self {
        Self {
            identity: identity.into(),
            benefit: benefit.into(),
            emotion: emotion.into(),
        }
    }

    /// Checks structural presence of all three parts.
    pub fn validate(&self) -> Result<(), HabitValidationError> {
        for (field, value) in [
            ("identity", &self.identity),
            ("benefit", &self.benefit),
            ("emotion", &self.emotion),
        ] {
            if value.trim().is_empty() {
                return Err(HabitValidationError::BlankMantraPart(field));
            }
        }
        Ok(())
    }
}

/// The single active habit held by a session.
///
/// Serialized with camelCase field names; this is the persisted slot shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct HabitRecord {
    pub id: HabitId,
    /// Raw goal text exactly as the user entered it.
    pub original_goal: String,
    pub mantra: MantraParts,
    /// Unix epoch milliseconds.
    pub created_at: i64,
    pub check_ins: u32,
    /// Device-local calendar day of the latest check-in.
    pub last_check_in_date: Option<NaiveDate>,
}

/// Outcome of applying one check-in to a habit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckInOutcome {
    /// Counter incremented and date stamped.
    Recorded,
    /// Already checked in on this day; nothing changed.
    AlreadyToday,
}

impl HabitRecord {
    /// Creates a fresh habit with a generated id.
    ///
    /// # Invariants
    /// - `check_ins` starts at `0`.
    /// - `last_check_in_date` starts as `None`.
    pub fn new(original_goal: impl Into<String>, mantra: MantraParts, created_at: i64) -> Self {
        Self::with_id(Uuid::new_v4(), original_goal, mantra, created_at)
    }

    /// Creates a fresh habit with a caller-provided id.
    pub fn with_id(
        id: HabitId,
        original_goal: impl Into<String>,
        mantra: MantraParts,
        created_at: i64,
    ) -> Self {
        Self {
            id,
            original_goal: original_goal.into(),
            mantra,
            created_at,
            check_ins: 0,
            last_check_in_date: None,
        }
    }

    /// Returns whether a check-in was already recorded on `today`.
    pub fn checked_in_on(&self, today: NaiveDate) -> bool {
        self.last_check_in_date == Some(today)
    }

    /// Records a check-in for `today` unless one already exists for that day.
    ///
    /// Gaps between days do not matter: any new day adds exactly one.
    pub fn check_in(&mut self, today: NaiveDate) -> CheckInOutcome {
        if self.checked_in_on(today) {
            return CheckInOutcome::AlreadyToday;
        }
        self.check_ins = self.check_ins.saturating_add(1);
        self.last_check_in_date = Some(today);
        CheckInOutcome::Recorded
    }

    /// Validates the record before persistence and after load.
    pub fn validate(&self) -> Result<(), HabitValidationError> {
        if self.id.is_nil() {
            return Err(HabitValidationError::NilId);
        }
        if self.original_goal.trim().is_empty() {
            return Err(HabitValidationError::BlankGoal);
        }
        self.mantra.validate()
    }
}

/// Structural validation failures for habit data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HabitValidationError {
    NilId,
    BlankGoal,
    /// Named mantra part is empty after trimming.
    BlankMantraPart(&'static str),
}

impl Display for HabitValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NilId => write!(f, "habit id must not be nil"),
            Self::BlankGoal => write!(f, "habit goal must not be blank"),
            Self::BlankMantraPart(field) => write!(f, "mantra `{field}` must not be blank"),
        }
    }
}

impl Error for HabitValidationError {}
