//! Pure session state machine.
//!
//! # Responsibility
//! - Decide the next session value and the effects to perform for one event.
//! - Stay free of I/O: ids, timestamps and "today" arrive inside events.
//!
//! # Invariants
//! - A habit record is carried only by `Active` and `Celebrating`.
//! - Rejected events leave the input session untouched.
//! - At most one generation is in flight: `SubmitGoal` is rejected while
//!   `Generating`.

use crate::model::habit::{CheckInOutcome, HabitId, HabitRecord, MantraParts};
use chrono::NaiveDate;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Fieldless view of the session phase, used for view selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AppState {
    Idle,
    Generating,
    Active,
    Celebrating,
}

impl AppState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Generating => "generating",
            Self::Active => "active",
            Self::Celebrating => "celebrating",
        }
    }
}

impl Display for AppState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Owned session value threaded through [`transition`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Session {
    #[default]
    Idle,
    /// Waiting on the generator for `goal`.
    Generating { goal: String },
    Active { habit: HabitRecord },
    Celebrating { habit: HabitRecord },
}

impl Session {
    /// Startup session: `Active` when a persisted habit was found.
    pub fn restored(habit: Option<HabitRecord>) -> Self {
        match habit {
            Some(habit) => Self::Active { habit },
            None => Self::Idle,
        }
    }

    pub fn state(&self) -> AppState {
        match self {
            Self::Idle => AppState::Idle,
            Self::Generating { .. } => AppState::Generating,
            Self::Active { .. } => AppState::Active,
            Self::Celebrating { .. } => AppState::Celebrating,
        }
    }

    pub fn habit(&self) -> Option<&HabitRecord> {
        match self {
            Self::Active { habit } | Self::Celebrating { habit } => Some(habit),
            Self::Idle | Self::Generating { .. } => None,
        }
    }

    /// Goal of the in-flight generation, if any.
    pub fn pending_goal(&self) -> Option<&str> {
        match self {
            Self::Generating { goal } => Some(goal),
            _ => None,
        }
    }
}

/// User intents and collaborator completions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    SubmitGoal {
        goal: String,
    },
    GenerationSucceeded {
        mantra: MantraParts,
        habit_id: HabitId,
        created_at_ms: i64,
    },
    GenerationFailed {
        reason: String,
    },
    CheckIn {
        today: NaiveDate,
    },
    Continue,
    Reset,
}

impl SessionEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::SubmitGoal { .. } => EventKind::SubmitGoal,
            Self::GenerationSucceeded { .. } => EventKind::GenerationSucceeded,
            Self::GenerationFailed { .. } => EventKind::GenerationFailed,
            Self::CheckIn { .. } => EventKind::CheckIn,
            Self::Continue => EventKind::Continue,
            Self::Reset => EventKind::Reset,
        }
    }
}

/// Payload-free event tag for errors and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    SubmitGoal,
    GenerationSucceeded,
    GenerationFailed,
    CheckIn,
    Continue,
    Reset,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SubmitGoal => "submit_goal",
            Self::GenerationSucceeded => "generation_succeeded",
            Self::GenerationFailed => "generation_failed",
            Self::CheckIn => "check_in",
            Self::Continue => "continue",
            Self::Reset => "reset",
        }
    }
}

/// User-visible, non-fatal notices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionNotice {
    GenerationFailed { reason: String },
    PersistenceFailed { reason: String },
}

impl Display for SessionNotice {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::GenerationFailed { reason } => {
                write!(f, "Failed to generate mantra. Please try again. ({reason})")
            }
            Self::PersistenceFailed { reason } => {
                write!(f, "Progress could not be saved on this device. ({reason})")
            }
        }
    }
}

/// Work the driver must perform after a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEffect {
    RequestMantra { goal: String },
    PersistHabit(HabitRecord),
    ClearPersistedHabit,
    /// Fire-and-forget celebratory feedback.
    Celebrate,
    Notify(SessionNotice),
}

/// Result of an accepted event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub next: Session,
    pub effects: Vec<SessionEffect>,
}

impl Transition {
    fn to(next: Session) -> Self {
        Self {
            next,
            effects: Vec::new(),
        }
    }

    fn with(mut self, effect: SessionEffect) -> Self {
        self.effects.push(effect);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    /// Goal was empty after trimming.
    EmptyGoal,
    /// Event is not valid in the current state.
    Rejected { state: AppState, event: EventKind },
}

impl Display for TransitionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyGoal => write!(f, "goal must not be empty"),
            Self::Rejected { state, event } => {
                write!(f, "event `{}` is not allowed while {state}", event.as_str())
            }
        }
    }
}

impl Error for TransitionError {}

/// Computes the next session for `event`.
///
/// # Errors
/// - `EmptyGoal` for a blank goal submitted from `Idle`.
/// - `Rejected` for any event the current state does not accept.
pub fn transition(session: &Session, event: SessionEvent) -> Result<Transition, TransitionError> {
    let rejected = |event: &SessionEvent| TransitionError::Rejected {
        state: session.state(),
        event: event.kind(),
    };

    match (session, event) {
        (Session::Idle, SessionEvent::SubmitGoal { goal }) => {
            if goal.trim().is_empty() {
                return Err(TransitionError::EmptyGoal);
            }
            Ok(Transition::to(Session::Generating { goal: goal.clone() })
                .with(SessionEffect::RequestMantra { goal }))
        }

        (
            Session::Generating { goal },
            SessionEvent::GenerationSucceeded {
                mantra,
                habit_id,
                created_at_ms,
            },
        ) => {
            let habit = HabitRecord::with_id(habit_id, goal.clone(), mantra, created_at_ms);
            Ok(Transition::to(Session::Active {
                habit: habit.clone(),
            })
            .with(SessionEffect::PersistHabit(habit)))
        }

        (Session::Generating { .. }, SessionEvent::GenerationFailed { reason }) => {
            Ok(Transition::to(Session::Idle)
                .with(SessionEffect::Notify(SessionNotice::GenerationFailed { reason })))
        }

        (Session::Active { habit }, SessionEvent::CheckIn { today }) => {
            let mut habit = habit.clone();
            match habit.check_in(today) {
                CheckInOutcome::AlreadyToday => Ok(Transition::to(Session::Celebrating { habit })),
                CheckInOutcome::Recorded => Ok(Transition::to(Session::Celebrating {
                    habit: habit.clone(),
                })
                .with(SessionEffect::PersistHabit(habit))
                .with(SessionEffect::Celebrate)),
            }
        }

        (Session::Celebrating { habit }, SessionEvent::Continue) => {
            Ok(Transition::to(Session::Active {
                habit: habit.clone(),
            }))
        }

        (Session::Active { .. } | Session::Celebrating { .. }, SessionEvent::Reset) => {
            Ok(Transition::to(Session::Idle).with(SessionEffect::ClearPersistedHabit))
        }

        (_, event) => Err(rejected(&event)),
    }
}
