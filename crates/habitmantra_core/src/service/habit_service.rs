//! Habit session use-case service.
//!
//! # Responsibility
//! - Own the live `Session` and drive it through `session::machine`.
//! - Execute transition effects against the store and the generator.
//!
//! # Invariants
//! - The in-memory session advances even when persistence fails; storage
//!   errors are logged and surfaced as notices.
//! - At most one generation is in flight; re-entrant submits are rejected
//!   by the state machine.
//! - Goal and mantra text are never written to logs.

use crate::generator::{GenerationResult, MantraGenerator};
use crate::model::habit::{HabitRecord, MantraParts};
use crate::repo::habit_store::HabitStore;
use crate::session::clock::{Clock, SystemClock};
use crate::session::machine::{
    transition, AppState, Session, SessionEffect, SessionEvent, SessionNotice, TransitionError,
};
use log::{error, info, warn};
use std::sync::Arc;
use uuid::Uuid;

/// Outcome of one accepted intent, for the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionUpdate {
    pub state: AppState,
    /// Celebratory feedback should fire.
    pub celebrate: bool,
    pub notices: Vec<SessionNotice>,
}

/// Read-only view of the session for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub state: AppState,
    pub habit: Option<HabitRecord>,
    pub pending_goal: Option<String>,
}

/// Drives a single habit session.
pub struct HabitService<S: HabitStore, C: Clock = SystemClock> {
    session: Session,
    store: S,
    generator: Arc<dyn MantraGenerator>,
    clock: C,
}

impl<S: HabitStore> HabitService<S> {
    /// Restores a session using the wall clock.
    pub fn restore(store: S, generator: Arc<dyn MantraGenerator>) -> Self {
        Self::restore_with_clock(store, generator, SystemClock)
    }
}

impl<S: HabitStore, C: Clock> HabitService<S, C> {
    /// Loads the persisted habit and starts in `Active`, or `Idle` when none.
    ///
    /// A failing store is logged and treated as empty.
    pub fn restore_with_clock(store: S, generator: Arc<dyn MantraGenerator>, clock: C) -> Self {
        let habit = match store.load() {
            Ok(habit) => habit,
            Err(err) => {
                error!(
                    "event=session_restore module=service status=error error_code=store_load_failed error={err}"
                );
                None
            }
        };
        let session = Session::restored(habit);
        info!(
            "event=session_restore module=service status=ok state={}",
            session.state()
        );
        Self {
            session,
            store,
            generator,
            clock,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn state(&self) -> AppState {
        self.session.state()
    }

    pub fn habit(&self) -> Option<&HabitRecord> {
        self.session.habit()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Shared handle to the generator, usable without holding the service.
    pub fn generator(&self) -> Arc<dyn MantraGenerator> {
        Arc::clone(&self.generator)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state(),
            habit: self.habit().cloned(),
            pending_goal: self.session.pending_goal().map(str::to_string),
        }
    }

    /// Submits a goal and waits for the generator's single outcome.
    pub async fn submit_goal(&mut self, goal: &str) -> Result<SessionUpdate, TransitionError> {
        let goal = self.begin_generation(goal)?;
        let generator = self.generator();
        info!(
            "event=mantra_request module=service status=start generator={}",
            generator.name()
        );
        let outcome = generator.generate(&goal).await;
        self.finish_generation(outcome)
    }

    /// Moves `Idle -> Generating` and returns the goal to generate for, as typed.
    ///
    /// Callers that cannot hold `&mut self` across the generator call (for
    /// example behind a mutex) pair this with [`Self::finish_generation`].
    pub fn begin_generation(&mut self, goal: &str) -> Result<String, TransitionError> {
        let (_, request) = self.dispatch(SessionEvent::SubmitGoal {
            goal: goal.to_string(),
        })?;
        // SubmitGoal always requests exactly one mantra when accepted.
        Ok(request.unwrap_or_else(|| goal.to_string()))
    }

    /// Resolves the in-flight generation with the generator's outcome.
    pub fn finish_generation(
        &mut self,
        outcome: GenerationResult<MantraParts>,
    ) -> Result<SessionUpdate, TransitionError> {
        let event = match outcome {
            Ok(mantra) => SessionEvent::GenerationSucceeded {
                mantra,
                habit_id: Uuid::new_v4(),
                created_at_ms: self.clock.now_ms(),
            },
            Err(err) => SessionEvent::GenerationFailed {
                reason: err.to_string(),
            },
        };
        self.dispatch(event).map(|(update, _)| update)
    }

    /// Records today's check-in; a repeat on the same day only celebrates.
    pub fn check_in(&mut self) -> Result<SessionUpdate, TransitionError> {
        let today = self.clock.today();
        self.dispatch(SessionEvent::CheckIn { today })
            .map(|(update, _)| update)
    }

    /// Returns from the celebration view to the dashboard.
    pub fn continue_to_dashboard(&mut self) -> Result<SessionUpdate, TransitionError> {
        self.dispatch(SessionEvent::Continue)
            .map(|(update, _)| update)
    }

    /// Drops the habit from memory and storage and returns to `Idle`.
    pub fn reset(&mut self) -> Result<SessionUpdate, TransitionError> {
        self.dispatch(SessionEvent::Reset).map(|(update, _)| update)
    }

    fn dispatch(
        &mut self,
        event: SessionEvent,
    ) -> Result<(SessionUpdate, Option<String>), TransitionError> {
        let from = self.session.state();
        let kind = event.kind();
        let step = match transition(&self.session, event) {
            Ok(step) => step,
            Err(err) => {
                warn!(
                    "event=session_transition module=service status=rejected state={from} intent={} error={err}",
                    kind.as_str()
                );
                return Err(err);
            }
        };
        self.session = step.next;

        let mut update = SessionUpdate {
            state: self.session.state(),
            celebrate: false,
            notices: Vec::new(),
        };
        let mut request = None;

        for effect in step.effects {
            match effect {
                SessionEffect::RequestMantra { goal } => request = Some(goal),
                SessionEffect::PersistHabit(habit) => {
                    if let Err(err) = self.store.save(&habit) {
                        error!(
                            "event=habit_persist module=service status=error error_code=store_save_failed error={err}"
                        );
                        update.notices.push(SessionNotice::PersistenceFailed {
                            reason: err.to_string(),
                        });
                    }
                }
                SessionEffect::ClearPersistedHabit => {
                    if let Err(err) = self.store.clear() {
                        error!(
                            "event=habit_persist module=service status=error error_code=store_clear_failed error={err}"
                        );
                        update.notices.push(SessionNotice::PersistenceFailed {
                            reason: err.to_string(),
                        });
                    }
                }
                SessionEffect::Celebrate => {
                    info!("event=celebrate module=service status=ok");
                    update.celebrate = true;
                }
                SessionEffect::Notify(notice) => update.notices.push(notice),
            }
        }

        info!(
            "event=session_transition module=service status=ok from={from} to={} intent={}",
            update.state,
            kind.as_str()
        );
        Ok((update, request))
    }
}
