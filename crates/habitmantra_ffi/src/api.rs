//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose stable, intent-level session functions to Dart via FRB.
//! - Hold the single process-wide habit session.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - The session lock is never held while the generator call is awaited,
//!   so snapshots stay responsive during generation.
//! - Every response carries the view to render next.

use habitmantra_core::db::open_db;
use habitmantra_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, ping as ping_inner,
    CoreConfig, GeminiMantraGenerator, HabitRecord, HabitService, MantraGenerator, SessionSnapshot,
    SessionUpdate, SqliteHabitStore, TransitionError,
};
use log::{error, info};
use std::sync::{Arc, Mutex, PoisonError};

type LiveSession = HabitService<SqliteHabitStore>;
type SessionSlot = Mutex<Option<LiveSession>>;

static SESSION: SessionSlot = Mutex::new(None);

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Safe to call repeatedly with the same `level + log_dir` (idempotent).
/// - Never panics; returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err.to_string(),
    }
}

/// Active habit projection for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HabitView {
    pub habit_id: String,
    pub original_goal: String,
    pub identity: String,
    pub benefit: String,
    pub emotion: String,
    /// Streak counter shown on the dashboard.
    pub check_ins: u32,
    /// `YYYY-MM-DD`, or `None` before the first check-in.
    pub last_check_in_date: Option<String>,
    pub created_at_ms: i64,
}

/// View selection envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionView {
    /// One of `idle|generating|active|celebrating`.
    pub state: String,
    pub habit: Option<HabitView>,
    pub pending_goal: Option<String>,
}

/// Result envelope for every session intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionActionResponse {
    /// Whether the intent was accepted.
    pub ok: bool,
    pub view: SessionView,
    /// Fire the celebration effect.
    pub celebrate: bool,
    /// User-visible, non-fatal notice (failed generation, unsaved progress).
    pub notice: Option<String>,
    /// Diagnostics message.
    pub message: String,
}

/// Returns the current session view, restoring it from storage on first use.
///
/// # FFI contract
/// - Sync call; first call opens the local database.
/// - Never panics; falls back to an idle view when the session cannot open.
#[flutter_rust_bridge::frb(sync)]
pub fn session_snapshot() -> SessionView {
    snapshot_in(&SESSION)
}

/// Turns a goal into a mantra and starts a new habit.
///
/// # FFI contract
/// - Async call; awaits one generation request.
/// - Rejected while another generation is in flight.
/// - Generation failure returns `ok=true`, idle view and a notice.
pub async fn session_submit_goal(goal: String) -> SessionActionResponse {
    submit_goal_in(&SESSION, goal).await
}

/// Records today's check-in and switches to the celebration view.
#[flutter_rust_bridge::frb(sync)]
pub fn session_check_in() -> SessionActionResponse {
    check_in_in(&SESSION)
}

/// Returns from the celebration view to the dashboard.
#[flutter_rust_bridge::frb(sync)]
pub fn session_continue() -> SessionActionResponse {
    continue_in(&SESSION)
}

/// Discards the current habit and returns to goal entry.
#[flutter_rust_bridge::frb(sync)]
pub fn session_reset() -> SessionActionResponse {
    reset_in(&SESSION)
}

fn snapshot_in(slot: &SessionSlot) -> SessionView {
    with_session(slot, |service| Ok::<_, String>(service.snapshot()))
        .map(to_session_view)
        .unwrap_or_else(|_| idle_view())
}

async fn submit_goal_in(slot: &SessionSlot, goal: String) -> SessionActionResponse {
    let begun = with_session(slot, |service| {
        let goal = service.begin_generation(&goal)?;
        Ok::<_, TransitionError>((goal, service.generator()))
    });
    let (goal, generator) = match begun {
        Ok(begun) => begun,
        Err(message) => return failure(slot, "session_submit_goal", message),
    };

    // Slot is unlocked across the await; other callers observe `Generating`.
    let outcome = generator.generate(&goal).await;
    let finished = with_session(slot, |service| service.finish_generation(outcome));
    respond(slot, "session_submit_goal", finished)
}

fn check_in_in(slot: &SessionSlot) -> SessionActionResponse {
    let result = with_session(slot, |service| service.check_in());
    respond(slot, "session_check_in", result)
}

fn continue_in(slot: &SessionSlot) -> SessionActionResponse {
    let result = with_session(slot, |service| service.continue_to_dashboard());
    respond(slot, "session_continue", result)
}

fn reset_in(slot: &SessionSlot) -> SessionActionResponse {
    let result = with_session(slot, |service| service.reset());
    respond(slot, "session_reset", result)
}

fn with_session<T, E: ToString>(
    slot: &SessionSlot,
    f: impl FnOnce(&mut LiveSession) -> Result<T, E>,
) -> Result<T, String> {
    let mut guard = slot.lock().unwrap_or_else(PoisonError::into_inner);
    if guard.is_none() {
        *guard = Some(open_session()?);
    }
    match guard.as_mut() {
        Some(service) => f(service).map_err(|err| err.to_string()),
        None => Err("session unavailable".to_string()),
    }
}

fn open_session() -> Result<LiveSession, String> {
    let config = CoreConfig::from_env().map_err(|err| err.to_string())?;
    let conn = open_db(&config.db_path).map_err(|err| {
        error!(
            "event=session_open module=ffi status=error error_code=db_open_failed error={err}"
        );
        format!("session DB open failed: {err}")
    })?;
    let generator = Arc::new(GeminiMantraGenerator::new(config.gemini));
    let service = HabitService::restore(SqliteHabitStore::new(conn), generator);
    info!(
        "event=session_open module=ffi status=ok state={}",
        service.state()
    );
    Ok(service)
}

fn respond(
    slot: &SessionSlot,
    operation: &str,
    result: Result<SessionUpdate, String>,
) -> SessionActionResponse {
    match result {
        Ok(update) => SessionActionResponse {
            ok: true,
            view: snapshot_in(slot),
            celebrate: update.celebrate,
            notice: update.notices.first().map(ToString::to_string),
            message: format!("{operation} ok: {}", update.state),
        },
        Err(message) => failure(slot, operation, message),
    }
}

fn failure(slot: &SessionSlot, operation: &str, message: String) -> SessionActionResponse {
    SessionActionResponse {
        ok: false,
        view: snapshot_in(slot),
        celebrate: false,
        notice: None,
        message: format!("{operation} failed: {message}"),
    }
}

fn to_session_view(snapshot: SessionSnapshot) -> SessionView {
    SessionView {
        state: snapshot.state.as_str().to_string(),
        habit: snapshot.habit.map(to_habit_view),
        pending_goal: snapshot.pending_goal,
    }
}

fn to_habit_view(habit: HabitRecord) -> HabitView {
    HabitView {
        habit_id: habit.id.to_string(),
        original_goal: habit.original_goal,
        identity: habit.mantra.identity,
        benefit: habit.mantra.benefit,
        emotion: habit.mantra.emotion,
        check_ins: habit.check_ins,
        last_check_in_date: habit
            .last_check_in_date
            .map(|day| day.to_string()),
        created_at_ms: habit.created_at,
    }
}

fn idle_view() -> SessionView {
    SessionView {
        state: "idle".to_string(),
        habit: None,
        pending_goal: None,
    }
}

#[cfg(test)]
mod tests {
    use super::{
        check_in_in, continue_in, core_version, init_logging, ping, reset_in, session_snapshot,
        snapshot_in, submit_goal_in, SessionActionResponse, SessionSlot, SessionView,
    };
    use async_trait::async_trait;
    use habitmantra_core::db::open_db_in_memory;
    use habitmantra_core::{
        GenerationError, GenerationResult, HabitService, MantraGenerator, MantraParts,
        SqliteHabitStore,
    };
    use std::sync::{Arc, Mutex, OnceLock};

    const GOAL: &str = "  我要读完100本书 ";

    /// What the generator saw while its call was in flight.
    struct InFlight {
        lock_free: bool,
        view: SessionView,
        resubmit: SessionActionResponse,
    }

    #[derive(Default)]
    struct StubGenerator {
        fail: bool,
        watched: OnceLock<&'static SessionSlot>,
        in_flight: Mutex<Option<InFlight>>,
    }

    #[async_trait]
    impl MantraGenerator for StubGenerator {
        fn name(&self) -> &'static str {
            "stub"
        }

        async fn generate(&self, _goal: &str) -> GenerationResult<MantraParts> {
            if let Some(slot) = self.watched.get().copied() {
                let lock_free = slot.try_lock().is_ok();
                let view = snapshot_in(slot);
                let resubmit = submit_goal_in(slot, "写作".to_string()).await;
                *self.in_flight.lock().unwrap() = Some(InFlight {
                    lock_free,
                    view,
                    resubmit,
                });
            }
            if self.fail {
                return Err(GenerationError::MissingApiKey);
            }
            Ok(MantraParts::new(
                "我是一个每天都看一页书的人",
                "它让我保持进步的惯性",
                "所以我会很轻松快乐",
            ))
        }
    }

    fn slot_with(generator: Arc<StubGenerator>) -> &'static SessionSlot {
        let store = SqliteHabitStore::new(open_db_in_memory().unwrap());
        let service = HabitService::restore(store, generator);
        Box::leak(Box::new(Mutex::new(Some(service))))
    }

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }

    #[test]
    fn init_logging_rejects_empty_log_dir() {
        let error = init_logging("info".to_string(), String::new());
        assert!(error.contains("empty"));
    }

    #[test]
    fn init_logging_rejects_unsupported_level() {
        let error = init_logging("verbose".to_string(), "tmp/logs".to_string());
        assert!(error.contains("unsupported log level"));
    }

    #[test]
    fn snapshot_reports_a_known_state() {
        let view = session_snapshot();
        assert!(["idle", "generating", "active", "celebrating"].contains(&view.state.as_str()));
        assert_eq!(view.habit.is_some(), matches!(view.state.as_str(), "active" | "celebrating"));
    }

    #[tokio::test]
    async fn blank_goal_is_rejected_without_changing_the_session() {
        let slot = slot_with(Arc::new(StubGenerator::default()));
        let response = submit_goal_in(slot, "   ".to_string()).await;
        assert!(!response.ok);
        assert!(response.message.contains("session_submit_goal failed"));
        assert_eq!(response.view.state, "idle");
    }

    #[tokio::test]
    async fn habit_lifecycle_through_every_intent() {
        let slot = slot_with(Arc::new(StubGenerator::default()));

        let created = submit_goal_in(slot, GOAL.to_string()).await;
        assert!(created.ok, "{}", created.message);
        assert_eq!(created.view.state, "active");
        let habit = created.view.habit.expect("active view carries habit");
        assert_eq!(habit.original_goal, GOAL);
        assert_eq!(habit.check_ins, 0);
        assert_eq!(habit.last_check_in_date, None);

        let checked = check_in_in(slot);
        assert!(checked.ok, "{}", checked.message);
        assert!(checked.celebrate);
        assert_eq!(checked.view.state, "celebrating");
        let habit = checked.view.habit.expect("celebrating view carries habit");
        assert_eq!(habit.check_ins, 1);
        assert!(habit.last_check_in_date.is_some());

        let back = continue_in(slot);
        assert!(back.ok, "{}", back.message);
        assert_eq!(back.view.state, "active");

        let again = check_in_in(slot);
        assert!(again.ok, "{}", again.message);
        assert!(!again.celebrate);
        assert_eq!(again.view.state, "celebrating");
        assert_eq!(again.view.habit.map(|habit| habit.check_ins), Some(1));

        let reset = reset_in(slot);
        assert!(reset.ok, "{}", reset.message);
        assert_eq!(reset.view.state, "idle");
        assert_eq!(reset.view.habit, None);
    }

    #[tokio::test]
    async fn failed_generation_returns_idle_view_with_notice() {
        let slot = slot_with(Arc::new(StubGenerator {
            fail: true,
            ..StubGenerator::default()
        }));

        let response = submit_goal_in(slot, GOAL.to_string()).await;
        assert!(response.ok, "{}", response.message);
        assert!(!response.celebrate);
        assert_eq!(response.view.state, "idle");
        assert_eq!(response.view.habit, None);
        let notice = response.notice.expect("failure should carry a notice");
        assert!(notice.contains("API key"), "{notice}");
    }

    #[tokio::test]
    async fn session_stays_readable_and_rejects_resubmit_during_generation() {
        let generator = Arc::new(StubGenerator::default());
        let slot = slot_with(generator.clone());
        assert!(generator.watched.set(slot).is_ok());

        let response = submit_goal_in(slot, GOAL.to_string()).await;
        assert!(response.ok, "{}", response.message);
        assert_eq!(response.view.state, "active");

        let in_flight = generator
            .in_flight
            .lock()
            .unwrap()
            .take()
            .expect("generator should have observed the session");
        assert!(in_flight.lock_free);
        assert_eq!(in_flight.view.state, "generating");
        assert_eq!(in_flight.view.pending_goal.as_deref(), Some(GOAL));
        assert!(!in_flight.resubmit.ok);
        assert!(in_flight.resubmit.message.contains("session_submit_goal failed"));
        assert_eq!(in_flight.resubmit.view.state, "generating");
    }

    #[test]
    fn intents_outside_their_state_are_rejected() {
        let slot = slot_with(Arc::new(StubGenerator::default()));

        for response in [check_in_in(slot), continue_in(slot), reset_in(slot)] {
            assert!(!response.ok);
            assert!(!response.celebrate);
            assert_eq!(response.view.state, "idle");
        }
    }
}
