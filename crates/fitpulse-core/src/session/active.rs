//! Module-level accessor for the single process-wide session.
//!
//! Exactly one interactive session may be active at a time. The instance
//! lives in a process-wide slot with an explicit create/destroy lifecycle so
//! tests can reset it between cases; nothing is constructed at import time.

use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};

use super::engine::SessionEngine;
use super::state::{SessionSnapshot, SessionSummary, WorkoutPlan};
use crate::error::SessionError;
use crate::lifecycle::{AppState, LifecycleMonitor};
use crate::storage::{Config, Database};

static ACTIVE: Mutex<Option<SessionEngine>> = Mutex::new(None);

fn slot() -> MutexGuard<'static, Option<SessionEngine>> {
    ACTIVE.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Start the process-wide session. Fails with `SessionAlreadyActive` when
/// one is already running; an ended (but not yet destroyed) session is
/// replaced.
pub fn start(
    plan: &WorkoutPlan,
    config: Config,
    store: Option<Database>,
    now: DateTime<Utc>,
) -> Result<SessionSnapshot, SessionError> {
    let mut slot = slot();
    if slot.as_ref().is_some_and(SessionEngine::is_active) {
        return Err(SessionError::SessionAlreadyActive);
    }
    let engine = SessionEngine::start(plan, config, store, now);
    let snapshot = engine.snapshot(now);
    *slot = Some(engine);
    Ok(snapshot)
}

/// Install an engine built elsewhere (session recovery). Same exclusivity
/// rule as `start`.
pub fn install(engine: SessionEngine) -> Result<(), SessionError> {
    let mut slot = slot();
    if slot.as_ref().is_some_and(SessionEngine::is_active) {
        return Err(SessionError::SessionAlreadyActive);
    }
    *slot = Some(engine);
    Ok(())
}

/// Run `f` against the current session instance.
pub fn with<R>(f: impl FnOnce(&mut SessionEngine) -> R) -> Result<R, SessionError> {
    let mut slot = slot();
    match slot.as_mut() {
        Some(engine) => Ok(f(engine)),
        None => Err(SessionError::NoActiveSession),
    }
}

/// End the current session. The instance stays in the slot with its cached
/// summary, so a repeated end returns the same value.
pub fn end(now: DateTime<Utc>) -> Result<SessionSummary, SessionError> {
    with(|engine| engine.end(now))?
}

pub fn is_active() -> bool {
    slot().as_ref().is_some_and(SessionEngine::is_active)
}

/// Drop the instance entirely. Subsequent operations report
/// `NoActiveSession`.
pub fn destroy() {
    *slot() = None;
}

/// Wire lifecycle transitions to the session slot: going to background
/// persists the record (best-effort, before the handler returns), coming
/// back to the foreground applies the catch-up tick, and the termination
/// hook gets one last persistence attempt.
pub fn attach_lifecycle(monitor: &mut LifecycleMonitor) {
    monitor.subscribe(|signal| match signal.current {
        AppState::Background => {
            let _ = with(|engine| engine.persist());
        }
        AppState::Active => {
            let _ = with(|engine| {
                engine.reconcile(signal.at);
            });
        }
    });
    monitor.on_terminate(|| {
        let _ = with(|engine| engine.persist());
        Ok(())
    });
}

#[cfg(test)]
pub(crate) static TEST_GUARD: Mutex<()> = Mutex::new(());

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::NoopBridge;
    use crate::session::{ExercisePlan, WorkoutPhase};
    use chrono::{Duration, TimeZone};

    fn plan() -> WorkoutPlan {
        WorkoutPlan {
            id: "mobility".into(),
            name: "Mobility".into(),
            exercises: vec![ExercisePlan {
                id: "stretch".into(),
                name: "Stretch".into(),
                phase: WorkoutPhase::Cooldown,
                sets: 2,
                suggested_duration_secs: None,
            }],
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn only_one_session_may_be_active() {
        let _guard = TEST_GUARD.lock().unwrap_or_else(PoisonError::into_inner);
        destroy();

        start(&plan(), Config::default(), None, t0()).unwrap();
        let err = start(&plan(), Config::default(), None, t0()).unwrap_err();
        assert_eq!(err, SessionError::SessionAlreadyActive);

        // An ended session no longer blocks a new start.
        end(t0() + Duration::seconds(10)).unwrap();
        start(&plan(), Config::default(), None, t0() + Duration::seconds(20)).unwrap();
        destroy();
    }

    #[test]
    fn operations_without_a_session_fail_typed() {
        let _guard = TEST_GUARD.lock().unwrap_or_else(PoisonError::into_inner);
        destroy();

        assert_eq!(
            with(|e| e.is_active()).unwrap_err(),
            SessionError::NoActiveSession
        );
        assert_eq!(end(t0()).unwrap_err(), SessionError::NoActiveSession);
        assert!(!is_active());
    }

    #[test]
    fn end_is_idempotent_until_destroy() {
        let _guard = TEST_GUARD.lock().unwrap_or_else(PoisonError::into_inner);
        destroy();

        start(&plan(), Config::default(), None, t0()).unwrap();
        let first = end(t0() + Duration::seconds(30)).unwrap();
        let second = end(t0() + Duration::seconds(99)).unwrap();
        assert_eq!(first, second);

        destroy();
        assert_eq!(end(t0()).unwrap_err(), SessionError::NoActiveSession);
    }

    #[test]
    fn lifecycle_wiring_reconciles_on_foreground() {
        let _guard = TEST_GUARD.lock().unwrap_or_else(PoisonError::into_inner);
        destroy();

        start(&plan(), Config::default(), None, t0()).unwrap();
        let mut monitor = LifecycleMonitor::new(&NoopBridge);
        attach_lifecycle(&mut monitor);

        monitor.report(AppState::Background, t0() + Duration::seconds(10));
        monitor.report(AppState::Active, t0() + Duration::seconds(70));

        // The catch-up tick advanced the workout clock by the full gap.
        let elapsed = with(|e| {
            e.timer_snapshots()
                .iter()
                .find(|s| s.role == crate::timer::TimerRole::Workout)
                .map(|s| s.elapsed_ms)
        })
        .unwrap()
        .unwrap();
        assert_eq!(elapsed, 70_000);
        destroy();
    }
}
