//! Startup recovery of interrupted sessions.
//!
//! Runs before any new session may begin. A fresh-enough persisted record
//! comes back as an engine in the paused state so the user explicitly
//! confirms continuation; the interval the process spent dead is excluded
//! from elapsed time by re-dating the pause to the record's last update.
//! Stale records are discarded. The record itself is cleared only by an
//! explicit end or [`discard`], never here implicitly, so another kill
//! before the user confirms still finds the same record.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use super::engine::SessionEngine;
use crate::error::EngineError;
use crate::feedback::{EffectDevice, NullDevice};
use crate::metrics::HeartRateBuffer;
use crate::storage::{Config, Database};

/// Look for an interrupted session in durable storage.
///
/// Returns `Ok(None)` when there is nothing to recover: no record, a record
/// from a session that already ended, an unreadable record, or one older
/// than the configured staleness bound. None of these block starting a new
/// session.
pub fn resume_interrupted(
    db: &Database,
    config: &Config,
    now: DateTime<Utc>,
) -> Result<Option<SessionEngine>, EngineError> {
    resume_interrupted_with_device(db, config, Arc::new(NullDevice), now)
}

pub fn resume_interrupted_with_device(
    db: &Database,
    config: &Config,
    device: Arc<dyn EffectDevice>,
    now: DateTime<Utc>,
) -> Result<Option<SessionEngine>, EngineError> {
    let mut state = match db.load_active_session() {
        Ok(Some(state)) => state,
        Ok(None) => return Ok(None),
        Err(e) => {
            warn!(error = %e, "unreadable session record; no recovery available");
            return Ok(None);
        }
    };

    if !state.is_active {
        // Leftover from a session that ended without clearing its record.
        if let Err(e) = discard(db) {
            warn!(error = %e, "failed to drop ended session record");
        }
        return Ok(None);
    }

    let gap_secs = (now - state.last_update).num_seconds().max(0) as u64;
    if gap_secs > config.session.stale_after_secs {
        info!(
            session_id = %state.session_id,
            gap_secs,
            "persisted session too old to recover; discarding"
        );
        discard(db)?;
        return Ok(None);
    }

    // Exclude the dead interval: the record is treated as paused since its
    // last update. An interrupted in-flight pause keeps its original start.
    if !state.is_paused {
        state.begin_pause(state.last_update);
    }
    state.last_update = now;

    let heart_rate = match db.load_heart_rate() {
        Ok(Some(buffer)) => buffer,
        Ok(None) => HeartRateBuffer::default(),
        Err(e) => {
            warn!(error = %e, "unreadable heart-rate buffer; recovering without samples");
            HeartRateBuffer::default()
        }
    };

    info!(session_id = %state.session_id, gap_secs, "recovered interrupted session, paused");
    let engine = SessionEngine::from_persisted(
        state,
        heart_rate,
        config.clone(),
        Some(db.clone()),
        device,
        now,
    );
    // Keep the record recoverable across another background/kill cycle.
    engine.persist();
    Ok(Some(engine))
}

/// Explicitly throw away a recoverable record (user declined to continue).
pub fn discard(db: &Database) -> Result<(), EngineError> {
    db.clear_active_session()?;
    db.clear_heart_rate()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::MetricUpdate;
    use crate::session::{ExercisePlan, WorkoutPhase, WorkoutPlan};
    use chrono::{Duration, TimeZone};

    fn plan() -> WorkoutPlan {
        WorkoutPlan {
            id: "push-day".into(),
            name: "Push Day".into(),
            exercises: vec![
                ExercisePlan {
                    id: "bench".into(),
                    name: "Bench Press".into(),
                    phase: WorkoutPhase::Strength,
                    sets: 3,
                    suggested_duration_secs: None,
                },
                ExercisePlan {
                    id: "plank".into(),
                    name: "Plank".into(),
                    phase: WorkoutPhase::Core,
                    sets: 2,
                    suggested_duration_secs: Some(60),
                },
            ],
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    /// Build a session against storage, drive it a little, and "kill" the
    /// process by dropping the engine.
    fn interrupted_session(db: &Database) -> (String, u64) {
        let mut engine =
            SessionEngine::start(&plan(), Config::default(), Some(db.clone()), t0());
        engine.start_exercise("bench", None, t0() + Duration::seconds(10)).unwrap();
        engine.complete_set(0, t0() + Duration::seconds(60)).unwrap();
        engine
            .ingest(MetricUpdate::HeartRate { bpm: 142.0 }, t0() + Duration::seconds(70))
            .unwrap();
        engine
            .ingest(MetricUpdate::ActiveCalories { kcal: 9.0 }, t0() + Duration::seconds(75))
            .unwrap();
        // Persist what a background transition would have written.
        engine.persist();
        let id = engine.state().session_id.clone();
        let elapsed = engine.state().elapsed_ms(t0() + Duration::seconds(75));
        (id, elapsed)
    }

    #[test]
    fn fresh_record_recovers_paused_with_identical_progress() {
        let db = Database::open_memory().unwrap();
        let (session_id, _) = interrupted_session(&db);
        let before = db.load_active_session().unwrap().unwrap();

        let restart = t0() + Duration::seconds(200);
        let engine = resume_interrupted(&db, &Config::default(), restart)
            .unwrap()
            .expect("session should be recoverable");

        let state = engine.state();
        assert_eq!(state.session_id, session_id);
        assert!(state.is_paused, "recovery resumes paused for explicit confirmation");

        // Progress data survives bit-for-bit, metrics buffer included.
        assert_eq!(state.phase, before.phase);
        assert_eq!(state.exercises, before.exercises);
        assert_eq!(state.current_exercise, before.current_exercise);
        assert_eq!(state.completed_exercises, before.completed_exercises);
        assert_eq!(state.calories, before.calories);
        assert_eq!(engine.heart_rate().len(), 1);
        assert_eq!(engine.heart_rate().latest().unwrap().bpm, 142.0);
    }

    #[test]
    fn dead_interval_is_excluded_from_elapsed_time() {
        let db = Database::open_memory().unwrap();
        let (_, elapsed_at_kill) = interrupted_session(&db);

        // Ten minutes pass before the restart.
        let restart = t0() + Duration::seconds(675);
        let engine = resume_interrupted(&db, &Config::default(), restart)
            .unwrap()
            .unwrap();

        assert_eq!(engine.state().elapsed_ms(restart), elapsed_at_kill);
        // Still frozen later, until the user resumes.
        assert_eq!(
            engine.state().elapsed_ms(restart + Duration::seconds(300)),
            elapsed_at_kill
        );
    }

    #[test]
    fn stale_record_is_discarded() {
        let db = Database::open_memory().unwrap();
        interrupted_session(&db);

        let mut config = Config::default();
        config.session.stale_after_secs = 300;

        // Last update was t0+75; restart 10 minutes later.
        let restart = t0() + Duration::seconds(75 + 600);
        let recovered = resume_interrupted(&db, &config, restart).unwrap();
        assert!(recovered.is_none());
        assert!(db.load_active_session().unwrap().is_none());
        assert!(db.load_heart_rate().unwrap().is_none());
    }

    #[test]
    fn record_survives_a_second_kill_before_confirmation() {
        let db = Database::open_memory().unwrap();
        let (session_id, _) = interrupted_session(&db);

        let restart = t0() + Duration::seconds(120);
        let engine = resume_interrupted(&db, &Config::default(), restart)
            .unwrap()
            .unwrap();
        drop(engine); // killed again before the user confirmed

        let second_restart = restart + Duration::seconds(120);
        let engine = resume_interrupted(&db, &Config::default(), second_restart)
            .unwrap()
            .expect("record must still be recoverable");
        assert_eq!(engine.state().session_id, session_id);
    }

    #[test]
    fn ended_or_missing_records_yield_no_recovery() {
        let db = Database::open_memory().unwrap();
        assert!(resume_interrupted(&db, &Config::default(), t0())
            .unwrap()
            .is_none());

        // A record flagged inactive is cleaned up.
        let engine = SessionEngine::start(&plan(), Config::default(), None, t0());
        let mut state = engine.state().clone();
        state.is_active = false;
        db.save_active_session(&state).unwrap();

        assert!(resume_interrupted(&db, &Config::default(), t0() + Duration::seconds(10))
            .unwrap()
            .is_none());
        assert!(db.load_active_session().unwrap().is_none());
    }

    #[test]
    fn corrupt_record_degrades_to_no_recovery() {
        let db = Database::open_memory().unwrap();
        db.kv_set("active_session", "{not valid").unwrap();
        assert!(resume_interrupted(&db, &Config::default(), t0())
            .unwrap()
            .is_none());
    }

    #[test]
    fn recovered_session_resumes_cleanly() {
        let db = Database::open_memory().unwrap();
        interrupted_session(&db);

        let restart = t0() + Duration::seconds(300);
        let mut engine = resume_interrupted(&db, &Config::default(), restart)
            .unwrap()
            .unwrap();

        let confirm = restart + Duration::seconds(30);
        engine.resume(confirm).unwrap();
        assert!(!engine.state().is_paused);

        // Clock runs again from the confirmation instant.
        assert_eq!(
            engine.state().elapsed_ms(confirm + Duration::seconds(10)),
            engine.state().elapsed_ms(confirm) + 10_000
        );
    }
}
