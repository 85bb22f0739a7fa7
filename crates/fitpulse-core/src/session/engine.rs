//! The interactive workout session orchestrator.
//!
//! `SessionEngine` composes the timer manager, the session record, the
//! feedback dispatchers and the storage handle. UI actions call the
//! operation methods; each one mutates the record before either channel
//! fires, and a clock tick advances every timer and folds completions into
//! state before notifying the state channel and then the timer channel — so
//! no subscriber ever sees a timer update newer than the session state it
//! was delivered alongside.
//!
//! Session-level states: NotStarted -> Active <-> Paused -> Ended. Ticks are
//! gated on `is_active && !is_paused`; after `end` no tick can mutate the
//! record.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use super::state::{SessionSnapshot, SessionState, SessionSummary, WorkoutPlan};
use crate::error::SessionError;
use crate::events::{Event, Publisher, Subscription};
use crate::feedback::{AudioDispatcher, EffectDevice, HapticDispatcher, NullDevice};
use crate::metrics::{HeartRateBuffer, HeartRateSample, MetricUpdate};
use crate::storage::{Config, Database};
use crate::timer::{Timer, TimerManager, TimerRole, TimerSnapshot, TimerState};

pub struct SessionEngine {
    state: SessionState,
    timers: TimerManager,
    config: Config,
    store: Option<Database>,
    heart_rate: HeartRateBuffer,
    audio: AudioDispatcher,
    haptics: HapticDispatcher,
    state_channel: Publisher<SessionSnapshot>,
    /// Finalized exactly once; re-ends return the cached value.
    summary: Option<SessionSummary>,
}

impl SessionEngine {
    /// Start a new session from a workout definition. The whole-workout
    /// clock starts immediately as an open-ended count-up timer.
    pub fn start(
        plan: &WorkoutPlan,
        config: Config,
        store: Option<Database>,
        now: DateTime<Utc>,
    ) -> Self {
        Self::start_with_device(plan, config, store, Arc::new(NullDevice), now)
    }

    pub fn start_with_device(
        plan: &WorkoutPlan,
        config: Config,
        store: Option<Database>,
        device: Arc<dyn EffectDevice>,
        now: DateTime<Utc>,
    ) -> Self {
        let state = SessionState::new(plan, now);
        let mut timers = TimerManager::new();
        timers.start_timer(Timer::open_ended(TimerRole::Workout));

        let mut engine = Self {
            audio: AudioDispatcher::new(config.audio.clone(), device.clone()),
            haptics: HapticDispatcher::new(config.haptics.clone(), device),
            state,
            timers,
            config,
            store,
            heart_rate: HeartRateBuffer::default(),
            state_channel: Publisher::new(),
            summary: None,
        };

        info!(
            session_id = %engine.state.session_id,
            workout_id = %engine.state.workout_id,
            "interactive session started"
        );
        engine.persist();
        engine.emit(Event::SessionStarted {
            session_id: engine.state.session_id.clone(),
            workout_id: engine.state.workout_id.clone(),
            at: now,
        });
        engine.publish_state(now);
        engine
    }

    /// Rebuild an engine around a persisted record. Timers are recreated
    /// fresh for the current phase; only elapsed accounting carries over.
    pub fn from_persisted(
        state: SessionState,
        heart_rate: HeartRateBuffer,
        config: Config,
        store: Option<Database>,
        device: Arc<dyn EffectDevice>,
        now: DateTime<Utc>,
    ) -> Self {
        let mut timers = TimerManager::new();
        let workout = Timer::open_ended(TimerRole::Workout).with_elapsed_ms(state.elapsed_ms(now));
        timers.start_timer(if state.is_paused {
            workout.paused()
        } else {
            workout
        });

        Self {
            audio: AudioDispatcher::new(config.audio.clone(), device.clone()),
            haptics: HapticDispatcher::new(config.haptics.clone(), device),
            state,
            timers,
            config,
            store,
            heart_rate,
            state_channel: Publisher::new(),
            summary: None,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_active(&self) -> bool {
        self.state.is_active
    }

    pub fn heart_rate(&self) -> &HeartRateBuffer {
        &self.heart_rate
    }

    pub fn timer_snapshots(&self) -> Vec<TimerSnapshot> {
        self.timers.snapshots()
    }

    pub fn snapshot(&self, now: DateTime<Utc>) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.state.session_id.clone(),
            workout_id: self.state.workout_id.clone(),
            phase: self.state.phase,
            is_active: self.state.is_active,
            is_paused: self.state.is_paused,
            elapsed_ms: self.state.elapsed_ms(now),
            current_exercise: self.state.current_exercise.clone(),
            set_cursor: self.state.set_cursor,
            sets_completed: self.state.sets_completed(),
            sets_total: self.state.sets_total(),
            completed_exercises: self.state.completed_exercises.clone(),
            calories: self.state.calories,
            heart_rate_bpm: self.heart_rate.latest().map(|s| s.bpm),
            rest_remaining_ms: self
                .timers
                .get(TimerRole::Rest)
                .filter(|s| s.state == TimerState::Running || s.state == TimerState::Paused)
                .and_then(|s| s.remaining_ms),
            at: now,
        }
    }

    /// Whether skipping the timer in `role` should be confirmed by the user
    /// first. Rest timers never need confirmation; workout/exercise timers
    /// do once more than the configured threshold remains (open-ended
    /// timers always do).
    pub fn skip_requires_confirmation(&self, role: TimerRole) -> bool {
        if role == TimerRole::Rest {
            return false;
        }
        let Some(snapshot) = self.timers.get(role) else {
            return false;
        };
        match snapshot.remaining_ms {
            None => true,
            Some(ms) => ms > self.config.session.skip_confirm_threshold_secs * 1000,
        }
    }

    // ── Subscriptions ────────────────────────────────────────────────

    /// Consolidated session-state channel.
    pub fn subscribe_state<F>(&mut self, callback: F) -> Subscription
    where
        F: FnMut(&SessionSnapshot) + Send + 'static,
    {
        self.state_channel.subscribe(callback)
    }

    pub fn unsubscribe_state(&mut self, subscription: Subscription) {
        self.state_channel.unsubscribe(subscription);
    }

    /// Raw active-timer-list channel.
    pub fn subscribe_timers<F>(&mut self, callback: F) -> Subscription
    where
        F: FnMut(&Vec<TimerSnapshot>) + Send + 'static,
    {
        self.timers.subscribe(callback)
    }

    pub fn unsubscribe_timers(&mut self, subscription: Subscription) {
        self.timers.unsubscribe(subscription);
    }

    // ── Operations ───────────────────────────────────────────────────

    /// Point the session at an exercise. A suggested duration (given here or
    /// on the plan) starts an exercise timer; otherwise exercise timing is
    /// left to the whole-workout clock.
    pub fn start_exercise(
        &mut self,
        exercise_id: &str,
        suggested_duration_secs: Option<u64>,
        now: DateTime<Utc>,
    ) -> Result<(), SessionError> {
        self.ensure_active()?;

        let Some(exercise) = self.state.exercise(exercise_id) else {
            warn!(exercise_id, "start of unknown exercise ignored");
            return Ok(());
        };
        let phase = exercise.phase;
        let duration = suggested_duration_secs.or(exercise.suggested_duration_secs);

        let phase_changed = phase != self.state.phase;
        self.state.phase = phase;
        self.state.current_exercise = Some(exercise_id.to_string());
        self.state.set_cursor = self
            .state
            .exercise(exercise_id)
            .map_or(0, |e| e.next_set_index());
        self.state.last_update = now;

        match duration {
            Some(secs) => {
                self.timers
                    .start_timer(Timer::countdown(TimerRole::Exercise, secs));
            }
            None => {
                // Don't let a timer from the previous exercise keep running
                // against the new one.
                self.timers.complete_timer(TimerRole::Exercise);
            }
        }

        self.persist();
        if phase_changed {
            self.emit(Event::PhaseChanged { phase, at: now });
        }
        self.emit(Event::ExerciseStarted {
            exercise_id: exercise_id.to_string(),
            duration_secs: duration,
            at: now,
        });
        self.publish_state(now);
        Ok(())
    }

    /// Mark a set of the current exercise complete. Starts the auto-rest
    /// timer when configured. Never advances the exercise pointer.
    pub fn complete_set(&mut self, set_index: usize, now: DateTime<Utc>) -> Result<(), SessionError> {
        self.ensure_active()?;

        let Some(exercise_id) = self.state.current_exercise.clone() else {
            warn!(set_index, "set completion with no current exercise ignored");
            return Ok(());
        };
        if !self.state.mark_set_complete(set_index) {
            return Ok(());
        }
        self.state.last_update = now;

        self.emit(Event::SetCompleted {
            exercise_id,
            set_index,
            at: now,
        });

        if self.config.session.auto_rest {
            let secs = self.config.session.rest_duration_secs;
            self.timers.start_timer(
                Timer::countdown(TimerRole::Rest, secs)
                    .with_max_secs(self.config.session.rest_max_secs),
            );
            self.emit(Event::RestStarted {
                duration_secs: secs,
                at: now,
            });
        }

        self.persist();
        self.publish_state(now);
        Ok(())
    }

    /// Mark the current exercise complete and clear the pointer. Completing
    /// an exercise that isn't current is a UI race; it is logged and ignored.
    pub fn complete_exercise(
        &mut self,
        exercise_id: &str,
        now: DateTime<Utc>,
    ) -> Result<(), SessionError> {
        self.ensure_active()?;

        if self.state.current_exercise.as_deref() != Some(exercise_id) {
            warn!(
                exercise_id,
                current = ?self.state.current_exercise,
                "completion of non-current exercise ignored"
            );
            return Ok(());
        }

        self.state.mark_exercise_complete(exercise_id);
        self.state.current_exercise = None;
        self.state.set_cursor = 0;
        self.state.last_update = now;
        self.timers.complete_timer(TimerRole::Exercise);

        self.persist();
        self.emit(Event::ExerciseCompleted {
            exercise_id: exercise_id.to_string(),
            at: now,
        });
        self.publish_state(now);
        Ok(())
    }

    /// Route a skip to the rest timer; no effect when none is active.
    pub fn skip_rest_timer(&mut self, now: DateTime<Utc>) -> Result<(), SessionError> {
        self.ensure_active()?;
        if self.timers.skip_timer(TimerRole::Rest) {
            self.state.last_update = now;
            self.emit(Event::RestSkipped { at: now });
            self.publish_state(now);
        }
        Ok(())
    }

    /// Shift the rest timer by `delta_secs`; no effect when none is active.
    pub fn adjust_rest_timer(
        &mut self,
        delta_secs: i64,
        now: DateTime<Utc>,
    ) -> Result<(), SessionError> {
        self.ensure_active()?;
        let Some(snapshot) = self.timers.adjust_timer(TimerRole::Rest, delta_secs) else {
            return Ok(());
        };
        self.state.last_update = now;
        if snapshot.state == TimerState::Completed {
            self.emit(Event::TimerCompleted {
                role: TimerRole::Rest,
                at: now,
            });
        } else {
            self.emit(Event::RestAdjusted {
                remaining_ms: snapshot.remaining_ms.unwrap_or(0),
                at: now,
            });
        }
        self.publish_state(now);
        Ok(())
    }

    /// Pause the whole session: every timer stops and the pause interval
    /// starts accruing. Pausing an already paused session is a logged no-op.
    pub fn pause(&mut self, now: DateTime<Utc>) -> Result<(), SessionError> {
        self.ensure_active()?;
        if !self.state.begin_pause(now) {
            return Ok(());
        }
        self.timers.pause_all();
        self.persist();
        self.emit(Event::SessionPaused { at: now });
        self.publish_state(now);
        Ok(())
    }

    /// Resume: the finished pause interval joins the cumulative total and
    /// every timer restarts. Resuming an unpaused session is a logged no-op.
    pub fn resume(&mut self, now: DateTime<Utc>) -> Result<(), SessionError> {
        self.ensure_active()?;
        let Some(paused_ms) = self.state.end_pause(now) else {
            return Ok(());
        };
        self.timers.resume_all();
        self.persist();
        self.emit(Event::SessionResumed { paused_ms, at: now });
        self.publish_state(now);
        Ok(())
    }

    /// End the session: stop all timers, finalize the summary, clear the
    /// persisted record. Calling `end` again returns the same summary
    /// without recomputation.
    pub fn end(&mut self, now: DateTime<Utc>) -> Result<SessionSummary, SessionError> {
        if let Some(summary) = &self.summary {
            return Ok(summary.clone());
        }
        if !self.state.is_active {
            return Err(SessionError::NoActiveSession);
        }

        // Close an in-flight pause so the duration math is final.
        if self.state.is_paused {
            self.state.end_pause(now);
        }
        let duration_ms = self.state.elapsed_ms(now);

        self.timers.stop_all();
        self.state.is_active = false;
        self.state.last_update = now;

        let summary = SessionSummary {
            session_id: self.state.session_id.clone(),
            workout_id: self.state.workout_id.clone(),
            started_at: self.state.started_at,
            ended_at: now,
            duration_ms,
            paused_ms: self.state.paused_total_ms,
            exercises_completed: self.state.completed_exercises.len(),
            sets_completed: self.state.sets_completed(),
            calories: self.state.calories,
            avg_bpm: self.heart_rate.avg_bpm(),
            max_bpm: self.heart_rate.max_bpm(),
        };

        if let Some(db) = &self.store {
            if let Err(e) = db.clear_active_session() {
                warn!(error = %e, "failed to clear persisted session record");
            }
            if let Err(e) = db.clear_heart_rate() {
                warn!(error = %e, "failed to clear persisted heart-rate buffer");
            }
            if let Err(e) = db.record_summary(&summary) {
                warn!(error = %e, "failed to record session history");
            }
        }

        info!(
            session_id = %summary.session_id,
            duration_ms = summary.duration_ms,
            "interactive session ended"
        );
        self.summary = Some(summary.clone());
        self.emit(Event::SessionEnded {
            session_id: summary.session_id.clone(),
            duration_ms,
            at: now,
        });
        self.publish_state(now);
        Ok(summary)
    }

    // ── Metrics ──────────────────────────────────────────────────────

    /// Fold one update from the external metrics feed into the session.
    pub fn ingest(&mut self, update: MetricUpdate, now: DateTime<Utc>) -> Result<(), SessionError> {
        self.ensure_active()?;
        match update {
            MetricUpdate::HeartRate { bpm } => {
                self.heart_rate.push(HeartRateSample { bpm, at: now });
            }
            MetricUpdate::ActiveCalories { kcal } => {
                self.state.calories += kcal;
            }
        }
        self.state.last_update = now;
        self.publish_state(now);
        Ok(())
    }

    /// Merge samples collected while the process was backgrounded.
    pub fn merge_background_samples(&mut self, buffer: HeartRateBuffer) {
        self.heart_rate.merge(buffer);
    }

    // ── Clock ────────────────────────────────────────────────────────

    /// One shared clock tick. Advances every timer, folds completions into
    /// session state, then publishes: state channel first, timer channel
    /// second. Gated so nothing moves while paused or after end.
    pub fn tick(&mut self, delta_ms: u64, now: DateTime<Utc>) {
        if !self.state.is_active || self.state.is_paused {
            return;
        }
        let completed = self.timers.advance(delta_ms);
        self.state.last_update = now;
        for role in &completed {
            self.emit(Event::TimerCompleted { role: *role, at: now });
        }
        self.publish_state(now);
        self.timers.publish_active();
    }

    /// Apply the single big catch-up tick for the interval spent away from
    /// the foreground. Returns the gap applied, if any.
    pub fn reconcile(&mut self, now: DateTime<Utc>) -> Option<u64> {
        if !self.state.is_active || self.state.is_paused {
            return None;
        }
        let gap_ms = (now - self.state.last_update).num_milliseconds().max(0) as u64;
        if gap_ms == 0 {
            return None;
        }
        self.tick(gap_ms, now);
        self.emit(Event::Reconciled { gap_ms, at: now });
        Some(gap_ms)
    }

    // ── Persistence ──────────────────────────────────────────────────

    /// Write the session record and heart-rate buffer to durable storage.
    /// Best-effort: failures are logged and the session continues on
    /// in-memory state only.
    pub fn persist(&self) {
        let Some(db) = &self.store else {
            return;
        };
        if let Err(e) = db.save_active_session(&self.state) {
            warn!(error = %e, "session record persistence failed; continuing in memory");
        }
        if let Err(e) = db.save_heart_rate(&self.heart_rate) {
            warn!(error = %e, "heart-rate buffer persistence failed; continuing in memory");
        }
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn ensure_active(&self) -> Result<(), SessionError> {
        if self.state.is_active {
            Ok(())
        } else {
            Err(SessionError::NoActiveSession)
        }
    }

    fn emit(&self, event: Event) {
        self.audio.handle(&event);
        self.haptics.handle(&event);
    }

    fn publish_state(&mut self, now: DateTime<Utc>) {
        let snapshot = self.snapshot(now);
        self.state_channel.publish(&snapshot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{ExercisePlan, WorkoutPhase};
    use chrono::{Duration, TimeZone};
    use std::sync::{Arc, Mutex};

    fn plan() -> WorkoutPlan {
        WorkoutPlan {
            id: "full-body".into(),
            name: "Full Body".into(),
            exercises: vec![
                ExercisePlan {
                    id: "jumping-jacks".into(),
                    name: "Jumping Jacks".into(),
                    phase: WorkoutPhase::Warmup,
                    sets: 1,
                    suggested_duration_secs: Some(120),
                },
                ExercisePlan {
                    id: "bench".into(),
                    name: "Bench Press".into(),
                    phase: WorkoutPhase::Strength,
                    sets: 3,
                    suggested_duration_secs: None,
                },
            ],
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    fn engine() -> SessionEngine {
        SessionEngine::start(&plan(), Config::default(), None, t0())
    }

    #[test]
    fn start_installs_the_workout_clock() {
        let engine = engine();
        let timers = engine.timer_snapshots();
        assert_eq!(timers.len(), 1);
        assert_eq!(timers[0].role, TimerRole::Workout);
        assert_eq!(timers[0].remaining_ms, None);
        assert!(engine.is_active());
    }

    #[test]
    fn timed_exercise_starts_an_exercise_timer() {
        let mut engine = engine();
        engine
            .start_exercise("jumping-jacks", None, t0() + Duration::seconds(5))
            .unwrap();

        let exercise = engine
            .timer_snapshots()
            .into_iter()
            .find(|s| s.role == TimerRole::Exercise)
            .unwrap();
        assert_eq!(exercise.remaining_ms, Some(120_000));
        assert_eq!(engine.state().phase, WorkoutPhase::Warmup);
    }

    #[test]
    fn untimed_exercise_leaves_timing_to_the_workout_clock() {
        let mut engine = engine();
        engine
            .start_exercise("bench", None, t0() + Duration::seconds(5))
            .unwrap();

        assert!(engine
            .timer_snapshots()
            .iter()
            .all(|s| s.role != TimerRole::Exercise));
        assert_eq!(engine.state().phase, WorkoutPhase::Strength);
    }

    #[test]
    fn complete_set_starts_auto_rest_without_advancing_pointer() {
        let mut engine = engine();
        let now = t0() + Duration::seconds(10);
        engine.start_exercise("bench", None, now).unwrap();
        engine.complete_set(0, now).unwrap();

        let rest = engine
            .timer_snapshots()
            .into_iter()
            .find(|s| s.role == TimerRole::Rest)
            .unwrap();
        assert_eq!(rest.remaining_ms, Some(60_000));
        assert_eq!(
            engine.state().current_exercise.as_deref(),
            Some("bench")
        );
        assert_eq!(engine.state().sets_completed(), 1);
    }

    #[test]
    fn complete_exercise_clears_pointer_and_timer() {
        let mut engine = engine();
        let now = t0() + Duration::seconds(10);
        engine.start_exercise("jumping-jacks", None, now).unwrap();
        engine.complete_exercise("jumping-jacks", now).unwrap();

        assert!(engine.state().is_exercise_complete("jumping-jacks"));
        assert!(engine.state().current_exercise.is_none());
        // The exercise timer was completed and reaped on the next publish.
        engine.tick(1_000, now + Duration::seconds(1));
        assert!(engine
            .timer_snapshots()
            .iter()
            .all(|s| s.role != TimerRole::Exercise));
    }

    #[test]
    fn completing_a_non_current_exercise_is_a_noop() {
        let mut engine = engine();
        let now = t0() + Duration::seconds(10);
        engine.start_exercise("bench", None, now).unwrap();
        engine.complete_exercise("jumping-jacks", now).unwrap();

        assert!(!engine.state().is_exercise_complete("jumping-jacks"));
        assert_eq!(engine.state().current_exercise.as_deref(), Some("bench"));
    }

    #[test]
    fn pause_freezes_timers_and_elapsed() {
        let mut engine = engine();
        let now = t0() + Duration::seconds(100);
        engine.pause(now).unwrap();

        // Ticks while paused change nothing.
        engine.tick(30_000, now + Duration::seconds(30));
        assert_eq!(
            engine.snapshot(now + Duration::seconds(30)).elapsed_ms,
            100_000
        );

        engine.resume(now + Duration::seconds(50)).unwrap();
        assert_eq!(engine.state().paused_total_ms, 50_000);
        assert_eq!(
            engine.snapshot(now + Duration::seconds(60)).elapsed_ms,
            110_000
        );
    }

    #[test]
    fn end_is_idempotent_and_summarizes() {
        let mut engine = engine();
        let now = t0() + Duration::seconds(60);
        engine.start_exercise("bench", None, t0()).unwrap();
        engine.complete_set(0, t0() + Duration::seconds(30)).unwrap();
        engine
            .ingest(MetricUpdate::ActiveCalories { kcal: 12.5 }, t0() + Duration::seconds(40))
            .unwrap();

        let first = engine.end(now).unwrap();
        assert_eq!(first.duration_ms, 60_000);
        assert_eq!(first.sets_completed, 1);
        assert_eq!(first.calories, 12.5);

        let second = engine.end(now + Duration::seconds(30)).unwrap();
        assert_eq!(second, first);
    }

    #[test]
    fn no_tick_mutates_after_end() {
        let mut engine = engine();
        let now = t0() + Duration::seconds(60);
        engine.end(now).unwrap();

        let before = engine.state().clone();
        engine.tick(10_000, now + Duration::seconds(10));
        assert_eq!(*engine.state(), before);
    }

    #[test]
    fn operations_after_end_fail_with_no_active_session() {
        let mut engine = engine();
        engine.end(t0() + Duration::seconds(10)).unwrap();

        let err = engine
            .start_exercise("bench", None, t0() + Duration::seconds(20))
            .unwrap_err();
        assert_eq!(err, SessionError::NoActiveSession);
        assert_eq!(
            engine.pause(t0() + Duration::seconds(20)).unwrap_err(),
            SessionError::NoActiveSession
        );
    }

    #[test]
    fn heart_rate_folds_into_snapshot_and_summary() {
        let mut engine = engine();
        engine
            .ingest(MetricUpdate::HeartRate { bpm: 120.0 }, t0() + Duration::seconds(5))
            .unwrap();
        engine
            .ingest(MetricUpdate::HeartRate { bpm: 150.0 }, t0() + Duration::seconds(10))
            .unwrap();

        assert_eq!(
            engine.snapshot(t0() + Duration::seconds(10)).heart_rate_bpm,
            Some(150.0)
        );
        let summary = engine.end(t0() + Duration::seconds(20)).unwrap();
        assert_eq!(summary.avg_bpm, Some(135.0));
        assert_eq!(summary.max_bpm, Some(150.0));
    }

    #[test]
    fn state_channel_sees_state_no_older_than_timer_channel() {
        let mut engine = engine();
        let order: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));

        let state_sink = order.clone();
        engine.subscribe_state(move |_| state_sink.lock().unwrap().push("state"));
        let timer_sink = order.clone();
        engine.subscribe_timers(move |_| timer_sink.lock().unwrap().push("timers"));

        engine.tick(1_000, t0() + Duration::seconds(1));

        let seen = order.lock().unwrap();
        assert_eq!(*seen, vec!["state", "timers"]);
    }

    #[test]
    fn reconcile_applies_one_big_tick() {
        let mut engine = engine();
        let now = t0() + Duration::seconds(5);
        engine.start_exercise("jumping-jacks", None, now).unwrap();

        // 90 seconds pass without any ticks (backgrounded).
        let later = now + Duration::seconds(90);
        let gap = engine.reconcile(later).unwrap();
        assert_eq!(gap, 90_000);

        let exercise = engine
            .timer_snapshots()
            .into_iter()
            .find(|s| s.role == TimerRole::Exercise)
            .unwrap();
        assert_eq!(exercise.remaining_ms, Some(30_000));

        // Nothing further to reconcile at the same instant.
        assert!(engine.reconcile(later).is_none());
    }

    #[test]
    fn reconcile_while_paused_excludes_the_gap() {
        let mut engine = engine();
        let now = t0() + Duration::seconds(50);
        engine.pause(now).unwrap();

        assert!(engine.reconcile(now + Duration::seconds(600)).is_none());
        assert_eq!(
            engine.snapshot(now + Duration::seconds(600)).elapsed_ms,
            50_000
        );
    }

    #[test]
    fn skip_confirmation_policy_follows_threshold() {
        let mut engine = engine();
        let now = t0() + Duration::seconds(5);

        // Open-ended workout clock always confirms.
        assert!(engine.skip_requires_confirmation(TimerRole::Workout));

        // 120s exercise timer is under the 300s threshold.
        engine.start_exercise("jumping-jacks", None, now).unwrap();
        assert!(!engine.skip_requires_confirmation(TimerRole::Exercise));

        // Rest never confirms, active or not.
        assert!(!engine.skip_requires_confirmation(TimerRole::Rest));
    }
}
