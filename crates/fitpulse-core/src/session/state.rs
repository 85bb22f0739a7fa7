//! The authoritative, serializable snapshot of an in-progress session.
//!
//! `SessionState` is what gets written to durable storage and what every
//! orchestrator operation mutates. Elapsed time is derived, never stored:
//! `now - started_at - paused_total`, with the clock frozen at the pause
//! instant while paused. That derivation is what lets a recovered record
//! exclude the interval the process spent dead: recovery re-dates the pause
//! to `last_update` and the gap falls out of the sum.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

/// A named stage of a workout. Groups exercises and drives the visual and
/// audio theme on the consuming side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkoutPhase {
    Warmup,
    Strength,
    Core,
    Cardio,
    Cooldown,
}

impl std::fmt::Display for WorkoutPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkoutPhase::Warmup => write!(f, "warmup"),
            WorkoutPhase::Strength => write!(f, "strength"),
            WorkoutPhase::Core => write!(f, "core"),
            WorkoutPhase::Cardio => write!(f, "cardio"),
            WorkoutPhase::Cooldown => write!(f, "cooldown"),
        }
    }
}

/// One exercise in a workout definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExercisePlan {
    pub id: String,
    pub name: String,
    pub phase: WorkoutPhase,
    pub sets: u32,
    /// Suggested duration for a timed exercise; untimed holds have none.
    #[serde(default)]
    pub suggested_duration_secs: Option<u64>,
}

/// The workout definition a session is started from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkoutPlan {
    pub id: String,
    pub name: String,
    pub exercises: Vec<ExercisePlan>,
}

impl WorkoutPlan {
    /// A small built-in full-body plan for demos and smoke tests.
    pub fn sample() -> Self {
        Self {
            id: "sample-full-body".into(),
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
                    id: "pushups".into(),
                    name: "Pushups".into(),
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
                ExercisePlan {
                    id: "stretch".into(),
                    name: "Stretching".into(),
                    phase: WorkoutPhase::Cooldown,
                    sets: 1,
                    suggested_duration_secs: Some(180),
                },
            ],
        }
    }
}

/// Per-exercise progress inside the session record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseProgress {
    pub id: String,
    pub name: String,
    pub phase: WorkoutPhase,
    /// One flag per set, in order.
    pub sets_done: Vec<bool>,
    #[serde(default)]
    pub suggested_duration_secs: Option<u64>,
}

impl ExerciseProgress {
    fn from_plan(plan: &ExercisePlan) -> Self {
        Self {
            id: plan.id.clone(),
            name: plan.name.clone(),
            phase: plan.phase,
            sets_done: vec![false; plan.sets as usize],
            suggested_duration_secs: plan.suggested_duration_secs,
        }
    }

    pub fn sets_total(&self) -> usize {
        self.sets_done.len()
    }

    pub fn sets_completed(&self) -> usize {
        self.sets_done.iter().filter(|d| **d).count()
    }

    /// Index of the first incomplete set, or `sets_total` when all done.
    pub fn next_set_index(&self) -> usize {
        self.sets_done
            .iter()
            .position(|d| !d)
            .unwrap_or(self.sets_done.len())
    }
}

/// The persisted session record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub session_id: String,
    pub workout_id: String,
    pub started_at: DateTime<Utc>,

    pub phase: WorkoutPhase,
    pub exercises: Vec<ExerciseProgress>,
    pub current_exercise: Option<String>,
    /// Next set index within the current exercise.
    pub set_cursor: usize,
    pub completed_exercises: Vec<String>,

    /// Sum of all finished pause intervals.
    pub paused_total_ms: u64,
    /// Start of the in-flight pause interval, if any.
    pub pause_started_at: Option<DateTime<Utc>>,
    pub last_update: DateTime<Utc>,

    pub calories: f64,

    pub is_active: bool,
    pub is_paused: bool,
}

impl SessionState {
    pub fn new(plan: &WorkoutPlan, now: DateTime<Utc>) -> Self {
        let phase = plan
            .exercises
            .first()
            .map_or(WorkoutPhase::Warmup, |e| e.phase);
        Self {
            session_id: Uuid::new_v4().to_string(),
            workout_id: plan.id.clone(),
            started_at: now,
            phase,
            exercises: plan.exercises.iter().map(ExerciseProgress::from_plan).collect(),
            current_exercise: None,
            set_cursor: 0,
            completed_exercises: Vec::new(),
            paused_total_ms: 0,
            pause_started_at: None,
            last_update: now,
            calories: 0.0,
            is_active: true,
            is_paused: false,
        }
    }

    // ── Time accounting ──────────────────────────────────────────────

    /// Milliseconds of active session time at `now`. Frozen at the pause
    /// instant while paused; identical whether queried during a pause or
    /// after the matching resume.
    pub fn elapsed_ms(&self, now: DateTime<Utc>) -> u64 {
        let end = if self.is_paused {
            self.pause_started_at.unwrap_or(now)
        } else {
            now
        };
        let gross = (end - self.started_at).num_milliseconds().max(0) as u64;
        gross.saturating_sub(self.paused_total_ms)
    }

    /// Record the start of a pause interval. Returns false when already
    /// paused (logged, not an error — the UI may race the engine).
    pub fn begin_pause(&mut self, now: DateTime<Utc>) -> bool {
        if self.is_paused {
            warn!(session_id = %self.session_id, "pause while already paused ignored");
            return false;
        }
        self.is_paused = true;
        self.pause_started_at = Some(now);
        self.last_update = now;
        true
    }

    /// Close the in-flight pause interval, folding it into the cumulative
    /// total. Returns the interval length, or None when not paused.
    pub fn end_pause(&mut self, now: DateTime<Utc>) -> Option<u64> {
        if !self.is_paused {
            warn!(session_id = %self.session_id, "resume while not paused ignored");
            return None;
        }
        let started = self.pause_started_at.unwrap_or(now);
        let interval = (now - started).num_milliseconds().max(0) as u64;
        self.paused_total_ms = self.paused_total_ms.saturating_add(interval);
        self.pause_started_at = None;
        self.is_paused = false;
        self.last_update = now;
        Some(interval)
    }

    // ── Progress ─────────────────────────────────────────────────────

    pub fn exercise(&self, id: &str) -> Option<&ExerciseProgress> {
        self.exercises.iter().find(|e| e.id == id)
    }

    pub fn exercise_mut(&mut self, id: &str) -> Option<&mut ExerciseProgress> {
        self.exercises.iter_mut().find(|e| e.id == id)
    }

    /// Mark a set of the current exercise complete and move the cursor to
    /// the next incomplete set. Out-of-range indexes and a missing current
    /// exercise are corrected defensively (no-op, logged).
    pub fn mark_set_complete(&mut self, set_index: usize) -> bool {
        let Some(current) = self.current_exercise.clone() else {
            warn!("set completion with no current exercise ignored");
            return false;
        };
        let Some(exercise) = self.exercise_mut(&current) else {
            warn!(exercise_id = %current, "current exercise missing from session record");
            return false;
        };
        let Some(flag) = exercise.sets_done.get_mut(set_index) else {
            warn!(exercise_id = %current, set_index, "set index out of range ignored");
            return false;
        };
        *flag = true;
        self.set_cursor = self.exercise(&current).map_or(0, ExerciseProgress::next_set_index);
        true
    }

    pub fn mark_exercise_complete(&mut self, id: &str) {
        if !self.completed_exercises.iter().any(|e| e == id) {
            self.completed_exercises.push(id.to_string());
        }
    }

    pub fn is_exercise_complete(&self, id: &str) -> bool {
        self.completed_exercises.iter().any(|e| e == id)
    }

    pub fn sets_completed(&self) -> usize {
        self.exercises.iter().map(ExerciseProgress::sets_completed).sum()
    }

    pub fn sets_total(&self) -> usize {
        self.exercises.iter().map(ExerciseProgress::sets_total).sum()
    }
}

/// Consolidated view published on the session-state channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub session_id: String,
    pub workout_id: String,
    pub phase: WorkoutPhase,
    pub is_active: bool,
    pub is_paused: bool,
    pub elapsed_ms: u64,
    pub current_exercise: Option<String>,
    pub set_cursor: usize,
    pub sets_completed: usize,
    pub sets_total: usize,
    pub completed_exercises: Vec<String>,
    pub calories: f64,
    pub heart_rate_bpm: Option<f32>,
    /// Remaining rest, when a rest timer is running.
    pub rest_remaining_ms: Option<u64>,
    pub at: DateTime<Utc>,
}

/// Value returned by `end`; finalized once and cached for idempotent re-ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub workout_id: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    /// Active (unpaused) session time.
    pub duration_ms: u64,
    pub paused_ms: u64,
    pub exercises_completed: usize,
    pub sets_completed: usize,
    pub calories: f64,
    pub avg_bpm: Option<f32>,
    pub max_bpm: Option<f32>,
}
