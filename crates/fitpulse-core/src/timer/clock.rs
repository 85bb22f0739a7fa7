//! The single-timer state machine.
//!
//! A `Timer` has no internal thread and never reads the wall clock; time
//! advances only through `tick()` with an explicit delta. One tick of N
//! seconds leaves the timer in the same state as N ticks of one second,
//! which is what makes background catch-up a single large tick.
//!
//! ## State Transitions
//!
//! ```text
//! Running -> (Paused <-> Running) -> Completed | Stopped
//! ```

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Which slot of the session a timer occupies. At most one timer per role
/// is active at any instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerRole {
    Workout,
    Exercise,
    Rest,
}

impl std::fmt::Display for TimerRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimerRole::Workout => write!(f, "workout"),
            TimerRole::Exercise => write!(f, "exercise"),
            TimerRole::Rest => write!(f, "rest"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerState {
    Running,
    Paused,
    /// Terminal: reached zero, was skipped, or an open-ended timer was
    /// explicitly completed. Entered exactly once.
    Completed,
    /// Terminal: torn down without completing (session ended).
    Stopped,
}

/// A countdown or count-up clock tagged with a role.
///
/// `total_ms: None` means open-ended: the timer counts up until explicitly
/// completed (untimed holds, the whole-workout clock).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Timer {
    role: TimerRole,
    total_ms: Option<u64>,
    remaining_ms: u64,
    elapsed_ms: u64,
    /// Ceiling for `adjust`; unbounded when absent.
    max_ms: Option<u64>,
    state: TimerState,
}

impl Timer {
    /// Create a running countdown timer.
    pub fn countdown(role: TimerRole, duration_secs: u64) -> Self {
        let total_ms = duration_secs.saturating_mul(1000);
        Self {
            role,
            total_ms: Some(total_ms),
            remaining_ms: total_ms,
            elapsed_ms: 0,
            max_ms: None,
            state: TimerState::Running,
        }
    }

    /// Create a running open-ended timer that counts up until explicitly
    /// completed.
    pub fn open_ended(role: TimerRole) -> Self {
        Self {
            role,
            total_ms: None,
            remaining_ms: 0,
            elapsed_ms: 0,
            max_ms: None,
            state: TimerState::Running,
        }
    }

    /// Cap the remaining time `adjust` may reach.
    pub fn with_max_secs(mut self, max_secs: u64) -> Self {
        self.max_ms = Some(max_secs.saturating_mul(1000));
        self
    }

    /// Carry over previously accumulated elapsed time (session recovery).
    pub fn with_elapsed_ms(mut self, elapsed_ms: u64) -> Self {
        self.elapsed_ms = elapsed_ms;
        if let Some(total) = self.total_ms {
            self.remaining_ms = total.saturating_sub(elapsed_ms);
        }
        self
    }

    /// Start in the paused state (session recovery).
    pub fn paused(mut self) -> Self {
        self.state = TimerState::Paused;
        self
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn role(&self) -> TimerRole {
        self.role
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == TimerState::Running
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.state, TimerState::Completed | TimerState::Stopped)
    }

    /// Remaining milliseconds; `None` for open-ended timers.
    pub fn remaining_ms(&self) -> Option<u64> {
        self.total_ms.map(|_| self.remaining_ms)
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    pub fn total_ms(&self) -> Option<u64> {
        self.total_ms
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Pause a running timer. Anything else is a logged no-op.
    pub fn pause(&mut self) -> bool {
        if self.state != TimerState::Running {
            warn!(role = %self.role, state = ?self.state, "pause on non-running timer ignored");
            return false;
        }
        self.state = TimerState::Paused;
        true
    }

    /// Resume a paused timer. Anything else is a logged no-op.
    pub fn resume(&mut self) -> bool {
        if self.state != TimerState::Paused {
            warn!(role = %self.role, state = ?self.state, "resume on non-paused timer ignored");
            return false;
        }
        self.state = TimerState::Running;
        true
    }

    /// Shift remaining time by `delta_secs`, clamped to `[0, max]`.
    /// Reaching zero completes the timer immediately. Returns true when the
    /// timer completed as a result.
    pub fn adjust(&mut self, delta_secs: i64) -> bool {
        if self.is_terminal() {
            warn!(role = %self.role, state = ?self.state, "adjust on finished timer ignored");
            return false;
        }
        let Some(_) = self.total_ms else {
            warn!(role = %self.role, "adjust on open-ended timer ignored");
            return false;
        };
        let delta_ms = delta_secs.saturating_mul(1000);
        let shifted = (self.remaining_ms as i64).saturating_add(delta_ms);
        let mut remaining = shifted.max(0) as u64;
        if let Some(max) = self.max_ms {
            remaining = remaining.min(max);
        }
        self.remaining_ms = remaining;
        if remaining == 0 {
            self.complete();
            return true;
        }
        false
    }

    /// Force immediate completion regardless of remaining time.
    pub fn skip(&mut self) {
        if self.is_terminal() {
            warn!(role = %self.role, state = ?self.state, "skip on finished timer ignored");
            return;
        }
        self.complete();
    }

    /// Enter the terminal `Completed` state. Idempotent.
    pub fn complete(&mut self) {
        if self.is_terminal() {
            return;
        }
        self.remaining_ms = 0;
        self.state = TimerState::Completed;
    }

    /// Tear down without completing.
    pub fn stop(&mut self) {
        if self.is_terminal() {
            return;
        }
        self.state = TimerState::Stopped;
    }

    /// Advance by `delta_ms`. Only running timers move; remaining time
    /// saturates at zero and triggers completion exactly once. Returns true
    /// when this tick completed the timer.
    pub fn tick(&mut self, delta_ms: u64) -> bool {
        if self.state != TimerState::Running {
            return false;
        }
        self.elapsed_ms = self.elapsed_ms.saturating_add(delta_ms);
        if self.total_ms.is_some() {
            self.remaining_ms = self.remaining_ms.saturating_sub(delta_ms);
            if self.remaining_ms == 0 {
                self.complete();
                return true;
            }
        }
        false
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        TimerSnapshot {
            role: self.role,
            state: self.state,
            total_ms: self.total_ms,
            remaining_ms: self.remaining_ms(),
            elapsed_ms: self.elapsed_ms,
        }
    }
}

/// Read-only view published to subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerSnapshot {
    pub role: TimerRole,
    pub state: TimerState,
    pub total_ms: Option<u64>,
    /// `None` for open-ended timers.
    pub remaining_ms: Option<u64>,
    pub elapsed_ms: u64,
}

impl TimerSnapshot {
    /// Remaining whole seconds, rounded up so a display never shows 0 while
    /// time is left.
    pub fn remaining_secs(&self) -> Option<u64> {
        self.remaining_ms.map(|ms| ms.div_ceil(1000))
    }
}
