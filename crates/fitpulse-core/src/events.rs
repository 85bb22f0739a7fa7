use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::session::WorkoutPhase;
use crate::timer::TimerRole;

/// Every externally visible state change in the engine produces an Event.
/// Feedback dispatchers consume them; the CLI prints them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    SessionStarted {
        session_id: String,
        workout_id: String,
        at: DateTime<Utc>,
    },
    ExerciseStarted {
        exercise_id: String,
        duration_secs: Option<u64>,
        at: DateTime<Utc>,
    },
    SetCompleted {
        exercise_id: String,
        set_index: usize,
        at: DateTime<Utc>,
    },
    ExerciseCompleted {
        exercise_id: String,
        at: DateTime<Utc>,
    },
    RestStarted {
        duration_secs: u64,
        at: DateTime<Utc>,
    },
    RestSkipped {
        at: DateTime<Utc>,
    },
    RestAdjusted {
        remaining_ms: u64,
        at: DateTime<Utc>,
    },
    PhaseChanged {
        phase: WorkoutPhase,
        at: DateTime<Utc>,
    },
    SessionPaused {
        at: DateTime<Utc>,
    },
    SessionResumed {
        /// Length of the pause interval that just ended, in milliseconds.
        paused_ms: u64,
        at: DateTime<Utc>,
    },
    /// A timer reached zero (or was skipped) and entered its terminal state.
    TimerCompleted {
        role: TimerRole,
        at: DateTime<Utc>,
    },
    /// A single catch-up tick was applied after time away from the foreground.
    Reconciled {
        gap_ms: u64,
        at: DateTime<Utc>,
    },
    /// An interrupted session was rebuilt from storage, paused.
    SessionRecovered {
        session_id: String,
        at: DateTime<Utc>,
    },
    SessionEnded {
        session_id: String,
        duration_ms: u64,
        at: DateTime<Utc>,
    },
}

/// Handle returned by [`Publisher::subscribe`]; pass back to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subscription(u64);

/// A synchronous fan-out channel. Subscribers are plain callbacks invoked
/// in registration order on the publishing thread; they receive snapshot
/// values, never references into engine state.
pub struct Publisher<T> {
    next_id: u64,
    subscribers: Vec<(u64, Box<dyn FnMut(&T) + Send>)>,
}

impl<T> Publisher<T> {
    pub fn new() -> Self {
        Self {
            next_id: 0,
            subscribers: Vec::new(),
        }
    }

    pub fn subscribe<F>(&mut self, callback: F) -> Subscription
    where
        F: FnMut(&T) + Send + 'static,
    {
        let id = self.next_id;
        self.next_id += 1;
        self.subscribers.push((id, Box::new(callback)));
        Subscription(id)
    }

    pub fn unsubscribe(&mut self, subscription: Subscription) {
        self.subscribers.retain(|(id, _)| *id != subscription.0);
    }

    pub fn publish(&mut self, value: &T) {
        for (_, callback) in &mut self.subscribers {
            callback(value);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

impl<T> Default for Publisher<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for Publisher<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Publisher")
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}
