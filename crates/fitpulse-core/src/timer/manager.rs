//! Role-keyed set of concurrent timers on one shared clock.
//!
//! All active timers advance inside a single `tick()`; there is no per-timer
//! interval, so concurrently running timers cannot drift apart and pausing
//! everything is atomic with respect to observers.
//!
//! A timer that reaches a terminal state stays in the published list for one
//! more publish, so subscribers observe `Completed` at least once before the
//! timer disappears.

use std::collections::HashMap;

use tracing::debug;

use super::{Timer, TimerRole, TimerSnapshot};
use crate::events::{Publisher, Subscription};

fn role_order(role: TimerRole) -> u8 {
    match role {
        TimerRole::Workout => 0,
        TimerRole::Exercise => 1,
        TimerRole::Rest => 2,
    }
}

#[derive(Debug, Default)]
pub struct TimerManager {
    active: HashMap<TimerRole, Timer>,
    channel: Publisher<Vec<TimerSnapshot>>,
}

impl TimerManager {
    pub fn new() -> Self {
        Self {
            active: HashMap::new(),
            channel: Publisher::new(),
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// Snapshot of every timer in the active set, workout first.
    pub fn snapshots(&self) -> Vec<TimerSnapshot> {
        let mut list: Vec<_> = self.active.values().map(Timer::snapshot).collect();
        list.sort_by_key(|s| role_order(s.role));
        list
    }

    pub fn get(&self, role: TimerRole) -> Option<TimerSnapshot> {
        self.active.get(&role).map(Timer::snapshot)
    }

    /// True when a non-terminal timer occupies the role.
    pub fn is_active(&self, role: TimerRole) -> bool {
        self.active.get(&role).is_some_and(|t| !t.is_terminal())
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Install a timer, replacing any prior holder of its role.
    pub fn start_timer(&mut self, timer: Timer) -> TimerSnapshot {
        let role = timer.role();
        if let Some(prev) = self.active.insert(role, timer) {
            if !prev.is_terminal() {
                debug!(role = %role, "replacing active timer");
            }
        }
        let snapshot = self.active[&role].snapshot();
        self.publish_active();
        snapshot
    }

    /// Pause every running timer (whole-session pause).
    pub fn pause_all(&mut self) {
        for timer in self.active.values_mut() {
            if timer.is_running() {
                timer.pause();
            }
        }
        self.publish_active();
    }

    /// Resume every paused timer.
    pub fn resume_all(&mut self) {
        for timer in self.active.values_mut() {
            if timer.state() == super::TimerState::Paused {
                timer.resume();
            }
        }
        self.publish_active();
    }

    /// Shift the matching timer's remaining time; no-op when the role is
    /// idle. Returns the post-adjust snapshot.
    pub fn adjust_timer(&mut self, role: TimerRole, delta_secs: i64) -> Option<TimerSnapshot> {
        let timer = self.active.get_mut(&role)?;
        timer.adjust(delta_secs);
        let snapshot = timer.snapshot();
        self.publish_active();
        Some(snapshot)
    }

    /// Force the matching timer to complete; no-op when the role is idle.
    /// Returns true when a timer was actually skipped.
    pub fn skip_timer(&mut self, role: TimerRole) -> bool {
        let Some(timer) = self.active.get_mut(&role) else {
            return false;
        };
        if timer.is_terminal() {
            return false;
        }
        timer.skip();
        self.publish_active();
        true
    }

    /// Complete the matching timer without the skip semantics (used when the
    /// thing being timed finished on its own).
    pub fn complete_timer(&mut self, role: TimerRole) -> bool {
        let Some(timer) = self.active.get_mut(&role) else {
            return false;
        };
        if timer.is_terminal() {
            return false;
        }
        timer.complete();
        self.publish_active();
        true
    }

    /// Stop and drop every timer (session teardown). Subscribers observe the
    /// stopped set once before it empties.
    pub fn stop_all(&mut self) {
        for timer in self.active.values_mut() {
            timer.stop();
        }
        self.publish_active();
    }

    // ── Clock ────────────────────────────────────────────────────────

    /// Advance every running timer by `delta_ms` without publishing.
    /// Returns the roles that completed during this advance, in role order.
    /// The orchestrator folds completions into session state before any
    /// subscriber hears about them.
    pub fn advance(&mut self, delta_ms: u64) -> Vec<TimerRole> {
        let mut completed: Vec<TimerRole> = self
            .active
            .values_mut()
            .filter_map(|t| if t.tick(delta_ms) { Some(t.role()) } else { None })
            .collect();
        completed.sort_by_key(|r| role_order(*r));
        completed
    }

    /// Publish the current set, then reap timers whose terminal state has
    /// now been observed.
    pub fn publish_active(&mut self) {
        let snapshots = self.snapshots();
        self.channel.publish(&snapshots);
        self.active.retain(|_, t| !t.is_terminal());
    }

    /// One shared clock tick: advance, publish, reap.
    pub fn tick(&mut self, delta_ms: u64) -> Vec<TimerRole> {
        let completed = self.advance(delta_ms);
        self.publish_active();
        completed
    }

    // ── Subscriptions ────────────────────────────────────────────────

    pub fn subscribe<F>(&mut self, callback: F) -> Subscription
    where
        F: FnMut(&Vec<TimerSnapshot>) + Send + 'static,
    {
        self.channel.subscribe(callback)
    }

    pub fn unsubscribe(&mut self, subscription: Subscription) {
        self.channel.unsubscribe(subscription);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::TimerState;
    use proptest::prelude::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn starting_a_role_replaces_the_previous_holder() {
        let mut mgr = TimerManager::new();
        mgr.start_timer(Timer::countdown(TimerRole::Rest, 60));
        mgr.start_timer(Timer::countdown(TimerRole::Rest, 90));

        let snapshots = mgr.snapshots();
        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots[0].remaining_ms, Some(90_000));
    }

    #[test]
    fn completed_timer_is_published_once_then_reaped() {
        let seen: Arc<Mutex<Vec<Vec<TimerSnapshot>>>> = Arc::new(Mutex::new(Vec::new()));
        let mut mgr = TimerManager::new();
        let sink = seen.clone();
        mgr.subscribe(move |list| sink.lock().unwrap().push(list.clone()));

        mgr.start_timer(Timer::countdown(TimerRole::Rest, 2));
        let completed = mgr.tick(2_000);
        assert_eq!(completed, vec![TimerRole::Rest]);

        // Second tick publishes an empty set.
        mgr.tick(1_000);

        let published = seen.lock().unwrap();
        // start publish, completion publish, post-reap publish
        assert_eq!(published.len(), 3);
        assert_eq!(published[1][0].state, TimerState::Completed);
        assert!(published[2].is_empty());
    }

    #[test]
    fn pause_all_and_resume_all_cover_every_timer() {
        let mut mgr = TimerManager::new();
        mgr.start_timer(Timer::open_ended(TimerRole::Workout));
        mgr.start_timer(Timer::countdown(TimerRole::Exercise, 120));

        mgr.pause_all();
        assert!(mgr
            .snapshots()
            .iter()
            .all(|s| s.state == TimerState::Paused));

        // No motion while everything is paused.
        mgr.tick(5_000);
        assert_eq!(
            mgr.get(TimerRole::Exercise).unwrap().remaining_ms,
            Some(120_000)
        );

        mgr.resume_all();
        mgr.tick(1_000);
        assert_eq!(
            mgr.get(TimerRole::Exercise).unwrap().remaining_ms,
            Some(119_000)
        );
    }

    #[test]
    fn skip_and_adjust_are_noops_without_a_timer() {
        let mut mgr = TimerManager::new();
        assert!(!mgr.skip_timer(TimerRole::Rest));
        assert!(mgr.adjust_timer(TimerRole::Rest, 30).is_none());
    }

    #[test]
    fn shared_tick_advances_all_roles_together() {
        let mut mgr = TimerManager::new();
        mgr.start_timer(Timer::open_ended(TimerRole::Workout));
        mgr.start_timer(Timer::countdown(TimerRole::Exercise, 60));
        mgr.start_timer(Timer::countdown(TimerRole::Rest, 30));

        mgr.tick(10_000);

        assert_eq!(mgr.get(TimerRole::Workout).unwrap().elapsed_ms, 10_000);
        assert_eq!(
            mgr.get(TimerRole::Exercise).unwrap().remaining_ms,
            Some(50_000)
        );
        assert_eq!(mgr.get(TimerRole::Rest).unwrap().remaining_ms, Some(20_000));
    }

    proptest! {
        // Randomized start/skip/complete/tick sequences never leave more
        // than one timer per role in the active set.
        #[test]
        fn at_most_one_timer_per_role(ops in prop::collection::vec(0u8..6, 1..60)) {
            let roles = [TimerRole::Workout, TimerRole::Exercise, TimerRole::Rest];
            let mut mgr = TimerManager::new();
            for (i, op) in ops.iter().enumerate() {
                let role = roles[i % roles.len()];
                match op {
                    0 => {
                        mgr.start_timer(Timer::countdown(role, 30));
                    }
                    1 => {
                        mgr.start_timer(Timer::open_ended(role));
                    }
                    2 => {
                        mgr.skip_timer(role);
                    }
                    3 => {
                        mgr.complete_timer(role);
                    }
                    4 => {
                        mgr.tick(7_000);
                    }
                    _ => {
                        mgr.adjust_timer(role, -10);
                    }
                }
                let snapshots = mgr.snapshots();
                for r in roles {
                    prop_assert!(snapshots.iter().filter(|s| s.role == r).count() <= 1);
                }
            }
        }
    }
}
