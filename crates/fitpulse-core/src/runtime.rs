//! The shared scheduling clock.
//!
//! One tokio interval drives the process-wide session; there is no
//! per-timer interval anywhere. The delta passed to each tick is measured
//! from the previous fire, so a delayed wakeup becomes one larger tick
//! instead of lost time.

use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::session::active;

pub struct SessionTicker {
    handle: Option<JoinHandle<()>>,
}

impl SessionTicker {
    /// Spawn the clock task. It idles quietly while no session is active.
    pub fn spawn(period: Duration) -> Self {
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first fire is immediate; anchor the delta clock there.
            interval.tick().await;
            let mut last = Instant::now();
            loop {
                interval.tick().await;
                let delta_ms = last.elapsed().as_millis() as u64;
                last = Instant::now();
                if active::with(|engine| engine.tick(delta_ms, Utc::now())).is_err() {
                    debug!("clock tick with no active session");
                }
            }
        });
        Self {
            handle: Some(handle),
        }
    }

    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for SessionTicker {
    fn drop(&mut self) {
        self.stop();
    }
}
