//! App lifecycle monitoring.
//!
//! The engine never talks to platform notification centers directly; a host
//! adapter implements [`PlatformBridge`] and feeds observed transitions into
//! [`LifecycleMonitor::report`]. Subscribers get one synchronous signal per
//! transition. Termination hooks are best-effort: errors are caught and
//! logged, never propagated, because the platform gives no guarantees the
//! process survives long enough anyway.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::EngineError;
use crate::events::{Publisher, Subscription};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppState {
    /// Foreground, receiving UI events.
    Active,
    /// Backgrounded or inactive; ticks may stop arriving.
    Background,
}

/// One observed transition. Ephemeral, consumed synchronously.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleSignal {
    pub previous: AppState,
    pub current: AppState,
    pub at: DateTime<Utc>,
}

/// Host platform adapter.
pub trait PlatformBridge: Send {
    /// Permit continued execution with audio capability while backgrounded.
    /// Called once at monitor construction; failure only downgrades
    /// background continuation guarantees.
    fn configure_background_audio(&self) -> Result<(), EngineError> {
        Ok(())
    }
}

/// Bridge for tests and platforms without lifecycle integration.
#[derive(Debug, Default)]
pub struct NoopBridge;

impl PlatformBridge for NoopBridge {}

type TerminationHook = Box<dyn Fn() -> Result<(), EngineError> + Send>;

pub struct LifecycleMonitor {
    current: AppState,
    background_capable: bool,
    channel: Publisher<LifecycleSignal>,
    termination_hooks: Vec<TerminationHook>,
}

impl LifecycleMonitor {
    pub fn new(bridge: &dyn PlatformBridge) -> Self {
        let background_capable = match bridge.configure_background_audio() {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "background audio session unavailable; background continuation not guaranteed");
                false
            }
        };
        Self {
            current: AppState::Active,
            background_capable,
            channel: Publisher::new(),
            termination_hooks: Vec::new(),
        }
    }

    pub fn current(&self) -> AppState {
        self.current
    }

    pub fn background_capable(&self) -> bool {
        self.background_capable
    }

    /// Feed an observed platform state. Emits a signal only on an actual
    /// transition; repeated reports of the same state are ignored.
    pub fn report(&mut self, state: AppState, now: DateTime<Utc>) -> Option<LifecycleSignal> {
        if state == self.current {
            return None;
        }
        let signal = LifecycleSignal {
            previous: self.current,
            current: state,
            at: now,
        };
        self.current = state;
        info!(previous = ?signal.previous, current = ?signal.current, "app lifecycle transition");
        self.channel.publish(&signal);
        Some(signal)
    }

    pub fn subscribe<F>(&mut self, callback: F) -> Subscription
    where
        F: FnMut(&LifecycleSignal) + Send + 'static,
    {
        self.channel.subscribe(callback)
    }

    pub fn unsubscribe(&mut self, subscription: Subscription) {
        self.channel.unsubscribe(subscription);
    }

    /// Register a hook to run right before process death.
    pub fn on_terminate<F>(&mut self, hook: F)
    where
        F: Fn() -> Result<(), EngineError> + Send + 'static,
    {
        self.termination_hooks.push(Box::new(hook));
    }

    /// Invoke every termination hook, best-effort.
    pub fn terminating(&self) {
        for hook in &self.termination_hooks {
            if let Err(e) = hook() {
                warn!(error = %e, "termination hook failed");
            }
        }
    }
}
