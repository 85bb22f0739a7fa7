//! Audio and haptic feedback dispatchers.
//!
//! Dispatchers translate session events into device-effect requests through
//! the narrow [`EffectDevice`] trait. They hold their own enabled/volume/
//! intensity knobs but no session state, and every dispatch is
//! fire-and-forget: a failing device is logged and never blocks the session.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::EngineError;
use crate::events::Event;
use crate::storage::config::{AudioConfig, HapticConfig};
use crate::timer::TimerRole;

/// A request to play one audio cue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioCue {
    /// Completion chime for the given timer role.
    TimerDone(TimerRole),
    Motivation(MotivationKind),
    SessionDone,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotivationKind {
    SetDone,
    ExerciseDone,
}

/// A request for one haptic pulse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HapticPulse {
    Light,
    Medium,
    Heavy,
}

/// The device boundary. Implementations talk to actual speakers/actuators;
/// the engine only ever requests effects.
pub trait EffectDevice: Send + Sync {
    fn play_cue(&self, cue: AudioCue, volume: f32) -> Result<(), EngineError>;
    fn pulse(&self, pulse: HapticPulse, intensity: f32) -> Result<(), EngineError>;
}

/// Device that logs requests and does nothing. Default for headless use.
#[derive(Debug, Default)]
pub struct NullDevice;

impl EffectDevice for NullDevice {
    fn play_cue(&self, cue: AudioCue, volume: f32) -> Result<(), EngineError> {
        debug!(?cue, volume, "audio cue requested");
        Ok(())
    }

    fn pulse(&self, pulse: HapticPulse, intensity: f32) -> Result<(), EngineError> {
        debug!(?pulse, intensity, "haptic pulse requested");
        Ok(())
    }
}

#[derive(Clone)]
pub struct AudioDispatcher {
    config: AudioConfig,
    device: Arc<dyn EffectDevice>,
}

impl AudioDispatcher {
    pub fn new(config: AudioConfig, device: Arc<dyn EffectDevice>) -> Self {
        Self { config, device }
    }

    fn volume(&self) -> f32 {
        (self.config.volume.min(100) as f32) / 100.0
    }

    pub fn handle(&self, event: &Event) {
        if !self.config.enabled {
            return;
        }
        let cue = match event {
            Event::TimerCompleted { role, .. } => Some(AudioCue::TimerDone(*role)),
            Event::SetCompleted { .. } => Some(AudioCue::Motivation(MotivationKind::SetDone)),
            Event::ExerciseCompleted { .. } => {
                Some(AudioCue::Motivation(MotivationKind::ExerciseDone))
            }
            Event::SessionEnded { .. } => Some(AudioCue::SessionDone),
            _ => None,
        };
        if let Some(cue) = cue {
            if let Err(e) = self.device.play_cue(cue, self.volume()) {
                warn!(error = %e, ?cue, "audio cue dispatch failed");
            }
        }
    }
}

#[derive(Clone)]
pub struct HapticDispatcher {
    config: HapticConfig,
    device: Arc<dyn EffectDevice>,
}

impl HapticDispatcher {
    pub fn new(config: HapticConfig, device: Arc<dyn EffectDevice>) -> Self {
        Self { config, device }
    }

    fn intensity(&self) -> f32 {
        (self.config.intensity.min(100) as f32) / 100.0
    }

    pub fn handle(&self, event: &Event) {
        if !self.config.enabled {
            return;
        }
        let pulse = match event {
            Event::SetCompleted { .. } => Some(HapticPulse::Light),
            Event::ExerciseCompleted { .. } | Event::TimerCompleted { .. } => {
                Some(HapticPulse::Medium)
            }
            Event::SessionEnded { .. } => Some(HapticPulse::Heavy),
            _ => None,
        };
        if let Some(pulse) = pulse {
            if let Err(e) = self.device.pulse(pulse, self.intensity()) {
                warn!(error = %e, ?pulse, "haptic dispatch failed");
            }
        }
    }
}
