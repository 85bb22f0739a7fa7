//! # Fitpulse Core Library
//!
//! Core business logic for the Fitpulse interactive workout session engine.
//! The CLI binary and any GUI shell are thin layers over this library.
//!
//! ## Architecture
//!
//! - **Timers**: role-tagged countdown/count-up clocks advanced only through
//!   explicit `tick()` deltas on one shared scheduling clock
//! - **Session**: the orchestrator composing timers, the persisted session
//!   record, feedback dispatch and recovery
//! - **Storage**: SQLite key-value records for the live session plus TOML
//!   configuration
//! - **Lifecycle**: foreground/background monitoring behind a platform
//!   bridge trait
//!
//! ## Key Components
//!
//! - [`SessionEngine`]: the session orchestrator
//! - [`TimerManager`]: role-keyed active timer set
//! - [`Database`]: durable session snapshot and history storage
//! - [`Config`]: application configuration management

pub mod error;
pub mod events;
pub mod feedback;
pub mod lifecycle;
pub mod metrics;
pub mod runtime;
pub mod session;
pub mod storage;
pub mod timer;

pub use error::{ConfigError, EngineError, SessionError, StorageError};
pub use events::Event;
pub use lifecycle::{AppState, LifecycleMonitor, LifecycleSignal, PlatformBridge};
pub use metrics::{HeartRateBuffer, HeartRateSample, MetricUpdate};
pub use session::{
    SessionEngine, SessionSnapshot, SessionState, SessionSummary, WorkoutPhase, WorkoutPlan,
};
pub use storage::{Config, Database};
pub use timer::{Timer, TimerManager, TimerRole, TimerSnapshot, TimerState};
