pub mod active;
mod engine;
pub mod recovery;
mod state;

pub use engine::SessionEngine;
pub use state::{
    ExercisePlan, ExerciseProgress, SessionSnapshot, SessionState, SessionSummary, WorkoutPhase,
    WorkoutPlan,
};
