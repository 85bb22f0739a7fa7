pub mod config;
pub mod database;

pub use config::Config;
pub use database::{Database, WorkoutStats};

use std::path::PathBuf;

use crate::error::EngineError;

/// Returns `~/.config/fitpulse[-dev]/` based on FITPULSE_ENV.
///
/// Set FITPULSE_ENV=dev to use the development data directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, EngineError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("FITPULSE_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("fitpulse-dev")
    } else {
        base_dir.join("fitpulse")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
