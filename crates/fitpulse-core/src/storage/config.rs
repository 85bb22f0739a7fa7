//! TOML-based application configuration.
//!
//! Stores the session policy knobs (auto-rest, staleness bound, skip
//! confirmation threshold) plus feedback preferences.
//!
//! Configuration is stored at `~/.config/fitpulse/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::data_dir;
use crate::error::{ConfigError, EngineError};

/// Session policy configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Start a rest timer automatically after each completed set.
    #[serde(default = "default_true")]
    pub auto_rest: bool,
    /// Default rest interval in seconds.
    #[serde(default = "default_rest_duration")]
    pub rest_duration_secs: u64,
    /// Ceiling the rest timer may be extended to.
    #[serde(default = "default_rest_max")]
    pub rest_max_secs: u64,
    /// Skipping a workout/exercise timer with more than this many seconds
    /// remaining should be confirmed by the user first. Product policy
    /// value, not a structural requirement.
    #[serde(default = "default_skip_confirm_threshold")]
    pub skip_confirm_threshold_secs: u64,
    /// A persisted session older than this is not offered for recovery.
    #[serde(default = "default_stale_after")]
    pub stale_after_secs: u64,
    /// Shared clock period driving all timers.
    #[serde(default = "default_tick_period")]
    pub tick_period_ms: u64,
}

/// Audio feedback configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_50")]
    pub volume: u32,
}

/// Haptic feedback configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HapticConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_50")]
    pub intensity: u32,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/fitpulse/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub haptics: HapticConfig,
}

// Default functions
fn default_true() -> bool {
    true
}
fn default_50() -> u32 {
    50
}
fn default_rest_duration() -> u64 {
    60
}
fn default_rest_max() -> u64 {
    300
}
fn default_skip_confirm_threshold() -> u64 {
    300
}
fn default_stale_after() -> u64 {
    1800
}
fn default_tick_period() -> u64 {
    1000
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            auto_rest: true,
            rest_duration_secs: default_rest_duration(),
            rest_max_secs: default_rest_max(),
            skip_confirm_threshold_secs: default_skip_confirm_threshold(),
            stale_after_secs: default_stale_after(),
            tick_period_ms: default_tick_period(),
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            volume: 50,
        }
    }
}

impl Default for HapticConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            intensity: 50,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            session: SessionConfig::default(),
            audio: AudioConfig::default(),
            haptics: HapticConfig::default(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let mut parts = key.split('.').peekable();
        if parts.peek().is_none() {
            return Err(ConfigError::UnknownKey(key.to_string()));
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current
                    .as_object_mut()
                    .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
                let existing = obj
                    .get(part)
                    .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value.parse::<bool>().map_err(|e| ConfigError::InvalidValue {
                            key: key.to_string(),
                            message: e.to_string(),
                        })?,
                    ),
                    serde_json::Value::Number(_) => {
                        if let Ok(n) = value.parse::<u64>() {
                            serde_json::Value::Number(n.into())
                        } else if let Ok(n) = value.parse::<f64>() {
                            serde_json::Number::from_f64(n)
                                .map(serde_json::Value::Number)
                                .ok_or_else(|| ConfigError::InvalidValue {
                                    key: key.to_string(),
                                    message: format!("cannot parse '{value}' as number"),
                                })?
                        } else {
                            return Err(ConfigError::InvalidValue {
                                key: key.to_string(),
                                message: format!("cannot parse '{value}' as number"),
                            });
                        }
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current
                .get_mut(part)
                .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
        }

        Err(ConfigError::UnknownKey(key.to_string()))
    }

    fn path() -> Result<PathBuf, EngineError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from disk or write and return the default.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, EngineError> {
        let path = Self::path()?;
        match std::fs::read_to_string(&path) {
            Ok(content) => {
                let cfg: Config = toml::from_str(&content).map_err(|e| {
                    EngineError::Config(ConfigError::LoadFailed {
                        path,
                        message: e.to_string(),
                    })
                })?;
                Ok(cfg)
            }
            Err(_) => {
                let cfg = Self::default();
                cfg.save()?;
                Ok(cfg)
            }
        }
    }

    /// Persist to disk.
    pub fn save(&self) -> Result<(), EngineError> {
        let path = Self::path()?;
        let content = toml::to_string_pretty(self).map_err(|e| {
            EngineError::Config(ConfigError::SaveFailed {
                path: path.clone(),
                message: e.to_string(),
            })
        })?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by key and persist. Returns an error if the key is
    /// unknown or the value cannot be parsed.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), EngineError> {
        let mut json = serde_json::to_value(&*self)?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        *self = serde_json::from_value(json)?;
        self.save()?;
        Ok(())
    }

    /// Load from disk, returning default on error.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }
}
