//! Configuration file support for Seven.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/seven/config.toml`.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub timer: TimerConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

impl DataConfig {
    /// Path of the key-value file inside the data directory
    pub fn store_path(&self) -> PathBuf {
        self.data_dir.join("store.json")
    }
}

/// Shape of the random seven-minute circuit
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionConfig {
    /// How many exercises to draw from the catalog (capped by catalog size)
    #[serde(default = "default_exercise_count")]
    pub exercise_count: usize,

    #[serde(default = "default_work_seconds")]
    pub work_seconds: u32,

    #[serde(default = "default_rest_seconds")]
    pub rest_seconds: u32,

    /// Seconds credited to the daily history when a circuit completes,
    /// also the daily goal shown by `status`
    #[serde(default = "default_target_seconds")]
    pub target_seconds: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            exercise_count: default_exercise_count(),
            work_seconds: default_work_seconds(),
            rest_seconds: default_rest_seconds(),
            target_seconds: default_target_seconds(),
        }
    }
}

/// Tick cadence
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TimerConfig {
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
        }
    }
}

impl TimerConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));
    base.join("seven")
}

fn default_exercise_count() -> usize {
    12
}

fn default_work_seconds() -> u32 {
    crate::types::DEFAULT_WORK_SECONDS
}

fn default_rest_seconds() -> u32 {
    crate::types::DEFAULT_REST_SECONDS
}

fn default_target_seconds() -> u32 {
    7 * 60
}

fn default_tick_interval_ms() -> u64 {
    1000
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!(
                "No config file found at {:?}, using defaults",
                config_path
            );
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
            .unwrap_or_else(|| PathBuf::from("."));
        base.join("seven").join("config.toml")
    }

    /// Reject values that would make the timer stall or never start
    pub fn validate(&self) -> Result<()> {
        let session = &self.session;
        if session.exercise_count == 0 {
            return Err(Error::Config("session.exercise_count must be > 0".into()));
        }
        if session.work_seconds == 0 || session.rest_seconds == 0 {
            return Err(Error::Config(
                "session.work_seconds and session.rest_seconds must be > 0".into(),
            ));
        }
        if session.target_seconds == 0 {
            return Err(Error::Config("session.target_seconds must be > 0".into()));
        }
        Ok(())
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }
}
