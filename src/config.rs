//! Configuration.
//!
//! Configuration is loaded in the following order (later overrides earlier):
//! 1. Default values
//! 2. YAML config file (if specified via RULEFLOW_CONFIG or --config)
//! 3. Environment variables

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logging configuration.
    pub logging: LoggingConfig,
    /// Machine definition loading.
    pub machines: MachinesConfig,
}

impl Config {
    /// Loads configuration from `path` (or RULEFLOW_CONFIG), then applies
    /// environment variable overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var("RULEFLOW_CONFIG").ok().map(PathBuf::from));

        let mut config = match path {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Loads configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    fn apply_env_overrides(&mut self) {
        self.logging.apply_env_overrides();
        self.machines.apply_env_overrides();
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when RUST_LOG is unset.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl LoggingConfig {
    fn apply_env_overrides(&mut self) {
        if let Ok(level) = std::env::var("RULEFLOW_LOG_LEVEL") {
            if !level.is_empty() {
                self.level = level;
            }
        }
    }
}

/// Where machine definitions come from.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MachinesConfig {
    /// Directory scanned for `*.json`, `*.yaml` and `*.yml` definitions.
    pub definitions_dir: Option<PathBuf>,
    /// Apply a file whose id is already registered as an update instead
    /// of rejecting it.
    pub replace_existing: bool,
}

impl MachinesConfig {
    fn apply_env_overrides(&mut self) {
        if let Ok(dir) = std::env::var("RULEFLOW_DEFINITIONS_DIR") {
            if !dir.is_empty() {
                self.definitions_dir = Some(PathBuf::from(dir));
            }
        }

        if let Ok(replace) = std::env::var("RULEFLOW_REPLACE_EXISTING") {
            self.replace_existing = replace == "1" || replace.to_lowercase() == "true";
        }
    }
}

/// Configuration and definition loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse '{}': {reason}", path.display())]
    Parse { path: PathBuf, reason: String },

    #[error("failed to load '{}': {source}", path.display())]
    Definition {
        path: PathBuf,
        source: ruleflow_core::CoreError,
    },
}
