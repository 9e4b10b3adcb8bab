//! Configuration management for the Borealis core layer.
//!
//! Defines the TOML-backed configuration schema ([`CoreConfig`],
//! [`LoggingConfig`]) and a loader that reads and validates a configuration
//! file, falling back to defaults when no file is present.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Configuration for the logging subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter: "trace", "debug", "info", "warn" or "error".
    pub level: String,
    /// Output format: "text" or "json".
    pub format: String,
    /// Optional log file path. Logs go to stderr when absent.
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
            file: None,
        }
    }
}

/// Root configuration for the core layer.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Logging subsystem configuration.
    pub logging: LoggingConfig,
}

const VALID_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];
const VALID_FORMATS: &[&str] = &["text", "json"];

/// Loader for [`CoreConfig`].
pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads configuration from the given TOML file.
    ///
    /// Returns the default configuration if the file does not exist. Read,
    /// parse and validation failures are reported as [`ConfigError`].
    pub fn load_from_path(path: &Path) -> Result<CoreConfig, ConfigError> {
        if !path.exists() {
            return Ok(CoreConfig::default());
        }
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        let config: CoreConfig = toml::from_str(&contents)?;
        Self::validate(&config)?;
        Ok(config)
    }

    /// Validates a parsed configuration.
    pub fn validate(config: &CoreConfig) -> Result<(), ConfigError> {
        let level = config.logging.level.to_lowercase();
        if !VALID_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "unknown log level {:?}",
                config.logging.level
            )));
        }
        let format = config.logging.format.to_lowercase();
        if !VALID_FORMATS.contains(&format.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "unknown log format {:?}",
                config.logging.format
            )));
        }
        Ok(())
    }
}
