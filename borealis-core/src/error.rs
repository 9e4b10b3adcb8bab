//! Error handling for the Borealis core layer.
//!
//! This module defines the error types shared by the foundational layer,
//! built on the `thiserror` crate. The main error type is [`CoreError`],
//! which wraps the more specific [`ConfigError`] and [`LoggingError`].

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for the Borealis display stack foundation layer.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Errors related to configuration loading, parsing, or validation.
    #[error("Configuration Error: {0}")]
    Config(#[from] ConfigError),

    /// Errors that occur during initialization of the logging system.
    #[error("Logging Initialization Failed: {0}")]
    Logging(#[from] LoggingError),

    /// General I/O errors not covered by a more specific variant.
    #[error("I/O Error: {0}")]
    Io(#[from] std::io::Error),

    /// Catch-all for unexpected internal errors within the core library.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

/// Error type for configuration-related operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An error occurred while attempting to read a configuration file.
    #[error("Failed to read configuration file from {path:?}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An error occurred while parsing a configuration file.
    #[error("Failed to parse configuration file: {0}")]
    ParseError(#[from] toml::de::Error),

    /// A configuration value failed validation after successful parsing.
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Error type for logging subsystem initialization.
#[derive(Debug, Error)]
pub enum LoggingError {
    /// The global tracing subscriber was already installed.
    #[error("A global logging subscriber has already been set")]
    AlreadyInitialized,

    /// The configured log level or format was not understood.
    #[error("Invalid logging configuration: {0}")]
    InvalidConfig(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::ValidationError("level must not be empty".to_string());
        assert_eq!(
            err.to_string(),
            "Configuration validation failed: level must not be empty"
        );
    }

    #[test]
    fn test_core_error_from_config_error() {
        let err: CoreError = ConfigError::ValidationError("bad".to_string()).into();
        assert!(matches!(err, CoreError::Config(_)));
        assert!(err.to_string().starts_with("Configuration Error:"));
    }

    #[test]
    fn test_core_error_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: CoreError = io_err.into();
        assert!(matches!(err, CoreError::Io(_)));
    }

    #[test]
    fn test_logging_error_display() {
        let err = LoggingError::AlreadyInitialized;
        assert_eq!(
            err.to_string(),
            "A global logging subscriber has already been set"
        );
    }
}
