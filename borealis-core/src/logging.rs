//! Logging bootstrap for the Borealis core layer.
//!
//! Built on the `tracing` ecosystem. Provides a minimal stderr setup for
//! tests and early startup, and a configuration-driven initializer that
//! honors the level and format from [`LoggingConfig`].

use tracing::Level;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingConfig;
use crate::error::LoggingError;

/// Initializes a minimal logging setup, directing messages to `stderr`.
///
/// Intended for tests and early startup before configuration is loaded.
/// Filters via the `RUST_LOG` environment variable, defaulting to "info".
/// Errors from double initialization are ignored.
pub fn init_minimal_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(Level::INFO.to_string()));

    let _ = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Initializes the global logging subscriber from configuration.
///
/// # Arguments
/// * `config`: Level and format settings, typically from the loaded
///   [`crate::config::CoreConfig`].
pub fn initialize_logging(config: &LoggingConfig) -> Result<(), LoggingError> {
    let filter = EnvFilter::try_new(&config.level)
        .map_err(|e| LoggingError::InvalidConfig(format!("level {:?}: {e}", config.level)))?;

    let builder = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let result = match config.format.to_lowercase().as_str() {
        "json" => builder.json().try_init(),
        "text" => builder.try_init(),
        other => {
            return Err(LoggingError::InvalidConfig(format!(
                "unknown format {other:?}"
            )))
        }
    };

    result.map_err(|_| LoggingError::AlreadyInitialized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_logging_is_idempotent() {
        // Neither call may panic; the second becomes a no-op.
        init_minimal_logging();
        init_minimal_logging();
    }

    #[test]
    fn test_initialize_logging_rejects_unknown_format() {
        let config = LoggingConfig {
            level: "info".to_string(),
            format: "yaml".to_string(),
            file: None,
        };
        let result = initialize_logging(&config);
        assert!(matches!(result, Err(LoggingError::InvalidConfig(_))));
    }
}
