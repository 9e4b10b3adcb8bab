//! # Borealis Core Library (`borealis-core`)
//!
//! Foundational library for the Borealis display stack. It provides the
//! pieces every other crate in the workspace leans on:
//!
//! - **Error Handling**: a unified error system through [`error::CoreError`]
//!   and the more specific [`error::ConfigError`] and [`error::LoggingError`].
//! - **Core Data Types**: integer geometry ([`types::PointInt`],
//!   [`types::SizeInt`], [`types::RectInt`]) and display sink/mode types
//!   ([`types::DisplayMode`], [`types::SinkConnector`], [`types::SinkStatus`]).
//! - **Configuration**: TOML-based loading with defaults and validation via
//!   [`config::ConfigLoader`] and [`config::CoreConfig`].
//! - **Logging**: a `tracing`-based bootstrap, configurable for text or JSON
//!   output through [`logging::initialize_logging`].

pub mod config;
pub mod error;
pub mod logging;
pub mod types;

pub use config::{ConfigLoader, CoreConfig, LoggingConfig};
pub use error::{ConfigError, CoreError, LoggingError};
pub use types::{DisplayMode, PointInt, RectInt, SinkConnector, SinkStatus, SizeInt};
