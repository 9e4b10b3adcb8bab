//! Shared data types for the Borealis display stack.

pub mod display;
pub mod geometry;

pub use display::{DisplayMode, SinkConnector, SinkStatus};
pub use geometry::{PointInt, RectInt, SizeInt};
