//! # Borealis Image Manager
//!
//! This crate provides the scanout image registry for the Borealis display
//! stack. It handles image registration, protocol-level reference counting,
//! and structures describing image properties like backing, format, and
//! dimensions.
//!
//! It is designed to be used by the display commit engine, which associates
//! images with surfaces and pipelines and releases references as staged
//! configurations are adopted or discarded.

pub mod image;

// Re-export key types for convenience.
pub use image::{ClientId, ImageBacking, ImageDetails, ImageFormat, ImageId, ImageManager};
