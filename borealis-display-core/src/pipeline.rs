//! Pipelines: output-driving objects that consume a surface's image and
//! drive connected sinks.

use std::sync::{Arc, Mutex};

use borealis_core::types::{DisplayMode, PointInt};
use borealis_image_manager::{ImageDetails, ImageId};

use crate::sink::SinkId;

/// Identity of a pipeline. Doubles as its slot index in transactions and in
/// the device registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PipelineId(usize);

impl PipelineId {
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for PipelineId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "pipeline {}", self.0)
    }
}

/// A handle for a completion event staged by the caller before commit.
///
/// The engine only attaches the handle to a pipeline's staged state and
/// forwards it into the source-swap primitive; delivery back to the original
/// requester happens outside this core, when the swap becomes visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletionHandle {
    pub id: u64,
    pub user_data: u64,
}

impl CompletionHandle {
    pub fn new(id: u64, user_data: u64) -> Self {
        Self { id, user_data }
    }
}

/// A pipeline's configuration: the scanned-out image, scanout position,
/// active mode, and the set of sinks it drives.
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    /// Image the pipeline scans out, or `None` when disabled.
    pub image: Option<Arc<Mutex<ImageDetails>>>,
    /// Scanout offset within the image.
    pub position: PointInt,
    /// Active display mode, or `None` when disabled.
    pub mode: Option<DisplayMode>,
    /// Sinks driven by this pipeline.
    pub sinks: Vec<SinkId>,
}

impl PipelineConfig {
    /// Identity of the scanned-out image, if any.
    pub fn image_id(&self) -> Option<ImageId> {
        self.image.as_ref().map(|image| image.lock().unwrap().id)
    }
}

/// A long-lived output-driving object.
///
/// `bound_image` tracks the image the underlying output actually has bound,
/// which can diverge from `active`: a hotplug event may unbind the output
/// asynchronously before userspace has observed the change. A source swap
/// against such a pipeline fails with a transient busy error rather than a
/// hard failure.
#[derive(Debug)]
pub struct Pipeline {
    pub id: PipelineId,
    pub active: PipelineConfig,
    /// Image currently bound on the underlying output.
    pub bound_image: Option<ImageId>,
    /// Whether the underlying output can swap its source image in place.
    pub supports_source_swap: bool,
}

impl Pipeline {
    pub fn new(id: PipelineId, supports_source_swap: bool) -> Self {
        Self {
            id,
            active: PipelineConfig::default(),
            bound_image: None,
            supports_source_swap,
        }
    }
}
