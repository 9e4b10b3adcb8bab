//! The seam to the underlying display hardware: reconfiguration and
//! source-swap primitives consumed by the default committers.

use std::sync::{Arc, Mutex};

use thiserror::Error;

use borealis_core::types::{DisplayMode, PointInt, RectInt};
use borealis_image_manager::ImageDetails;

use crate::pipeline::{CompletionHandle, PipelineId};
use crate::sink::Sink;
use crate::surface::SurfaceId;
use crate::transaction::TransactionFlags;

/// Errors reported by the display backend primitives.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The underlying pipeline lacks the requested capability.
    #[error("operation not supported by the underlying pipeline")]
    Unsupported,

    /// The underlying output is transiently unavailable.
    #[error("underlying output is busy")]
    Busy,

    /// The request was rejected by the display hardware.
    #[error("rejected by the display hardware: {0}")]
    Rejected(String),
}

/// Request to display a surface's image at the staged geometry.
#[derive(Debug, Clone)]
pub struct SurfaceUpdate {
    pub surface: SurfaceId,
    pub pipeline: PipelineId,
    pub image: Arc<Mutex<ImageDetails>>,
    pub dest: RectInt,
    pub src: RectInt,
}

/// A complete mode-set descriptor for a pipeline.
///
/// An empty descriptor (no image, no mode, no sinks) tears the pipeline
/// down.
#[derive(Debug, Clone)]
pub struct ModeSetRequest {
    pub pipeline: PipelineId,
    pub position: PointInt,
    pub mode: Option<DisplayMode>,
    pub image: Option<Arc<Mutex<ImageDetails>>>,
    pub sinks: Vec<Arc<Mutex<Sink>>>,
}

/// The reconfiguration and source-swap primitives of the underlying display
/// pipeline. Implemented by the driver; the commit engine only orchestrates.
pub trait DisplayBackend: Send + Sync {
    /// Asks the target pipeline to display the surface's image at the staged
    /// geometry.
    fn update_surface(&self, update: &SurfaceUpdate) -> Result<(), BackendError>;

    /// Detaches a surface from whatever pipeline it feeds. Infallible: a
    /// surface that produces nothing can always be turned off.
    fn disable_surface(&self, surface: SurfaceId);

    /// Attempts to realize a full mode-set descriptor on the pipeline.
    fn reconfigure(&self, request: &ModeSetRequest) -> Result<(), BackendError>;

    /// Attempts an in-place image swap on an already-driving pipeline.
    ///
    /// The completion handle, when present, fires once the swap takes
    /// visible effect; the call itself returns as soon as the swap is
    /// accepted.
    fn swap_image(
        &self,
        pipeline: PipelineId,
        image: Arc<Mutex<ImageDetails>>,
        completion: Option<CompletionHandle>,
        flags: TransactionFlags,
    ) -> Result<(), BackendError>;
}
