//! Surfaces: image-producing configurable objects composited onto an output.

use std::sync::{Arc, Mutex};

use borealis_core::types::RectInt;
use borealis_image_manager::{ImageDetails, ImageId};

use crate::pipeline::PipelineId;

/// Identity of a surface. Doubles as its slot index in transactions and in
/// the device registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceId(usize);

impl SurfaceId {
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "surface {}", self.0)
    }
}

/// A surface's configuration: which pipeline it feeds, the image it scans
/// out, and the destination/source rectangles.
#[derive(Debug, Clone, Default)]
pub struct SurfaceConfig {
    /// Target pipeline, or `None` when the surface is detached.
    pub pipeline: Option<PipelineId>,
    /// Attached image, or `None` when the surface produces no output.
    pub image: Option<Arc<Mutex<ImageDetails>>>,
    /// Destination rectangle on the pipeline, in pipeline coordinates.
    pub dest: RectInt,
    /// Source rectangle within the image, in image coordinates.
    pub src: RectInt,
}

impl SurfaceConfig {
    /// Identity of the attached image, if any.
    pub fn image_id(&self) -> Option<ImageId> {
        self.image.as_ref().map(|image| image.lock().unwrap().id)
    }
}

/// A long-lived output-producing object.
///
/// Owned by the device registry; transactions never own a surface, only its
/// staged state. The active configuration is only replaced by adopting a
/// staged state during a commit.
#[derive(Debug)]
pub struct Surface {
    pub id: SurfaceId,
    pub active: SurfaceConfig,
}

impl Surface {
    pub fn new(id: SurfaceId) -> Self {
        Self {
            id,
            active: SurfaceConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_surface_creation_defaults() {
        let surface = Surface::new(SurfaceId::new(3));
        assert_eq!(surface.id, SurfaceId::new(3));
        assert!(surface.active.pipeline.is_none(), "New surface should be detached.");
        assert!(surface.active.image.is_none(), "New surface should have no image.");
        assert!(surface.active.dest.is_empty());
    }

    #[test]
    fn test_surface_id_display() {
        assert_eq!(SurfaceId::new(7).to_string(), "surface 7");
    }

    #[test]
    fn test_config_image_id_when_absent() {
        let config = SurfaceConfig::default();
        assert!(config.image_id().is_none());
    }
}
