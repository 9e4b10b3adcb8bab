//! The device registry: authoritative count and lookup of surfaces,
//! pipelines, and sinks by identity.

use std::sync::{Arc, Mutex};

use borealis_core::types::SinkConnector;

use crate::error::StateError;
use crate::pipeline::{Pipeline, PipelineId};
use crate::sink::{Sink, SinkId};
use crate::surface::{Surface, SurfaceId};

/// Registry of all long-lived display objects.
///
/// Identities are slot indices, so transactions can address staged state with
/// flat index-addressed arrays sized to the counts captured at `begin`. The
/// object count must not change while a transaction is alive.
#[derive(Default)]
pub struct DeviceRegistry {
    surfaces: Vec<Arc<Mutex<Surface>>>,
    pipelines: Vec<Arc<Mutex<Pipeline>>>,
    sinks: Vec<Arc<Mutex<Sink>>>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new surface and returns its identity.
    pub fn add_surface(&mut self) -> SurfaceId {
        let id = SurfaceId::new(self.surfaces.len());
        self.surfaces.push(Arc::new(Mutex::new(Surface::new(id))));
        id
    }

    /// Registers a new pipeline and returns its identity.
    pub fn add_pipeline(&mut self, supports_source_swap: bool) -> PipelineId {
        let id = PipelineId::new(self.pipelines.len());
        self.pipelines
            .push(Arc::new(Mutex::new(Pipeline::new(id, supports_source_swap))));
        id
    }

    /// Registers a new sink and returns its identity.
    pub fn add_sink(&mut self, name: impl Into<String>, connector: SinkConnector) -> SinkId {
        let id = SinkId::new(self.sinks.len());
        self.sinks
            .push(Arc::new(Mutex::new(Sink::new(id, name, connector))));
        id
    }

    pub fn surface(&self, id: SurfaceId) -> Option<Arc<Mutex<Surface>>> {
        self.surfaces.get(id.index()).cloned()
    }

    pub fn pipeline(&self, id: PipelineId) -> Option<Arc<Mutex<Pipeline>>> {
        self.pipelines.get(id.index()).cloned()
    }

    pub fn sink(&self, id: SinkId) -> Option<Arc<Mutex<Sink>>> {
        self.sinks.get(id.index()).cloned()
    }

    pub fn surface_count(&self) -> usize {
        self.surfaces.len()
    }

    pub fn pipeline_count(&self) -> usize {
        self.pipelines.len()
    }

    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }

    /// Resolves a set of sink identifiers to live sink objects.
    ///
    /// Used when building a full mode-set descriptor. Unknown identifiers are
    /// an invalid-argument error.
    pub fn resolve_sinks(&self, ids: &[SinkId]) -> Result<Vec<Arc<Mutex<Sink>>>, StateError> {
        ids.iter()
            .map(|&id| {
                self.sink(id)
                    .ok_or_else(|| StateError::InvalidArgument(format!("unknown {id}")))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_sequential_indices() {
        let mut registry = DeviceRegistry::new();
        assert_eq!(registry.add_surface(), SurfaceId::new(0));
        assert_eq!(registry.add_surface(), SurfaceId::new(1));
        assert_eq!(registry.add_pipeline(true), PipelineId::new(0));
        assert_eq!(registry.surface_count(), 2);
        assert_eq!(registry.pipeline_count(), 1);
    }

    #[test]
    fn test_lookup_returns_registered_object() {
        let mut registry = DeviceRegistry::new();
        let id = registry.add_surface();
        let surface = registry.surface(id).expect("surface should be registered");
        assert_eq!(surface.lock().unwrap().id, id);
        assert!(registry.surface(SurfaceId::new(5)).is_none());
    }

    #[test]
    fn test_resolve_sinks() {
        let mut registry = DeviceRegistry::new();
        let a = registry.add_sink("HDMI-A-1", SinkConnector::Hdmi);
        let b = registry.add_sink("DP-1", SinkConnector::DisplayPort);

        let resolved = registry.resolve_sinks(&[a, b]).unwrap();
        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved[1].lock().unwrap().name, "DP-1");

        let result = registry.resolve_sinks(&[a, SinkId::new(9)]);
        assert!(matches!(result, Err(StateError::InvalidArgument(_))));
    }
}
