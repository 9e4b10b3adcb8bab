//! Transactions and staged state.
//!
//! A transaction collects staged configuration snapshots for every surface
//! and pipeline touched by a client, so that either all staged changes take
//! effect together at commit or none do. Slots are flat index-addressed
//! arrays sized to the system's object counts when the transaction begins;
//! the object count must not change for the transaction's lifetime.

use std::any::Any;
use std::sync::{Arc, Mutex};

use bitflags::bitflags;

use borealis_core::types::{DisplayMode, PointInt, RectInt};
use borealis_image_manager::{ImageDetails, ImageManager};

use crate::error::StateError;
use crate::pipeline::{CompletionHandle, Pipeline, PipelineConfig, PipelineId};
use crate::sink::SinkId;
use crate::surface::{Surface, SurfaceConfig, SurfaceId};

bitflags! {
    /// Flags captured at `begin`, applying uniformly to every commit
    /// performed under the transaction.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TransactionFlags: u32 {
        /// Commit must not block waiting for a swap to become visible.
        const NONBLOCK = 1 << 0;
        /// Request an immediate swap, not aligned to the refresh boundary.
        const ASYNC_SWAP = 1 << 1;
    }
}

/// A staged copy of a surface's configuration, tagged to one transaction.
///
/// A staged state is either *unadopted* (reachable only from the
/// transaction) or *adopted* (swapped into the surface's active slot, with
/// the displaced previous configuration left here in its place) for the
/// whole life of the transaction.
#[derive(Debug)]
pub struct StagedSurfaceState {
    pub config: SurfaceConfig,
    /// Whether `config.image` holds a caller-supplied reference rather than
    /// the unowned snapshot of the active image.
    image_owned: bool,
    adopted: bool,
    /// Extension slot for drivers that stage additional per-surface state
    /// through a custom get-state capability.
    pub driver_data: Option<Box<dyn Any + Send>>,
}

impl StagedSurfaceState {
    fn snapshot(surface: &Surface) -> Self {
        Self {
            config: surface.active.clone(),
            image_owned: false,
            adopted: false,
            driver_data: None,
        }
    }

    /// Stages an image, consuming the reference the caller already holds on
    /// it. A previously staged owned reference is released.
    pub fn set_image(
        &mut self,
        image: Option<Arc<Mutex<ImageDetails>>>,
        images: &mut ImageManager,
    ) {
        if self.image_owned {
            if let Some(previous) = self.config.image.take() {
                let id = previous.lock().unwrap().id;
                images.release_image(id);
            }
        }
        self.image_owned = image.is_some();
        self.config.image = image;
    }

    pub fn set_pipeline(&mut self, pipeline: Option<PipelineId>) {
        self.config.pipeline = pipeline;
    }

    pub fn set_dest(&mut self, dest: RectInt) {
        self.config.dest = dest;
    }

    pub fn set_src(&mut self, src: RectInt) {
        self.config.src = src;
    }

    pub fn is_adopted(&self) -> bool {
        self.adopted
    }

    pub fn owns_image(&self) -> bool {
        self.image_owned
    }

    pub(crate) fn mark_adopted(&mut self) {
        self.adopted = true;
    }
}

/// A staged copy of a pipeline's configuration, tagged to one transaction.
#[derive(Debug)]
pub struct StagedPipelineState {
    pub config: PipelineConfig,
    completion: Option<CompletionHandle>,
    full_reconfiguration: bool,
    image_owned: bool,
    adopted: bool,
    /// Extension slot for drivers staging additional per-pipeline state.
    pub driver_data: Option<Box<dyn Any + Send>>,
}

impl StagedPipelineState {
    fn snapshot(pipeline: &Pipeline) -> Self {
        Self {
            config: pipeline.active.clone(),
            completion: None,
            full_reconfiguration: false,
            image_owned: false,
            adopted: false,
            driver_data: None,
        }
    }

    /// Stages an image, consuming the reference the caller already holds on
    /// it. A previously staged owned reference is released.
    pub fn set_image(
        &mut self,
        image: Option<Arc<Mutex<ImageDetails>>>,
        images: &mut ImageManager,
    ) {
        if self.image_owned {
            if let Some(previous) = self.config.image.take() {
                let id = previous.lock().unwrap().id;
                images.release_image(id);
            }
        }
        self.image_owned = image.is_some();
        self.config.image = image;
    }

    /// Stages a mode change. Mode changes require a full reconfiguration.
    pub fn set_mode(&mut self, mode: Option<DisplayMode>) {
        self.config.mode = mode;
        self.full_reconfiguration = true;
    }

    pub fn set_position(&mut self, position: PointInt) {
        self.config.position = position;
    }

    /// Stages the set of driven sinks. Sink changes require a full
    /// reconfiguration.
    pub fn set_sinks(&mut self, sinks: Vec<SinkId>) {
        self.config.sinks = sinks;
        self.full_reconfiguration = true;
    }

    /// Forces the full-reconfiguration commit path.
    pub fn require_full_reconfiguration(&mut self) {
        self.full_reconfiguration = true;
    }

    pub fn needs_full_reconfiguration(&self) -> bool {
        self.full_reconfiguration
    }

    /// Stages a completion-event handle, fired when the committed update
    /// takes visible effect.
    pub fn set_completion(&mut self, handle: CompletionHandle) {
        self.completion = Some(handle);
    }

    pub fn completion(&self) -> Option<CompletionHandle> {
        self.completion
    }

    pub(crate) fn take_completion(&mut self) -> Option<CompletionHandle> {
        self.completion.take()
    }

    pub fn is_adopted(&self) -> bool {
        self.adopted
    }

    pub fn owns_image(&self) -> bool {
        self.image_owned
    }

    pub(crate) fn mark_adopted(&mut self) {
        self.adopted = true;
    }
}

/// An in-flight set of staged changes.
///
/// Created by [`crate::engine::CommitEngine::begin`], populated by staging,
/// consumed by `check`/`commit`, and destroyed by `end`, which releases
/// every staged state exactly once even after a partially successful commit.
pub struct Transaction {
    flags: TransactionFlags,
    surfaces: Vec<Option<StagedSurfaceState>>,
    pipelines: Vec<Option<StagedPipelineState>>,
}

impl Transaction {
    pub(crate) fn new(
        surface_count: usize,
        pipeline_count: usize,
        flags: TransactionFlags,
    ) -> Result<Self, StateError> {
        let mut surfaces = Vec::new();
        surfaces
            .try_reserve_exact(surface_count)
            .map_err(|_| StateError::ResourceExhausted("surface slot table".to_string()))?;
        surfaces.resize_with(surface_count, || None);

        let mut pipelines = Vec::new();
        pipelines
            .try_reserve_exact(pipeline_count)
            .map_err(|_| StateError::ResourceExhausted("pipeline slot table".to_string()))?;
        pipelines.resize_with(pipeline_count, || None);

        Ok(Self {
            flags,
            surfaces,
            pipelines,
        })
    }

    pub fn flags(&self) -> TransactionFlags {
        self.flags
    }

    /// Number of surface slots (the system's surface count at `begin`).
    pub fn surface_slots(&self) -> usize {
        self.surfaces.len()
    }

    /// Number of pipeline slots (the system's pipeline count at `begin`).
    pub fn pipeline_slots(&self) -> usize {
        self.pipelines.len()
    }

    pub fn surface_state(&self, id: SurfaceId) -> Option<&StagedSurfaceState> {
        self.surfaces.get(id.index())?.as_ref()
    }

    pub fn surface_state_mut(&mut self, id: SurfaceId) -> Option<&mut StagedSurfaceState> {
        self.surfaces.get_mut(id.index())?.as_mut()
    }

    pub fn pipeline_state(&self, id: PipelineId) -> Option<&StagedPipelineState> {
        self.pipelines.get(id.index())?.as_ref()
    }

    pub fn pipeline_state_mut(&mut self, id: PipelineId) -> Option<&mut StagedPipelineState> {
        self.pipelines.get_mut(id.index())?.as_mut()
    }

    /// Returns the staged state for `surface`, snapshotting its active
    /// configuration on first use. Idempotent per (surface, transaction):
    /// repeated calls return the same staged state, so multiple property
    /// writes accumulate.
    pub(crate) fn stage_surface(
        &mut self,
        surface: &Surface,
    ) -> Result<&mut StagedSurfaceState, StateError> {
        let index = surface.id.index();
        let slot = self.surfaces.get_mut(index).ok_or_else(|| {
            StateError::InvalidArgument(format!(
                "{} outside the transaction's slot table",
                surface.id
            ))
        })?;
        Ok(slot.get_or_insert_with(|| StagedSurfaceState::snapshot(surface)))
    }

    /// Pipeline counterpart of [`Transaction::stage_surface`].
    pub(crate) fn stage_pipeline(
        &mut self,
        pipeline: &Pipeline,
    ) -> Result<&mut StagedPipelineState, StateError> {
        let index = pipeline.id.index();
        let slot = self.pipelines.get_mut(index).ok_or_else(|| {
            StateError::InvalidArgument(format!(
                "{} outside the transaction's slot table",
                pipeline.id
            ))
        })?;
        Ok(slot.get_or_insert_with(|| StagedPipelineState::snapshot(pipeline)))
    }

    /// Releases every staged state.
    ///
    /// Unadopted slots still hold any caller-supplied image reference; those
    /// are released exactly once here. Adopted slots hold the displaced
    /// previous configurations, whose references were already settled during
    /// commit. Tolerates the mixed outcome of a partially successful commit.
    pub(crate) fn release_all(self, images: &mut ImageManager) {
        for slot in self.surfaces {
            if let Some(state) = slot {
                if !state.adopted && state.image_owned {
                    if let Some(image) = state.config.image {
                        let id = image.lock().unwrap().id;
                        images.release_image(id);
                    }
                }
            }
        }
        for slot in self.pipelines {
            if let Some(state) = slot {
                if !state.adopted && state.image_owned {
                    if let Some(image) = state.config.image {
                        let id = image.lock().unwrap().id;
                        images.release_image(id);
                    }
                }
            }
        }
    }
}
