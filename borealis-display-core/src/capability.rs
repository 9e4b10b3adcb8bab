//! Per-object-kind commit operations.
//!
//! The engine never hardcodes how a surface or pipeline is validated or
//! committed; it dispatches through a capability table. The defaults here
//! implement the standard behavior, and a driver can wrap or replace either
//! entry to stage extra state or add validation while reusing the rest.

use std::mem;
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use borealis_core::types::{PointInt, RectInt};
use borealis_image_manager::{ImageId, ImageManager};

use crate::backend::{BackendError, DisplayBackend, ModeSetRequest, SurfaceUpdate};
use crate::error::{ObjectRef, StateError};
use crate::pipeline::{Pipeline, PipelineId};
use crate::registry::DeviceRegistry;
use crate::surface::{Surface, SurfaceId};
use crate::transaction::{
    StagedPipelineState, StagedSurfaceState, Transaction, TransactionFlags,
};

/// Shared references handed to the commit operations of every object in one
/// commit pass.
pub struct CommitContext<'a> {
    pub registry: &'a DeviceRegistry,
    pub backend: &'a dyn DisplayBackend,
    pub images: &'a Mutex<ImageManager>,
    /// Serializes full reconfigurations and surface updates against each
    /// other. Source swaps deliberately bypass it.
    pub config_lock: &'a Mutex<()>,
    pub flags: TransactionFlags,
}

/// Surface operations dispatched by the engine.
pub trait SurfaceStateOps: Send + Sync {
    /// Returns the staged state for `surface` in `txn`, snapshotting the
    /// active configuration on first use.
    fn get_state<'a>(
        &self,
        surface: &Surface,
        txn: &'a mut Transaction,
    ) -> Result<&'a mut StagedSurfaceState, StateError>;

    /// Validates one staged surface state without touching hardware.
    fn check_state(
        &self,
        surface: SurfaceId,
        state: &StagedSurfaceState,
        registry: &DeviceRegistry,
    ) -> Result<(), StateError>;

    /// Applies one staged surface state and, on success, adopts it into the
    /// surface.
    fn commit_state(
        &self,
        surface: &Arc<Mutex<Surface>>,
        txn: &mut Transaction,
        ctx: &CommitContext<'_>,
    ) -> Result<(), StateError>;
}

/// Pipeline operations dispatched by the engine.
pub trait PipelineStateOps: Send + Sync {
    fn get_state<'a>(
        &self,
        pipeline: &Pipeline,
        txn: &'a mut Transaction,
    ) -> Result<&'a mut StagedPipelineState, StateError>;

    fn check_state(
        &self,
        pipeline: PipelineId,
        state: &StagedPipelineState,
        registry: &DeviceRegistry,
    ) -> Result<(), StateError>;

    fn commit_state(
        &self,
        pipeline: &Arc<Mutex<Pipeline>>,
        txn: &mut Transaction,
        ctx: &CommitContext<'_>,
    ) -> Result<(), StateError>;
}

/// The operation table the engine dispatches through.
#[derive(Clone)]
pub struct CapabilityTable {
    pub surface_ops: Arc<dyn SurfaceStateOps>,
    pub pipeline_ops: Arc<dyn PipelineStateOps>,
}

impl Default for CapabilityTable {
    fn default() -> Self {
        Self {
            surface_ops: Arc::new(DefaultSurfaceOps),
            pipeline_ops: Arc::new(DefaultPipelineOps),
        }
    }
}

/// Adopts a staged state into an active configuration slot.
///
/// The staged configuration becomes active and the displaced previous
/// configuration is left in the staged slot. Returns the identity of the
/// displaced image reference the caller must release, if any: the previous
/// active reference dies unless the adopted configuration carries that same
/// unowned snapshot reference forward.
fn adopt<C>(active: &mut C, staged: &mut C, old_image: Option<ImageId>, staged_owned: bool, staged_has_image: bool) -> Option<ImageId> {
    mem::swap(active, staged);
    match old_image {
        Some(id) if staged_owned || !staged_has_image => Some(id),
        _ => None,
    }
}

fn release(images: &Mutex<ImageManager>, id: Option<ImageId>) {
    if let Some(id) = id {
        images.lock().unwrap().release_image(id);
    }
}

/// Standard surface operations.
pub struct DefaultSurfaceOps;

impl SurfaceStateOps for DefaultSurfaceOps {
    fn get_state<'a>(
        &self,
        surface: &Surface,
        txn: &'a mut Transaction,
    ) -> Result<&'a mut StagedSurfaceState, StateError> {
        txn.stage_surface(surface)
    }

    fn check_state(
        &self,
        surface: SurfaceId,
        state: &StagedSurfaceState,
        registry: &DeviceRegistry,
    ) -> Result<(), StateError> {
        if let Some(pipeline) = state.config.pipeline {
            if registry.pipeline(pipeline).is_none() {
                return Err(StateError::ValidationFailed {
                    surface,
                    reason: format!("targets unknown {pipeline}"),
                });
            }
        }

        if let Some(image) = &state.config.image {
            if state.config.pipeline.is_none() {
                return Err(StateError::ValidationFailed {
                    surface,
                    reason: "image attached without a target pipeline".to_string(),
                });
            }
            if state.config.dest.is_empty() {
                return Err(StateError::ValidationFailed {
                    surface,
                    reason: "empty destination rectangle".to_string(),
                });
            }
            let (width, height) = {
                let details = image.lock().unwrap();
                (details.width, details.height)
            };
            let bounds = RectInt::new(0, 0, width, height);
            if !state.config.src.contained_in(&bounds) {
                return Err(StateError::ValidationFailed {
                    surface,
                    reason: format!(
                        "source rectangle {:?} exceeds {width}x{height} image bounds",
                        state.config.src
                    ),
                });
            }
        }

        Ok(())
    }

    fn commit_state(
        &self,
        surface: &Arc<Mutex<Surface>>,
        txn: &mut Transaction,
        ctx: &CommitContext<'_>,
    ) -> Result<(), StateError> {
        let surface_id = surface.lock().unwrap().id;
        let state = txn.surface_state_mut(surface_id).ok_or_else(|| {
            StateError::InvalidArgument(format!("{surface_id} has no staged state"))
        })?;

        let update = match (state.config.pipeline, state.config.image.clone()) {
            (Some(pipeline), Some(image)) => Some(SurfaceUpdate {
                surface: surface_id,
                pipeline,
                image,
                dest: state.config.dest,
                src: state.config.src,
            }),
            _ => None,
        };

        {
            let _config = ctx.config_lock.lock().unwrap();
            match &update {
                Some(request) => {
                    debug!(surface = %surface_id, pipeline = %request.pipeline, "Committing surface update");
                    ctx.backend.update_surface(request).map_err(|source| {
                        warn!(surface = %surface_id, error = %source, "Surface update rejected");
                        StateError::CommitFailed {
                            object: ObjectRef::Surface(surface_id),
                            source,
                        }
                    })?;
                }
                None => {
                    debug!(surface = %surface_id, "Disabling surface");
                    ctx.backend.disable_surface(surface_id);
                }
            }
        }

        let staged_owned = state.owns_image();
        let staged_has_image = state.config.image.is_some();
        let displaced = {
            let mut guard = surface.lock().unwrap();
            let old_image = guard.active.image_id();
            let displaced = adopt(
                &mut guard.active,
                &mut state.config,
                old_image,
                staged_owned,
                staged_has_image,
            );
            state.mark_adopted();
            displaced
        };
        release(ctx.images, displaced);

        Ok(())
    }
}

/// Standard pipeline operations.
///
/// Commit selects one of three paths: a full reconfiguration when a staged
/// mode or sink change (or an explicit request) demands one, an in-place
/// source swap when only the scanned-out image changed, or a teardown when
/// the image was cleared on a driving pipeline. Staged state matching none
/// of the paths is an invalid argument.
pub struct DefaultPipelineOps;

impl PipelineStateOps for DefaultPipelineOps {
    fn get_state<'a>(
        &self,
        pipeline: &Pipeline,
        txn: &'a mut Transaction,
    ) -> Result<&'a mut StagedPipelineState, StateError> {
        txn.stage_pipeline(pipeline)
    }

    fn check_state(
        &self,
        _pipeline: PipelineId,
        _state: &StagedPipelineState,
        _registry: &DeviceRegistry,
    ) -> Result<(), StateError> {
        Ok(())
    }

    fn commit_state(
        &self,
        pipeline: &Arc<Mutex<Pipeline>>,
        txn: &mut Transaction,
        ctx: &CommitContext<'_>,
    ) -> Result<(), StateError> {
        let pipeline_id = pipeline.lock().unwrap().id;
        let state = txn.pipeline_state_mut(pipeline_id).ok_or_else(|| {
            StateError::InvalidArgument(format!("{pipeline_id} has no staged state"))
        })?;

        if state.needs_full_reconfiguration() {
            return commit_full_reconfiguration(pipeline, pipeline_id, state, ctx);
        }

        let staged_image = state.config.image_id();
        let active_image = pipeline.lock().unwrap().active.image_id();

        match (staged_image, active_image) {
            (Some(staged), _) if Some(staged) != active_image => {
                commit_source_swap(pipeline, pipeline_id, state, ctx)
            }
            (None, Some(_)) => commit_teardown(pipeline, pipeline_id, state, ctx),
            _ => Err(StateError::InvalidArgument(format!(
                "no commit path applies to the staged state of {pipeline_id}"
            ))),
        }
    }
}

/// Realizes a complete mode-set descriptor: image, position, mode, and the
/// driven sinks, all applied together under the global configuration lock.
fn commit_full_reconfiguration(
    pipeline: &Arc<Mutex<Pipeline>>,
    pipeline_id: PipelineId,
    state: &mut StagedPipelineState,
    ctx: &CommitContext<'_>,
) -> Result<(), StateError> {
    let sinks = ctx.registry.resolve_sinks(&state.config.sinks)?;
    let request = ModeSetRequest {
        pipeline: pipeline_id,
        position: state.config.position,
        mode: state.config.mode.clone(),
        image: state.config.image.clone(),
        sinks,
    };

    debug!(
        pipeline = %pipeline_id,
        mode = ?request.mode,
        sinks = request.sinks.len(),
        "Committing full reconfiguration"
    );

    let _config = ctx.config_lock.lock().unwrap();
    let mut guard = pipeline.lock().unwrap();
    ctx.backend.reconfigure(&request).map_err(|source| {
        warn!(pipeline = %pipeline_id, error = %source, "Reconfiguration rejected");
        StateError::CommitFailed {
            object: ObjectRef::Pipeline(pipeline_id),
            source,
        }
    })?;

    let staged_owned = state.owns_image();
    let staged_has_image = state.config.image.is_some();
    let old_image = guard.active.image_id();
    let displaced = adopt(
        &mut guard.active,
        &mut state.config,
        old_image,
        staged_owned,
        staged_has_image,
    );
    state.mark_adopted();
    guard.bound_image = guard.active.image_id();
    drop(guard);

    release(ctx.images, displaced);
    Ok(())
}

/// Swaps the scanned-out image in place on an already-driving pipeline.
///
/// Takes only the pipeline's own lock: a swap never perturbs the global
/// configuration, so concurrent swaps on other pipelines may proceed. The
/// staged completion handle is forwarded to the swap primitive and consumed
/// only if the swap is accepted; on failure it stays staged and the caller
/// still owns its delivery.
fn commit_source_swap(
    pipeline: &Arc<Mutex<Pipeline>>,
    pipeline_id: PipelineId,
    state: &mut StagedPipelineState,
    ctx: &CommitContext<'_>,
) -> Result<(), StateError> {
    let image = state
        .config
        .image
        .clone()
        .ok_or_else(|| StateError::InvalidArgument(format!("{pipeline_id} swap without an image")))?;

    let mut guard = pipeline.lock().unwrap();

    // The underlying output can be unbound asynchronously by a hotplug
    // event before the caller observes it.
    if guard.bound_image.is_none() {
        debug!(pipeline = %pipeline_id, "Swap raced with output unbind");
        return Err(StateError::TransientlyBusy);
    }
    if !guard.supports_source_swap {
        return Err(StateError::Unsupported);
    }

    ctx.backend
        .swap_image(pipeline_id, image, state.completion(), ctx.flags)
        .map_err(|source| match source {
            BackendError::Unsupported => StateError::Unsupported,
            BackendError::Busy => StateError::TransientlyBusy,
            other => {
                warn!(pipeline = %pipeline_id, error = %other, "Source swap rejected");
                StateError::CommitFailed {
                    object: ObjectRef::Pipeline(pipeline_id),
                    source: other,
                }
            }
        })?;

    // Accepted: the backend now owns completion delivery.
    state.take_completion();

    let staged_owned = state.owns_image();
    let staged_has_image = state.config.image.is_some();
    let old_image = guard.active.image_id();
    let displaced = adopt(
        &mut guard.active,
        &mut state.config,
        old_image,
        staged_owned,
        staged_has_image,
    );
    state.mark_adopted();
    guard.bound_image = guard.active.image_id();
    drop(guard);

    release(ctx.images, displaced);
    Ok(())
}

/// Tears a driving pipeline down after its image was cleared.
fn commit_teardown(
    pipeline: &Arc<Mutex<Pipeline>>,
    pipeline_id: PipelineId,
    state: &mut StagedPipelineState,
    ctx: &CommitContext<'_>,
) -> Result<(), StateError> {
    // A torn-down pipeline drops its whole configuration, not only the
    // image the caller cleared.
    state.config.mode = None;
    state.config.sinks.clear();
    state.config.position = PointInt::ZERO;

    let request = ModeSetRequest {
        pipeline: pipeline_id,
        position: PointInt::ZERO,
        mode: None,
        image: None,
        sinks: Vec::new(),
    };

    debug!(pipeline = %pipeline_id, "Committing pipeline teardown");

    let _config = ctx.config_lock.lock().unwrap();
    let mut guard = pipeline.lock().unwrap();
    ctx.backend.reconfigure(&request).map_err(|source| {
        warn!(pipeline = %pipeline_id, error = %source, "Teardown rejected");
        StateError::CommitFailed {
            object: ObjectRef::Pipeline(pipeline_id),
            source,
        }
    })?;

    let old_image = guard.active.image_id();
    let displaced = adopt(&mut guard.active, &mut state.config, old_image, false, false);
    state.mark_adopted();
    guard.bound_image = None;
    drop(guard);

    release(ctx.images, displaced);
    Ok(())
}
