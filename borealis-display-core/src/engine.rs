//! The commit engine: the transaction lifecycle from `begin` to `end`.

use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use borealis_image_manager::ImageManager;

use crate::capability::{CapabilityTable, CommitContext};
use crate::error::StateError;
use crate::pipeline::{CompletionHandle, PipelineId};
use crate::registry::DeviceRegistry;
use crate::surface::SurfaceId;
use crate::transaction::{
    StagedPipelineState, StagedSurfaceState, Transaction, TransactionFlags,
};

/// Orchestrates transactional commits of display configuration.
///
/// The engine owns no policy of its own: validation and application of
/// staged state are dispatched through the capability table, and hardware
/// access goes through the display backend. What the engine guarantees is
/// the lifecycle: staged changes apply together in index order, a failing
/// object stops the pass without rolling back earlier objects, and `end`
/// settles every staged image reference exactly once whatever the outcome.
pub struct CommitEngine {
    registry: Arc<Mutex<DeviceRegistry>>,
    backend: Arc<dyn crate::backend::DisplayBackend>,
    images: Arc<Mutex<ImageManager>>,
    capabilities: CapabilityTable,
    /// Serializes full reconfigurations and surface updates. Taken after the
    /// registry lock and before any object lock, never the other way.
    config_lock: Mutex<()>,
}

impl CommitEngine {
    pub fn new(
        registry: Arc<Mutex<DeviceRegistry>>,
        backend: Arc<dyn crate::backend::DisplayBackend>,
        images: Arc<Mutex<ImageManager>>,
    ) -> Self {
        Self::with_capabilities(registry, backend, images, CapabilityTable::default())
    }

    /// Builds an engine with driver-supplied commit operations.
    pub fn with_capabilities(
        registry: Arc<Mutex<DeviceRegistry>>,
        backend: Arc<dyn crate::backend::DisplayBackend>,
        images: Arc<Mutex<ImageManager>>,
        capabilities: CapabilityTable,
    ) -> Self {
        Self {
            registry,
            backend,
            images,
            capabilities,
            config_lock: Mutex::new(()),
        }
    }

    pub fn registry(&self) -> Arc<Mutex<DeviceRegistry>> {
        self.registry.clone()
    }

    pub fn images(&self) -> Arc<Mutex<ImageManager>> {
        self.images.clone()
    }

    /// Opens a transaction sized to the current object counts.
    ///
    /// The counts must stay stable until `end`; objects must not be added to
    /// or removed from the registry while the transaction is alive.
    pub fn begin(&self, flags: TransactionFlags) -> Result<Transaction, StateError> {
        let registry = self.registry.lock().unwrap();
        let txn = Transaction::new(registry.surface_count(), registry.pipeline_count(), flags)?;
        debug!(
            surfaces = txn.surface_slots(),
            pipelines = txn.pipeline_slots(),
            ?flags,
            "Opened transaction"
        );
        Ok(txn)
    }

    /// Returns the staged state for a surface, snapshotting its active
    /// configuration on first use within the transaction.
    pub fn surface_state<'a>(
        &self,
        id: SurfaceId,
        txn: &'a mut Transaction,
    ) -> Result<&'a mut StagedSurfaceState, StateError> {
        let registry = self.registry.lock().unwrap();
        let surface = registry
            .surface(id)
            .ok_or_else(|| StateError::InvalidArgument(format!("unknown {id}")))?;
        let guard = surface.lock().unwrap();
        self.capabilities.surface_ops.get_state(&guard, txn)
    }

    /// Returns the staged state for a pipeline, snapshotting its active
    /// configuration on first use within the transaction.
    pub fn pipeline_state<'a>(
        &self,
        id: PipelineId,
        txn: &'a mut Transaction,
    ) -> Result<&'a mut StagedPipelineState, StateError> {
        let registry = self.registry.lock().unwrap();
        let pipeline = registry
            .pipeline(id)
            .ok_or_else(|| StateError::InvalidArgument(format!("unknown {id}")))?;
        let guard = pipeline.lock().unwrap();
        self.capabilities.pipeline_ops.get_state(&guard, txn)
    }

    /// Stages a completion-event handle on a pipeline.
    pub fn set_completion(
        &self,
        id: PipelineId,
        txn: &mut Transaction,
        handle: CompletionHandle,
    ) -> Result<(), StateError> {
        self.pipeline_state(id, txn)?.set_completion(handle);
        Ok(())
    }

    /// Validates every staged state without touching hardware.
    ///
    /// Surfaces are validated in index order and the first failure is
    /// returned; later slots stay unexamined. A transaction that fails
    /// `check` is left intact and may be amended and re-checked.
    pub fn check(&self, txn: &Transaction) -> Result<(), StateError> {
        let registry = self.registry.lock().unwrap();

        for index in 0..txn.surface_slots() {
            let id = SurfaceId::new(index);
            if let Some(state) = txn.surface_state(id) {
                self.capabilities
                    .surface_ops
                    .check_state(id, state, &registry)
                    .inspect_err(|error| {
                        debug!(surface = %id, %error, "Validation failed");
                    })?;
            }
        }

        for index in 0..txn.pipeline_slots() {
            let id = PipelineId::new(index);
            if let Some(state) = txn.pipeline_state(id) {
                self.capabilities
                    .pipeline_ops
                    .check_state(id, state, &registry)?;
            }
        }

        Ok(())
    }

    /// Applies the staged states: all surfaces in index order, then all
    /// pipelines in index order.
    ///
    /// Fail-fast without rollback: the first failing object stops the pass,
    /// and objects committed before it keep their new configuration. The
    /// transaction stays responsible for the untouched remainder; `end`
    /// settles it either way.
    pub fn commit(&self, txn: &mut Transaction) -> Result<(), StateError> {
        let registry = self.registry.lock().unwrap();
        let ctx = CommitContext {
            registry: &registry,
            backend: self.backend.as_ref(),
            images: &self.images,
            config_lock: &self.config_lock,
            flags: txn.flags(),
        };

        for index in 0..txn.surface_slots() {
            let id = SurfaceId::new(index);
            let staged = match txn.surface_state(id) {
                Some(state) if !state.is_adopted() => true,
                _ => false,
            };
            if staged {
                let surface = registry
                    .surface(id)
                    .ok_or_else(|| StateError::InvalidArgument(format!("unknown {id}")))?;
                self.capabilities
                    .surface_ops
                    .commit_state(&surface, txn, &ctx)
                    .inspect_err(|error| {
                        warn!(surface = %id, %error, "Commit stopped");
                    })?;
            }
        }

        for index in 0..txn.pipeline_slots() {
            let id = PipelineId::new(index);
            let staged = match txn.pipeline_state(id) {
                Some(state) if !state.is_adopted() => true,
                _ => false,
            };
            if staged {
                let pipeline = registry
                    .pipeline(id)
                    .ok_or_else(|| StateError::InvalidArgument(format!("unknown {id}")))?;
                self.capabilities
                    .pipeline_ops
                    .commit_state(&pipeline, txn, &ctx)
                    .inspect_err(|error| {
                        warn!(pipeline = %id, %error, "Commit stopped");
                    })?;
            }
        }

        debug!("Transaction committed");
        Ok(())
    }

    /// Closes a transaction, releasing every staged reference exactly once.
    ///
    /// Safe after any outcome: an uncommitted, fully committed, or partially
    /// committed transaction all settle correctly.
    pub fn end(&self, txn: Transaction) {
        let mut images = self.images.lock().unwrap();
        txn.release_all(&mut images);
        debug!("Transaction closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendError, DisplayBackend, ModeSetRequest, SurfaceUpdate};
    use borealis_core::types::RectInt;
    use borealis_image_manager::{
        ClientId, ImageBacking, ImageDetails, ImageFormat,
    };
    use std::sync::atomic::Ordering;

    #[derive(Debug, PartialEq, Eq, Clone, Copy)]
    enum Call {
        Update(usize),
        Disable(usize),
        Reconfigure(usize),
        Swap(usize),
    }

    /// Backend recording the order of primitive calls, failing where told.
    #[derive(Default)]
    struct RecordingBackend {
        calls: Mutex<Vec<Call>>,
        fail_update_for: Option<SurfaceId>,
    }

    impl DisplayBackend for RecordingBackend {
        fn update_surface(&self, update: &SurfaceUpdate) -> Result<(), BackendError> {
            self.calls
                .lock()
                .unwrap()
                .push(Call::Update(update.surface.index()));
            if self.fail_update_for == Some(update.surface) {
                return Err(BackendError::Rejected("scanout fifo underrun".to_string()));
            }
            Ok(())
        }

        fn disable_surface(&self, surface: SurfaceId) {
            self.calls.lock().unwrap().push(Call::Disable(surface.index()));
        }

        fn reconfigure(&self, request: &ModeSetRequest) -> Result<(), BackendError> {
            self.calls
                .lock()
                .unwrap()
                .push(Call::Reconfigure(request.pipeline.index()));
            Ok(())
        }

        fn swap_image(
            &self,
            pipeline: PipelineId,
            _image: Arc<Mutex<ImageDetails>>,
            _completion: Option<CompletionHandle>,
            _flags: TransactionFlags,
        ) -> Result<(), BackendError> {
            self.calls.lock().unwrap().push(Call::Swap(pipeline.index()));
            Ok(())
        }
    }

    fn engine_with(
        backend: Arc<RecordingBackend>,
        surfaces: usize,
        pipelines: usize,
    ) -> CommitEngine {
        let mut registry = DeviceRegistry::new();
        for _ in 0..pipelines {
            registry.add_pipeline(true);
        }
        for _ in 0..surfaces {
            registry.add_surface();
        }
        CommitEngine::new(
            Arc::new(Mutex::new(registry)),
            backend,
            Arc::new(Mutex::new(ImageManager::new())),
        )
    }

    fn stage_full_surface(
        engine: &CommitEngine,
        txn: &mut Transaction,
        surface: SurfaceId,
        pipeline: PipelineId,
    ) -> Arc<Mutex<ImageDetails>> {
        let images = engine.images();
        let image = images.lock().unwrap().register_image(
            ImageBacking::Shm,
            64,
            64,
            256,
            ImageFormat::Argb8888,
            Some(ClientId::new(1)),
        );
        image.lock().unwrap().increment_ref_count();

        let state = engine.surface_state(surface, txn).unwrap();
        state.set_pipeline(Some(pipeline));
        state.set_image(Some(image.clone()), &mut images.lock().unwrap());
        state.set_dest(RectInt::new(0, 0, 64, 64));
        state.set_src(RectInt::new(0, 0, 64, 64));
        image
    }

    #[test]
    fn test_begin_sizes_transaction_to_registry() {
        let engine = engine_with(Arc::new(RecordingBackend::default()), 3, 2);
        let txn = engine.begin(TransactionFlags::empty()).unwrap();
        assert_eq!(txn.surface_slots(), 3);
        assert_eq!(txn.pipeline_slots(), 2);
        engine.end(txn);
    }

    #[test]
    fn test_commit_applies_surfaces_in_index_order() {
        let backend = Arc::new(RecordingBackend::default());
        let engine = engine_with(backend.clone(), 3, 1);
        let pipeline = PipelineId::new(0);

        let mut txn = engine.begin(TransactionFlags::empty()).unwrap();
        // Stage out of order; commit must still run 0, 2.
        stage_full_surface(&engine, &mut txn, SurfaceId::new(2), pipeline);
        stage_full_surface(&engine, &mut txn, SurfaceId::new(0), pipeline);

        engine.check(&txn).unwrap();
        engine.commit(&mut txn).unwrap();
        engine.end(txn);

        let calls = backend.calls.lock().unwrap();
        assert_eq!(*calls, vec![Call::Update(0), Call::Update(2)]);
    }

    #[test]
    fn test_commit_stops_at_first_failure_without_rollback() {
        let backend = Arc::new(RecordingBackend {
            fail_update_for: Some(SurfaceId::new(1)),
            ..Default::default()
        });
        let engine = engine_with(backend.clone(), 3, 1);
        let pipeline = PipelineId::new(0);

        let mut txn = engine.begin(TransactionFlags::empty()).unwrap();
        let first_image = stage_full_surface(&engine, &mut txn, SurfaceId::new(0), pipeline);
        stage_full_surface(&engine, &mut txn, SurfaceId::new(1), pipeline);
        stage_full_surface(&engine, &mut txn, SurfaceId::new(2), pipeline);

        let result = engine.commit(&mut txn);
        assert!(matches!(result, Err(StateError::CommitFailed { .. })));

        // Surface 0 stays committed, surface 2 was never attempted.
        let calls = backend.calls.lock().unwrap().clone();
        assert_eq!(calls, vec![Call::Update(0), Call::Update(1)]);
        let registry = engine.registry();
        let registry = registry.lock().unwrap();
        let surface0 = registry.surface(SurfaceId::new(0)).unwrap();
        assert_eq!(
            surface0.lock().unwrap().active.image_id(),
            Some(first_image.lock().unwrap().id)
        );
        let surface2 = registry.surface(SurfaceId::new(2)).unwrap();
        assert!(surface2.lock().unwrap().active.image.is_none());
        drop(registry);

        engine.end(txn);

        // The adopted image keeps the surface's reference; the unadopted
        // staged references are gone.
        assert_eq!(
            first_image.lock().unwrap().ref_count.load(Ordering::SeqCst),
            2
        );
    }

    #[test]
    fn test_unknown_surface_is_invalid_argument() {
        let engine = engine_with(Arc::new(RecordingBackend::default()), 1, 1);
        let mut txn = engine.begin(TransactionFlags::empty()).unwrap();
        let result = engine.surface_state(SurfaceId::new(9), &mut txn);
        assert!(matches!(result, Err(StateError::InvalidArgument(_))));
        engine.end(txn);
    }

    #[test]
    fn test_empty_transaction_checks_and_commits() {
        let backend = Arc::new(RecordingBackend::default());
        let engine = engine_with(backend.clone(), 2, 1);
        let mut txn = engine.begin(TransactionFlags::empty()).unwrap();
        engine.check(&txn).unwrap();
        engine.commit(&mut txn).unwrap();
        engine.end(txn);
        assert!(backend.calls.lock().unwrap().is_empty());
    }
}
