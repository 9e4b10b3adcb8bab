//! Transactional commit of display configuration.
//!
//! Clients open a [`Transaction`], stage configuration changes against
//! surfaces and pipelines, validate them with [`CommitEngine::check`], apply
//! them with [`CommitEngine::commit`], and close the transaction with
//! [`CommitEngine::end`]. Staged state is a snapshot-and-modify copy of the
//! active configuration; committing swaps it in, leaving the displaced
//! previous configuration in the transaction. Image references are settled
//! exactly once across commit and `end`, whatever combination of successes
//! and failures the transaction saw.
//!
//! Hardware access goes through the [`DisplayBackend`] trait, and per-object
//! validation and commit behavior is dispatched through a [`CapabilityTable`]
//! so drivers can extend either.

pub mod backend;
pub mod capability;
pub mod engine;
pub mod error;
pub mod pipeline;
pub mod registry;
pub mod sink;
pub mod surface;
pub mod transaction;

pub use backend::{BackendError, DisplayBackend, ModeSetRequest, SurfaceUpdate};
pub use capability::{
    CapabilityTable, CommitContext, DefaultPipelineOps, DefaultSurfaceOps, PipelineStateOps,
    SurfaceStateOps,
};
pub use engine::CommitEngine;
pub use error::{ObjectRef, StateError};
pub use pipeline::{CompletionHandle, Pipeline, PipelineConfig, PipelineId};
pub use registry::DeviceRegistry;
pub use sink::{Sink, SinkId};
pub use surface::{Surface, SurfaceConfig, SurfaceId};
pub use transaction::{StagedPipelineState, StagedSurfaceState, Transaction, TransactionFlags};
