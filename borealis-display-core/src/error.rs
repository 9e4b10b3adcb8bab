//! Error types for the display state-commit engine.

use thiserror::Error;

use crate::backend::BackendError;
use crate::pipeline::PipelineId;
use crate::surface::SurfaceId;

/// Identifies the object a commit failure refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectRef {
    Surface(SurfaceId),
    Pipeline(PipelineId),
}

impl std::fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ObjectRef::Surface(id) => write!(f, "{id}"),
            ObjectRef::Pipeline(id) => write!(f, "{id}"),
        }
    }
}

/// Errors produced by the transaction lifecycle and the commit machinery.
///
/// `check` and `commit` are fail-fast: they report the first failing object
/// and leave later ones unexamined. A failed commit is not rolled back;
/// objects committed before the failure stay committed.
#[derive(Debug, Error)]
pub enum StateError {
    /// An unknown object, property, or an inapplicable staged state.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Allocation failure while creating a transaction or staging state.
    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    /// The first failing surface reported by the validation pass.
    #[error("validation failed for {surface}: {reason}")]
    ValidationFailed { surface: SurfaceId, reason: String },

    /// The first failing object reported by the commit pass, with the
    /// underlying primitive's error.
    #[error("commit failed for {object}: {source}")]
    CommitFailed {
        object: ObjectRef,
        #[source]
        source: BackendError,
    },

    /// The pipeline lacks the source-swap capability.
    #[error("pipeline does not support source swap")]
    Unsupported,

    /// The pipeline's underlying output was detached (hotplug) and userspace
    /// has not yet observed it. Retryable after re-observing system state.
    #[error("pipeline output not yet bound after hotplug")]
    TransientlyBusy,
}

impl StateError {
    /// Whether the caller may retry after re-observing system state.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StateError::TransientlyBusy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_transiently_busy_is_retryable() {
        assert!(StateError::TransientlyBusy.is_retryable());
        assert!(!StateError::Unsupported.is_retryable());
        assert!(!StateError::InvalidArgument("x".into()).is_retryable());
    }

    #[test]
    fn test_commit_failed_display_names_object() {
        let err = StateError::CommitFailed {
            object: ObjectRef::Pipeline(PipelineId::new(2)),
            source: BackendError::Rejected("mode clock too high".to_string()),
        };
        let message = err.to_string();
        assert!(message.contains("pipeline 2"), "got: {message}");
    }
}
