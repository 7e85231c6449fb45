//! Orchestrator-boundary error type.

use stillframe_core::error::ConfigError;

/// Errors surfaced by the pipeline's public operations.
///
/// Per-frame failures never appear here -- they are attached to the
/// owning [`FrameRecord`](stillframe_core::types::FrameRecord) and
/// surfaced through the aggregated result set instead.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Invalid run parameters; nothing was dispatched.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The operation is not valid in the pipeline's current state.
    #[error("invalid pipeline state: {0}")]
    State(String),
}
