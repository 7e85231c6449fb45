//! Error taxonomy for the pipeline.
//!
//! Configuration errors abort a run before it starts; extraction and
//! enhancement errors are per-frame and never halt the worker pool.

/// Invalid run parameters. Fatal: rejected before any task is dispatched.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid time range: start {start}s must be before end {end}s")]
    InvalidRange { start: f64, end: f64 },

    #[error("invalid fps: {0} (must be a positive finite number)")]
    InvalidFps(f64),

    #[error("time range {start}s..{end}s at {fps} fps yields no frames")]
    EmptyRange { start: f64, end: f64, fps: f64 },
}

/// Per-frame extraction failure. Terminal for the frame -- there is no
/// retry at the extraction stage.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    /// Corrupt or unsupported input, or the decoder reported a failure.
    #[error("decode error: {0}")]
    Decode(String),

    /// The extraction call stalled past the caller-enforced deadline.
    #[error("frame extraction timed out after {0}s")]
    Timeout(u64),
}

/// A single enhancement attempt failure. Non-terminal until every
/// fallback tier has been exhausted for the frame.
#[derive(Debug, thiserror::Error)]
pub enum EnhancementError {
    /// The remote enhancement service rejected or failed the request.
    /// Carries the underlying service message.
    #[error("remote enhancement failed: {0}")]
    Remote(String),

    /// The local (offline) engine failed.
    #[error("local enhancement failed: {0}")]
    Local(String),
}
