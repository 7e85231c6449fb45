//! The stillframe processing pipeline.
//!
//! Coordinates frame extraction and multi-tier enhancement over a
//! bounded-concurrency worker pool, with cooperative cancellation,
//! per-stage progress counters, and ZIP export of the result set.

pub mod enhance;
pub mod error;
pub mod export;
pub mod extract;
pub mod orchestrator;
pub mod pool;
pub mod records;

pub use error::PipelineError;
pub use orchestrator::{Pipeline, PipelineOptions, PipelineProgress};
