//! Shared types, errors, and adapter seams for the stillframe pipeline.
//!
//! Holds the frame data model, the error taxonomy, frame plan
//! computation, filename conventions, the async adapter traits, and the
//! ffmpeg-backed frame source.

pub mod adapter;
pub mod error;
pub mod ffmpeg;
pub mod naming;
pub mod plan;
pub mod types;
