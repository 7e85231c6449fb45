//! Adapter traits for the external capabilities the pipeline depends on.
//!
//! The pipeline stages only ever see these seams; production
//! implementations live in [`crate::ffmpeg`] (frame source) and the
//! `stillframe-enhance` crate (remote service, local engine).

use async_trait::async_trait;

use crate::error::{EnhancementError, ExtractionError};
use crate::types::RemoteMethod;

/// "Given a timestamp, produce an image" -- the frame extraction
/// capability of a single opened video source.
#[async_trait]
pub trait FrameSource: Send + Sync {
    /// Extract one frame at `timestamp_secs` and return its encoded bytes.
    ///
    /// The caller enforces the hard timeout; implementations do not need
    /// their own stall detection.
    async fn extract_frame(&self, timestamp_secs: f64) -> Result<Vec<u8>, ExtractionError>;
}

/// "Given an image and a method, return an enhanced image or fail" --
/// the remote enhancement/generation service.
#[async_trait]
pub trait Enhancer: Send + Sync {
    /// Run one enhancement attempt with the given method tag.
    ///
    /// `context` is the optional scene description produced by
    /// [`describe_image`](Self::describe_image) for smart-mode attempts.
    async fn enhance(
        &self,
        image: &[u8],
        method: RemoteMethod,
        context: Option<&str>,
    ) -> Result<Vec<u8>, EnhancementError>;

    /// Describe an image for smart-mode context.
    ///
    /// Fails silently: any service failure yields an empty string rather
    /// than an error, and the enhancement attempt proceeds without
    /// context.
    async fn describe_image(&self, image: &[u8]) -> String;
}

/// Optional local (offline) enhancement engine, tried before any remote
/// tier when selected.
#[async_trait]
pub trait LocalEnhancer: Send + Sync {
    async fn enhance_local(&self, image: &[u8]) -> Result<Vec<u8>, EnhancementError>;
}
