//! Local (offline) enhancement engine.
//!
//! A pure-CPU fallback-free upscaler built on the `image` crate: decode,
//! 2x Lanczos resize, light unsharp mask, PNG re-encode. No network, no
//! contextual analysis -- selected by the user when the remote service
//! should only be a fallback.

use std::io::Cursor;

use async_trait::async_trait;
use image::imageops::FilterType;
use image::ImageFormat;
use stillframe_core::adapter::LocalEnhancer;
use stillframe_core::error::EnhancementError;

/// Upscale factor applied to both dimensions.
const SCALE: u32 = 2;
/// Unsharp mask parameters (sigma, threshold).
const SHARPEN_SIGMA: f32 = 1.0;
const SHARPEN_THRESHOLD: i32 = 2;

/// Offline upscaler implementing [`LocalEnhancer`].
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalUpscaler;

impl LocalUpscaler {
    pub fn new() -> Self {
        Self
    }
}

/// Decode, upscale, sharpen, and re-encode one image. Synchronous; run
/// on a blocking thread from async contexts.
fn upscale(image_bytes: &[u8]) -> Result<Vec<u8>, EnhancementError> {
    let decoded = image::load_from_memory(image_bytes)
        .map_err(|e| EnhancementError::Local(format!("decode failed: {e}")))?;

    let (w, h) = (decoded.width(), decoded.height());
    let resized = decoded.resize_exact(w * SCALE, h * SCALE, FilterType::Lanczos3);
    let sharpened = resized.unsharpen(SHARPEN_SIGMA, SHARPEN_THRESHOLD);

    let mut out = Cursor::new(Vec::new());
    sharpened
        .write_to(&mut out, ImageFormat::Png)
        .map_err(|e| EnhancementError::Local(format!("encode failed: {e}")))?;
    Ok(out.into_inner())
}

#[async_trait]
impl LocalEnhancer for LocalUpscaler {
    async fn enhance_local(&self, image: &[u8]) -> Result<Vec<u8>, EnhancementError> {
        let image = image.to_vec();
        // CPU-bound work; keep it off the async worker threads.
        tokio::task::spawn_blocking(move || upscale(&image))
            .await
            .map_err(|e| EnhancementError::Local(format!("upscale task failed: {e}")))?
    }
}
