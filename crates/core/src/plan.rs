//! Frame plan computation and run parameter validation.
//!
//! Pure functions: given a time range and a sampling rate, produce the
//! ordered list of [`FrameTask`]s for a run.

use crate::error::ConfigError;
use crate::types::FrameTask;

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

/// Default concurrency limit for both pipeline stages.
pub const DEFAULT_CONCURRENCY: usize = 8;

/// Hard timeout applied by the extraction stage to each frame source call.
pub const EXTRACTION_TIMEOUT_SECS: u64 = 10;

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate run parameters without building the task list.
///
/// Rules:
/// - `start_secs` and `end_secs` must be finite, `start_secs >= 0`, and
///   `start_secs < end_secs`.
/// - `fps` must be a positive finite number.
pub fn validate_range(start_secs: f64, end_secs: f64, fps: f64) -> Result<(), ConfigError> {
    if !fps.is_finite() || fps <= 0.0 {
        return Err(ConfigError::InvalidFps(fps));
    }
    if !start_secs.is_finite() || !end_secs.is_finite() || start_secs < 0.0 || start_secs >= end_secs
    {
        return Err(ConfigError::InvalidRange {
            start: start_secs,
            end: end_secs,
        });
    }
    Ok(())
}

/// Number of frames a valid range yields: `floor((end - start) * fps)`.
pub fn total_frames(start_secs: f64, end_secs: f64, fps: f64) -> u32 {
    ((end_secs - start_secs) * fps).floor() as u32
}

// ---------------------------------------------------------------------------
// Plan
// ---------------------------------------------------------------------------

/// Build the ordered frame plan for a run.
///
/// Frame numbers are dense `1..=total`; frame `i` (0-based) samples the
/// video at `start_secs + i / fps`. Timestamps are strictly increasing
/// and evenly spaced.
pub fn frame_plan(start_secs: f64, end_secs: f64, fps: f64) -> Result<Vec<FrameTask>, ConfigError> {
    validate_range(start_secs, end_secs, fps)?;

    let total = total_frames(start_secs, end_secs, fps);
    if total == 0 {
        return Err(ConfigError::EmptyRange {
            start: start_secs,
            end: end_secs,
            fps,
        });
    }

    let tasks = (0..total)
        .map(|i| FrameTask {
            frame_number: i + 1,
            timestamp_secs: start_secs + i as f64 / fps,
        })
        .collect();
    Ok(tasks)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
