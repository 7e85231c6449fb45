//! FFmpeg/FFprobe-backed frame source.
//!
//! [`FfmpegFrameSource`] implements the [`FrameSource`] capability by
//! shelling out to `ffmpeg`, decoding exactly one frame per call and
//! streaming it back as PNG bytes on stdout.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;

use crate::adapter::FrameSource;
use crate::error::ExtractionError;

/// Error type for FFmpeg/FFprobe operations.
#[derive(Debug, thiserror::Error)]
pub enum FfmpegError {
    #[error("ffprobe/ffmpeg binary not found: {0}")]
    NotFound(std::io::Error),

    #[error("ffprobe/ffmpeg execution failed (exit code {exit_code:?}): {stderr}")]
    ExecutionFailed {
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("failed to parse ffprobe output: {0}")]
    ParseError(String),

    #[error("video file not found: {0}")]
    VideoNotFound(String),

    #[error("decoder produced no frame at {timestamp_secs}s")]
    EmptyFrame { timestamp_secs: f64 },
}

// ---------------------------------------------------------------------------
// ffprobe JSON output structures
// ---------------------------------------------------------------------------

/// Top-level ffprobe JSON output (`-print_format json -show_format -show_streams`).
#[derive(Debug, Deserialize)]
pub struct FfprobeOutput {
    pub streams: Vec<FfprobeStream>,
    pub format: FfprobeFormat,
}

/// A single stream from ffprobe output.
#[derive(Debug, Deserialize)]
pub struct FfprobeStream {
    pub codec_type: Option<String>,
    /// e.g. "30/1" or "24000/1001"
    pub r_frame_rate: Option<String>,
    pub duration: Option<String>,
}

/// Format-level metadata from ffprobe.
#[derive(Debug, Deserialize)]
pub struct FfprobeFormat {
    pub duration: Option<String>,
}

// ---------------------------------------------------------------------------
// Probe
// ---------------------------------------------------------------------------

/// Run `ffprobe` on a video file and return the parsed JSON output.
pub async fn probe_video(path: &Path) -> Result<FfprobeOutput, FfmpegError> {
    if !path.exists() {
        return Err(FfmpegError::VideoNotFound(
            path.to_string_lossy().to_string(),
        ));
    }

    let output = tokio::process::Command::new("ffprobe")
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .output()
        .await
        .map_err(FfmpegError::NotFound)?;

    if !output.status.success() {
        return Err(FfmpegError::ExecutionFailed {
            exit_code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        });
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str::<FfprobeOutput>(&stdout)
        .map_err(|e| FfmpegError::ParseError(format!("{e}: {stdout}")))
}

// ---------------------------------------------------------------------------
// Parsing helpers
// ---------------------------------------------------------------------------

/// Find the first video stream in the ffprobe output.
fn first_video_stream(probe: &FfprobeOutput) -> Option<&FfprobeStream> {
    probe
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
}

/// Parse the video duration in seconds from ffprobe output.
pub fn parse_duration(probe: &FfprobeOutput) -> f64 {
    // Try format-level duration first.
    if let Some(d) = &probe.format.duration {
        if let Ok(secs) = d.parse::<f64>() {
            return secs;
        }
    }
    // Fall back to the first video stream's duration.
    if let Some(stream) = first_video_stream(probe) {
        if let Some(d) = &stream.duration {
            if let Ok(secs) = d.parse::<f64>() {
                return secs;
            }
        }
    }
    0.0
}

/// Parse the video framerate from ffprobe output.
///
/// The `r_frame_rate` field is a fraction like `"30/1"` or `"24000/1001"`.
pub fn parse_framerate(probe: &FfprobeOutput) -> f64 {
    first_video_stream(probe)
        .and_then(|s| s.r_frame_rate.as_deref())
        .map(parse_fraction)
        .unwrap_or(0.0)
}

/// Parse a fraction string like `"30/1"` into a float.
fn parse_fraction(s: &str) -> f64 {
    let parts: Vec<&str> = s.split('/').collect();
    if parts.len() == 2 {
        let num = parts[0].parse::<f64>().unwrap_or(0.0);
        let den = parts[1].parse::<f64>().unwrap_or(1.0);
        if den > 0.0 {
            return num / den;
        }
    }
    s.parse::<f64>().unwrap_or(0.0)
}

// ---------------------------------------------------------------------------
// Frame source
// ---------------------------------------------------------------------------

/// A frame source backed by a single video file on disk.
///
/// Created via [`open`](Self::open), which probes the file up front so
/// that out-of-range timestamps are rejected without spawning a decoder.
#[derive(Debug)]
pub struct FfmpegFrameSource {
    video_path: PathBuf,
    duration_secs: f64,
    framerate: f64,
}

impl FfmpegFrameSource {
    /// Probe `video_path` and build a frame source for it.
    pub async fn open(video_path: impl Into<PathBuf>) -> Result<Self, FfmpegError> {
        let video_path = video_path.into();
        let probe = probe_video(&video_path).await?;
        let duration_secs = parse_duration(&probe);
        let framerate = parse_framerate(&probe);

        tracing::debug!(
            path = %video_path.display(),
            duration_secs,
            framerate,
            "Opened video source",
        );

        Ok(Self {
            video_path,
            duration_secs,
            framerate,
        })
    }

    /// Probed duration of the source in seconds (0 when unknown).
    pub fn duration_secs(&self) -> f64 {
        self.duration_secs
    }

    /// Probed framerate of the source (0 when unknown).
    pub fn framerate(&self) -> f64 {
        self.framerate
    }

    /// Decode one frame at `timestamp_secs`, returned as PNG bytes.
    ///
    /// Uses `-ss` before `-i` for fast keyframe seeking and `image2pipe`
    /// so no temporary file is written.
    async fn decode_frame(&self, timestamp_secs: f64) -> Result<Vec<u8>, FfmpegError> {
        let output = tokio::process::Command::new("ffmpeg")
            .args(["-v", "error", "-ss", &format!("{timestamp_secs:.3}"), "-i"])
            .arg(&self.video_path)
            .args([
                "-frames:v",
                "1",
                "-f",
                "image2pipe",
                "-vcodec",
                "png",
                "-",
            ])
            .output()
            .await
            .map_err(FfmpegError::NotFound)?;

        if !output.status.success() {
            return Err(FfmpegError::ExecutionFailed {
                exit_code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            });
        }

        if output.stdout.is_empty() {
            // ffmpeg exits 0 with no output when seeking past the end.
            return Err(FfmpegError::EmptyFrame { timestamp_secs });
        }

        Ok(output.stdout)
    }
}

#[async_trait]
impl FrameSource for FfmpegFrameSource {
    async fn extract_frame(&self, timestamp_secs: f64) -> Result<Vec<u8>, ExtractionError> {
        if self.duration_secs > 0.0 && timestamp_secs > self.duration_secs {
            return Err(ExtractionError::Decode(format!(
                "timestamp {timestamp_secs}s is past the end of the video ({}s)",
                self.duration_secs
            )));
        }

        self.decode_frame(timestamp_secs)
            .await
            .map_err(|e| ExtractionError::Decode(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
