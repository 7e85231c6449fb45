//! Frame data model shared across the pipeline crates.

use serde::{Deserialize, Serialize};

/// Frame numbers are dense 1-based indices within a single run.
pub type FrameNumber = u32;

// ---------------------------------------------------------------------------
// Method label constants
// ---------------------------------------------------------------------------

/// Enhanced by the local (offline) engine.
pub const METHOD_LOCAL: &str = "Local";
/// Enhanced remotely with the smart (context-aware) method.
pub const METHOD_SMART: &str = "Smart";
/// Enhanced remotely with the normal method.
pub const METHOD_NORMAL: &str = "Normal";
/// Smart method succeeded as the fallback after the initial choice failed.
pub const METHOD_SMART_FALLBACK: &str = "Smart (Fallback)";
/// Normal method succeeded as the fallback after the initial choice failed.
pub const METHOD_NORMAL_FALLBACK: &str = "Normal (Fallback)";
/// Content-preserving direct upscale, used when everything else failed.
pub const METHOD_DIRECT_LAST_RESORT: &str = "Direct (Last Resort)";

// ---------------------------------------------------------------------------
// Method selectors
// ---------------------------------------------------------------------------

/// Remote enhancement method tag sent to the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemoteMethod {
    /// Context-aware enhancement (describe the image first, feed the
    /// description into the enhancement prompt).
    Smart,
    /// Standard enhancement without a context pre-step.
    Normal,
    /// Content-preserving upscale only, no contextual analysis.
    Direct,
}

impl RemoteMethod {
    /// Wire tag for the remote service.
    pub fn as_str(self) -> &'static str {
        match self {
            RemoteMethod::Smart => "smart",
            RemoteMethod::Normal => "normal",
            RemoteMethod::Direct => "direct",
        }
    }
}

/// The user-selected initial remote method. `direct` is never an initial
/// choice -- it is reserved for the last-resort tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InitialMethod {
    Smart,
    Normal,
}

impl InitialMethod {
    /// The remote method tag for the initial attempt.
    pub fn remote(self) -> RemoteMethod {
        match self {
            InitialMethod::Smart => RemoteMethod::Smart,
            InitialMethod::Normal => RemoteMethod::Normal,
        }
    }

    /// The other of {smart, normal}, tried when the initial attempt fails.
    pub fn fallback(self) -> RemoteMethod {
        match self {
            InitialMethod::Smart => RemoteMethod::Normal,
            InitialMethod::Normal => RemoteMethod::Smart,
        }
    }

    /// Method label recorded when the initial attempt succeeds.
    pub fn label(self) -> &'static str {
        match self {
            InitialMethod::Smart => METHOD_SMART,
            InitialMethod::Normal => METHOD_NORMAL,
        }
    }

    /// Method label recorded when the fallback attempt succeeds.
    pub fn fallback_label(self) -> &'static str {
        match self {
            InitialMethod::Smart => METHOD_NORMAL_FALLBACK,
            InitialMethod::Normal => METHOD_SMART_FALLBACK,
        }
    }
}

// ---------------------------------------------------------------------------
// Frame task / record
// ---------------------------------------------------------------------------

/// A single unit of extraction work. Immutable once created.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameTask {
    /// 1-based dense frame index within the run.
    pub frame_number: FrameNumber,
    /// Timestamp within the source video, in seconds.
    pub timestamp_secs: f64,
}

/// The accumulated state of one frame as it moves through the stages.
///
/// An empty `original` together with a set `error` signals a failed
/// extraction. Exactly one of `enhanced` / `error` is set once the frame
/// reaches a terminal state for a stage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FrameRecord {
    pub frame_number: FrameNumber,
    /// Extracted image bytes; empty when extraction failed.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub original: Vec<u8>,
    /// Enhanced image bytes, present after a successful enhancement.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enhanced: Option<Vec<u8>>,
    /// Label of the method that produced `enhanced`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    /// Terminal error message for the owning stage.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FrameRecord {
    /// Record for a successfully extracted frame.
    pub fn extracted(frame_number: FrameNumber, original: Vec<u8>) -> Self {
        Self {
            frame_number,
            original,
            ..Default::default()
        }
    }

    /// Record for a frame whose extraction failed (terminal, no retry).
    pub fn extraction_failed(frame_number: FrameNumber, message: String) -> Self {
        Self {
            frame_number,
            error: Some(message),
            ..Default::default()
        }
    }

    /// Whether extraction produced usable image bytes.
    pub fn is_extracted(&self) -> bool {
        !self.original.is_empty()
    }

    /// The bytes to export for this frame: enhanced when available,
    /// otherwise the extracted original. `None` if extraction failed.
    pub fn export_bytes(&self) -> Option<&[u8]> {
        match &self.enhanced {
            Some(bytes) => Some(bytes),
            None if self.is_extracted() => Some(&self.original),
            None => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Progress / run state
// ---------------------------------------------------------------------------

/// Per-stage progress counter. `done` is monotonically non-decreasing
/// until the stage completes or the run is cancelled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageProgress {
    pub done: u32,
    pub total: u32,
}

/// Lifecycle of a pipeline run.
///
/// `cancel()` from `Extracting` or `Enhancing` returns to `Idle` rather
/// than `Complete`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Idle,
    Extracting,
    /// Extraction finished; waiting for an explicit enhancement start.
    ExtractedPending,
    Enhancing,
    Complete,
}

impl RunState {
    pub fn as_str(self) -> &'static str {
        match self {
            RunState::Idle => "idle",
            RunState::Extracting => "extracting",
            RunState::ExtractedPending => "extracted_pending",
            RunState::Enhancing => "enhancing",
            RunState::Complete => "complete",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_method_remote_and_fallback_are_complementary() {
        assert_eq!(InitialMethod::Smart.remote(), RemoteMethod::Smart);
        assert_eq!(InitialMethod::Smart.fallback(), RemoteMethod::Normal);
        assert_eq!(InitialMethod::Normal.remote(), RemoteMethod::Normal);
        assert_eq!(InitialMethod::Normal.fallback(), RemoteMethod::Smart);
    }

    #[test]
    fn fallback_labels_name_the_other_method() {
        assert_eq!(InitialMethod::Smart.fallback_label(), METHOD_NORMAL_FALLBACK);
        assert_eq!(InitialMethod::Normal.fallback_label(), METHOD_SMART_FALLBACK);
    }

    #[test]
    fn remote_method_wire_tags() {
        assert_eq!(RemoteMethod::Smart.as_str(), "smart");
        assert_eq!(RemoteMethod::Normal.as_str(), "normal");
        assert_eq!(RemoteMethod::Direct.as_str(), "direct");
    }

    #[test]
    fn extraction_failed_record_has_no_bytes() {
        let rec = FrameRecord::extraction_failed(3, "decode error".into());
        assert!(!rec.is_extracted());
        assert_eq!(rec.error.as_deref(), Some("decode error"));
        assert!(rec.export_bytes().is_none());
    }

    #[test]
    fn export_prefers_enhanced_bytes() {
        let mut rec = FrameRecord::extracted(1, vec![1, 2, 3]);
        assert_eq!(rec.export_bytes(), Some(&[1u8, 2, 3][..]));
        rec.enhanced = Some(vec![9, 9]);
        assert_eq!(rec.export_bytes(), Some(&[9u8, 9][..]));
    }
}
