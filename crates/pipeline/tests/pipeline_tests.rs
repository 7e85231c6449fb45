//! End-to-end tests for the frame pipeline.
//!
//! Drives the orchestrator with stub adapters: a frame source with
//! randomized completion order, a scriptable remote enhancer, and the
//! real local upscaler.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use stillframe_core::adapter::{Enhancer, FrameSource, LocalEnhancer};
use stillframe_core::error::{EnhancementError, ExtractionError};
use stillframe_core::types::{
    InitialMethod, RemoteMethod, RunState, METHOD_DIRECT_LAST_RESORT, METHOD_LOCAL, METHOD_SMART,
};
use stillframe_enhance::local::LocalUpscaler;
use stillframe_pipeline::{Pipeline, PipelineError, PipelineOptions};

// ---------------------------------------------------------------------------
// Stub adapters
// ---------------------------------------------------------------------------

/// Frame source whose per-call latency depends on the timestamp, so
/// completion order differs from dispatch order.
struct JitterySource {
    calls: AtomicUsize,
}

impl JitterySource {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl FrameSource for JitterySource {
    async fn extract_frame(&self, timestamp_secs: f64) -> Result<Vec<u8>, ExtractionError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        // Earlier dispatches sleep longer: completion order is reversed
        // within each admitted batch.
        let delay_ms = 10u64.saturating_sub(call as u64 % 10);
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        // Encode the timestamp so payloads are distinguishable.
        Ok(format!("frame@{timestamp_secs:.3}").into_bytes())
    }
}

/// Remote enhancer that succeeds only for the configured methods.
struct ScriptedRemote {
    succeed: Vec<RemoteMethod>,
}

impl ScriptedRemote {
    fn new(succeed: Vec<RemoteMethod>) -> Arc<Self> {
        Arc::new(Self { succeed })
    }
}

#[async_trait]
impl Enhancer for ScriptedRemote {
    async fn enhance(
        &self,
        image: &[u8],
        method: RemoteMethod,
        _context: Option<&str>,
    ) -> Result<Vec<u8>, EnhancementError> {
        if self.succeed.contains(&method) {
            let mut out = image.to_vec();
            out.extend_from_slice(b"+enhanced");
            Ok(out)
        } else {
            Err(EnhancementError::Remote(format!(
                "{} unavailable",
                method.as_str()
            )))
        }
    }

    async fn describe_image(&self, _image: &[u8]) -> String {
        "a busy street at dusk".to_string()
    }
}

/// Source that blocks until released, for cancellation tests.
struct GatedSource {
    started: AtomicUsize,
    release: tokio::sync::Notify,
}

impl GatedSource {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            started: AtomicUsize::new(0),
            release: tokio::sync::Notify::new(),
        })
    }
}

#[async_trait]
impl FrameSource for GatedSource {
    async fn extract_frame(&self, _timestamp_secs: f64) -> Result<Vec<u8>, ExtractionError> {
        self.started.fetch_add(1, Ordering::SeqCst);
        self.release.notified().await;
        Ok(vec![1])
    }
}

fn pipeline_with(
    source: Arc<dyn FrameSource>,
    remote: Arc<dyn Enhancer>,
    local: Option<Arc<dyn LocalEnhancer>>,
    options: PipelineOptions,
) -> Arc<Pipeline> {
    Arc::new(Pipeline::new(source, remote, local, options))
}

// ---------------------------------------------------------------------------
// Test: full run, ordering, progress
// ---------------------------------------------------------------------------

/// A full auto run produces exactly `total` records in ascending frame
/// order despite shuffled completion, every one enhanced by the initial
/// smart method.
#[tokio::test]
async fn full_run_produces_ordered_enhanced_records() {
    let pipeline = pipeline_with(
        JitterySource::new(),
        ScriptedRemote::new(vec![RemoteMethod::Smart]),
        None,
        PipelineOptions::default(),
    );

    pipeline.start(0.0, 2.0, 5.0).await.unwrap();
    assert_eq!(pipeline.state().await, RunState::Complete);

    let records = pipeline.records().await;
    assert_eq!(records.len(), 10);
    for (i, record) in records.iter().enumerate() {
        assert_eq!(record.frame_number, i as u32 + 1);
        assert_eq!(record.method.as_deref(), Some(METHOD_SMART));
        assert!(record.enhanced.is_some());
        assert!(record.error.is_none());
    }

    let progress = pipeline.progress().await;
    assert_eq!(progress.done, 10);
    assert_eq!(progress.total, 10);
}

/// Fallback determinism: with smart and normal failing and direct
/// succeeding, every frame's terminal method is the last resort.
#[tokio::test]
async fn direct_only_service_yields_last_resort_for_every_frame() {
    let pipeline = pipeline_with(
        JitterySource::new(),
        ScriptedRemote::new(vec![RemoteMethod::Direct]),
        None,
        PipelineOptions::default(),
    );

    pipeline.start(0.0, 1.0, 6.0).await.unwrap();

    let records = pipeline.records().await;
    assert_eq!(records.len(), 6);
    for record in records {
        assert_eq!(record.method.as_deref(), Some(METHOD_DIRECT_LAST_RESORT));
    }
}

/// With every tier failing, each frame carries the three joined attempt
/// messages and no enhanced bytes, and the run still completes.
#[tokio::test]
async fn total_enhancement_failure_still_completes_with_errors() {
    let pipeline = pipeline_with(
        JitterySource::new(),
        ScriptedRemote::new(vec![]),
        None,
        PipelineOptions::default(),
    );

    pipeline.start(0.0, 1.0, 4.0).await.unwrap();
    assert_eq!(pipeline.state().await, RunState::Complete);

    for record in pipeline.records().await {
        assert!(record.enhanced.is_none());
        let error = record.error.expect("error must be set");
        assert_eq!(error.matches(" | ").count(), 2);
        assert!(error.contains("smart unavailable"));
        assert!(error.contains("normal unavailable"));
        assert!(error.contains("direct unavailable"));
    }
}

// ---------------------------------------------------------------------------
// Test: local engine tier
// ---------------------------------------------------------------------------

/// With the local engine selected and valid image input, frames are
/// enhanced locally and the remote service is never needed.
#[tokio::test]
async fn local_engine_wins_before_any_remote_tier() {
    // Real PNG input so the real upscaler can decode it.
    let png = {
        let img = image::RgbImage::from_pixel(4, 4, image::Rgb([10, 20, 30]));
        let mut out = std::io::Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut out, image::ImageFormat::Png)
            .unwrap();
        out.into_inner()
    };

    struct PngSource(Vec<u8>);

    #[async_trait]
    impl FrameSource for PngSource {
        async fn extract_frame(&self, _ts: f64) -> Result<Vec<u8>, ExtractionError> {
            Ok(self.0.clone())
        }
    }

    let pipeline = pipeline_with(
        Arc::new(PngSource(png)),
        // Remote would fail everything; it must never be reached.
        ScriptedRemote::new(vec![]),
        Some(Arc::new(LocalUpscaler::new())),
        PipelineOptions::default(),
    );

    pipeline.start(0.0, 1.0, 3.0).await.unwrap();

    for record in pipeline.records().await {
        assert_eq!(record.method.as_deref(), Some(METHOD_LOCAL));
        assert!(record.enhanced.is_some());
    }
}

// ---------------------------------------------------------------------------
// Test: two-phase workflow
// ---------------------------------------------------------------------------

/// With `auto_enhance: false` the run parks at `ExtractedPending` and
/// only proceeds on an explicit `begin_enhancement`.
#[tokio::test]
async fn manual_mode_parks_until_begin_enhancement() {
    let options = PipelineOptions {
        auto_enhance: false,
        initial_method: InitialMethod::Normal,
        ..Default::default()
    };
    let pipeline = pipeline_with(
        JitterySource::new(),
        ScriptedRemote::new(vec![RemoteMethod::Normal]),
        None,
        options,
    );

    pipeline.start(0.0, 1.0, 5.0).await.unwrap();
    assert_eq!(pipeline.state().await, RunState::ExtractedPending);
    assert!(pipeline.records().await.iter().all(|r| r.enhanced.is_none()));

    pipeline.begin_enhancement().await.unwrap();
    assert_eq!(pipeline.state().await, RunState::Complete);
    assert!(pipeline.records().await.iter().all(|r| r.enhanced.is_some()));
}

/// `begin_enhancement` outside `ExtractedPending` is a state error.
#[tokio::test]
async fn begin_enhancement_from_idle_is_rejected() {
    let pipeline = pipeline_with(
        JitterySource::new(),
        ScriptedRemote::new(vec![]),
        None,
        PipelineOptions::default(),
    );

    let result = pipeline.begin_enhancement().await;
    assert!(matches!(result, Err(PipelineError::State(_))));
}

// ---------------------------------------------------------------------------
// Test: validation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn invalid_ranges_are_rejected_before_any_work() {
    let pipeline = pipeline_with(
        JitterySource::new(),
        ScriptedRemote::new(vec![]),
        None,
        PipelineOptions::default(),
    );

    assert!(matches!(
        pipeline.start(2.0, 1.0, 5.0).await,
        Err(PipelineError::Config(_))
    ));
    assert!(matches!(
        pipeline.start(0.0, 2.0, 0.0).await,
        Err(PipelineError::Config(_))
    ));
    assert!(matches!(
        pipeline.start(1.0, 1.05, 5.0).await,
        Err(PipelineError::Config(_))
    ));
    assert_eq!(pipeline.state().await, RunState::Idle);
    assert!(pipeline.records().await.is_empty());
}

// ---------------------------------------------------------------------------
// Test: cancellation
// ---------------------------------------------------------------------------

/// Cancelling during extraction stops admissions, drains in-flight
/// work, and lands the pipeline back in `Idle`.
#[tokio::test]
async fn cancel_during_extraction_returns_to_idle() {
    let source = GatedSource::new();
    let pipeline = pipeline_with(
        source.clone(),
        ScriptedRemote::new(vec![RemoteMethod::Smart]),
        None,
        PipelineOptions {
            concurrency: 2,
            ..Default::default()
        },
    );

    let run = {
        let pipeline = pipeline.clone();
        tokio::spawn(async move { pipeline.start(0.0, 4.0, 5.0).await })
    };

    // Wait for the first two workers to start, then cancel while the
    // pool is blocked waiting for a free slot.
    while source.started.load(Ordering::SeqCst) < 2 {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    pipeline.cancel().await;
    for _ in 0..20 {
        source.release.notify_waiters();
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    run.await.unwrap().unwrap();

    assert_eq!(pipeline.state().await, RunState::Idle);
    // No new task started after the flag was observed.
    assert_eq!(source.started.load(Ordering::SeqCst), 2);
    // The in-flight extractions settled and were recorded.
    assert_eq!(pipeline.records().await.len(), 2);
}

/// `cancel` is idempotent and safe before any run.
#[tokio::test]
async fn cancel_is_idempotent_from_any_state() {
    let pipeline = pipeline_with(
        JitterySource::new(),
        ScriptedRemote::new(vec![RemoteMethod::Smart]),
        None,
        PipelineOptions::default(),
    );

    pipeline.cancel().await;
    pipeline.cancel().await;
    assert_eq!(pipeline.state().await, RunState::Idle);

    // A fresh start resets the flag: the run must complete normally.
    pipeline.start(0.0, 1.0, 4.0).await.unwrap();
    assert_eq!(pipeline.state().await, RunState::Complete);
    assert_eq!(pipeline.records().await.len(), 4);
}

/// A cancelled pending run refuses to enter enhancement.
#[tokio::test]
async fn cancelled_pending_run_rejects_enhancement() {
    let pipeline = pipeline_with(
        JitterySource::new(),
        ScriptedRemote::new(vec![RemoteMethod::Smart]),
        None,
        PipelineOptions {
            auto_enhance: false,
            ..Default::default()
        },
    );

    pipeline.start(0.0, 1.0, 4.0).await.unwrap();
    assert_eq!(pipeline.state().await, RunState::ExtractedPending);

    pipeline.cancel().await;
    assert!(matches!(
        pipeline.begin_enhancement().await,
        Err(PipelineError::State(_))
    ));
}

// ---------------------------------------------------------------------------
// Test: export
// ---------------------------------------------------------------------------

/// The export archive contains one zero-padded entry per frame with
/// terminal image bytes.
#[tokio::test]
async fn export_archive_names_entries_by_frame_number() {
    let pipeline = pipeline_with(
        JitterySource::new(),
        ScriptedRemote::new(vec![RemoteMethod::Normal]),
        None,
        PipelineOptions {
            initial_method: InitialMethod::Normal,
            ..Default::default()
        },
    );

    pipeline.start(0.0, 1.0, 5.0).await.unwrap();
    let archive_bytes = pipeline.export_archive().await.unwrap();

    let mut archive =
        zip::ZipArchive::new(std::io::Cursor::new(archive_bytes)).expect("valid zip");
    assert_eq!(archive.len(), 5);
    // Stub payloads are not real images, so sniffing falls back to png.
    assert!(archive.by_name("frame_00001.png").is_ok());
    assert!(archive.by_name("frame_00005.png").is_ok());
}

/// Progress snapshots serialize for the presentation layer.
#[tokio::test]
async fn progress_snapshot_serializes() {
    let pipeline = pipeline_with(
        JitterySource::new(),
        ScriptedRemote::new(vec![RemoteMethod::Smart]),
        None,
        PipelineOptions::default(),
    );
    pipeline.start(0.0, 1.0, 2.0).await.unwrap();

    let json = serde_json::to_value(pipeline.progress().await).unwrap();
    assert_eq!(json["state"], "complete");
    assert_eq!(json["done"], 2);
    assert_eq!(json["total"], 2);
}
