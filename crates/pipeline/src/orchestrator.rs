//! Pipeline orchestrator.
//!
//! Sequences extraction into enhancement, owns the per-run cancellation
//! token and record store, and exposes progress snapshots. Intended to
//! be shared behind an `Arc` so that `cancel()` and `progress()` can be
//! called while a run is in flight.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;

use stillframe_core::adapter::{Enhancer, FrameSource, LocalEnhancer};
use stillframe_core::plan::{frame_plan, DEFAULT_CONCURRENCY};
use stillframe_core::types::{FrameRecord, InitialMethod, RunState, StageProgress};

use crate::enhance::run_enhancement;
use crate::error::PipelineError;
use crate::export::{archive_records, ExportError};
use crate::extract::run_extraction;
use crate::records::RecordStore;

/// Run configuration for a [`Pipeline`].
#[derive(Debug, Clone, Copy)]
pub struct PipelineOptions {
    /// First remote method tried for every frame.
    pub initial_method: InitialMethod,
    /// Concurrency limit shared by both stages.
    pub concurrency: usize,
    /// When true, `start` flows straight from extraction into
    /// enhancement; when false it parks at `ExtractedPending` until
    /// [`Pipeline::begin_enhancement`] is called.
    pub auto_enhance: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            initial_method: InitialMethod::Smart,
            concurrency: DEFAULT_CONCURRENCY,
            auto_enhance: true,
        }
    }
}

/// Progress snapshot for whichever stage is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PipelineProgress {
    pub state: RunState,
    pub done: u32,
    pub total: u32,
}

/// The frame processing pipeline for one video source.
pub struct Pipeline {
    source: Arc<dyn FrameSource>,
    remote: Arc<dyn Enhancer>,
    /// Selected local engine; `None` skips the local tier entirely.
    local: Option<Arc<dyn LocalEnhancer>>,
    options: PipelineOptions,
    store: Arc<RecordStore>,
    state: RwLock<RunState>,
    /// Token for the active run. Replaced (never merely reset) by each
    /// `start` call; `cancel` trips the current one.
    cancel: Mutex<CancellationToken>,
}

impl Pipeline {
    pub fn new(
        source: Arc<dyn FrameSource>,
        remote: Arc<dyn Enhancer>,
        local: Option<Arc<dyn LocalEnhancer>>,
        options: PipelineOptions,
    ) -> Self {
        Self {
            source,
            remote,
            local,
            options,
            store: Arc::new(RecordStore::new()),
            state: RwLock::new(RunState::Idle),
            cancel: Mutex::new(CancellationToken::new()),
        }
    }

    /// Current lifecycle state.
    pub async fn state(&self) -> RunState {
        *self.state.read().await
    }

    /// Start a run over `[start_secs, end_secs)` sampled at `fps`.
    ///
    /// Validates the range, resets the record store and cancellation
    /// token, and runs extraction to completion. In auto mode the run
    /// continues straight into enhancement; otherwise it parks at
    /// `ExtractedPending`.
    pub async fn start(
        &self,
        start_secs: f64,
        end_secs: f64,
        fps: f64,
    ) -> Result<(), PipelineError> {
        let tasks = frame_plan(start_secs, end_secs, fps)?;

        {
            let mut state = self.state.write().await;
            if matches!(*state, RunState::Extracting | RunState::Enhancing) {
                return Err(PipelineError::State(format!(
                    "a run is already active ({})",
                    state.as_str()
                )));
            }
            *state = RunState::Extracting;
        }

        let token = CancellationToken::new();
        *self.cancel.lock().await = token.clone();
        self.store.reset().await;

        tracing::info!(
            start_secs,
            end_secs,
            fps,
            total = tasks.len(),
            "Pipeline run started",
        );

        run_extraction(
            self.source.clone(),
            tasks,
            self.options.concurrency,
            self.store.clone(),
            &token,
        )
        .await;

        if token.is_cancelled() {
            *self.state.write().await = RunState::Idle;
            tracing::info!("Run cancelled during extraction");
            return Ok(());
        }

        *self.state.write().await = RunState::ExtractedPending;

        if self.options.auto_enhance {
            self.enhance_inner(token).await;
        }
        Ok(())
    }

    /// Explicit transition from `ExtractedPending` into enhancement.
    ///
    /// Only meaningful when the pipeline was built with
    /// `auto_enhance: false`.
    pub async fn begin_enhancement(&self) -> Result<(), PipelineError> {
        {
            let state = self.state.read().await;
            if *state != RunState::ExtractedPending {
                return Err(PipelineError::State(format!(
                    "enhancement requires extracted frames (currently {})",
                    state.as_str()
                )));
            }
        }

        let token = self.cancel.lock().await.clone();
        if token.is_cancelled() {
            return Err(PipelineError::State(
                "the run has been cancelled".to_string(),
            ));
        }

        self.enhance_inner(token).await;
        Ok(())
    }

    async fn enhance_inner(&self, token: CancellationToken) {
        *self.state.write().await = RunState::Enhancing;

        run_enhancement(
            self.remote.clone(),
            self.local.clone(),
            self.options.initial_method,
            self.options.concurrency,
            self.store.clone(),
            &token,
        )
        .await;

        let final_state = if token.is_cancelled() {
            tracing::info!("Run cancelled during enhancement");
            RunState::Idle
        } else {
            tracing::info!("Pipeline run complete");
            RunState::Complete
        };
        *self.state.write().await = final_state;
    }

    /// Cancel the active run. Idempotent; safe to call from any state.
    ///
    /// In-flight adapter calls cannot be aborted -- their results are
    /// discarded and no further tiers or tasks start.
    pub async fn cancel(&self) {
        self.cancel.lock().await.cancel();
        tracing::info!("Cancellation requested");
    }

    /// Progress snapshot for whichever stage is active.
    pub async fn progress(&self) -> PipelineProgress {
        let state = self.state().await;
        let stage: StageProgress = match state {
            RunState::Extracting | RunState::ExtractedPending => self.store.extraction.snapshot(),
            RunState::Enhancing | RunState::Complete => self.store.enhancement.snapshot(),
            RunState::Idle => {
                // After a cancelled run, report whichever stage got work.
                let enhancement = self.store.enhancement.snapshot();
                if enhancement.total > 0 {
                    enhancement
                } else {
                    self.store.extraction.snapshot()
                }
            }
        };
        PipelineProgress {
            state,
            done: stage.done,
            total: stage.total,
        }
    }

    /// The accumulated records, in ascending frame-number order.
    pub async fn records(&self) -> Vec<FrameRecord> {
        self.store.sorted().await
    }

    /// Build the export archive from the current records.
    ///
    /// Non-destructive: a failed build leaves the result set intact.
    pub async fn export_archive(&self) -> Result<Vec<u8>, ExportError> {
        archive_records(&self.records().await)
    }
}
