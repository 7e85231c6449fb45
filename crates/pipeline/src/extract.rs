//! Extraction stage.
//!
//! Pulls every planned frame out of the source through the bounded pool.
//! Failures are terminal per frame (no retry) and never halt the other
//! frames; a stalled decode is cut off by a caller-enforced timeout.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use stillframe_core::adapter::FrameSource;
use stillframe_core::error::ExtractionError;
use stillframe_core::plan::EXTRACTION_TIMEOUT_SECS;
use stillframe_core::types::{FrameRecord, FrameTask};

use crate::pool::run_bounded;
use crate::records::RecordStore;

/// Extract all `tasks` from `source` into `store`.
///
/// One record is written per settled task -- success with bytes, or
/// failure with the error message and empty bytes. The extraction
/// counter advances once per settled task; tasks skipped by
/// cancellation never settle and never count.
pub async fn run_extraction(
    source: Arc<dyn FrameSource>,
    tasks: Vec<FrameTask>,
    limit: usize,
    store: Arc<RecordStore>,
    cancel: &CancellationToken,
) {
    store.extraction.set_total(tasks.len() as u32);
    tracing::info!(total = tasks.len(), limit, "Extraction stage started");

    run_bounded(tasks, limit, cancel, move |task: FrameTask| {
        let source = source.clone();
        let store = store.clone();
        async move {
            let record = extract_one(source.as_ref(), task).await;
            store.put(record).await;
            store.extraction.increment_done();
        }
    })
    .await;
}

/// Run one extraction attempt with the hard timeout and turn the outcome
/// into a terminal [`FrameRecord`].
async fn extract_one(source: &dyn FrameSource, task: FrameTask) -> FrameRecord {
    let attempt = tokio::time::timeout(
        Duration::from_secs(EXTRACTION_TIMEOUT_SECS),
        source.extract_frame(task.timestamp_secs),
    )
    .await;

    match attempt {
        Ok(Ok(bytes)) => {
            tracing::debug!(
                frame = task.frame_number,
                timestamp_secs = task.timestamp_secs,
                bytes = bytes.len(),
                "Frame extracted",
            );
            FrameRecord::extracted(task.frame_number, bytes)
        }
        Ok(Err(e)) => {
            tracing::warn!(
                frame = task.frame_number,
                timestamp_secs = task.timestamp_secs,
                error = %e,
                "Frame extraction failed",
            );
            FrameRecord::extraction_failed(task.frame_number, e.to_string())
        }
        Err(_elapsed) => {
            let e = ExtractionError::Timeout(EXTRACTION_TIMEOUT_SECS);
            tracing::warn!(
                frame = task.frame_number,
                timestamp_secs = task.timestamp_secs,
                error = %e,
                "Frame extraction stalled",
            );
            FrameRecord::extraction_failed(task.frame_number, e.to_string())
        }
    }
}
