//! Shared result state for a pipeline run.
//!
//! [`RecordStore`] owns the single mapping from frame number to
//! [`FrameRecord`]. All mutation goes through one path (insert or update
//! by key under the write lock); the sorted view is derived on read from
//! the `BTreeMap`'s key order rather than re-sorted on every write.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, Ordering};

use tokio::sync::RwLock;

use stillframe_core::types::{FrameNumber, FrameRecord, StageProgress};

/// Monotonic progress counter for one stage.
///
/// `done` only ever increases between [`reset`](Self::reset) calls, and
/// only when a task settles with a terminal outcome -- never on a
/// cancellation abort.
#[derive(Debug, Default)]
pub struct StageCounter {
    done: AtomicU32,
    total: AtomicU32,
}

impl StageCounter {
    /// Set the stage total. Called once, before any task is dispatched.
    pub fn set_total(&self, total: u32) {
        self.total.store(total, Ordering::Relaxed);
    }

    /// Record one settled task.
    pub fn increment_done(&self) {
        self.done.fetch_add(1, Ordering::Relaxed);
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> StageProgress {
        StageProgress {
            done: self.done.load(Ordering::Relaxed),
            total: self.total.load(Ordering::Relaxed),
        }
    }

    fn reset(&self) {
        self.done.store(0, Ordering::Relaxed);
        self.total.store(0, Ordering::Relaxed);
    }
}

/// The accumulated frame records plus per-stage progress for one run.
#[derive(Debug, Default)]
pub struct RecordStore {
    records: RwLock<BTreeMap<FrameNumber, FrameRecord>>,
    /// Extraction stage progress.
    pub extraction: StageCounter,
    /// Enhancement stage progress.
    pub enhancement: StageCounter,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all records and counters at the start of a new run.
    pub async fn reset(&self) {
        self.records.write().await.clear();
        self.extraction.reset();
        self.enhancement.reset();
    }

    /// Insert or replace the record for its frame number.
    pub async fn put(&self, record: FrameRecord) {
        self.records.write().await.insert(record.frame_number, record);
    }

    /// Mutate the record for `frame_number` in place, if present.
    /// Returns whether a record existed.
    pub async fn update<F>(&self, frame_number: FrameNumber, f: F) -> bool
    where
        F: FnOnce(&mut FrameRecord),
    {
        match self.records.write().await.get_mut(&frame_number) {
            Some(record) => {
                f(record);
                true
            }
            None => false,
        }
    }

    /// Mark a frame as successfully enhanced.
    pub async fn mark_enhanced(&self, frame_number: FrameNumber, bytes: Vec<u8>, method: &str) {
        self.update(frame_number, |record| {
            record.enhanced = Some(bytes);
            record.method = Some(method.to_string());
            record.error = None;
        })
        .await;
    }

    /// Mark a frame as having exhausted every enhancement tier.
    pub async fn mark_enhancement_failed(&self, frame_number: FrameNumber, message: String) {
        self.update(frame_number, |record| {
            record.enhanced = None;
            record.error = Some(message);
        })
        .await;
    }

    /// Number of records currently held.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// All records in ascending frame-number order.
    pub async fn sorted(&self) -> Vec<FrameRecord> {
        self.records.read().await.values().cloned().collect()
    }

    /// The extraction successes, in ascending frame-number order --
    /// the input set for the enhancement stage.
    pub async fn extracted_frames(&self) -> Vec<(FrameNumber, Vec<u8>)> {
        self.records
            .read()
            .await
            .values()
            .filter(|r| r.is_extracted())
            .map(|r| (r.frame_number, r.original.clone()))
            .collect()
    }
}
