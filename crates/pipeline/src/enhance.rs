//! Enhancement stage: the per-frame fallback chain.
//!
//! Each extracted frame runs a tiered sequence of attempts, terminal on
//! the first success:
//!
//! 1. local engine (only when one is selected)
//! 2. remote, the user's initial method (`smart` or `normal`)
//! 3. remote, the other of {smart, normal}
//! 4. remote `direct` (content-preserving upscale, no analysis)
//!
//! Every failed attempt contributes its message; only a frame that
//! exhausts all tiers is a permanent failure, with the messages joined
//! by `" | "`. Cancellation is checked before each tier: an abandoned
//! frame keeps whatever the attempts produced so far and does not count
//! toward `done`.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use stillframe_core::adapter::{Enhancer, LocalEnhancer};
use stillframe_core::types::{
    FrameNumber, InitialMethod, RemoteMethod, METHOD_DIRECT_LAST_RESORT, METHOD_LOCAL,
};

use crate::pool::run_bounded;
use crate::records::RecordStore;

/// Separator between accumulated attempt error messages.
const ERROR_SEPARATOR: &str = " | ";

/// How a single frame left the fallback chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameOutcome {
    /// Terminal: enhanced by some tier, or all tiers exhausted.
    Settled,
    /// Abandoned mid-chain by cancellation.
    Aborted,
}

/// Enhancement stage inputs that are shared by every frame worker.
struct StageContext {
    remote: Arc<dyn Enhancer>,
    local: Option<Arc<dyn LocalEnhancer>>,
    initial: InitialMethod,
    store: Arc<RecordStore>,
    cancel: CancellationToken,
}

/// Enhance every extracted frame currently in `store`.
///
/// Only records with non-empty originals participate; extraction
/// failures stay terminal. The enhancement counter advances once per
/// frame that reaches a terminal outcome.
pub async fn run_enhancement(
    remote: Arc<dyn Enhancer>,
    local: Option<Arc<dyn LocalEnhancer>>,
    initial: InitialMethod,
    limit: usize,
    store: Arc<RecordStore>,
    cancel: &CancellationToken,
) {
    let inputs = store.extracted_frames().await;
    store.enhancement.set_total(inputs.len() as u32);
    tracing::info!(
        total = inputs.len(),
        limit,
        initial = ?initial,
        local_engine = local.is_some(),
        "Enhancement stage started",
    );

    let ctx = Arc::new(StageContext {
        remote,
        local,
        initial,
        store: store.clone(),
        cancel: cancel.clone(),
    });

    run_bounded(
        inputs,
        limit,
        cancel,
        move |(frame_number, original): (FrameNumber, Vec<u8>)| {
            let ctx = ctx.clone();
            async move {
                let outcome = enhance_frame(&ctx, frame_number, &original).await;
                if outcome == FrameOutcome::Settled {
                    ctx.store.enhancement.increment_done();
                }
            }
        },
    )
    .await;
}

/// Run the fallback chain for one frame.
async fn enhance_frame(ctx: &StageContext, frame: FrameNumber, original: &[u8]) -> FrameOutcome {
    let mut attempts: Vec<String> = Vec::new();

    // Tier 1: local engine, when selected.
    if let Some(local) = &ctx.local {
        if ctx.cancel.is_cancelled() {
            return FrameOutcome::Aborted;
        }
        match local.enhance_local(original).await {
            Ok(bytes) => {
                ctx.store.mark_enhanced(frame, bytes, METHOD_LOCAL).await;
                tracing::debug!(frame, method = METHOD_LOCAL, "Frame enhanced");
                return FrameOutcome::Settled;
            }
            Err(e) => {
                tracing::debug!(frame, error = %e, "Local engine failed, falling back to remote");
                attempts.push(e.to_string());
            }
        }
    }

    // Tier 2: the user's initial remote method. Smart mode runs the
    // context-analysis pre-step first; its failure is silent.
    if ctx.cancel.is_cancelled() {
        return FrameOutcome::Aborted;
    }
    let context = match ctx.initial {
        InitialMethod::Smart => {
            let description = ctx.remote.describe_image(original).await;
            (!description.is_empty()).then_some(description)
        }
        InitialMethod::Normal => None,
    };
    match ctx
        .remote
        .enhance(original, ctx.initial.remote(), context.as_deref())
        .await
    {
        Ok(bytes) => {
            ctx.store.mark_enhanced(frame, bytes, ctx.initial.label()).await;
            tracing::debug!(frame, method = ctx.initial.label(), "Frame enhanced");
            return FrameOutcome::Settled;
        }
        Err(e) => attempts.push(e.to_string()),
    }

    // Tier 3: the other of {smart, normal}, without context.
    if ctx.cancel.is_cancelled() {
        return FrameOutcome::Aborted;
    }
    match ctx.remote.enhance(original, ctx.initial.fallback(), None).await {
        Ok(bytes) => {
            ctx.store
                .mark_enhanced(frame, bytes, ctx.initial.fallback_label())
                .await;
            tracing::debug!(frame, method = ctx.initial.fallback_label(), "Frame enhanced");
            return FrameOutcome::Settled;
        }
        Err(e) => attempts.push(e.to_string()),
    }

    // Tier 4: direct upscale, the last resort.
    if ctx.cancel.is_cancelled() {
        return FrameOutcome::Aborted;
    }
    match ctx.remote.enhance(original, RemoteMethod::Direct, None).await {
        Ok(bytes) => {
            ctx.store
                .mark_enhanced(frame, bytes, METHOD_DIRECT_LAST_RESORT)
                .await;
            tracing::debug!(frame, method = METHOD_DIRECT_LAST_RESORT, "Frame enhanced");
            return FrameOutcome::Settled;
        }
        Err(e) => attempts.push(e.to_string()),
    }

    // All tiers exhausted: the only permanent failure case.
    let message = attempts.join(ERROR_SEPARATOR);
    tracing::warn!(frame, error = %message, "All enhancement tiers failed");
    ctx.store.mark_enhancement_failed(frame, message).await;
    FrameOutcome::Settled
}
