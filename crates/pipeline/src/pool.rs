//! Bounded-concurrency worker pool.
//!
//! Runs up to `limit` tasks concurrently from a FIFO queue, refilling as
//! permits free up, and completes when all dispatched work has settled.
//! Cancellation is cooperative: once the token is observed no new task
//! is admitted, but in-flight tasks drain to their own outcome.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Run `worker` over `tasks` with at most `limit` concurrent executions.
///
/// Queue order is the only ordering guarantee; completion order is
/// unspecified. The pool holds no result state -- side effects belong to
/// the caller-supplied `worker` closure, which reports outcomes by
/// mutating shared state it captures.
///
/// The cancellation token is checked before each admission and again
/// after the permit is acquired (the flag may be raised while waiting
/// for a slot). A worker that panics is reported through the join error
/// and never takes the pool down with it.
pub async fn run_bounded<T, F, Fut>(
    tasks: Vec<T>,
    limit: usize,
    cancel: &CancellationToken,
    worker: F,
) where
    T: Send + 'static,
    F: Fn(T) -> Fut,
    Fut: Future<Output = ()> + Send + 'static,
{
    let limit = limit.max(1);
    let semaphore = Arc::new(Semaphore::new(limit));
    let mut in_flight = JoinSet::new();

    for task in tasks {
        if cancel.is_cancelled() {
            break;
        }

        let permit = match semaphore.clone().acquire_owned().await {
            Ok(permit) => permit,
            // The semaphore is never closed while the pool runs.
            Err(_) => break,
        };

        if cancel.is_cancelled() {
            break;
        }

        let fut = worker(task);
        in_flight.spawn(async move {
            let _permit = permit;
            fut.await;
        });
    }

    // Drain: let every admitted task settle, cancelled or not.
    while let Some(joined) = in_flight.join_next().await {
        if let Err(e) = joined {
            tracing::error!(error = %e, "Pool worker task failed to join");
        }
    }
}
