//! Worker dispatch for CPU-bound engine invocations.
//!
//! Aggregation, clustering and point location are pure and CPU-bound, so a
//! host serving concurrent requests runs each invocation on an isolated
//! blocking worker and gets the result back over a one-shot channel. A
//! single invocation runs to completion without yielding; dropping the
//! receiver discards the result but cannot interrupt the computation.
//! Deadlines are the caller's concern (wrap the receiver in a timeout).

use tokio::sync::oneshot;
use tracing::debug;

/// Run a pure computation on a blocking worker thread.
///
/// Returns immediately with the receiving half of a one-shot channel. The
/// send side is dropped if the receiver is gone by the time the computation
/// finishes, which is the coarse-grained cancellation the engine supports.
pub fn dispatch<T, F>(op: F) -> oneshot::Receiver<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    let (tx, rx) = oneshot::channel();
    tokio::task::spawn_blocking(move || {
        let result = op();
        if tx.send(result).is_err() {
            debug!("worker result discarded: caller dropped the receiver");
        }
    });
    rx
}
