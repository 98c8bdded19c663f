//! Bounded-concurrency task runner.
//!
//! Caps simultaneous item chains (fetch → normalize → ingest) within one
//! source. Every task settles independently: a panicking task yields `None`
//! in its slot without cancelling or blocking siblings.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::warn;

/// Run all `tasks` with at most `max_concurrency` in flight, waiting for
/// every task to settle. Results are returned in task order; a task that
/// panicked or was aborted maps to `None`.
pub async fn run_all<F, T>(max_concurrency: usize, tasks: Vec<F>) -> Vec<Option<T>>
where
    F: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    let semaphore = Arc::new(Semaphore::new(max_concurrency.max(1)));
    let mut handles = Vec::with_capacity(tasks.len());

    for task in tasks {
        let sem = semaphore.clone();
        handles.push(tokio::spawn(async move {
            let _permit = sem.acquire().await.expect("semaphore closed");
            task.await
        }));
    }

    let mut results = Vec::with_capacity(handles.len());
    for handle in handles {
        match handle.await {
            Ok(value) => results.push(Some(value)),
            Err(e) => {
                warn!(error = %e, "item task failed to settle");
                results.push(None);
            }
        }
    }
    results
}
