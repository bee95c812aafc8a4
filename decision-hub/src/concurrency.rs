//! Batched fan-out utilities for parallel stage work

use anyhow::{anyhow, Result};
use futures::{stream::FuturesUnordered, Future, StreamExt};
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Context provided to each task in a batch
#[derive(Debug, Clone, Copy)]
pub struct BatchContext {
    /// Batch number (1-indexed for display)
    pub batch_number: usize,
    /// Total number of batches in this fan-out
    pub total_batches: usize,
}

/// Execute items in parallel batches with concurrency control
///
/// At most `limit` tasks run at any moment; the rest queue on the
/// semaphore. Results arrive in completion order, not input order.
/// Fails fast: the first task error stops collection and is returned.
pub async fn execute_batches<T, F, Fut, R>(
    items: Vec<T>,
    limit: usize,
    task: F,
) -> Result<Vec<R>>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(T, BatchContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R>> + Send + 'static,
{
    let total = items.len();
    let sem = Arc::new(Semaphore::new(limit.max(1)));
    let task = Arc::new(task);
    let mut tasks = FuturesUnordered::new();

    for (idx, item) in items.into_iter().enumerate() {
        let sem = sem.clone();
        let task = task.clone();
        let ctx = BatchContext {
            batch_number: idx + 1,
            total_batches: total,
        };

        tasks.push(async move {
            let _permit = sem
                .acquire()
                .await
                .map_err(|_| anyhow!("semaphore closed"))?;

            task(item, ctx).await
        });
    }

    let mut results = Vec::with_capacity(total);
    while let Some(result) = tasks.next().await {
        results.push(result?);
    }

    Ok(results)
}
