//! Bounded worker pool
//!
//! A fixed number of tokio worker tasks pull items from a shared queue.
//! Each item runs in its own spawned task that its worker awaits, so a panic
//! in one operation becomes a result instead of taking the worker down.
//! Results flow through a single channel to one collector.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};

use crate::CancelSignal;

/// Why an item produced no result of its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Abandoned {
    /// Cancellation was requested before the item was dispatched.
    Cancelled,
    /// The operation panicked; carries the panic message.
    Panicked(String),
}

/// Run `op` over `items` with at most `parallelism` operations in flight.
///
/// Results are returned in input order, one per item. When `cancel` fires,
/// workers stop taking new items and in-flight operations run to
/// completion; every item never dispatched is passed to `on_abandon`.
pub async fn run<T, R, F, Fut, A>(
    items: Vec<T>,
    parallelism: usize,
    cancel: &CancelSignal,
    op: F,
    on_abandon: A,
) -> Vec<R>
where
    T: Clone + Send + 'static,
    R: Send + 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    A: Fn(T, Abandoned) -> R + Send + Sync + 'static,
{
    let total = items.len();
    if total == 0 {
        return Vec::new();
    }

    let queue: Arc<Mutex<VecDeque<(usize, T)>>> =
        Arc::new(Mutex::new(items.into_iter().enumerate().collect()));
    let op = Arc::new(op);
    let on_abandon = Arc::new(on_abandon);
    let workers = parallelism.clamp(1, total);
    let (tx, mut rx) = mpsc::channel::<(usize, R)>(workers);

    for worker in 0..workers {
        let queue = Arc::clone(&queue);
        let op = Arc::clone(&op);
        let on_abandon = Arc::clone(&on_abandon);
        let cancel = cancel.clone();
        let tx = tx.clone();
        tokio::spawn(async move {
            loop {
                if cancel.is_cancelled() {
                    tracing::debug!(worker, "Cancellation requested; worker stopping");
                    break;
                }
                let Some((index, item)) = queue.lock().await.pop_front() else {
                    break;
                };
                let task = tokio::spawn(op(item.clone()));
                let result = match task.await {
                    Ok(result) => result,
                    Err(e) => {
                        let message = panic_message(e);
                        tracing::warn!(worker, index, error = %message, "Operation panicked");
                        on_abandon(item, Abandoned::Panicked(message))
                    }
                };
                if tx.send((index, result)).await.is_err() {
                    break;
                }
            }
        });
    }
    drop(tx);

    let mut slots: Vec<Option<R>> = std::iter::repeat_with(|| None).take(total).collect();
    while let Some((index, result)) = rx.recv().await {
        slots[index] = Some(result);
    }

    // Every worker has exited; whatever is still queued was never dispatched.
    for (index, item) in queue.lock().await.drain(..) {
        slots[index] = Some(on_abandon(item, Abandoned::Cancelled));
    }

    slots.into_iter().flatten().collect()
}

fn panic_message(err: tokio::task::JoinError) -> String {
    if !err.is_panic() {
        return "task was cancelled".to_string();
    }
    let payload = err.into_panic();
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
