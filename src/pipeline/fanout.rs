//! Parallel Fan-Out Runner
//!
//! Runs one item analysis over many independent items with a bounded number
//! of in-flight calls.
//!
//! ## Guarantees
//!
//! - A failing item (error or panic) is logged with its identity and excluded;
//!   it never cancels siblings or aborts the batch.
//! - The batch settles only once every item has finished.
//! - Successes are returned in input order regardless of completion order.

use futures::FutureExt;
use futures::stream::{self, StreamExt};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use tracing::{error, info, instrument};

use crate::types::Result;

/// Per-item failure record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemFailure {
    /// Position of the item in the input
    pub index: usize,
    /// Item identity (procedure name, file name, ...)
    pub item: String,
    pub error: String,
}

/// Settled batch: successes in input order plus failures
#[derive(Debug)]
pub struct FanOutReport<T> {
    pub successes: Vec<T>,
    pub failures: Vec<ItemFailure>,
    pub total: usize,
}

impl<T> FanOutReport<T> {
    pub fn succeeded(&self) -> usize {
        self.successes.len()
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Run `worker` over `items` with at most `max_workers` calls in flight.
///
/// `identify` names each item for logging before it is moved into its task.
#[instrument(skip_all, fields(label = label, items = items.len(), concurrency = max_workers))]
pub async fn run_parallel<I, T, F, Fut, N>(
    label: &str,
    items: Vec<I>,
    max_workers: usize,
    identify: N,
    worker: F,
) -> FanOutReport<T>
where
    N: Fn(&I) -> String,
    F: Fn(I) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let total = items.len();
    let names: Vec<String> = items.iter().map(&identify).collect();

    info!(
        "{}: Starting fan-out ({} items, concurrency={})",
        label,
        total,
        max_workers.max(1)
    );

    let mut stream = stream::iter(items.into_iter().enumerate())
        .map(|(index, item)| {
            let task = AssertUnwindSafe(worker(item)).catch_unwind();
            async move { (index, task.await) }
        })
        .buffer_unordered(max_workers.max(1));

    let mut settled: Vec<(usize, T)> = Vec::with_capacity(total);
    let mut failures = Vec::new();

    while let Some((index, outcome)) = stream.next().await {
        let item = names.get(index).cloned().unwrap_or_default();
        let failure = match outcome {
            Ok(Ok(value)) => {
                settled.push((index, value));
                continue;
            }
            Ok(Err(e)) => e.to_string(),
            Err(panic) => panic_message(panic.as_ref()),
        };

        error!("{}: {} failed: {}", label, item, failure);
        failures.push(ItemFailure {
            index,
            item,
            error: failure,
        });
    }

    settled.sort_by_key(|(index, _)| *index);
    failures.sort_by_key(|f| f.index);

    info!("{}: processed {} of {}", label, settled.len(), total);

    FanOutReport {
        successes: settled.into_iter().map(|(_, value)| value).collect(),
        failures,
        total,
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("panicked: {}", s)
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("panicked: {}", s)
    } else {
        "panicked".to_string()
    }
}
