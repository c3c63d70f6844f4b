//! Fixed-width worker pool for CPU-bound transforms.
//!
//! Each task runs on tokio's blocking thread pool via `spawn_blocking`;
//! `buffer_unordered` keeps at most `workers` of them in flight and yields
//! results as they finish. The pool is a plain value owned by one pipeline
//! call, so two pipelines in one process never share a width.

use futures::stream::{self, Stream, StreamExt};
use std::sync::Arc;
use tokio::task::JoinError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerPool {
    workers: usize,
}

impl WorkerPool {
    /// A pool running at most `workers` tasks at once (minimum 1).
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run `task` over every unit, yielding results in completion order.
    ///
    /// Each item is paired with the unit's position in `units`. A task that
    /// panics yields `Err(JoinError)` instead of tearing down the stream; the
    /// other units keep running. Must be polled from inside a tokio runtime.
    pub fn map_unordered<T, R, F>(
        &self,
        units: impl IntoIterator<Item = T>,
        task: F,
    ) -> impl Stream<Item = (usize, Result<R, JoinError>)>
    where
        T: Send + 'static,
        R: Send + 'static,
        F: Fn(T) -> R + Send + Sync + 'static,
    {
        let task = Arc::new(task);
        stream::iter(units.into_iter().enumerate().map(move |(pos, unit)| {
            let task = Arc::clone(&task);
            let handle = tokio::task::spawn_blocking(move || task(unit));
            async move { (pos, handle.await) }
        }))
        .buffer_unordered(self.workers)
    }
}
