//! Pieces shared by the browse and search state machines.

use crate::api::Movie;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// The single background fetch a state machine may have outstanding.
///
/// Every dispatch runs under a generation number. Superseding aborts the
/// current task and bumps the generation, so any event already queued by the
/// old task no longer matches and is discarded on arrival.
#[derive(Debug, Default)]
pub(crate) struct TaskSlot {
    generation: u64,
    handle: Option<JoinHandle<()>>,
}

impl TaskSlot {
    /// Abort whatever is outstanding and start a new generation.
    pub(crate) fn supersede(&mut self) -> u64 {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            tracing::debug!(generation = self.generation, "Aborted superseded fetch task");
        }
        self.generation = self.generation.wrapping_add(1);
        self.generation
    }

    pub(crate) fn spawn<F>(&mut self, task: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        self.handle = Some(tokio::spawn(task));
    }

    pub(crate) fn is_current(&self, generation: u64) -> bool {
        self.generation == generation
    }

    /// Forget the outstanding task once its final event has been folded.
    pub(crate) fn finish(&mut self) {
        self.handle = None;
    }

    pub(crate) fn take_handle(&mut self) -> Option<JoinHandle<()>> {
        self.handle.take()
    }

    pub(crate) fn restore_handle(&mut self, handle: JoinHandle<()>) {
        self.handle = Some(handle);
    }
}

/// Fold a freshly fetched page into the accumulated results.
///
/// Never mutates `existing`: observers holding the previous snapshot keep
/// seeing exactly what they were given. Page 1 replaces, later pages append.
/// Duplicate ids across pages are kept.
pub(crate) fn fold_page(existing: &Arc<Vec<Movie>>, page: u32, results: Vec<Movie>) -> Arc<Vec<Movie>> {
    if page <= 1 {
        return Arc::new(results);
    }
    let mut combined = Vec::with_capacity(existing.len() + results.len());
    combined.extend(existing.iter().cloned());
    combined.extend(results);
    Arc::new(combined)
}
