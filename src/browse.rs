//! Category browsing with incremental pagination.
//!
//! [`BrowseMachine`] owns a [`BrowseState`] and mutates it only through its
//! operations. Fetches run as background tasks on the tokio runtime; their
//! outcome comes back as a [`BrowseEvent`] that the owner feeds to
//! [`BrowseMachine::handle_event`] (or lets [`BrowseMachine::settle`] pump).
//! Observers get immutable snapshots through [`BrowseMachine::subscribe`].

use crate::api::{Catalog, CatalogError, Category, Movie, MoviePage};
use crate::machine::{fold_page, TaskSlot};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

/// Snapshot of the browse screen.
#[derive(Debug, Clone, Default)]
pub struct BrowseState {
    /// `None` until the first category is selected.
    pub category: Option<Category>,
    /// Last page requested; 0 when nothing has been requested.
    pub page: u32,
    /// Accumulated results in fetch order.
    pub movies: Arc<Vec<Movie>>,
    pub is_loading: bool,
    /// Set when the service reports no further pages, or after a failure.
    pub is_last_page: bool,
    pub error: Option<String>,
}

/// Outcome of a background page fetch.
#[derive(Debug)]
pub struct BrowseEvent {
    pub generation: u64,
    pub category: Category,
    pub page: u32,
    pub result: Result<MoviePage, CatalogError>,
}

pub struct BrowseMachine<C: Catalog> {
    catalog: Arc<C>,
    state: BrowseState,
    task: TaskSlot,
    event_tx: mpsc::Sender<BrowseEvent>,
    event_rx: mpsc::Receiver<BrowseEvent>,
    state_tx: watch::Sender<BrowseState>,
}

impl<C: Catalog> BrowseMachine<C> {
    pub fn new(catalog: Arc<C>) -> Self {
        let (event_tx, event_rx) = mpsc::channel(8);
        let (state_tx, _) = watch::channel(BrowseState::default());
        Self {
            catalog,
            state: BrowseState::default(),
            task: TaskSlot::default(),
            event_tx,
            event_rx,
            state_tx,
        }
    }

    pub fn state(&self) -> &BrowseState {
        &self.state
    }

    /// Receive a snapshot after every state change.
    pub fn subscribe(&self) -> watch::Receiver<BrowseState> {
        self.state_tx.subscribe()
    }

    /// Switch to `category` and fetch its first page.
    ///
    /// Reselecting the current category does nothing. Returns whether a fetch
    /// was dispatched.
    pub fn select_category(&mut self, category: Category) -> bool {
        if self.state.category == Some(category) {
            tracing::debug!(category = %category, "Category already selected, ignoring");
            return false;
        }
        self.state.category = Some(category);
        self.restart(category);
        true
    }

    /// Fetch the next page of the current category.
    ///
    /// Ignored while a fetch is outstanding, once the last page has been
    /// reached, or before any category is selected.
    pub fn advance_page(&mut self) -> bool {
        let Some(category) = self.state.category else {
            return false;
        };
        if self.state.is_loading || self.state.is_last_page {
            tracing::debug!(
                category = %category,
                page = self.state.page,
                loading = self.state.is_loading,
                last_page = self.state.is_last_page,
                "Ignoring page advance"
            );
            return false;
        }

        let page = self.state.page + 1;
        let generation = self.task.supersede();
        self.state.page = page;
        self.state.is_loading = true;
        self.state.error = None;
        self.publish();
        self.dispatch(generation, category, page);
        true
    }

    /// Drop the accumulated results and refetch page 1 of the current category.
    pub fn refresh(&mut self) -> bool {
        let Some(category) = self.state.category else {
            return false;
        };
        self.restart(category);
        true
    }

    /// Empty the results and reset pagination without fetching.
    ///
    /// The category is kept; the next [`advance_page`](Self::advance_page)
    /// requests page 1. Any outstanding fetch is abandoned.
    pub fn clear(&mut self) {
        self.task.supersede();
        self.state.page = 0;
        self.state.movies = Arc::new(Vec::new());
        self.state.is_loading = false;
        self.state.is_last_page = false;
        self.state.error = None;
        self.publish();
        tracing::debug!("Browse results cleared");
    }

    /// Return the pending error message and clear it so it is shown once.
    pub fn take_error(&mut self) -> Option<String> {
        let error = self.state.error.take();
        if error.is_some() {
            self.publish();
        }
        error
    }

    /// Wait for the next event from a background fetch.
    ///
    /// For use in an owner's `select!` loop; pass the result to
    /// [`handle_event`](Self::handle_event).
    pub async fn recv(&mut self) -> Option<BrowseEvent> {
        self.event_rx.recv().await
    }

    /// Fold a fetch outcome into the state, discarding stale ones.
    pub fn handle_event(&mut self, event: BrowseEvent) {
        if !self.task.is_current(event.generation) || self.state.category != Some(event.category) {
            tracing::debug!(
                category = %event.category,
                page = event.page,
                generation = event.generation,
                "Discarding stale browse result"
            );
            return;
        }

        self.task.finish();
        self.state.is_loading = false;

        match event.result {
            Ok(page) => {
                let received = page.results.len();
                self.state.is_last_page = page.is_last(event.page);
                self.state.movies = fold_page(&self.state.movies, event.page, page.results);
                tracing::debug!(
                    category = %event.category,
                    page = event.page,
                    received,
                    total = self.state.movies.len(),
                    last_page = self.state.is_last_page,
                    "Folded category page"
                );
            }
            Err(e) => {
                let message = if e.is_http() {
                    format!("Failed to load movies: {e}")
                } else {
                    format!(
                        "Network or parsing error for {} page {}: {e}",
                        event.category, event.page
                    )
                };
                tracing::error!(category = %event.category, page = event.page, error = %e, "Category fetch failed");
                self.state.error = Some(message);
                // Stop automatic pagination until the user retries
                self.state.is_last_page = true;
            }
        }
        self.publish();
    }

    /// Pump events until no fetch is outstanding.
    pub async fn settle(&mut self) {
        while let Some(mut handle) = self.task.take_handle() {
            tokio::select! {
                biased;
                Some(event) = self.event_rx.recv() => {
                    self.task.restore_handle(handle);
                    self.handle_event(event);
                }
                joined = &mut handle => {
                    if let Err(e) = joined {
                        tracing::warn!(error = %e, "Browse fetch task ended abnormally");
                        self.state.is_loading = false;
                        self.publish();
                    }
                    while let Ok(event) = self.event_rx.try_recv() {
                        self.handle_event(event);
                    }
                }
            }
        }
    }

    fn restart(&mut self, category: Category) {
        let generation = self.task.supersede();
        self.state.page = 1;
        self.state.movies = Arc::new(Vec::new());
        self.state.is_last_page = false;
        self.state.is_loading = true;
        self.state.error = None;
        self.publish();
        self.dispatch(generation, category, 1);
    }

    fn dispatch(&mut self, generation: u64, category: Category, page: u32) {
        let catalog = Arc::clone(&self.catalog);
        let tx = self.event_tx.clone();

        tracing::debug!(category = %category, page, generation, "Dispatching category fetch");

        self.task.spawn(async move {
            let result = catalog.fetch_category(category, page).await;
            let event = BrowseEvent {
                generation,
                category,
                page,
                result,
            };
            if let Err(e) = tx.send(event).await {
                tracing::warn!(error = %e, "Failed to deliver browse result (receiver dropped)");
            }
        });
    }

    fn publish(&self) {
        self.state_tx.send_replace(self.state.clone());
    }
}
