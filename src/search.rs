//! Free-text search with debouncing and pagination.
//!
//! Keystrokes call [`SearchMachine::search`]; each call supersedes the one
//! before it, so only the query still pending when the debounce delay
//! elapses reaches the catalog. A search runs as a background task that
//! reports back twice: [`SearchEvent::Dispatched`] when the delay has passed
//! and the request is sent, and [`SearchEvent::Completed`] with the result.
//! Both carry the generation they were issued under; anything from an older
//! generation, or for a query that is no longer tracked, is dropped.

use crate::api::{Catalog, CatalogError, Movie, MoviePage};
use crate::machine::{fold_page, TaskSlot};
use crate::util::MAX_SEARCH_QUERY_LENGTH;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// Snapshot of the search screen.
#[derive(Debug, Clone)]
pub struct SearchState {
    /// Query whose results are held; empty when idle.
    pub query: String,
    pub page: u32,
    pub movies: Arc<Vec<Movie>>,
    /// A search is scheduled but still waiting out its debounce delay.
    pub is_pending: bool,
    pub is_loading: bool,
    pub is_last_page: bool,
    pub error: Option<String>,
}

impl Default for SearchState {
    fn default() -> Self {
        Self {
            query: String::new(),
            page: 1,
            movies: Arc::new(Vec::new()),
            is_pending: false,
            is_loading: false,
            is_last_page: false,
            error: None,
        }
    }
}

#[derive(Debug)]
pub enum SearchEvent {
    /// The debounce delay elapsed and the request went out.
    ///
    /// `fresh` marks a new search (results reset) as opposed to a further
    /// page of the tracked query.
    Dispatched {
        generation: u64,
        query: String,
        page: u32,
        fresh: bool,
    },
    Completed {
        generation: u64,
        query: String,
        page: u32,
        result: Result<MoviePage, CatalogError>,
    },
}

pub struct SearchMachine<C: Catalog> {
    catalog: Arc<C>,
    debounce: Duration,
    state: SearchState,
    task: TaskSlot,
    event_tx: mpsc::Sender<SearchEvent>,
    event_rx: mpsc::Receiver<SearchEvent>,
    state_tx: watch::Sender<SearchState>,
}

impl<C: Catalog> SearchMachine<C> {
    pub fn new(catalog: Arc<C>) -> Self {
        Self::with_debounce(catalog, DEFAULT_DEBOUNCE)
    }

    pub fn with_debounce(catalog: Arc<C>, debounce: Duration) -> Self {
        let (event_tx, event_rx) = mpsc::channel(8);
        let (state_tx, _) = watch::channel(SearchState::default());
        Self {
            catalog,
            debounce,
            state: SearchState::default(),
            task: TaskSlot::default(),
            event_tx,
            event_rx,
            state_tx,
        }
    }

    pub fn state(&self) -> &SearchState {
        &self.state
    }

    pub fn subscribe(&self) -> watch::Receiver<SearchState> {
        self.state_tx.subscribe()
    }

    /// Search for `query` after the configured debounce delay.
    pub fn search(&mut self, query: &str, page: u32) -> bool {
        self.search_with_debounce(query, page, self.debounce)
    }

    /// Search for `query`, waiting `delay` for further input first.
    ///
    /// A blank query resets the machine immediately without a request. A
    /// query other than the tracked one, or page 1, starts a fresh search;
    /// otherwise `page` is fetched and appended. Asking for a later page of
    /// the tracked query once its last page is loaded does nothing. Returns
    /// whether a search was scheduled.
    pub fn search_with_debounce(&mut self, query: &str, page: u32, delay: Duration) -> bool {
        let query = query.trim();
        if query.is_empty() {
            tracing::debug!("Search query is blank, clearing results");
            self.clear_search_results();
            return false;
        }

        if query.chars().count() > MAX_SEARCH_QUERY_LENGTH {
            self.task.supersede();
            self.state.is_pending = false;
            self.state.is_loading = false;
            self.state.error = Some(format!(
                "Search query too long (max {} chars)",
                MAX_SEARCH_QUERY_LENGTH
            ));
            self.publish();
            return false;
        }

        if query == self.state.query && page > 1 && self.state.is_last_page {
            tracing::debug!(query = %query, page, "Already on last page for query, skipping");
            return false;
        }

        let fresh = query != self.state.query || page <= 1;
        let page = if fresh { 1 } else { page };
        let generation = self.task.supersede();
        self.state.is_pending = true;
        self.publish();

        let catalog = Arc::clone(&self.catalog);
        let tx = self.event_tx.clone();
        let query = query.to_string();

        tracing::debug!(query = %query, page, generation, delay_ms = delay.as_millis() as u64, "Scheduling search");

        self.task.spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            let dispatched = SearchEvent::Dispatched {
                generation,
                query: query.clone(),
                page,
                fresh,
            };
            if tx.send(dispatched).await.is_err() {
                tracing::warn!("Search receiver dropped before dispatch");
                return;
            }

            let result = catalog.search(&query, page).await;
            let completed = SearchEvent::Completed {
                generation,
                query,
                page,
                result,
            };
            if let Err(e) = tx.send(completed).await {
                tracing::warn!(error = %e, "Failed to deliver search result (receiver dropped)");
            }
        });
        true
    }

    /// Request the next page of the tracked query, without debouncing.
    ///
    /// Ignored while a scheduled search has not been sent yet, so a scroll
    /// during the debounce delay cannot displace the newer query.
    pub fn advance_page(&mut self) -> bool {
        if self.state.query.is_empty()
            || self.state.is_pending
            || self.state.is_loading
            || self.state.is_last_page
        {
            return false;
        }
        let query = self.state.query.clone();
        let next = self.state.page + 1;
        self.search_with_debounce(&query, next, Duration::ZERO)
    }

    /// Cancel any pending or running search and reset to the idle state.
    pub fn clear_search_results(&mut self) {
        self.task.supersede();
        self.state = SearchState::default();
        self.publish();
        tracing::debug!("Search results cleared");
    }

    /// Return the pending error message and clear it so it is shown once.
    pub fn take_error(&mut self) -> Option<String> {
        let error = self.state.error.take();
        if error.is_some() {
            self.publish();
        }
        error
    }

    pub async fn recv(&mut self) -> Option<SearchEvent> {
        self.event_rx.recv().await
    }

    pub fn handle_event(&mut self, event: SearchEvent) {
        match event {
            SearchEvent::Dispatched {
                generation,
                query,
                page,
                fresh,
            } => {
                if !self.task.is_current(generation) {
                    tracing::debug!(query = %query, generation, "Discarding stale search dispatch");
                    return;
                }
                if fresh {
                    self.state.movies = Arc::new(Vec::new());
                    self.state.is_last_page = false;
                    self.state.query = query;
                    tracing::debug!(query = %self.state.query, "New search initiated");
                }
                self.state.page = page;
                self.state.is_pending = false;
                self.state.is_loading = true;
                self.state.error = None;
                self.publish();
            }
            SearchEvent::Completed {
                generation,
                query,
                page,
                result,
            } => {
                if !self.task.is_current(generation) || query != self.state.query {
                    tracing::warn!(
                        query = %query,
                        tracked = %self.state.query,
                        generation,
                        "Discarding stale search result"
                    );
                    return;
                }

                self.task.finish();
                self.state.is_loading = false;

                match result {
                    Ok(found) => {
                        self.state.is_last_page = found.is_last(page);
                        self.state.movies = fold_page(&self.state.movies, page, found.results);
                        tracing::debug!(
                            query = %query,
                            page,
                            total = self.state.movies.len(),
                            last_page = self.state.is_last_page,
                            "Folded search page"
                        );
                    }
                    Err(e) => {
                        let message = if e.is_http() {
                            format!("Failed to search movies: {e}")
                        } else {
                            format!("Network or parsing error for search '{query}': {e}")
                        };
                        tracing::error!(query = %query, page, error = %e, "Search failed");
                        self.state.error = Some(message);
                        self.state.is_last_page = true;
                    }
                }
                self.publish();
            }
        }
    }

    /// Pump events until no search is pending or running.
    ///
    /// Includes waiting out the debounce delay of a pending search.
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
                        tracing::warn!(error = %e, "Search task ended abnormally");
                        self.state.is_pending = false;
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

    fn publish(&self) {
        self.state_tx.send_replace(self.state.clone());
    }
}
