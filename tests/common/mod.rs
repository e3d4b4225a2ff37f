//! Scripted in-memory catalog shared by the integration tests.

#![allow(dead_code)]

use cinestudio::api::{Catalog, CatalogError, Category, Movie, MoviePage};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

/// A request the stub received, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Category(Category, u32),
    ById(u64),
    Search(String, u32),
}

/// What the stub answers for a scripted request.
#[derive(Debug, Clone)]
pub enum Reply {
    Page(MoviePage),
    Http(u16, String),
    Timeout,
}

impl Reply {
    fn into_result(self) -> Result<MoviePage, CatalogError> {
        match self {
            Reply::Page(page) => Ok(page),
            Reply::Http(status, body) => Err(CatalogError::Http { status, body }),
            Reply::Timeout => Err(CatalogError::Timeout(30)),
        }
    }
}

/// Answers from scripts keyed by request; unscripted requests get an empty
/// single page.
#[derive(Default)]
pub struct ScriptedCatalog {
    categories: Mutex<HashMap<(Category, u32), Reply>>,
    searches: Mutex<HashMap<(String, u32), Reply>>,
    movies: Mutex<HashMap<u64, Movie>>,
    search_delays: Mutex<HashMap<String, Duration>>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedCatalog {
    pub fn script_category(&self, category: Category, page: u32, reply: Reply) {
        self.categories.lock().unwrap().insert((category, page), reply);
    }

    pub fn script_search(&self, query: &str, page: u32, reply: Reply) {
        self.searches
            .lock()
            .unwrap()
            .insert((query.to_string(), page), reply);
    }

    pub fn script_movie(&self, movie: Movie) {
        self.movies.lock().unwrap().insert(movie.id, movie);
    }

    /// Make searches for `query` take `delay` before answering.
    pub fn delay_search(&self, query: &str, delay: Duration) {
        self.search_delays
            .lock()
            .unwrap()
            .insert(query.to_string(), delay);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

impl Catalog for ScriptedCatalog {
    async fn fetch_category(&self, category: Category, page: u32) -> Result<MoviePage, CatalogError> {
        self.record(Call::Category(category, page));
        let reply = self.categories.lock().unwrap().get(&(category, page)).cloned();
        reply.unwrap_or_else(|| Reply::Page(page_of(page, &[], 1))).into_result()
    }

    async fn fetch_by_id(&self, id: u64) -> Result<Movie, CatalogError> {
        self.record(Call::ById(id));
        let movie = self.movies.lock().unwrap().get(&id).cloned();
        movie.ok_or_else(|| CatalogError::Http {
            status: 404,
            body: "The resource you requested could not be found.".to_string(),
        })
    }

    async fn search(&self, query: &str, page: u32) -> Result<MoviePage, CatalogError> {
        self.record(Call::Search(query.to_string(), page));
        let delay = self.search_delays.lock().unwrap().get(query).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let reply = self
            .searches
            .lock()
            .unwrap()
            .get(&(query.to_string(), page))
            .cloned();
        reply.unwrap_or_else(|| Reply::Page(page_of(page, &[], 1))).into_result()
    }
}

pub fn movie(id: u64) -> Movie {
    Movie {
        id,
        title: format!("Movie {id}"),
        poster_path: Some(format!("/poster{id}.jpg")),
        backdrop_path: None,
        release_date: Some("2023-06-01".to_string()),
        vote_average: 6.8,
        overview: Some("Overview".to_string()),
        genre_ids: Some(vec![28]),
        genres: None,
    }
}

pub fn page_of(page: u32, ids: &[u64], total_pages: u32) -> MoviePage {
    MoviePage {
        page,
        results: ids.iter().map(|&id| movie(id)).collect(),
        total_pages,
        total_results: ids.len() as u64,
    }
}

pub fn ids(movies: &[Movie]) -> Vec<u64> {
    movies.iter().map(|m| m.id).collect()
}
