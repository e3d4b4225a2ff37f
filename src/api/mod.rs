//! Catalog client: typed access to the movie catalog REST service.
//!
//! - [`types`] - wire types (`Movie`, `MoviePage`, `Category`, `Genre`)
//! - [`client`] - the HTTP implementation, [`TmdbClient`]
//!
//! State machines talk to the service only through the [`Catalog`] trait so
//! tests can substitute a scripted stub for the network.

mod client;
mod types;

pub use client::{
    CatalogError, ClientConfig, TmdbClient, DEFAULT_BASE_URL, DEFAULT_LANGUAGE, DEFAULT_TIMEOUT,
};
pub use types::{
    genre_name, image_url, Category, Genre, Movie, MoviePage, ParseCategoryError,
    BACKDROP_BASE_URL, POSTER_BASE_URL,
};

use std::future::Future;

/// Read operations against the movie catalog.
///
/// Every call is a single attempt: no retries happen at this layer.
pub trait Catalog: Send + Sync + 'static {
    /// Fetch one page (1-based) of a category listing.
    fn fetch_category(
        &self,
        category: Category,
        page: u32,
    ) -> impl Future<Output = Result<MoviePage, CatalogError>> + Send;

    /// Fetch a single movie by its identifier.
    fn fetch_by_id(&self, id: u64) -> impl Future<Output = Result<Movie, CatalogError>> + Send;

    /// Fetch one page (1-based) of free-text search results.
    fn search(
        &self,
        query: &str,
        page: u32,
    ) -> impl Future<Output = Result<MoviePage, CatalogError>> + Send;
}
