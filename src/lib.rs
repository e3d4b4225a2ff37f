//! Browse and search a movie catalog.
//!
//! - [`api`] - the catalog client and its wire types
//! - [`browse`] - category listing with incremental pagination
//! - [`search`] - debounced free-text search with pagination
//! - [`config`] - configuration file loading
//! - [`util`] - base URL validation and terminal text helpers
//!
//! The state machines never touch the network directly; they are generic
//! over [`api::Catalog`] and are handed a client by whoever assembles them.

pub mod api;
pub mod browse;
pub mod config;
mod machine;
pub mod search;
pub mod util;

pub use api::{Catalog, CatalogError, Category, Movie, MoviePage, TmdbClient};
pub use browse::{BrowseEvent, BrowseMachine, BrowseState};
pub use config::{Config, ConfigError};
pub use search::{SearchEvent, SearchMachine, SearchState};
