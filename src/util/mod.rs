//! Utility functions shared by the client and the command-line front end.
//!
//! - **URL validation**: the catalog base URL must be HTTPS (loopback excepted)
//! - **Text processing**: Unicode-aware width, truncation and sanitizing of
//!   service-provided text for terminal output

mod text;
mod url_validator;

pub use text::{display_width, pad_to_width, sanitize_line, truncate_to_width};
pub use url_validator::{validate_base_url, UrlValidationError};

/// Maximum accepted search query length, in characters.
pub const MAX_SEARCH_QUERY_LENGTH: usize = 256;
