use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Base path for poster images (500px wide rendition).
pub const POSTER_BASE_URL: &str = "https://image.tmdb.org/t/p/w500/";
/// Base path for backdrop images (1280px wide rendition).
pub const BACKDROP_BASE_URL: &str = "https://image.tmdb.org/t/p/w1280/";

// ============================================================================
// Category
// ============================================================================

/// One of the four fixed catalog listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    #[default]
    Popular,
    TopRated,
    Upcoming,
    NowPlaying,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Popular,
        Category::TopRated,
        Category::Upcoming,
        Category::NowPlaying,
    ];

    /// Path relative to the API base URL.
    pub fn path(self) -> &'static str {
        match self {
            Category::Popular => "movie/popular",
            Category::TopRated => "movie/top_rated",
            Category::Upcoming => "movie/upcoming",
            Category::NowPlaying => "movie/now_playing",
        }
    }

    /// Spelling used in config files and on the command line.
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Popular => "popular",
            Category::TopRated => "top_rated",
            Category::Upcoming => "upcoming",
            Category::NowPlaying => "now_playing",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Category::Popular => "Popular",
            Category::TopRated => "Top Rated",
            Category::Upcoming => "Upcoming",
            Category::NowPlaying => "Now Playing",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown category '{0}' (expected popular, top_rated, upcoming or now_playing)")]
pub struct ParseCategoryError(pub String);

impl FromStr for Category {
    type Err = ParseCategoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Accept both "top_rated" and "top-rated"
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "popular" => Ok(Category::Popular),
            "top_rated" => Ok(Category::TopRated),
            "upcoming" => Ok(Category::Upcoming),
            "now_playing" => Ok(Category::NowPlaying),
            _ => Err(ParseCategoryError(s.to_string())),
        }
    }
}

// ============================================================================
// Genre
// ============================================================================

/// A movie genre as returned by the detail endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genre {
    pub id: u32,
    pub name: String,
}

/// The catalog's fixed movie genre identifiers.
///
/// List and search responses only carry `genre_ids`, so names are resolved
/// locally.
const GENRE_NAMES: &[(u32, &str)] = &[
    (28, "Action"),
    (12, "Adventure"),
    (16, "Animation"),
    (35, "Comedy"),
    (80, "Crime"),
    (99, "Documentary"),
    (18, "Drama"),
    (10751, "Family"),
    (14, "Fantasy"),
    (36, "History"),
    (27, "Horror"),
    (10402, "Music"),
    (9648, "Mystery"),
    (10749, "Romance"),
    (878, "Science Fiction"),
    (10770, "TV Movie"),
    (53, "Thriller"),
    (10752, "War"),
    (37, "Western"),
];

/// Look up the display name for a genre identifier.
pub fn genre_name(id: u32) -> Option<&'static str> {
    GENRE_NAMES
        .iter()
        .find(|(gid, _)| *gid == id)
        .map(|(_, name)| *name)
}

// ============================================================================
// Movie
// ============================================================================

/// A single catalog entry.
///
/// Identity is the `id`: two movies are the same entry iff their ids match,
/// regardless of the other fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Movie {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub backdrop_path: Option<String>,
    /// Free text from the service; not guaranteed to be a valid date.
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub vote_average: f64,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub genre_ids: Option<Vec<u32>>,
    /// Only present on detail responses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genres: Option<Vec<Genre>>,
}

impl PartialEq for Movie {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Movie {}

impl Movie {
    pub fn poster_url(&self) -> Option<String> {
        image_url(POSTER_BASE_URL, self.poster_path.as_deref())
    }

    pub fn backdrop_url(&self) -> Option<String> {
        image_url(BACKDROP_BASE_URL, self.backdrop_path.as_deref())
    }

    /// Rating with one decimal place, e.g. `"7.3/10"`.
    pub fn formatted_rating(&self) -> String {
        format!("{:.1}/10", self.vote_average)
    }

    /// Year of release, when the date starts with a plausible four-digit year.
    pub fn release_year(&self) -> Option<i32> {
        let date = self.release_date.as_deref()?.trim();
        if let Ok(parsed) = chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d") {
            return Some(chrono::Datelike::year(&parsed));
        }
        date.get(..4)
            .filter(|y| y.chars().all(|c| c.is_ascii_digit()))
            .and_then(|y| y.parse().ok())
    }

    /// Genre names from the detail `genres` list, falling back to `genre_ids`.
    pub fn genre_names(&self) -> Vec<String> {
        if let Some(genres) = &self.genres {
            return genres.iter().map(|g| g.name.clone()).collect();
        }
        self.genre_ids
            .iter()
            .flatten()
            .filter_map(|id| genre_name(*id))
            .map(str::to_string)
            .collect()
    }
}

/// Join a base image path with a relative path from the service.
///
/// The service returns paths with a leading slash while the bases end in one,
/// so the duplicate is dropped. Absent or empty paths yield no URL.
pub fn image_url(base: &str, path: Option<&str>) -> Option<String> {
    let path = path?.trim();
    if path.is_empty() {
        return None;
    }
    Some(format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    ))
}

// ============================================================================
// Page
// ============================================================================

/// One page of list or search results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoviePage {
    pub page: u32,
    #[serde(default)]
    pub results: Vec<Movie>,
    #[serde(default = "default_total_pages")]
    pub total_pages: u32,
    #[serde(default)]
    pub total_results: u64,
}

fn default_total_pages() -> u32 {
    1
}

impl MoviePage {
    /// True when `page` is at or past the service-reported page count.
    pub fn is_last(&self, page: u32) -> bool {
        page >= self.total_pages
    }
}
