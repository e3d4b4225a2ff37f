use super::types::{Category, Movie, MoviePage};
use super::Catalog;
use crate::util::{validate_base_url, UrlValidationError};
use futures::StreamExt;
use reqwest::redirect::Policy;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Default catalog service endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.themoviedb.org/3/";
pub const DEFAULT_LANGUAGE: &str = "en-US";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const MAX_RESPONSE_SIZE: usize = 5 * 1024 * 1024; // 5MB

/// Failure of a single catalog request.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The service answered with a non-2xx status.
    #[error("{status} - {body}")]
    Http { status: u16, body: String },
    /// Transport failure, with the request URL stripped.
    #[error("Request failed: {0}")]
    Network(reqwest::Error),
    #[error("Request timed out after {0}s")]
    Timeout(u64),
    #[error("Malformed response: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Response too large (exceeds {0} bytes)")]
    ResponseTooLarge(usize),
    #[error("Invalid UTF-8 in response")]
    InvalidUtf8,
    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(#[from] UrlValidationError),
    #[error("No API key configured (set TMDB_API_KEY or api_key in config.toml)")]
    MissingApiKey,
}

impl CatalogError {
    fn network(e: reqwest::Error) -> Self {
        CatalogError::Network(e.without_url())
    }

    /// True when the service was reached and rejected the request.
    pub fn is_http(&self) -> bool {
        matches!(self, CatalogError::Http { .. })
    }
}

/// Settings for constructing a [`TmdbClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub api_key: SecretString,
    pub language: String,
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: SecretString::from(api_key.into()),
            language: DEFAULT_LANGUAGE.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

/// HTTP implementation of [`Catalog`] against the TMDB v3 API.
///
/// Constructed explicitly and handed to whichever state machines need it;
/// cloning shares the underlying connection pool.
#[derive(Clone)]
pub struct TmdbClient {
    http: reqwest::Client,
    base_url: Url,
    api_key: SecretString,
    language: String,
    timeout: Duration,
}

impl std::fmt::Debug for TmdbClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TmdbClient")
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &"[REDACTED]")
            .field("language", &self.language)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl TmdbClient {
    pub fn new(config: ClientConfig) -> Result<Self, CatalogError> {
        if config.api_key.expose_secret().trim().is_empty() {
            return Err(CatalogError::MissingApiKey);
        }
        let base_url = validate_base_url(&config.base_url)?;

        let http = reqwest::Client::builder()
            .user_agent(concat!("cinestudio/", env!("CARGO_PKG_VERSION")))
            .redirect(Policy::limited(3))
            .build()
            .map_err(CatalogError::network)?;

        Ok(Self {
            http,
            base_url,
            api_key: config.api_key,
            language: config.language,
            timeout: config.timeout,
        })
    }

    /// Build the request URL: `base/path?api_key=..&<params>`.
    ///
    /// Parameter values are percent-encoded by the serializer, so search text
    /// is passed through verbatim.
    fn endpoint(&self, path: &str, params: &[(&str, String)]) -> Result<Url, CatalogError> {
        let mut url = self
            .base_url
            .join(path)
            .map_err(|e| CatalogError::InvalidBaseUrl(UrlValidationError::InvalidUrl(e)))?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("api_key", self.api_key.expose_secret());
            for (key, value) in params {
                query.append_pair(key, value);
            }
        }
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, CatalogError> {
        let url = self.endpoint(path, params)?;

        // The URL carries the API key; only the path is logged
        tracing::debug!(path = %path, "Catalog request");

        let body = tokio::time::timeout(self.timeout, self.execute(url))
            .await
            .map_err(|_| CatalogError::Timeout(self.timeout.as_secs()))??;

        serde_json::from_str(&body).map_err(|e| {
            tracing::warn!(path = %path, error = %e, "Failed to parse catalog response");
            CatalogError::Parse(e)
        })
    }

    async fn execute(&self, url: Url) -> Result<String, CatalogError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(CatalogError::network)?;
        let status = response.status();

        if !status.is_success() {
            let body = read_limited_text(response, MAX_RESPONSE_SIZE)
                .await
                .map(|b| b.trim().to_string())
                .unwrap_or_default();
            let body = if body.is_empty() {
                "Unknown error".to_string()
            } else {
                body
            };
            tracing::debug!(status = status.as_u16(), "Catalog responded with error status");
            return Err(CatalogError::Http {
                status: status.as_u16(),
                body,
            });
        }

        read_limited_text(response, MAX_RESPONSE_SIZE).await
    }

    fn list_params(&self, page: u32) -> Vec<(&'static str, String)> {
        vec![
            ("language", self.language.clone()),
            ("page", page.max(1).to_string()),
        ]
    }
}

impl Catalog for TmdbClient {
    async fn fetch_category(&self, category: Category, page: u32) -> Result<MoviePage, CatalogError> {
        self.get_json(category.path(), &self.list_params(page)).await
    }

    async fn fetch_by_id(&self, id: u64) -> Result<Movie, CatalogError> {
        self.get_json(&format!("movie/{id}"), &[]).await
    }

    async fn search(&self, query: &str, page: u32) -> Result<MoviePage, CatalogError> {
        let mut params = vec![("query", query.to_string())];
        params.extend(self.list_params(page));
        self.get_json("search/movie", &params).await
    }
}

async fn read_limited_text(
    response: reqwest::Response,
    limit: usize,
) -> Result<String, CatalogError> {
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(CatalogError::ResponseTooLarge(limit));
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(CatalogError::network)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(CatalogError::ResponseTooLarge(limit));
        }
        bytes.extend_from_slice(&chunk);
    }

    String::from_utf8(bytes).map_err(|_| CatalogError::InvalidUtf8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PAGE_JSON: &str = r#"{
        "page": 1,
        "results": [
            {"id": 1, "title": "One", "vote_average": 6.5},
            {"id": 2, "title": "Two", "vote_average": 7.1}
        ],
        "total_pages": 3,
        "total_results": 6
    }"#;

    fn client_for(server: &MockServer) -> TmdbClient {
        TmdbClient::new(ClientConfig::new("test-key").with_base_url(server.uri())).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_category_sends_params() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/movie/top_rated"))
            .and(query_param("api_key", "test-key"))
            .and(query_param("language", "en-US"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_string(PAGE_JSON))
            .expect(1)
            .mount(&server)
            .await;

        let page = client_for(&server)
            .fetch_category(Category::TopRated, 2)
            .await
            .unwrap();
        assert_eq!(page.results.len(), 2);
        assert_eq!(page.total_pages, 3);
    }

    #[tokio::test]
    async fn test_search_encodes_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search/movie"))
            .and(query_param("query", "star wars & co"))
            .and(query_param("page", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_string(PAGE_JSON))
            .expect(1)
            .mount(&server)
            .await;

        let page = client_for(&server).search("star wars & co", 1).await.unwrap();
        assert_eq!(page.results[1].title, "Two");
    }

    #[tokio::test]
    async fn test_fetch_by_id() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/movie/550"))
            .and(query_param("api_key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"id": 550, "title": "Fight Club", "vote_average": 8.4,
                    "genres": [{"id": 18, "name": "Drama"}]}"#,
            ))
            .mount(&server)
            .await;

        let movie = client_for(&server).fetch_by_id(550).await.unwrap();
        assert_eq!(movie.id, 550);
        assert_eq!(movie.genre_names(), vec!["Drama"]);
    }

    #[tokio::test]
    async fn test_http_error_carries_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Invalid API key"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .fetch_category(Category::Popular, 1)
            .await
            .unwrap_err();
        match &err {
            CatalogError::Http { status, body } => {
                assert_eq!(*status, 401);
                assert_eq!(body, "Invalid API key");
            }
            other => panic!("expected Http error, got {other:?}"),
        }
        assert_eq!(err.to_string(), "401 - Invalid API key");
    }

    #[tokio::test]
    async fn test_http_error_empty_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = client_for(&server).fetch_by_id(1).await.unwrap_err();
        assert_eq!(err.to_string(), "503 - Unknown error");
    }

    #[tokio::test]
    async fn test_malformed_body_is_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let err = client_for(&server).search("x", 1).await.unwrap_err();
        assert!(matches!(err, CatalogError::Parse(_)));
    }

    #[tokio::test]
    async fn test_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(PAGE_JSON)
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let mut config = ClientConfig::new("k").with_base_url(server.uri());
        config.timeout = Duration::from_millis(100);
        let client = TmdbClient::new(config).unwrap();

        let err = client.fetch_category(Category::Upcoming, 1).await.unwrap_err();
        assert!(matches!(err, CatalogError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_transport_error_hides_api_key() {
        // Nothing listens on port 1
        let client =
            TmdbClient::new(ClientConfig::new("sekrit-key-123").with_base_url("http://127.0.0.1:1/"))
                .unwrap();

        let err = client.fetch_category(Category::Popular, 1).await.unwrap_err();
        assert!(matches!(err, CatalogError::Network(_)));
        assert!(!err.to_string().contains("sekrit-key-123"));
        assert!(!format!("{err:?}").contains("sekrit-key-123"));
    }

    #[test]
    fn test_missing_api_key_rejected() {
        let result = TmdbClient::new(ClientConfig::new("  "));
        assert!(matches!(result, Err(CatalogError::MissingApiKey)));
    }

    #[test]
    fn test_insecure_base_url_rejected() {
        let result =
            TmdbClient::new(ClientConfig::new("k").with_base_url("http://api.themoviedb.org/3/"));
        assert!(matches!(result, Err(CatalogError::InvalidBaseUrl(_))));
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let client = TmdbClient::new(ClientConfig::new("super-secret-key")).unwrap();
        let debug = format!("{client:?}");
        assert!(!debug.contains("super-secret-key"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let client = TmdbClient::new(ClientConfig::new("k")).unwrap();
        let url = client
            .endpoint("movie/popular", &[("page", "3".to_string())])
            .unwrap();
        assert_eq!(url.path(), "/3/movie/popular");
        assert_eq!(url.query(), Some("api_key=k&page=3"));
    }
}
