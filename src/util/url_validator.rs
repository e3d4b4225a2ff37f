use std::net::IpAddr;
use thiserror::Error;
use url::Url;

/// Errors that can occur while validating the catalog service base URL.
#[derive(Error, Debug)]
pub enum UrlValidationError {
    /// The URL string could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// The URL uses a scheme other than http or https.
    #[error("Unsupported scheme: {0} (only http/https allowed)")]
    UnsupportedScheme(String),
    /// Plain HTTP to a remote host would expose the API key.
    #[error("Insecure base URL: HTTPS required (except localhost for testing)")]
    Insecure,
    /// The URL carries a query string or fragment, which would be clobbered.
    #[error("Base URL must not contain a query or fragment")]
    HasQuery,
}

/// Validates the base URL the catalog client sends requests to.
///
/// Rejects anything but HTTPS, with plain HTTP allowed only for loopback
/// hosts (mock servers in tests). The returned URL always ends in `/` so
/// relative endpoint paths join underneath it instead of replacing the last
/// segment.
///
/// # Examples
///
/// ```
/// use cinestudio::util::validate_base_url;
///
/// let url = validate_base_url("https://api.themoviedb.org/3").unwrap();
/// assert_eq!(url.as_str(), "https://api.themoviedb.org/3/");
///
/// assert!(validate_base_url("http://api.themoviedb.org/3/").is_err());
/// assert!(validate_base_url("http://127.0.0.1:8080/").is_ok());
/// ```
pub fn validate_base_url(url_str: &str) -> Result<Url, UrlValidationError> {
    let mut url = Url::parse(url_str.trim())?;

    match url.scheme() {
        "https" => {}
        "http" => {
            if !is_loopback(&url) {
                return Err(UrlValidationError::Insecure);
            }
            tracing::warn!(base_url = %url, "Using non-HTTPS catalog base URL (localhost only)");
        }
        scheme => return Err(UrlValidationError::UnsupportedScheme(scheme.to_owned())),
    }

    if url.query().is_some() || url.fragment().is_some() {
        return Err(UrlValidationError::HasQuery);
    }

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }

    Ok(url)
}

fn is_loopback(url: &Url) -> bool {
    match url.host_str() {
        Some("localhost") => true,
        Some(host) => host
            .trim_start_matches('[')
            .trim_end_matches(']')
            .parse::<IpAddr>()
            .is_ok_and(|ip| ip.is_loopback()),
        None => false,
    }
}
