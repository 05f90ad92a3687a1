//! Backend URL handling.
//!
//! Endpoint paths are joined onto a user-supplied base URL, which may carry
//! a path prefix (e.g. behind a reverse proxy) and stray trailing slashes.

use reqwest::Url;

/// Normalize a base URL by trimming whitespace and trailing slashes
///
/// # Examples
///
/// ```
/// use flames::utils::url::normalize_base_url;
///
/// assert_eq!(normalize_base_url("http://localhost:8000"), "http://localhost:8000");
/// assert_eq!(normalize_base_url(" http://localhost:8000/ "), "http://localhost:8000");
/// assert_eq!(normalize_base_url("https://dev.example.com/flames///"), "https://dev.example.com/flames");
/// ```
pub fn normalize_base_url(base_url: &str) -> String {
    base_url.trim().trim_end_matches('/').to_string()
}

/// Join an endpoint path onto a base URL without doubling slashes
///
/// # Examples
///
/// ```
/// use flames::utils::url::construct_api_url;
///
/// assert_eq!(
///     construct_api_url("http://localhost:8000/", "/api/chat/stream"),
///     "http://localhost:8000/api/chat/stream"
/// );
/// ```
pub fn construct_api_url(base_url: &str, endpoint: &str) -> String {
    let normalized_base = normalize_base_url(base_url);
    let endpoint = endpoint.trim_start_matches('/');
    format!("{normalized_base}/{endpoint}")
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendUrlError {
    #[error("invalid backend URL {url:?}: {reason}")]
    Invalid { url: String, reason: String },
    #[error("invalid backend URL {url:?}: unsupported scheme {scheme:?}")]
    UnsupportedScheme { url: String, scheme: String },
}

/// Check that a backend URL is an absolute http(s) URL, returning its
/// normalized form.
pub fn validate_backend_url(base_url: &str) -> Result<String, BackendUrlError> {
    let normalized = normalize_base_url(base_url);
    let parsed = Url::parse(&normalized).map_err(|err| BackendUrlError::Invalid {
        url: normalized.clone(),
        reason: err.to_string(),
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(normalized),
        other => Err(BackendUrlError::UnsupportedScheme {
            scheme: other.to_string(),
            url: normalized,
        }),
    }
}
