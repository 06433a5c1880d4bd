//! Origin URL construction.

use url::Url;

/// Error type for origin URL construction failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty origin host")]
    EmptyHost,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Build the URL of an origin request.
///
/// `path` is the already rewritten origin path and `query` the query string
/// to forward (without the leading `?`). The host is lowercased and no
/// fragment is ever attached.
pub fn origin_url(scheme: &str, host: &str, path: &str, query: Option<&str>) -> Result<Url, UrlError> {
    match scheme {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    let host = host.trim();
    if host.is_empty() {
        return Err(UrlError::EmptyHost);
    }

    let mut url = Url::parse(&format!("{scheme}://{}", host.to_lowercase()))
        .map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    url.set_path(path);
    url.set_query(query.filter(|q| !q.is_empty()));

    Ok(url)
}
