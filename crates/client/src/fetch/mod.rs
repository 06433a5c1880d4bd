//! HTTP fetch pipeline for image origins.
//!
//! - One shared reqwest client (connection pooling, rustls, redirect limit)
//! - The caller's `Accept` header is forwarded, `*/*` otherwise
//! - Any HTTP status is returned as a response; only transport failures
//!   are errors, since non-success origin answers are passed through
//! - The whole body is buffered once into [`Bytes`]

pub mod url;

use bytes::Bytes;
use reqwest::Url;
use reqwest::{Client, StatusCode, header};
use std::time::{Duration, Instant};

pub use self::url::{UrlError, origin_url};

use edgepix_core::Error;

/// Connection-level and framing headers that are never forwarded.
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
    "content-length",
];

/// Configuration for the origin client.
#[derive(Debug, Clone)]
pub struct OriginConfig {
    /// User agent string (default: "edgepix/0.1")
    pub user_agent: String,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for OriginConfig {
    fn default() -> Self {
        Self { user_agent: "edgepix/0.1".to_string(), timeout: Duration::from_millis(20000), max_redirects: 5 }
    }
}

/// Response from an origin fetch.
#[derive(Debug, Clone)]
pub struct OriginResponse {
    /// The URL requested
    pub url: Url,
    /// HTTP status code
    pub status: StatusCode,
    /// Content-Type header
    pub content_type: Option<String>,
    /// Response body bytes
    pub bytes: Bytes,
    /// Response headers
    pub headers: header::HeaderMap,
    /// Time taken to fetch in milliseconds
    pub fetch_ms: u64,
}

impl OriginResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Origin headers minus hop-by-hop headers, safe to send to the client.
    pub fn forwardable_headers(&self) -> header::HeaderMap {
        let mut headers = self.headers.clone();
        for name in HOP_BY_HOP {
            headers.remove(*name);
        }
        headers
    }
}

/// HTTP client for image origins.
#[derive(Debug, Clone)]
pub struct OriginClient {
    http: Client,
}

impl OriginClient {
    /// Create a new origin client with the given configuration.
    pub fn new(config: OriginConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::HttpError(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http })
    }

    /// Fetch an origin URL, returning status, headers and the buffered body.
    pub async fn fetch(&self, url: Url, accept: Option<&str>) -> Result<OriginResponse, Error> {
        let start = Instant::now();

        let response = self
            .http
            .get(url.clone())
            .header(header::ACCEPT, accept.unwrap_or("*/*"))
            .send()
            .await
            .map_err(|e| Error::HttpError(format!("network error: {}", e)))?;

        let status = response.status();
        let headers = response.headers().clone();

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::HttpError(format!("failed to read response: {}", e)))?;

        let content_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let fetch_ms = start.elapsed().as_millis() as u64;

        tracing::debug!(
            "fetched {} -> {} in {}ms ({} bytes)",
            url,
            status.as_u16(),
            fetch_ms,
            bytes.len()
        );

        Ok(OriginResponse { url, status, content_type, bytes, headers, fetch_ms })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::MockServer;

    fn client() -> OriginClient {
        OriginClient::new(OriginConfig::default()).unwrap()
    }

    #[test]
    fn test_origin_config_default() {
        let config = OriginConfig::default();
        assert_eq!(config.user_agent, "edgepix/0.1");
        assert_eq!(config.timeout, Duration::from_millis(20000));
        assert_eq!(config.max_redirects, 5);
    }

    #[test]
    fn test_forwardable_headers_strip_hop_by_hop() {
        let mut headers = header::HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, "image/png".parse().unwrap());
        headers.insert(header::CONNECTION, "keep-alive".parse().unwrap());
        headers.insert(header::TRANSFER_ENCODING, "chunked".parse().unwrap());
        headers.insert(header::ETAG, "\"v1\"".parse().unwrap());

        let response = OriginResponse {
            url: Url::parse("https://i0.wp.com/a.png").unwrap(),
            status: StatusCode::OK,
            content_type: Some("image/png".to_string()),
            bytes: Bytes::new(),
            headers,
            fetch_ms: 3,
        };

        let forwarded = response.forwardable_headers();
        assert!(forwarded.get(header::CONNECTION).is_none());
        assert!(forwarded.get(header::TRANSFER_ENCODING).is_none());
        assert_eq!(forwarded.get(header::ETAG).unwrap(), "\"v1\"");
        assert_eq!(forwarded.get(header::CONTENT_TYPE).unwrap(), "image/png");
    }

    #[tokio::test]
    async fn test_fetch_forwards_accept() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method("GET").path("/avatar/abc.png").header("accept", "image/avif");
                then.status(200).header("content-type", "image/avif").body("avif-bytes");
            })
            .await;

        let url = Url::parse(&server.url("/avatar/abc.png")).unwrap();
        let response = client().fetch(url, Some("image/avif")).await.unwrap();

        mock.assert_async().await;
        assert!(response.is_success());
        assert_eq!(response.content_type.as_deref(), Some("image/avif"));
        assert_eq!(response.bytes.as_ref(), b"avif-bytes");
    }

    #[tokio::test]
    async fn test_fetch_defaults_accept_to_any() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method("GET").path("/a.jpg").header("accept", "*/*");
                then.status(200).body("jpeg");
            })
            .await;

        let url = Url::parse(&server.url("/a.jpg")).unwrap();
        let response = client().fetch(url, None).await.unwrap();

        mock.assert_async().await;
        assert_eq!(response.content_type, None);
    }

    #[tokio::test]
    async fn test_fetch_returns_non_success_status() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method("GET").path("/missing.jpg");
                then.status(404).body("not here");
            })
            .await;

        let url = Url::parse(&server.url("/missing.jpg")).unwrap();
        let response = client().fetch(url, None).await.unwrap();

        assert!(!response.is_success());
        assert_eq!(response.status, StatusCode::NOT_FOUND);
        assert_eq!(response.bytes.as_ref(), b"not here");
    }

    #[tokio::test]
    async fn test_fetch_transport_error() {
        let url = Url::parse("http://127.0.0.1:1/a.jpg").unwrap();
        let result = client().fetch(url, None).await;
        assert!(matches!(result, Err(Error::HttpError(_))));
    }
}
