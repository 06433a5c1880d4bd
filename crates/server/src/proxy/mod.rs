//! Tiered image proxy.
//!
//! Request flow: purge (when `nocache` is present), referer guard, route
//! match, cache key, then edge cache, durable store and origin in that
//! order. Fills are handed to the [`BackfillWriter`] and never delay the
//! response.

pub mod backfill;
pub mod engine;
pub mod purge;

use axum::http::{HeaderMap, HeaderValue, Uri, header};

use edgepix_core::key;

pub use backfill::BackfillWriter;
pub use engine::Engine;

/// The parts of an inbound request the proxy looks at.
#[derive(Debug, Clone)]
pub struct ProxyRequest {
    path: String,
    query: Option<String>,
    accept: Option<HeaderValue>,
    referer: Option<HeaderValue>,
}

impl ProxyRequest {
    pub fn new(uri: &Uri, headers: &HeaderMap) -> Self {
        Self {
            path: uri.path().to_string(),
            query: uri.query().filter(|q| !q.is_empty()).map(str::to_string),
            accept: headers.get(header::ACCEPT).cloned(),
            referer: headers.get(header::REFERER).cloned(),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Raw query string, `None` when absent or empty.
    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    pub fn accept(&self) -> Option<&str> {
        self.accept.as_ref().and_then(|v| v.to_str().ok())
    }

    pub fn referer(&self) -> Option<&HeaderValue> {
        self.referer.as_ref()
    }

    /// Edge cache identity of this request.
    pub fn identity(&self) -> String {
        key::request_identity(&self.path, self.query())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(uri: &str) -> ProxyRequest {
        ProxyRequest::new(&uri.parse().unwrap(), &HeaderMap::new())
    }

    #[test]
    fn test_empty_query_is_none() {
        assert_eq!(request("/a.jpg").query(), None);
        assert_eq!(request("/a.jpg?").query(), None);
        assert_eq!(request("/a.jpg?w=1").query(), Some("w=1"));
    }

    #[test]
    fn test_identity_keeps_control_params() {
        assert_eq!(request("/a.jpg?debug&w=1").identity(), "/a.jpg?debug&w=1");
        assert_eq!(request("/a.jpg").identity(), "/a.jpg");
    }

    #[test]
    fn test_headers_captured() {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static("image/avif,image/webp"));
        headers.insert(header::REFERER, HeaderValue::from_static("https://bibica.net/"));

        let request = ProxyRequest::new(&"/a.jpg".parse().unwrap(), &headers);
        assert_eq!(request.accept(), Some("image/avif,image/webp"));
        assert_eq!(request.referer().unwrap(), "https://bibica.net/");
    }
}
