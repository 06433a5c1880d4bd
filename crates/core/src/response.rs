//! The response value shared by every tier.
//!
//! A [`ProxyResponse`] is built once and then only cloned: the client gets
//! one handle and the edge cache another. The body is an immutable
//! [`Bytes`] buffer, so clones share the same allocation.

use bytes::Bytes;
use http::header::{CACHE_CONTROL, CONTENT_TYPE, LOCATION, VARY};
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};

use crate::Error;

/// Cache directive attached to every image served from a tier.
pub const LONG_LIVED: &str = "public, max-age=31536000";

/// Directive for responses that must never be shared between callers.
pub const NO_STORE: &str = "no-store";

/// Content type used when neither the origin nor the store supplies one.
pub const DEFAULT_CONTENT_TYPE: &str = "image/webp";

/// Provenance header naming the tier that answered.
pub static X_SERVED_BY: HeaderName = HeaderName::from_static("x-served-by");

/// Which tier produced a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    EdgeCache,
    ObjectStore,
    FirstLoad,
}

impl Provenance {
    pub fn marker(self, service: &str) -> String {
        match self {
            Provenance::EdgeCache => format!("Edge Cache & {service}"),
            Provenance::ObjectStore => format!("Object Store & {service}"),
            Provenance::FirstLoad => format!("Edge Proxy & {service} (first load)"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProxyResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl ProxyResponse {
    pub fn new(status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        Self { status, headers, body }
    }

    /// A long-lived, shareable image response.
    ///
    /// Starts from `base` (origin headers, or empty for stored objects) and
    /// overrides content type, cache directive, `Vary` and provenance.
    pub fn image(
        status: StatusCode, base: HeaderMap, content_type: &str, body: Bytes, provenance: Provenance, service: &str,
    ) -> Result<Self, Error> {
        let mut headers = base;
        headers.insert(CONTENT_TYPE, HeaderValue::from_str(content_type)?);
        headers.insert(CACHE_CONTROL, HeaderValue::from_static(LONG_LIVED));
        headers.insert(VARY, HeaderValue::from_static("Accept"));
        headers.insert(X_SERVED_BY.clone(), HeaderValue::from_str(&provenance.marker(service))?);
        Ok(Self { status, headers, body })
    }

    /// Plain-text response that shared caches must not keep.
    pub fn uncacheable(status: StatusCode, message: impl Into<String>) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
        headers.insert(CACHE_CONTROL, HeaderValue::from_static(NO_STORE));
        Self { status, headers, body: Bytes::from(message.into()) }
    }

    /// 302 redirect to `location`.
    pub fn redirect(location: &str) -> Result<Self, Error> {
        let mut headers = HeaderMap::new();
        headers.insert(LOCATION, HeaderValue::from_str(location)?);
        headers.insert(CACHE_CONTROL, HeaderValue::from_static(NO_STORE));
        Ok(Self { status: StatusCode::FOUND, headers, body: Bytes::new() })
    }

    /// Re-tag a cached response with a new provenance marker.
    pub fn with_provenance(self, provenance: Provenance, service: &str) -> Result<Self, Error> {
        let mut headers = self.headers;
        headers.insert(X_SERVED_BY.clone(), HeaderValue::from_str(&provenance.marker(service))?);
        Ok(Self { headers, ..self })
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn header_str(&self, name: impl http::header::AsHeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header_str(CONTENT_TYPE)
    }

    pub fn served_by(&self) -> Option<&str> {
        self.header_str(&X_SERVED_BY)
    }
}

impl From<ProxyResponse> for http::Response<Bytes> {
    fn from(value: ProxyResponse) -> Self {
        let mut response = http::Response::new(value.body);
        *response.status_mut() = value.status;
        *response.headers_mut() = value.headers;
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provenance_markers() {
        assert_eq!(Provenance::EdgeCache.marker("Gravatar"), "Edge Cache & Gravatar");
        assert_eq!(Provenance::ObjectStore.marker("Artalk & Jetpack"), "Object Store & Artalk & Jetpack");
        assert_eq!(Provenance::FirstLoad.marker("Jetpack"), "Edge Proxy & Jetpack (first load)");
    }

    #[test]
    fn test_image_overrides_headers() {
        let mut base = HeaderMap::new();
        base.insert(CACHE_CONTROL, HeaderValue::from_static("max-age=60"));
        base.insert("etag", HeaderValue::from_static("\"abc\""));

        let response = ProxyResponse::image(
            StatusCode::OK,
            base,
            "image/png",
            Bytes::from_static(b"png"),
            Provenance::FirstLoad,
            "Gravatar",
        )
        .unwrap();

        assert_eq!(response.content_type(), Some("image/png"));
        assert_eq!(response.header_str(CACHE_CONTROL), Some(LONG_LIVED));
        assert_eq!(response.header_str(VARY), Some("Accept"));
        assert_eq!(response.header_str("etag"), Some("\"abc\""));
        assert_eq!(response.served_by(), Some("Edge Proxy & Gravatar (first load)"));
    }

    #[test]
    fn test_uncacheable() {
        let response = ProxyResponse::uncacheable(StatusCode::FORBIDDEN, "nope");
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(response.header_str(CACHE_CONTROL), Some(NO_STORE));
        assert_eq!(response.body().as_ref(), b"nope");
    }

    #[test]
    fn test_redirect() {
        let response = ProxyResponse::redirect("/x.jpg?w=1").unwrap();
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.header_str(LOCATION), Some("/x.jpg?w=1"));
    }

    #[test]
    fn test_with_provenance_keeps_body() {
        let response = ProxyResponse::image(
            StatusCode::OK,
            HeaderMap::new(),
            DEFAULT_CONTENT_TYPE,
            Bytes::from_static(b"img"),
            Provenance::ObjectStore,
            "Jetpack",
        )
        .unwrap()
        .with_provenance(Provenance::EdgeCache, "Jetpack")
        .unwrap();

        assert_eq!(response.served_by(), Some("Edge Cache & Jetpack"));
        assert_eq!(response.body().as_ref(), b"img");
        assert_eq!(response.content_type(), Some(DEFAULT_CONTENT_TYPE));
    }

    #[test]
    fn test_into_http_response() {
        let response: http::Response<Bytes> = ProxyResponse::uncacheable(StatusCode::NOT_FOUND, "gone").into();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.body().as_ref(), b"gone");
    }
}
