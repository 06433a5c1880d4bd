//! HTTP routing for the image proxy.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, Uri};
use axum::response::Response;
use axum::routing::get;
use bytes::Bytes;
use edgepix_core::ProxyResponse;
use tower_http::catch_panic::CatchPanicLayer;

use crate::error::{WebError, panic_response};
use crate::proxy::{Engine, ProxyRequest};

/// Build the router. Every path is served by the proxy; `get` also answers
/// HEAD with the body dropped. A panicking handler still yields a 500.
pub fn router(engine: Arc<Engine>) -> Router {
    Router::new()
        .route("/", get(serve))
        .route("/{*path}", get(serve))
        .with_state(engine)
        .layer(CatchPanicLayer::custom(panic_response))
}

#[tracing::instrument(skip_all, fields(path = %uri.path()))]
async fn serve(State(engine): State<Arc<Engine>>, uri: Uri, headers: HeaderMap) -> Result<Response, WebError> {
    let request = ProxyRequest::new(&uri, &headers);
    let response = engine.handle(&request).await?;
    tracing::debug!(status = response.status().as_u16(), served_by = response.served_by(), "served");
    Ok(into_http(response))
}

pub fn into_http(response: ProxyResponse) -> Response {
    axum::http::Response::<Bytes>::from(response).map(Body::from)
}
