//! HTTP-facing errors for the edgepix server.
//!
//! Every error becomes a short plain-text body marked `no-store` so no
//! shared cache keeps it.

use std::any::Any;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use edgepix_core::{DenyReason, Error, ProxyResponse};

use crate::handler::into_http;

/// Errors surfaced to clients.
#[derive(Debug, thiserror::Error)]
pub enum WebError {
    /// Referer check failed.
    #[error("{0}")]
    Denied(DenyReason),

    /// No route covers the path.
    #[error("Path not supported: {0}")]
    NotFound(String),

    /// Any other failure while serving.
    #[error("Error: {0}")]
    Internal(String),
}

impl WebError {
    pub fn status(&self) -> StatusCode {
        match self {
            WebError::Denied(_) => StatusCode::FORBIDDEN,
            WebError::NotFound(_) => StatusCode::NOT_FOUND,
            WebError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<Error> for WebError {
    fn from(err: Error) -> Self {
        if err.is_user_facing() {
            tracing::debug!(error = %err, "request rejected");
        } else {
            tracing::error!(error = %err, "request failed");
        }

        match err {
            Error::AccessDenied(reason) => WebError::Denied(reason),
            Error::RouteNotFound(path) => WebError::NotFound(path),
            other => WebError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        into_http(ProxyResponse::uncacheable(self.status(), self.to_string()))
    }
}

/// Turn a handler panic into the same 500 response as any other failure.
pub fn panic_response(payload: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else {
        "handler panicked".to_string()
    };
    tracing::error!(panic = %message, "request handler panicked");
    WebError::Internal(message).into_response()
}
