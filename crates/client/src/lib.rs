//! Origin client for edgepix.
//!
//! This crate provides the HTTP fetch pipeline used on a full cache miss and
//! the construction of rewritten origin URLs.

pub mod fetch;

pub use fetch::{OriginClient, OriginConfig, OriginResponse, UrlError, origin_url};
