//! Referer-based hotlink protection.
//!
//! Requests without a query string are always served. Requests with one
//! must carry a `Referer` whose host is on the allow-list, unless they are
//! in debug mode.

use std::collections::HashSet;
use std::fmt;

use http::HeaderValue;
use url::Url;

use crate::Error;
use crate::key::ControlFlags;

/// Why a request was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenyReason {
    Missing,
    Invalid,
    NotAllowed(String),
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DenyReason::Missing => f.write_str("Access denied: Referer header is missing."),
            DenyReason::Invalid => f.write_str("Access denied: Invalid Referer header."),
            DenyReason::NotAllowed(host) => write!(f, "Access denied: Requests from {host} are not allowed."),
        }
    }
}

/// Outcome of an authorization check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    Allow,
    Deny(DenyReason),
}

/// Referer host allow-list.
#[derive(Debug, Clone)]
pub struct AccessGuard {
    allowed: HashSet<String>,
}

impl AccessGuard {
    pub fn new<I, S>(hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self { allowed: hosts.into_iter().map(|h| h.as_ref().to_ascii_lowercase()).collect() }
    }

    /// Decide whether a request may be served.
    ///
    /// `has_query` is whether the raw request carried a non-empty query
    /// string, control parameters included.
    pub fn authorize(&self, has_query: bool, flags: &ControlFlags, referer: Option<&HeaderValue>) -> Access {
        if !has_query || flags.debug {
            return Access::Allow;
        }

        let Some(referer) = referer else {
            return Access::Deny(DenyReason::Missing);
        };

        let Some(parsed) = referer.to_str().ok().and_then(|r| Url::parse(r).ok()) else {
            return Access::Deny(DenyReason::Invalid);
        };

        let host = parsed.host_str().unwrap_or_default().to_ascii_lowercase();
        if self.allowed.contains(&host) { Access::Allow } else { Access::Deny(DenyReason::NotAllowed(host)) }
    }

    /// Same as [`authorize`](Self::authorize), as a `Result` for `?` chains.
    pub fn check(&self, has_query: bool, flags: &ControlFlags, referer: Option<&HeaderValue>) -> Result<(), Error> {
        match self.authorize(has_query, flags, referer) {
            Access::Allow => Ok(()),
            Access::Deny(reason) => {
                tracing::debug!(%reason, "request denied by referer guard");
                Err(Error::AccessDenied(reason))
            }
        }
    }
}
