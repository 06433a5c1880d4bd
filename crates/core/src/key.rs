//! Cache key normalization and control flags.
//!
//! Three query parameters change proxy behaviour instead of selecting
//! content: `debug`, `force` and `nocache`. They are presence-only flags
//! (`?debug` and `?debug=1` are equivalent) and never take part in the
//! durable store key.
//!
//! All helpers here work on the raw query string and return new values;
//! parameter order and encoding of everything else is preserved.

use std::fmt;

/// Diagnostic bypass flag.
pub const DEBUG: &str = "debug";

/// Skip both cache tiers and refetch from the origin.
pub const FORCE: &str = "force";

/// Purge the edge cache entry for the clean URL.
pub const NOCACHE: &str = "nocache";

const KEY_EXCLUDED: &[&str] = &[DEBUG, FORCE, NOCACHE];

/// Control flags parsed once per request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControlFlags {
    pub debug: bool,
    pub force: bool,
    pub nocache: bool,
}

impl ControlFlags {
    /// Parse control flags from a raw query string.
    pub fn parse(query: Option<&str>) -> Self {
        let mut flags = Self::default();
        for name in query.into_iter().flat_map(pairs).map(param_name) {
            match name {
                DEBUG => flags.debug = true,
                FORCE => flags.force = true,
                NOCACHE => flags.nocache = true,
                _ => {}
            }
        }
        flags
    }
}

fn pairs(query: &str) -> impl Iterator<Item = &str> {
    query.split('&').filter(|pair| !pair.is_empty())
}

fn param_name(pair: &str) -> &str {
    pair.split_once('=').map_or(pair, |(name, _)| name)
}

/// Remove every parameter whose name is in `names`, keeping the rest in order.
pub fn strip_params(query: &str, names: &[&str]) -> String {
    pairs(query)
        .filter(|pair| !names.contains(&param_name(pair)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Join a path and query, adding `?` only when the query is non-empty.
pub fn with_query(path: &str, query: &str) -> String {
    if query.is_empty() { path.to_string() } else { format!("{path}?{query}") }
}

/// Edge cache identity: the request path and query exactly as received.
pub fn request_identity(path: &str, query: Option<&str>) -> String {
    with_query(path, query.unwrap_or_default())
}

/// The URL a purge redirects to: the request with `nocache` removed.
pub fn clean_url(path: &str, query: Option<&str>) -> String {
    with_query(path, &strip_params(query.unwrap_or_default(), &[NOCACHE]))
}

/// Query forwarded to the origin. Debug requests drop their own flag.
pub fn origin_query(query: Option<&str>, flags: ControlFlags) -> Option<String> {
    let query = query.filter(|q| !q.is_empty())?;
    let forwarded = if flags.debug { strip_params(query, &[DEBUG]) } else { query.to_string() };
    (!forwarded.is_empty()).then_some(forwarded)
}

/// Canonical durable store key: path plus the query without control parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Derive the key for a request path and raw query.
    pub fn normalize(path: &str, query: Option<&str>) -> Self {
        Self(with_query(path, &strip_params(query.unwrap_or_default(), KEY_EXCLUDED)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
