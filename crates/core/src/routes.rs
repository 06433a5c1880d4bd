//! Static mapping from request path prefixes to image origins.
//!
//! Rules are checked in order and the first literal prefix match wins, so
//! specific prefixes must come before the `/` catch-all.

use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

/// How a request path becomes an origin path.
///
/// The origin path is `base` followed by the request path, with the matched
/// prefix removed first when `strip_prefix` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathRewrite {
    pub base: String,
    #[serde(default)]
    pub strip_prefix: bool,
}

impl PathRewrite {
    pub fn apply(&self, path: &str, prefix: &str) -> String {
        let rest = if self.strip_prefix { path.strip_prefix(prefix).unwrap_or(path) } else { path };
        format!("{}{rest}", self.base)
    }
}

/// A single origin route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteRule {
    pub prefix: String,
    pub target_host: String,
    pub rewrite: PathRewrite,
    /// Display label used in provenance headers.
    pub service: String,
}

impl RouteRule {
    pub fn matches(&self, path: &str) -> bool {
        path.starts_with(&self.prefix)
    }

    pub fn origin_path(&self, path: &str) -> String {
        self.rewrite.apply(path, &self.prefix)
    }
}

static BUILTIN: LazyLock<RouteTable> = LazyLock::new(|| {
    RouteTable::new(vec![
        RouteRule {
            prefix: "/avatar".into(),
            target_host: "secure.gravatar.com".into(),
            rewrite: PathRewrite { base: "/avatar".into(), strip_prefix: true },
            service: "Gravatar".into(),
        },
        RouteRule {
            prefix: "/comment".into(),
            target_host: "i0.wp.com".into(),
            rewrite: PathRewrite { base: "/comment.bibica.net/static/images".into(), strip_prefix: true },
            service: "Artalk & Jetpack".into(),
        },
        RouteRule {
            prefix: "/".into(),
            target_host: "i0.wp.com".into(),
            rewrite: PathRewrite { base: "/bibica.net/wp-content/uploads".into(), strip_prefix: false },
            service: "Jetpack".into(),
        },
    ])
});

/// Ordered, immutable list of route rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTable {
    rules: Vec<RouteRule>,
}

impl RouteTable {
    pub fn new(rules: Vec<RouteRule>) -> Self {
        Self { rules }
    }

    /// The built-in table, initialised once per process.
    pub fn builtin() -> &'static RouteTable {
        &BUILTIN
    }

    /// Return the first rule whose prefix is a literal prefix of `path`.
    pub fn lookup(&self, path: &str) -> Option<&RouteRule> {
        self.rules.iter().find(|rule| rule.matches(path))
    }

    pub fn rules(&self) -> &[RouteRule] {
        &self.rules
    }
}
