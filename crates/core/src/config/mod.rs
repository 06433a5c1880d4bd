//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (EDGEPIX_*)
//! 2. TOML config file (if EDGEPIX_CONFIG_FILE set)
//! 3. Built-in defaults

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::routes::{RouteRule, RouteTable};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (EDGEPIX_*)
/// 2. TOML config file (if EDGEPIX_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Address the HTTP listener binds to.
    ///
    /// Set via EDGEPIX_LISTEN_ADDR environment variable.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,

    /// Path to the SQLite file backing the durable store.
    ///
    /// Set via EDGEPIX_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for origin requests.
    ///
    /// Set via EDGEPIX_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Origin request timeout in milliseconds.
    ///
    /// Set via EDGEPIX_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Largest origin body that is written back into the cache tiers.
    ///
    /// Set via EDGEPIX_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Scheme used for every origin request ("https" or "http").
    ///
    /// Set via EDGEPIX_ORIGIN_SCHEME environment variable.
    #[serde(default = "default_origin_scheme")]
    pub origin_scheme: String,

    /// Referer hosts allowed to load images with query parameters.
    ///
    /// Set via EDGEPIX_ALLOWED_REFERERS environment variable (`[a.com,b.com]`).
    #[serde(default = "default_allowed_referers")]
    pub allowed_referers: Vec<String>,

    /// Edge cache entry lifetime in seconds.
    ///
    /// Set via EDGEPIX_EDGE_TTL_SECS environment variable.
    #[serde(default = "default_edge_ttl_secs")]
    pub edge_ttl_secs: u64,

    /// Maximum number of responses held by the edge cache.
    ///
    /// Set via EDGEPIX_EDGE_MAX_ENTRIES environment variable.
    #[serde(default = "default_edge_max_entries")]
    pub edge_max_entries: usize,

    /// Ordered origin routes. Usually set from the TOML file.
    #[serde(default = "default_routes")]
    pub routes: Vec<RouteRule>,
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8787))
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./edgepix-store.sqlite")
}

fn default_user_agent() -> String {
    "edgepix/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_max_bytes() -> usize {
    25 * 1024 * 1024
}

fn default_origin_scheme() -> String {
    "https".into()
}

fn default_allowed_referers() -> Vec<String> {
    ["bibica.net", "static.bibica.net", "comment.bibica.net", "jetpack-cf-r2-cache-v2.pages.dev"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_edge_ttl_secs() -> u64 {
    86_400
}

fn default_edge_max_entries() -> usize {
    4096
}

fn default_routes() -> Vec<RouteRule> {
    RouteTable::builtin().rules().to_vec()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_bytes: default_max_bytes(),
            origin_scheme: default_origin_scheme(),
            allowed_referers: default_allowed_referers(),
            edge_ttl_secs: default_edge_ttl_secs(),
            edge_max_entries: default_edge_max_entries(),
            routes: default_routes(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn edge_ttl(&self) -> Duration {
        Duration::from_secs(self.edge_ttl_secs)
    }

    /// The configured routes as a table.
    pub fn route_table(&self) -> RouteTable {
        RouteTable::new(self.routes.clone())
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `EDGEPIX_`
    /// 2. TOML file from `EDGEPIX_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("EDGEPIX_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("EDGEPIX_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
