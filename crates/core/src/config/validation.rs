//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `max_bytes` is 0 or exceeds 100MB
    /// - `user_agent` is empty
    /// - `origin_scheme` is not `http` or `https`
    /// - `allowed_referers`, `routes`, `edge_ttl_secs` or `edge_max_entries` is empty/zero
    /// - a route prefix does not start with `/`, or a route has no target host
    ///   or a service label that cannot be sent as a header
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_ms < 100 {
            return Err(invalid("timeout_ms", "must be at least 100ms"));
        }
        if self.timeout_ms > 300_000 {
            return Err(invalid("timeout_ms", "must not exceed 5 minutes (300000ms)"));
        }

        if self.max_bytes == 0 {
            return Err(invalid("max_bytes", "must be greater than 0"));
        }
        if self.max_bytes > 100 * 1024 * 1024 {
            return Err(invalid("max_bytes", "must not exceed 100MB"));
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        if !matches!(self.origin_scheme.as_str(), "http" | "https") {
            return Err(invalid("origin_scheme", format!("unsupported scheme: {}", self.origin_scheme)));
        }

        if self.allowed_referers.is_empty() {
            return Err(invalid("allowed_referers", "must list at least one host"));
        }

        if self.edge_ttl_secs == 0 {
            return Err(invalid("edge_ttl_secs", "must be greater than 0"));
        }
        if self.edge_max_entries == 0 {
            return Err(invalid("edge_max_entries", "must be greater than 0"));
        }

        if self.routes.is_empty() {
            return Err(invalid("routes", "must contain at least one rule"));
        }
        for rule in &self.routes {
            if !rule.prefix.starts_with('/') {
                return Err(invalid("routes", format!("prefix {:?} must start with '/'", rule.prefix)));
            }
            if rule.target_host.is_empty() {
                return Err(invalid("routes", format!("rule {:?} has no target_host", rule.prefix)));
            }
            if !rule.service.chars().all(|c| c.is_ascii_graphic() || c == ' ') {
                return Err(invalid("routes", format!("service label {:?} must be printable ASCII", rule.service)));
            }
        }

        if !self.routes.iter().any(|rule| rule.prefix == "/") {
            tracing::warn!("no catch-all '/' route configured; unmatched paths will return 404");
        }

        Ok(())
    }
}
