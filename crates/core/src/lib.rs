//! Core types and shared functionality for edgepix.
//!
//! This crate provides:
//! - Route table and origin path rewriting
//! - Referer-based access guard
//! - Cache key normalization and control flags
//! - The durable object store (SQLite) and the edge response cache
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod guard;
pub mod key;
pub mod response;
pub mod routes;
pub mod tiers;

pub use cache::{MemoryEdgeCache, ObjectStore, StoredObject};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use guard::{Access, AccessGuard, DenyReason};
pub use key::{CacheKey, ControlFlags};
pub use response::{ProxyResponse, Provenance};
pub use routes::{PathRewrite, RouteRule, RouteTable};
pub use tiers::{DurableStore, EdgeCache};
