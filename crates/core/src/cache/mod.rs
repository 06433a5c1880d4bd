//! Storage tiers behind the proxy.
//!
//! - [`ObjectStore`]: durable SQLite object store with async access via
//!   tokio-rusqlite, automatic schema migrations and WAL mode.
//! - [`MemoryEdgeCache`]: in-process response cache with per-entry TTL and a
//!   capacity bound.

pub mod connection;
pub mod edge;
pub mod hash;
pub mod migrations;
pub mod objects;

pub use crate::Error;

pub use connection::ObjectStore;
pub use edge::MemoryEdgeCache;
pub use objects::StoredObject;
