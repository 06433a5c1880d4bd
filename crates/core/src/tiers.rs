//! Contracts for the two cache tiers.
//!
//! The durable store reports failures so callers can log them; the edge
//! cache is best-effort and never fails from the caller's point of view.

use async_trait::async_trait;
use bytes::Bytes;
use std::time::Instant;

use crate::Error;
use crate::cache::StoredObject;
use crate::key::CacheKey;
use crate::response::ProxyResponse;

/// Long-lived object store keyed by [`CacheKey`]. Entries never expire.
#[async_trait]
pub trait DurableStore: Send + Sync {
    async fn get(&self, key: &CacheKey) -> Result<Option<StoredObject>, Error>;

    /// Write the full body and content type in one operation.
    async fn put(&self, key: &CacheKey, body: Bytes, content_type: Option<String>) -> Result<(), Error>;
}

/// Short-lived whole-response cache keyed by request identity.
#[async_trait]
pub trait EdgeCache: Send + Sync {
    async fn lookup(&self, identity: &str) -> Option<ProxyResponse>;

    async fn store(&self, identity: &str, response: ProxyResponse);

    /// Deferred store for a response whose request began at `issued_at`.
    /// Implementations drop it if the identity was removed after that instant.
    async fn fill(&self, identity: &str, response: ProxyResponse, issued_at: Instant) {
        let _ = issued_at;
        self.store(identity, response).await;
    }

    /// Returns whether an entry was removed.
    async fn remove(&self, identity: &str) -> bool;
}
