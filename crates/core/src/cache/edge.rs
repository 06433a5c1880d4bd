//! In-process edge cache for whole responses.
//!
//! Entries expire after a fixed TTL. When the cache is full the oldest
//! entry is evicted to make room. Removing an identity leaves a purge
//! mark so a fill started before the removal cannot bring the entry back.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::response::ProxyResponse;
use crate::tiers::EdgeCache;

/// Cached response with its insertion time.
struct EdgeEntry {
    response: ProxyResponse,
    stored_at: Instant,
}

impl EdgeEntry {
    fn is_expired(&self, ttl: Duration) -> bool {
        self.stored_at.elapsed() > ttl
    }
}

#[derive(Default)]
struct EdgeState {
    entries: HashMap<String, EdgeEntry>,
    /// Identity -> last removal time.
    purged: HashMap<String, Instant>,
}

impl EdgeState {
    fn evict(&mut self, ttl: Duration, max_entries: usize) {
        self.entries.retain(|_, entry| !entry.is_expired(ttl));
        self.purged.retain(|_, at| at.elapsed() <= ttl);

        while self.entries.len() >= max_entries {
            let Some(oldest) = self
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.stored_at)
                .map(|(identity, _)| identity.clone())
            else {
                break;
            };
            tracing::trace!(identity = %oldest, "evicting edge cache entry");
            self.entries.remove(&oldest);
        }
    }

    fn insert(&mut self, identity: &str, response: ProxyResponse, ttl: Duration, max_entries: usize) {
        if !self.entries.contains_key(identity) {
            self.evict(ttl, max_entries);
        }
        self.entries.insert(identity.to_string(), EdgeEntry { response, stored_at: Instant::now() });
    }
}

/// Response cache keyed by request identity.
///
/// Uses a HashMap behind a tokio RwLock; clones share the same entries.
#[derive(Clone)]
pub struct MemoryEdgeCache {
    state: Arc<RwLock<EdgeState>>,
    ttl: Duration,
    max_entries: usize,
}

impl MemoryEdgeCache {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self { state: Arc::new(RwLock::new(EdgeState::default())), ttl, max_entries: max_entries.max(1) }
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.read().await.entries.is_empty()
    }
}

#[async_trait]
impl EdgeCache for MemoryEdgeCache {
    async fn lookup(&self, identity: &str) -> Option<ProxyResponse> {
        {
            let state = self.state.read().await;
            match state.entries.get(identity) {
                Some(entry) if !entry.is_expired(self.ttl) => return Some(entry.response.clone()),
                Some(_) => {}
                None => return None,
            }
        }

        // Expired: drop it under the write lock unless it was refreshed meanwhile.
        let mut state = self.state.write().await;
        if state.entries.get(identity).is_some_and(|entry| entry.is_expired(self.ttl)) {
            state.entries.remove(identity);
        }
        None
    }

    async fn store(&self, identity: &str, response: ProxyResponse) {
        self.state.write().await.insert(identity, response, self.ttl, self.max_entries);
    }

    async fn fill(&self, identity: &str, response: ProxyResponse, issued_at: Instant) {
        let mut state = self.state.write().await;
        if state.purged.get(identity).is_some_and(|purged_at| *purged_at >= issued_at) {
            tracing::debug!(identity = %identity, "dropping fill issued before purge");
            return;
        }
        state.insert(identity, response, self.ttl, self.max_entries);
    }

    async fn remove(&self, identity: &str) -> bool {
        let mut state = self.state.write().await;
        let ttl = self.ttl;
        state.purged.retain(|_, at| at.elapsed() <= ttl);
        state.purged.insert(identity.to_string(), Instant::now());
        state.entries.remove(identity).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::{HeaderMap, StatusCode};

    fn response(body: &'static [u8]) -> ProxyResponse {
        ProxyResponse::new(StatusCode::OK, HeaderMap::new(), Bytes::from_static(body))
    }

    #[tokio::test]
    async fn test_store_and_lookup() {
        let cache = MemoryEdgeCache::new(Duration::from_secs(60), 8);
        cache.store("/a.jpg", response(b"a")).await;

        let hit = cache.lookup("/a.jpg").await.unwrap();
        assert_eq!(hit.body().as_ref(), b"a");
        assert!(cache.lookup("/b.jpg").await.is_none());
    }

    #[tokio::test]
    async fn test_identity_includes_query() {
        let cache = MemoryEdgeCache::new(Duration::from_secs(60), 8);
        cache.store("/a.jpg?w=1", response(b"a")).await;
        assert!(cache.lookup("/a.jpg").await.is_none());
        assert!(cache.lookup("/a.jpg?w=1").await.is_some());
    }

    #[tokio::test]
    async fn test_remove() {
        let cache = MemoryEdgeCache::new(Duration::from_secs(60), 8);
        cache.store("/a.jpg", response(b"a")).await;

        assert!(cache.remove("/a.jpg").await);
        assert!(!cache.remove("/a.jpg").await);
        assert!(cache.lookup("/a.jpg").await.is_none());
    }

    #[tokio::test]
    async fn test_fill_issued_before_remove_is_dropped() {
        let cache = MemoryEdgeCache::new(Duration::from_secs(60), 8);
        cache.store("/a.jpg", response(b"stale")).await;
        let issued_at = Instant::now();

        cache.remove("/a.jpg").await;
        cache.fill("/a.jpg", response(b"stale"), issued_at).await;

        assert!(cache.lookup("/a.jpg").await.is_none());
    }

    #[tokio::test]
    async fn test_fill_issued_after_remove_is_kept() {
        let cache = MemoryEdgeCache::new(Duration::from_secs(60), 8);
        cache.remove("/a.jpg").await;
        tokio::time::sleep(Duration::from_millis(2)).await;

        cache.fill("/a.jpg", response(b"fresh"), Instant::now()).await;
        cache.fill("/b.jpg", response(b"other"), Instant::now()).await;

        assert_eq!(cache.lookup("/a.jpg").await.unwrap().body().as_ref(), b"fresh");
        assert!(cache.lookup("/b.jpg").await.is_some());
    }

    #[tokio::test]
    async fn test_entries_expire() {
        let cache = MemoryEdgeCache::new(Duration::from_millis(20), 8);
        cache.store("/a.jpg", response(b"a")).await;

        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(cache.lookup("/a.jpg").await.is_none());
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_capacity_evicts_oldest() {
        let cache = MemoryEdgeCache::new(Duration::from_secs(60), 2);
        cache.store("/1.jpg", response(b"1")).await;
        tokio::time::sleep(Duration::from_millis(2)).await;
        cache.store("/2.jpg", response(b"2")).await;
        tokio::time::sleep(Duration::from_millis(2)).await;
        cache.store("/3.jpg", response(b"3")).await;

        assert_eq!(cache.len().await, 2);
        assert!(cache.lookup("/1.jpg").await.is_none());
        assert!(cache.lookup("/2.jpg").await.is_some());
        assert!(cache.lookup("/3.jpg").await.is_some());
    }

    #[tokio::test]
    async fn test_overwrite_does_not_evict() {
        let cache = MemoryEdgeCache::new(Duration::from_secs(60), 2);
        cache.store("/1.jpg", response(b"1")).await;
        cache.store("/2.jpg", response(b"2")).await;
        cache.store("/2.jpg", response(b"two")).await;

        assert_eq!(cache.len().await, 2);
        assert_eq!(cache.lookup("/2.jpg").await.unwrap().body().as_ref(), b"two");
    }
}
