//! Deferred cache fills.
//!
//! Writes are spawned onto a shared [`JoinSet`] so the response goes out
//! first. Failures are logged and never reach the client. On shutdown
//! [`BackfillWriter::drain`] waits for whatever is still in flight.

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use bytes::Bytes;
use edgepix_core::{CacheKey, DurableStore, EdgeCache, ProxyResponse};
use tokio::task::JoinSet;

#[derive(Clone)]
pub struct BackfillWriter {
    store: Arc<dyn DurableStore>,
    edge: Arc<dyn EdgeCache>,
    tasks: Arc<Mutex<JoinSet<()>>>,
    max_bytes: usize,
}

impl BackfillWriter {
    pub fn new(store: Arc<dyn DurableStore>, edge: Arc<dyn EdgeCache>, max_bytes: usize) -> Self {
        Self { store, edge, tasks: Arc::new(Mutex::new(JoinSet::new())), max_bytes }
    }

    /// Write an origin body into the durable store under `key`.
    pub fn persist(&self, key: CacheKey, body: Bytes, content_type: String) {
        if self.oversized(key.as_str(), body.len()) {
            return;
        }

        let store = Arc::clone(&self.store);
        self.spawn(async move {
            match store.put(&key, body, Some(content_type)).await {
                Ok(()) => tracing::debug!(key = %key, "durable store filled"),
                Err(e) => tracing::warn!(key = %key, error = %e, "durable store fill failed"),
            }
        });
    }

    /// Keep a served response in the edge cache under the request identity.
    ///
    /// `issued_at` is when the request started; a purge of the identity
    /// after that instant wins over this fill.
    pub fn remember(&self, identity: String, response: ProxyResponse, issued_at: Instant) {
        if self.oversized(&identity, response.body().len()) {
            return;
        }

        let edge = Arc::clone(&self.edge);
        self.spawn(async move {
            edge.fill(&identity, response, issued_at).await;
            tracing::debug!(identity = %identity, "edge cache filled");
        });
    }

    /// Number of fills not yet reaped.
    pub fn pending(&self) -> usize {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Wait for every in-flight fill to finish.
    pub async fn drain(&self) {
        let mut pending = std::mem::take(&mut *self.tasks.lock().unwrap_or_else(PoisonError::into_inner));
        while let Some(joined) = pending.join_next().await {
            if let Err(e) = joined {
                tracing::warn!(error = %e, "backfill task aborted");
            }
        }
    }

    fn oversized(&self, target: &str, len: usize) -> bool {
        if len > self.max_bytes {
            tracing::info!(entry = %target, size = len, max_bytes = self.max_bytes, "body too large to cache");
            return true;
        }
        false
    }

    fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        while let Some(joined) = tasks.try_join_next() {
            if let Err(e) = joined {
                tracing::warn!(error = %e, "backfill task aborted");
            }
        }
        tasks.spawn(task);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, StatusCode};
    use edgepix_core::{MemoryEdgeCache, ObjectStore};
    use std::time::Duration;

    async fn writer(max_bytes: usize) -> (BackfillWriter, ObjectStore, MemoryEdgeCache) {
        let store = ObjectStore::open_in_memory().await.unwrap();
        let edge = MemoryEdgeCache::new(Duration::from_secs(60), 16);
        let writer = BackfillWriter::new(Arc::new(store.clone()), Arc::new(edge.clone()), max_bytes);
        (writer, store, edge)
    }

    #[tokio::test]
    async fn test_persist_and_drain() {
        let (writer, store, _) = writer(1024).await;
        let key = CacheKey::normalize("/a.jpg", Some("w=10"));

        writer.persist(key, Bytes::from_static(b"jpeg"), "image/jpeg".into());
        writer.drain().await;

        let object = store.get_object("/a.jpg?w=10").await.unwrap().unwrap();
        assert_eq!(object.body.as_ref(), b"jpeg");
        assert_eq!(object.content_type.as_deref(), Some("image/jpeg"));
        assert_eq!(writer.pending(), 0);
    }

    #[tokio::test]
    async fn test_remember_fills_edge() {
        let (writer, _, edge) = writer(1024).await;
        let response = ProxyResponse::new(StatusCode::OK, HeaderMap::new(), Bytes::from_static(b"png"));

        writer.remember("/a.png?debug".into(), response, Instant::now());
        writer.drain().await;

        assert_eq!(edge.lookup("/a.png?debug").await.unwrap().body().as_ref(), b"png");
    }

    #[tokio::test]
    async fn test_fill_loses_to_later_purge() {
        let (writer, _, edge) = writer(1024).await;
        let issued_at = Instant::now();
        edge.store("/x.jpg?w=1", ProxyResponse::new(StatusCode::OK, HeaderMap::new(), Bytes::from_static(b"old")))
            .await;

        edge.remove("/x.jpg?w=1").await;
        let response = ProxyResponse::new(StatusCode::OK, HeaderMap::new(), Bytes::from_static(b"old"));
        writer.remember("/x.jpg?w=1".into(), response, issued_at);
        writer.drain().await;

        assert!(edge.lookup("/x.jpg?w=1").await.is_none());
    }

    #[tokio::test]
    async fn test_oversized_bodies_skipped() {
        let (writer, store, edge) = writer(4).await;
        let body = Bytes::from_static(b"too large");

        writer.persist(CacheKey::normalize("/big.jpg", None), body.clone(), "image/jpeg".into());
        writer.remember("/big.jpg".into(), ProxyResponse::new(StatusCode::OK, HeaderMap::new(), body), Instant::now());
        assert_eq!(writer.pending(), 0);
        writer.drain().await;

        assert_eq!(store.count_objects().await.unwrap(), 0);
        assert!(edge.is_empty().await);
    }
}
