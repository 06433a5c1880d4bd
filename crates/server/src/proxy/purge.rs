//! Edge cache purge.
//!
//! `?nocache` removes the edge entry for the same URL without the flag and
//! redirects there, so the next request misses the edge and refills it.
//! The durable store is left alone; `?force` refreshes that tier.

use edgepix_core::{EdgeCache, Error, ProxyResponse, key};

pub async fn purge(edge: &dyn EdgeCache, path: &str, query: Option<&str>) -> Result<ProxyResponse, Error> {
    let clean = key::clean_url(path, query);
    let removed = edge.remove(&clean).await;
    tracing::info!(url = %clean, removed, "purged edge cache entry");
    ProxyResponse::redirect(&clean)
}
