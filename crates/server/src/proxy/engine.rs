//! Request resolution across the cache tiers.

use std::sync::Arc;
use std::time::Instant;

use axum::http::{HeaderMap, StatusCode};
use edgepix_client::{OriginClient, OriginConfig, origin_url};
use edgepix_core::response::DEFAULT_CONTENT_TYPE;
use edgepix_core::{
    AccessGuard, AppConfig, CacheKey, ControlFlags, DurableStore, EdgeCache, Error, Provenance, ProxyResponse,
    RouteRule, RouteTable,
};
use edgepix_core::key::origin_query;

use super::purge::purge;
use super::{BackfillWriter, ProxyRequest};

/// Everything needed to answer an image request.
pub struct Engine {
    routes: RouteTable,
    guard: AccessGuard,
    edge: Arc<dyn EdgeCache>,
    store: Arc<dyn DurableStore>,
    origin: OriginClient,
    origin_scheme: String,
    backfill: BackfillWriter,
}

impl Engine {
    pub fn new(config: &AppConfig, store: Arc<dyn DurableStore>, edge: Arc<dyn EdgeCache>) -> Result<Self, Error> {
        let origin = OriginClient::new(OriginConfig {
            user_agent: config.user_agent.clone(),
            timeout: config.timeout(),
            ..Default::default()
        })?;
        let backfill = BackfillWriter::new(Arc::clone(&store), Arc::clone(&edge), config.max_bytes);

        Ok(Self {
            routes: config.route_table(),
            guard: AccessGuard::new(&config.allowed_referers),
            edge,
            store,
            origin,
            origin_scheme: config.origin_scheme.clone(),
            backfill,
        })
    }

    pub fn backfill(&self) -> &BackfillWriter {
        &self.backfill
    }

    /// Answer one request: purge, guard, route, then the tiers.
    pub async fn handle(&self, request: &ProxyRequest) -> Result<ProxyResponse, Error> {
        let query = request.query();
        let flags = ControlFlags::parse(query);

        if flags.nocache {
            return purge(self.edge.as_ref(), request.path(), query).await;
        }

        self.guard.check(query.is_some(), &flags, request.referer())?;

        let rule = self
            .routes
            .lookup(request.path())
            .ok_or_else(|| Error::RouteNotFound(request.path().to_string()))?;
        let key = CacheKey::normalize(request.path(), query);

        self.resolve(request, flags, rule, &key).await
    }

    async fn resolve(
        &self, request: &ProxyRequest, flags: ControlFlags, rule: &RouteRule, key: &CacheKey,
    ) -> Result<ProxyResponse, Error> {
        let issued_at = Instant::now();
        let identity = request.identity();

        if !flags.force
            && !flags.debug
            && let Some(hit) = self.edge.lookup(&identity).await
        {
            tracing::debug!(identity = %identity, "edge cache hit");
            return hit.with_provenance(Provenance::EdgeCache, &rule.service);
        }

        // Debug requests always go to the origin; force refreshes the stored object.
        if !flags.force && !flags.debug {
            match self.store.get(key).await {
                Ok(Some(object)) => {
                    tracing::debug!(key = %key, size = object.body.len(), "object store hit");
                    let content_type = object.content_type.as_deref().unwrap_or(DEFAULT_CONTENT_TYPE);
                    let response = ProxyResponse::image(
                        StatusCode::OK,
                        HeaderMap::new(),
                        content_type,
                        object.body.clone(),
                        Provenance::ObjectStore,
                        &rule.service,
                    )?;
                    self.backfill.remember(identity, response.clone(), issued_at);
                    return Ok(response);
                }
                Ok(None) => tracing::debug!(key = %key, "object store miss"),
                Err(e) => tracing::warn!(key = %key, error = %e, "object store read failed, falling back to origin"),
            }
        }

        self.fetch_origin(request, flags, rule, key, identity, issued_at).await
    }

    async fn fetch_origin(
        &self, request: &ProxyRequest, flags: ControlFlags, rule: &RouteRule, key: &CacheKey, identity: String,
        issued_at: Instant,
    ) -> Result<ProxyResponse, Error> {
        let query = origin_query(request.query(), flags);
        let url = origin_url(&self.origin_scheme, &rule.target_host, &rule.origin_path(request.path()), query.as_deref())
            .map_err(|e| Error::InvalidUrl(e.to_string()))?;

        let origin = self.origin.fetch(url, request.accept()).await?;

        if !origin.is_success() {
            tracing::warn!(url = %origin.url, status = origin.status.as_u16(), "origin returned non-success status");
            return Ok(ProxyResponse::new(origin.status, origin.forwardable_headers(), origin.bytes));
        }

        tracing::info!(
            url = %origin.url,
            key = %key,
            size = origin.bytes.len(),
            fetch_ms = origin.fetch_ms,
            "first load from origin"
        );

        let content_type = origin.content_type.clone().unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());
        let response = ProxyResponse::image(
            origin.status,
            origin.forwardable_headers(),
            &content_type,
            origin.bytes.clone(),
            Provenance::FirstLoad,
            &rule.service,
        )?;

        self.backfill.persist(key.clone(), origin.bytes, content_type);
        if !flags.debug {
            self.backfill.remember(identity, response.clone(), issued_at);
        }

        Ok(response)
    }
}
