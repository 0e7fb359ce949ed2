//! In-memory remote store for testing
//!
//! Honours the preconditions the resource layer relies on: every write bumps
//! the entity tag, `If-Match` and `If-None-Match: *` are enforced with 412,
//! and `HEAD` answers without a body. Every request is recorded so tests can
//! assert that an operation never reached the network.

use async_trait::async_trait;
use sai_core::{
    EntityTag, Graph, GraphCodec, HttpMethod, HttpRequest, HttpResponse, ResourceId, SaiConfig,
    Session, TransportEffects, TransportError,
};
use sai_effects::JsonGraphCodec;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Request as observed by the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    /// Request method
    pub method: HttpMethod,
    /// Target identifier
    pub target: ResourceId,
}

#[derive(Debug, Clone)]
struct StoredDocument {
    body: Vec<u8>,
    version: u64,
}

impl StoredDocument {
    fn etag(&self) -> EntityTag {
        EntityTag::new(format!("\"v{}\"", self.version))
    }
}

#[derive(Debug, Default)]
struct StoreState {
    documents: HashMap<ResourceId, StoredDocument>,
    next_version: u64,
    requests: Vec<RecordedRequest>,
    /// Remaining successful PUTs before every PUT fails with the given status
    put_budget: Option<(usize, u16)>,
    unreachable: bool,
}

impl StoreState {
    fn bump(&mut self) -> u64 {
        self.next_version += 1;
        self.next_version
    }
}

/// In-memory remote store implementing the transport effect
#[derive(Debug, Clone)]
pub struct MemoryStore {
    state: Arc<RwLock<StoreState>>,
    codec: JsonGraphCodec,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(StoreState::default())),
            codec: JsonGraphCodec::new(),
        }
    }

    /// Session over this store with default configuration
    pub fn session(&self) -> Session {
        self.session_with(SaiConfig::default())
    }

    /// Session over this store with the given configuration
    pub fn session_with(&self, config: SaiConfig) -> Session {
        Session::new(
            Arc::new(self.clone()),
            Arc::new(self.codec.clone()),
            config,
        )
    }

    /// Write a graph unconditionally, bypassing the request log
    pub async fn seed(&self, graph: &Graph) -> EntityTag {
        let body = self.codec.encode(graph).unwrap_or_default();
        let mut state = self.state.write().await;
        let version = state.bump();
        let document = StoredDocument { body, version };
        let etag = document.etag();
        state.documents.insert(graph.id().clone(), document);
        etag
    }

    /// Decode the stored graph at `id`
    pub async fn read(&self, id: &ResourceId) -> Option<Graph> {
        let state = self.state.read().await;
        let document = state.documents.get(id)?;
        self.codec.decode(id, &document.body).ok()
    }

    /// Read, modify and re-seed the graph at `id`
    pub async fn modify(&self, id: &ResourceId, change: impl FnOnce(&mut Graph)) {
        let mut graph = self.read(id).await.unwrap_or_else(|| Graph::new(id.clone()));
        change(&mut graph);
        self.seed(&graph).await;
    }

    /// True when a document is stored at `id`
    pub async fn contains(&self, id: &ResourceId) -> bool {
        self.state.read().await.documents.contains_key(id)
    }

    /// Remove a document out of band
    pub async fn remove(&self, id: &ResourceId) -> bool {
        self.state.write().await.documents.remove(id).is_some()
    }

    /// Identifiers of every stored document under `prefix`
    pub async fn ids_under(&self, prefix: &ResourceId) -> Vec<ResourceId> {
        let state = self.state.read().await;
        let mut ids: Vec<ResourceId> = state
            .documents
            .keys()
            .filter(|id| id.as_str().starts_with(prefix.as_str()) && *id != prefix)
            .cloned()
            .collect();
        ids.sort();
        ids
    }

    /// Model a concurrent writer: bump the entity tag of `id`
    pub async fn simulate_remote_change(&self, id: &ResourceId) {
        let mut state = self.state.write().await;
        let version = state.bump();
        if let Some(document) = state.documents.get_mut(id) {
            document.version = version;
        }
    }

    /// Let `successes` more PUTs through, then fail every PUT with `status`
    pub async fn fail_puts_after(&self, successes: usize, status: u16) {
        self.state.write().await.put_budget = Some((successes, status));
    }

    /// Let every PUT through again
    pub async fn allow_puts(&self) {
        self.state.write().await.put_budget = None;
    }

    /// Fail every request with a transport error until reset
    pub async fn set_unreachable(&self, unreachable: bool) {
        self.state.write().await.unreachable = unreachable;
    }

    /// Requests received so far
    pub async fn requests(&self) -> Vec<RecordedRequest> {
        self.state.read().await.requests.clone()
    }

    /// Number of requests received so far
    pub async fn request_count(&self) -> usize {
        self.state.read().await.requests.len()
    }

    /// Number of requests with the given method
    pub async fn count(&self, method: HttpMethod) -> usize {
        self.state
            .read()
            .await
            .requests
            .iter()
            .filter(|r| r.method == method)
            .count()
    }

    /// Forget recorded requests
    pub async fn clear_requests(&self) {
        self.state.write().await.requests.clear();
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TransportEffects for MemoryStore {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut state = self.state.write().await;
        state.requests.push(RecordedRequest {
            method: request.method,
            target: request.target.clone(),
        });
        if state.unreachable {
            return Err(TransportError::ConnectionFailed("store offline".into()));
        }

        let target = request.target;
        match request.method {
            HttpMethod::Get | HttpMethod::Head => match state.documents.get(&target) {
                Some(document) => {
                    let mut response = HttpResponse::new(200).with_etag(document.etag());
                    if request.method == HttpMethod::Get {
                        response = response.with_body(document.body.clone());
                    }
                    Ok(response)
                }
                None => Ok(HttpResponse::new(404)),
            },
            HttpMethod::Put => {
                if let Some((remaining, status)) = state.put_budget {
                    if remaining == 0 {
                        return Ok(HttpResponse::new(status));
                    }
                    state.put_budget = Some((remaining - 1, status));
                }
                let current = state.documents.get(&target).map(StoredDocument::etag);
                if request.if_none_match_any && current.is_some() {
                    return Ok(HttpResponse::new(412));
                }
                if let Some(expected) = request.if_match {
                    if current.as_ref() != Some(&expected) {
                        return Ok(HttpResponse::new(412));
                    }
                }
                let version = state.bump();
                let document = StoredDocument {
                    body: request.body.unwrap_or_default(),
                    version,
                };
                let etag = document.etag();
                let status = if current.is_some() { 204 } else { 201 };
                state.documents.insert(target, document);
                Ok(HttpResponse::new(status).with_etag(etag))
            }
            HttpMethod::Delete => match state.documents.remove(&target) {
                Some(_) => Ok(HttpResponse::new(204)),
                None => Ok(HttpResponse::new(404)),
            },
            HttpMethod::Post | HttpMethod::Patch => Ok(HttpResponse::new(405)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> ResourceId {
        ResourceId::parse(s).unwrap()
    }

    #[tokio::test]
    async fn test_conditional_put() {
        let store = MemoryStore::new();
        let target = id("https://alice.example/data/a");

        let created = store
            .execute(HttpRequest::put(target.clone(), b"{}".to_vec()).if_none_match_any())
            .await
            .unwrap();
        assert_eq!(created.status, 201);
        let etag = created.etag.unwrap();

        let again = store
            .execute(HttpRequest::put(target.clone(), b"{}".to_vec()).if_none_match_any())
            .await
            .unwrap();
        assert_eq!(again.status, 412);

        store.simulate_remote_change(&target).await;
        let stale = store
            .execute(HttpRequest::put(target.clone(), b"{}".to_vec()).if_match(etag))
            .await
            .unwrap();
        assert_eq!(stale.status, 412);
        assert_eq!(store.request_count().await, 3);
    }

    #[tokio::test]
    async fn test_head_has_no_body() {
        let store = MemoryStore::new();
        let target = id("https://alice.example/data/a");
        store.seed(&Graph::new(target.clone())).await;

        let response = store.execute(HttpRequest::head(target)).await.unwrap();
        assert_eq!(response.status, 200);
        assert!(response.body.is_empty());
        assert!(response.etag.is_some());
    }

    #[tokio::test]
    async fn test_put_budget() {
        let store = MemoryStore::new();
        store.fail_puts_after(1, 503).await;
        let first = store
            .execute(HttpRequest::put(id("https://alice.example/a"), Vec::new()))
            .await
            .unwrap();
        let second = store
            .execute(HttpRequest::put(id("https://alice.example/b"), Vec::new()))
            .await
            .unwrap();
        assert_eq!(first.status, 201);
        assert_eq!(second.status, 503);
    }
}
