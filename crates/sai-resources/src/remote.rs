//! Remote resource proxy
//!
//! Owns one document's cached graph and the entity tag observed with it.
//! Nothing is written back until a lifecycle type issues an explicit persist
//! call; there is no background synchronization.

use sai_core::{
    check_status, EntityTag, Graph, HttpRequest, HttpResponse, ResourceId, Result, Session,
    WriteIntent,
};

/// Cached view of one network-addressable graph document
#[derive(Debug, Clone)]
pub struct RemoteResource {
    session: Session,
    id: ResourceId,
    graph: Graph,
    etag: Option<EntityTag>,
    fetched: bool,
    dirty: bool,
}

impl RemoteResource {
    /// Proxy for `id` with an empty, never-fetched cache
    pub fn new(session: Session, id: ResourceId) -> Self {
        let graph = Graph::new(id.clone());
        Self {
            session,
            id,
            graph,
            etag: None,
            fetched: false,
            dirty: false,
        }
    }

    /// Proxy seeded with a locally built graph; the graph's subject is the id
    pub fn with_graph(session: Session, graph: Graph) -> Self {
        Self {
            session,
            id: graph.id().clone(),
            graph,
            etag: None,
            fetched: false,
            dirty: true,
        }
    }

    /// Retrieve the current representation, replacing cache and entity tag.
    ///
    /// Fails with `NotFound` when the document is absent and `Unreachable`
    /// on transport failure.
    pub async fn fetch(&mut self) -> Result<()> {
        let request = HttpRequest::get(self.id.clone()).accept(self.session.content_type());
        let response = self.session.send(request).await?;
        check_status(&self.id, response.status, WriteIntent::Plain)?;
        let graph = self.session.decode(&self.id, &response.body)?;
        tracing::debug!(
            resource = %self.id,
            etag = ?response.etag,
            "Replacing cached representation"
        );
        self.graph = graph;
        self.etag = response.etag;
        self.fetched = true;
        self.dirty = false;
        Ok(())
    }

    /// Existence probe that does not transfer the body
    pub async fn exists(&self) -> Result<bool> {
        let response = self.session.send(HttpRequest::head(self.id.clone())).await?;
        match check_status(&self.id, response.status, WriteIntent::Plain) {
            Ok(()) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// PUT the cached graph with the given preconditions and record the
    /// entity tag the store answered with
    pub(crate) async fn put(&mut self, intent: WriteIntent) -> Result<HttpResponse> {
        let body = self.session.encode(&self.graph)?;
        let mut request = HttpRequest::put(self.id.clone(), body)
            .content_type(self.session.content_type());
        match intent {
            WriteIntent::Create => request = request.if_none_match_any(),
            WriteIntent::Update => {
                if let Some(etag) = self.etag.clone() {
                    request = request.if_match(etag);
                }
            }
            WriteIntent::Plain => {}
        }
        let response = self.session.send(request).await?;
        check_status(&self.id, response.status, intent)?;
        self.etag = response.etag.clone();
        self.fetched = true;
        self.dirty = false;
        Ok(response)
    }

    /// DELETE the document. An absent document counts as deleted.
    pub(crate) async fn delete(&mut self) -> Result<()> {
        let response = self.session.send(HttpRequest::delete(self.id.clone())).await?;
        match check_status(&self.id, response.status, WriteIntent::Plain) {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                tracing::debug!(resource = %self.id, "Delete of absent resource");
            }
            Err(e) => return Err(e),
        }
        self.etag = None;
        self.fetched = false;
        Ok(())
    }

    /// Identifier
    pub fn id(&self) -> &ResourceId {
        &self.id
    }

    /// Cached graph
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Mutable cached graph; marks the cache dirty
    pub(crate) fn graph_mut(&mut self) -> &mut Graph {
        self.dirty = true;
        &mut self.graph
    }

    /// Entity tag observed with the cached graph
    pub fn etag(&self) -> Option<&EntityTag> {
        self.etag.as_ref()
    }

    /// True once the cache reflects a fetch or a successful write
    pub fn is_fetched(&self) -> bool {
        self.fetched
    }

    /// True when the cache holds changes not yet persisted
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Session the proxy talks through
    pub fn session(&self) -> &Session {
        &self.session
    }
}
