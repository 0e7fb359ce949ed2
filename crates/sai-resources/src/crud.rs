//! Freely mutable documents with conditional-write safety
//!
//! Updates carry the entity tag observed at the last fetch or write. If the
//! store has moved on, the write is rejected with `Conflict` and the caller
//! must `refresh()` and re-apply; nothing is merged automatically.
//!
//! Concurrent mutations of the same `CrudResource` value are a caller error:
//! methods take `&mut self`, and clones of one resource each carry their own
//! entity tag, so at most one of two racing clones can win an update.

use crate::remote::RemoteResource;
use sai_core::{EntityTag, Graph, ResourceId, Result, SaiError, Session, WriteIntent};

/// Document supporting create, read, update and delete
#[derive(Debug, Clone)]
pub struct CrudResource {
    remote: RemoteResource,
}

impl CrudResource {
    /// Local, unpersisted resource with an empty graph at `id`
    pub fn new(session: &Session, id: ResourceId) -> Self {
        Self {
            remote: RemoteResource::new(session.clone(), id),
        }
    }

    /// Fetch `id`
    pub async fn get(session: &Session, id: &ResourceId) -> Result<Self> {
        let mut remote = RemoteResource::new(session.clone(), id.clone());
        remote.fetch().await?;
        Ok(Self { remote })
    }

    /// Persist `graph` at its subject identifier.
    ///
    /// Fails with `AlreadyExists` when the identifier is occupied.
    pub async fn create(session: &Session, graph: Graph) -> Result<Self> {
        let mut resource = Self {
            remote: RemoteResource::with_graph(session.clone(), graph),
        };
        resource.create_in_place().await?;
        Ok(resource)
    }

    /// Persist the locally built graph of a resource made with `new`
    pub async fn create_in_place(&mut self) -> Result<()> {
        self.remote.put(WriteIntent::Create).await?;
        tracing::debug!(resource = %self.id(), "Created resource");
        Ok(())
    }

    /// Write the cached graph back, conditional on the observed entity tag.
    ///
    /// Fails with `Conflict` when there is no observed entity tag or the
    /// remote state changed since it was observed.
    pub async fn update(&mut self) -> Result<()> {
        if self.remote.etag().is_none() {
            return Err(SaiError::conflict(
                self.id(),
                "update requires an entity tag from a prior fetch",
            ));
        }
        self.remote.put(WriteIntent::Update).await?;
        tracing::debug!(resource = %self.id(), etag = ?self.remote.etag(), "Updated resource");
        Ok(())
    }

    /// Delete; deleting an absent resource is not an error
    pub async fn delete(&mut self) -> Result<()> {
        self.remote.delete().await
    }

    /// Re-fetch, discarding local changes
    pub async fn refresh(&mut self) -> Result<()> {
        self.remote.fetch().await
    }

    /// Existence probe
    pub async fn exists(&self) -> Result<bool> {
        self.remote.exists().await
    }

    /// Identifier
    pub fn id(&self) -> &ResourceId {
        self.remote.id()
    }

    /// Cached graph
    pub fn graph(&self) -> &Graph {
        self.remote.graph()
    }

    /// Mutable cached graph; changes stay local until `update`
    pub fn graph_mut(&mut self) -> &mut Graph {
        self.remote.graph_mut()
    }

    /// Entity tag of the cached graph
    pub fn etag(&self) -> Option<&EntityTag> {
        self.remote.etag()
    }

    /// True when local changes are not yet persisted
    pub fn is_dirty(&self) -> bool {
        self.remote.is_dirty()
    }

    /// Session the resource talks through
    pub fn session(&self) -> &Session {
        self.remote.session()
    }
}
