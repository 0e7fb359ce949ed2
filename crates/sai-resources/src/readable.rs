//! Read-only mirror of a remote document

use crate::remote::RemoteResource;
use sai_core::{EntityTag, Graph, ResourceId, Result, SaiError, Session};

/// Fetched document with no write operations.
///
/// The cached graph only ever changes through a full re-fetch.
#[derive(Debug, Clone)]
pub struct ReadableResource {
    remote: RemoteResource,
}

impl ReadableResource {
    /// Fetch `id`
    pub async fn get(session: &Session, id: &ResourceId) -> Result<Self> {
        let mut remote = RemoteResource::new(session.clone(), id.clone());
        remote.fetch().await?;
        Ok(Self { remote })
    }

    /// Re-fetch, overwriting the cache unconditionally
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

    /// Entity tag of the cached graph
    pub fn etag(&self) -> Option<&EntityTag> {
        self.remote.etag()
    }

    /// Always `Unsupported`: readable resources have no write contract
    pub fn update(&self) -> Result<()> {
        Err(SaiError::unsupported(self.id(), "update of a read-only resource"))
    }
}
