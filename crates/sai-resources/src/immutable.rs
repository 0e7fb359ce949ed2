//! Write-once, content-addressed records
//!
//! The identifier is `container/` followed by the hex digest of the graph's
//! canonical bytes and a caller-supplied discriminator. Two creates with the
//! same content and discriminator land on the same identifier; changing either
//! moves the record elsewhere, so a persisted record's bytes never change.

use crate::remote::RemoteResource;
use sai_core::{
    DuplicateCreatePolicy, EntityTag, Graph, Hash32, ResourceId, Result, SaiError, Session,
    WriteIntent,
};

/// Identifier a graph would be stored at inside `container`
pub fn content_address(
    container: &ResourceId,
    graph: &Graph,
    discriminator: &[u8],
) -> Result<ResourceId> {
    let digest = Hash32::from_content(&graph.canonical_bytes(), discriminator);
    container.child(&digest.to_hex())
}

/// Create-once record; update is not part of its contract
#[derive(Debug, Clone)]
pub struct ImmutableResource {
    remote: RemoteResource,
}

impl ImmutableResource {
    /// Persist `graph` inside `container` at its content address.
    ///
    /// When the address is occupied the configured `DuplicateCreatePolicy`
    /// decides: `Idempotent` loads the stored record, `Reject` fails with
    /// `AlreadyExists`.
    pub async fn create(
        session: &Session,
        container: &ResourceId,
        mut graph: Graph,
        discriminator: &[u8],
    ) -> Result<Self> {
        let id = content_address(container, &graph, discriminator)?;
        graph.set_id(id.clone());
        let mut remote = RemoteResource::with_graph(session.clone(), graph);
        match remote.put(WriteIntent::Create).await {
            Ok(_) => {
                tracing::debug!(resource = %id, "Persisted immutable record");
            }
            Err(SaiError::AlreadyExists { .. })
                if session.config().duplicate_create_policy == DuplicateCreatePolicy::Idempotent =>
            {
                tracing::debug!(resource = %id, "Immutable record already present");
                remote.fetch().await?;
            }
            Err(e) => return Err(e),
        }
        Ok(Self { remote })
    }

    /// Fetch an existing record
    pub async fn get(session: &Session, id: &ResourceId) -> Result<Self> {
        let mut remote = RemoteResource::new(session.clone(), id.clone());
        remote.fetch().await?;
        Ok(Self { remote })
    }

    /// Revoke the record. Deleting an absent record is not an error.
    pub async fn delete(&mut self) -> Result<()> {
        self.remote.delete().await?;
        tracing::info!(resource = %self.id(), "Revoked immutable record");
        Ok(())
    }

    /// Always `Unsupported`: immutable records are never modified
    pub fn update(&self) -> Result<()> {
        Err(SaiError::unsupported(self.id(), "update of an immutable record"))
    }

    /// Re-fetch the stored record
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

    /// Stored graph
    pub fn graph(&self) -> &Graph {
        self.remote.graph()
    }

    /// Entity tag, when the store reported one
    pub fn etag(&self) -> Option<&EntityTag> {
        self.remote.etag()
    }
}
