//! Closed union over the three lifecycle kinds
//!
//! Lets one document type be opened read-only or for editing and leaves the
//! mutation contract to the kind it was opened with.

use crate::crud::CrudResource;
use crate::immutable::ImmutableResource;
use crate::readable::ReadableResource;
use sai_core::{EntityTag, Graph, ResourceId, Result, SaiError, Session};

/// Mutation contract of a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    /// Fetch and refresh only
    Readable,
    /// Create, read, update, delete
    Crud,
    /// Create once, delete as revocation
    Immutable,
}

/// Any resource, dispatched by lifecycle kind
#[derive(Debug, Clone)]
pub enum Resource {
    /// Read-only mirror
    Readable(ReadableResource),
    /// Mutable record
    Crud(CrudResource),
    /// Write-once record
    Immutable(ImmutableResource),
}

impl Resource {
    /// Fetch `id` under the given lifecycle kind
    pub async fn get(session: &Session, id: &ResourceId, kind: ResourceKind) -> Result<Self> {
        Ok(match kind {
            ResourceKind::Readable => ReadableResource::get(session, id).await?.into(),
            ResourceKind::Crud => CrudResource::get(session, id).await?.into(),
            ResourceKind::Immutable => ImmutableResource::get(session, id).await?.into(),
        })
    }

    /// Lifecycle kind
    pub fn kind(&self) -> ResourceKind {
        match self {
            Resource::Readable(_) => ResourceKind::Readable,
            Resource::Crud(_) => ResourceKind::Crud,
            Resource::Immutable(_) => ResourceKind::Immutable,
        }
    }

    /// Identifier
    pub fn id(&self) -> &ResourceId {
        match self {
            Resource::Readable(r) => r.id(),
            Resource::Crud(r) => r.id(),
            Resource::Immutable(r) => r.id(),
        }
    }

    /// Cached graph
    pub fn graph(&self) -> &Graph {
        match self {
            Resource::Readable(r) => r.graph(),
            Resource::Crud(r) => r.graph(),
            Resource::Immutable(r) => r.graph(),
        }
    }

    /// Mutable graph; `Unsupported` unless the resource is CRUD
    pub fn graph_mut(&mut self) -> Result<&mut Graph> {
        match self {
            Resource::Crud(r) => Ok(r.graph_mut()),
            Resource::Readable(r) => Err(SaiError::unsupported(
                r.id(),
                "modification of a read-only resource",
            )),
            Resource::Immutable(r) => Err(SaiError::unsupported(
                r.id(),
                "modification of an immutable resource",
            )),
        }
    }

    /// Entity tag of the cached graph
    pub fn etag(&self) -> Option<&EntityTag> {
        match self {
            Resource::Readable(r) => r.etag(),
            Resource::Crud(r) => r.etag(),
            Resource::Immutable(r) => r.etag(),
        }
    }

    /// Re-fetch
    pub async fn refresh(&mut self) -> Result<()> {
        match self {
            Resource::Readable(r) => r.refresh().await,
            Resource::Crud(r) => r.refresh().await,
            Resource::Immutable(r) => r.refresh().await,
        }
    }

    /// Conditional update; `Unsupported` for readable and immutable kinds
    pub async fn update(&mut self) -> Result<()> {
        match self {
            Resource::Readable(r) => r.update(),
            Resource::Crud(r) => r.update().await,
            Resource::Immutable(r) => r.update(),
        }
    }

    /// Delete; `Unsupported` for the readable kind
    pub async fn delete(&mut self) -> Result<()> {
        match self {
            Resource::Readable(r) => Err(SaiError::unsupported(
                r.id(),
                "delete of a read-only resource",
            )),
            Resource::Crud(r) => r.delete().await,
            Resource::Immutable(r) => r.delete().await,
        }
    }
}

impl From<ReadableResource> for Resource {
    fn from(r: ReadableResource) -> Self {
        Resource::Readable(r)
    }
}

impl From<CrudResource> for Resource {
    fn from(r: CrudResource) -> Self {
        Resource::Crud(r)
    }
}

impl From<ImmutableResource> for Resource {
    fn from(r: ImmutableResource) -> Self {
        Resource::Immutable(r)
    }
}
