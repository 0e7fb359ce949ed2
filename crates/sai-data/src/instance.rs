//! Data instances seen through a data grant
//!
//! Every remote operation checks the effective modes first and fails with
//! `ModeNotGranted` before a request is made. Effective modes are the grant's
//! modes, plus its creator modes when the instance names the grantee as its
//! creator.

use sai_authorization::DataGrant;
use sai_core::vocabulary::dcterms;
use sai_core::{AccessMode, AccessModes, Graph, ResourceId, Result, SaiError, Session, Value};
use sai_registry::{DataRegistration, Registration};
use sai_resources::CrudResource;

/// Link from a parent instance to a child instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentLink {
    /// Parent instance
    pub parent: ResourceId,
    /// Term on the parent pointing at the child
    pub relation: String,
}

/// One data instance with the modes its grant allows
#[derive(Debug, Clone)]
pub struct DataInstance {
    resource: CrudResource,
    grant: DataGrant,
    modes: AccessModes,
    parent: Option<ParentLink>,
}

impl DataInstance {
    pub(crate) fn new(resource: CrudResource, grant: DataGrant, parent: Option<ParentLink>) -> Self {
        let modes = grant.modes_for(resource.graph().node(dcterms::CREATOR).as_ref());
        Self {
            resource,
            grant,
            modes,
            parent,
        }
    }

    /// Identifier
    pub fn id(&self) -> &ResourceId {
        self.resource.id()
    }

    /// Cached graph
    pub fn graph(&self) -> &Graph {
        self.resource.graph()
    }

    /// Mutable graph; changes are local until `update`
    pub fn graph_mut(&mut self) -> &mut Graph {
        self.resource.graph_mut()
    }

    /// Agent recorded as the instance's creator
    pub fn creator(&self) -> Option<ResourceId> {
        self.resource.graph().node(dcterms::CREATOR)
    }

    /// Effective modes on this instance
    pub fn modes(&self) -> &AccessModes {
        &self.modes
    }

    /// Grant the instance was reached through
    pub fn grant(&self) -> &DataGrant {
        &self.grant
    }

    /// Parent instance, for instances reached through an inherited grant
    pub fn parent(&self) -> Option<&ParentLink> {
        self.parent.as_ref()
    }

    /// True when `mode` is allowed
    pub fn can(&self, mode: AccessMode) -> bool {
        self.modes.contains(mode)
    }

    fn require(&self, mode: AccessMode) -> Result<()> {
        if self.can(mode) {
            return Ok(());
        }
        Err(SaiError::ModeNotGranted {
            resource: self.id().clone(),
            mode,
            grant: self.grant.id().clone(),
        })
    }

    fn session(&self) -> &Session {
        self.resource.session()
    }

    /// Re-fetch the instance
    pub async fn refresh(&mut self) -> Result<()> {
        self.require(AccessMode::Read)?;
        self.resource.refresh().await?;
        self.modes = self.grant.modes_for(self.creator().as_ref());
        Ok(())
    }

    /// Write local changes back, conditional on the observed entity tag
    pub async fn update(&mut self) -> Result<()> {
        self.require(AccessMode::Update)?;
        self.resource.update().await
    }

    /// Delete the instance, then drop it from its registration and parent.
    ///
    /// Up to three writes, not atomic. If a later write fails the instance
    /// is already gone and the returned error names the document that could
    /// not be updated.
    pub async fn delete(&mut self) -> Result<()> {
        self.require(AccessMode::Delete)?;
        self.resource.delete().await?;

        let id = self.id().clone();
        DataRegistration::load(self.session(), self.grant.data_registration())
            .await?
            .remove_instance(&id)
            .await?;

        if let Some(link) = &self.parent {
            let mut parent = CrudResource::get(self.session(), &link.parent).await?;
            if parent
                .graph_mut()
                .remove_value(&link.relation, &Value::node(&id))
            {
                parent.update().await?;
            }
        }
        tracing::info!(instance = %id, grant = %self.grant.id(), "Deleted data instance");
        Ok(())
    }
}
