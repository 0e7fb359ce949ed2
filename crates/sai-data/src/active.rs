//! Access grants checked against the grantee's registration
//!
//! An access grant is only usable while the grantee's agent registration
//! names it as current. Once a newer grant supersedes it, opening or
//! re-walking it fails with `GrantRevoked`.

use sai_authorization::{AccessGrant, DataGrant, GrantScope};
use sai_core::vocabulary::dcterms;
use sai_core::{AccessMode, Graph, ResourceId, Result, SaiError, Session};
use sai_registry::{AgentRegistration, DataRegistration, Registration};
use sai_resources::CrudResource;
use std::sync::Arc;

use crate::enumerator::DataInstanceEnumerator;
use crate::instance::{DataInstance, ParentLink};

/// Access grant confirmed current at open time
#[derive(Debug, Clone)]
pub struct ActiveGrant {
    session: Session,
    registration: ResourceId,
    access_grant: Arc<AccessGrant>,
}

impl ActiveGrant {
    /// Open the access grant at `grant`.
    ///
    /// Grants are stored inside the grantee's agent registration, which is
    /// consulted to confirm the grant is still current.
    pub async fn open(session: &Session, grant: &ResourceId) -> Result<Self> {
        let registration = grant
            .parent_container()
            .ok_or_else(|| SaiError::invalid(format!("{grant} has no parent registration")))?;
        ensure_current(session, &registration, grant).await?;
        let access_grant = AccessGrant::load(session, grant).await?;
        tracing::debug!(grant = %grant, registration = %registration, "Opened access grant");
        Ok(Self {
            session: session.clone(),
            registration,
            access_grant: Arc::new(access_grant),
        })
    }

    /// Fail with `GrantRevoked` if the grant has been superseded since open
    pub async fn check(&self) -> Result<()> {
        ensure_current(&self.session, &self.registration, self.access_grant.id()).await
    }

    /// Session the grant was opened with
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Grantee's agent registration
    pub fn registration(&self) -> &ResourceId {
        &self.registration
    }

    /// The access grant
    pub fn access_grant(&self) -> &AccessGrant {
        &self.access_grant
    }

    /// Data grant of this access grant
    pub fn data_grant(&self, id: &ResourceId) -> Result<&DataGrant> {
        self.access_grant.data_grant(id).ok_or_else(|| {
            SaiError::invalid(format!(
                "{id} is not a data grant of {}",
                self.access_grant.id()
            ))
        })
    }

    /// Lazy walk over the instances `data_grant` covers
    pub fn enumerate(&self, data_grant: &ResourceId) -> Result<DataInstanceEnumerator> {
        let grant = self.data_grant(data_grant)?.clone();
        Ok(DataInstanceEnumerator::new(self.clone(), grant))
    }

    /// Create an instance in the registration of `data_grant`.
    ///
    /// Two writes, not atomic: the instance, then the registration listing.
    /// If the listing write fails the instance exists but is not listed.
    pub async fn new_instance(
        &self,
        data_grant: &ResourceId,
        fill: impl FnOnce(&mut Graph),
    ) -> Result<DataInstance> {
        let grant = self.data_grant(data_grant)?;
        match grant.scope() {
            GrantScope::AllFromRegistry => {}
            GrantScope::SelectedFromRegistry { .. } => {
                return Err(SaiError::invalid(format!(
                    "selected grant {data_grant} cannot add instances"
                )));
            }
            GrantScope::Inherited { .. } => {
                return Err(SaiError::invalid(format!(
                    "inherited grant {data_grant} only creates children of a parent instance"
                )));
            }
        }
        self.create(grant, fill, None).await
    }

    /// Create a child of `parent` under the inherited grant `data_grant`.
    ///
    /// Three writes, not atomic: the instance, the registration listing,
    /// then the `relation` link on the parent.
    pub async fn new_child_instance(
        &self,
        parent: &DataInstance,
        data_grant: &ResourceId,
        relation: &str,
        fill: impl FnOnce(&mut Graph),
    ) -> Result<DataInstance> {
        let grant = self.data_grant(data_grant)?;
        if grant.scope().inherits_from() != Some(parent.grant().id()) {
            return Err(SaiError::invalid(format!(
                "grant {data_grant} does not inherit from {}, the grant of {}",
                parent.grant().id(),
                parent.id()
            )));
        }
        let link = ParentLink {
            parent: parent.id().clone(),
            relation: relation.to_string(),
        };
        self.create(grant, fill, Some(link)).await
    }

    async fn create(
        &self,
        grant: &DataGrant,
        fill: impl FnOnce(&mut Graph),
        link: Option<ParentLink>,
    ) -> Result<DataInstance> {
        if !grant.access_modes().contains(AccessMode::Create) {
            return Err(SaiError::ModeNotGranted {
                resource: grant.data_registration().clone(),
                mode: AccessMode::Create,
                grant: grant.id().clone(),
            });
        }
        self.check().await?;

        let mut registration = DataRegistration::load(&self.session, grant.data_registration()).await?;
        let id = registration.generate_instance_id()?;
        let mut resource = CrudResource::new(&self.session, id.clone());
        fill(resource.graph_mut());
        resource
            .graph_mut()
            .set(dcterms::CREATOR, grant.grantee().clone());
        resource.create_in_place().await?;
        registration.add_instance(id.clone()).await?;

        if let Some(ref link) = link {
            let mut parent = CrudResource::get(&self.session, &link.parent).await?;
            parent.graph_mut().add(&link.relation, id.clone());
            parent.update().await?;
        }
        tracing::info!(
            instance = %id,
            grant = %grant.id(),
            parent = ?link.as_ref().map(|l| l.parent.as_str()),
            "Created data instance"
        );
        Ok(DataInstance::new(resource, grant.clone(), link))
    }
}

async fn ensure_current(session: &Session, registration: &ResourceId, grant: &ResourceId) -> Result<()> {
    let agent = AgentRegistration::load(session, registration).await?;
    if agent.access_grant() == Some(grant) {
        return Ok(());
    }
    tracing::debug!(
        grant = %grant,
        registration = %registration,
        superseded = agent.is_superseded(grant),
        "Access grant is not current"
    );
    Err(SaiError::GrantRevoked {
        grant: grant.clone(),
        registration: registration.clone(),
    })
}
