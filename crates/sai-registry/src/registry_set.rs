//! Registry set: the owner's entry point to every registry
//!
//! Points at exactly one agent registry, one authorization registry and one
//! or more data registries. Only ever changed by re-pointing. Found from an
//! owner's WebID through their social agent profile.

use sai_core::vocabulary::interop;
use sai_core::{ResourceId, Result, SaiError, Session};
use sai_resources::CrudResource;

use crate::agents::AgentRegistry;
use crate::authorizations::AuthorizationRegistry;
use crate::data::{DataRegistration, DataRegistry};
use crate::profiles::SocialAgentProfile;

/// Aggregate of the owner's registries
#[derive(Debug, Clone)]
pub struct RegistrySet {
    resource: CrudResource,
    agent_registry: ResourceId,
    authorization_registry: ResourceId,
    data_registries: Vec<ResourceId>,
}

impl RegistrySet {
    /// Fetch the registry set at `id`
    pub async fn open(session: &Session, id: &ResourceId) -> Result<Self> {
        Self::from_resource(CrudResource::get(session, id).await?)
    }

    /// Open the registry set named by the profile of `webid`
    pub async fn open_for_owner(session: &Session, webid: &ResourceId) -> Result<Self> {
        let profile = SocialAgentProfile::load(session, webid).await?;
        tracing::debug!(owner = %webid, set = %profile.registry_set(), "Discovered registry set");
        Self::open(session, profile.registry_set()).await
    }

    fn from_resource(resource: CrudResource) -> Result<Self> {
        let graph = resource.graph();
        graph.expect_type(interop::REGISTRY_SET)?;
        let data_registries = graph.nodes(interop::HAS_DATA_REGISTRY);
        if data_registries.is_empty() {
            return Err(SaiError::invalid(format!(
                "{} links no data registry",
                resource.id()
            )));
        }
        Ok(Self {
            agent_registry: graph.require_node(interop::HAS_AGENT_REGISTRY)?,
            authorization_registry: graph.require_node(interop::HAS_AUTHORIZATION_REGISTRY)?,
            data_registries,
            resource,
        })
    }

    /// Re-fetch the set
    pub async fn refresh(&mut self) -> Result<()> {
        self.resource.refresh().await?;
        *self = Self::from_resource(self.resource.clone())?;
        Ok(())
    }

    /// Identifier
    pub fn id(&self) -> &ResourceId {
        self.resource.id()
    }

    fn session(&self) -> &Session {
        self.resource.session()
    }

    /// Agent registry identifier
    pub fn agent_registry_id(&self) -> &ResourceId {
        &self.agent_registry
    }

    /// Authorization registry identifier
    pub fn authorization_registry_id(&self) -> &ResourceId {
        &self.authorization_registry
    }

    /// Data registry identifiers
    pub fn data_registry_ids(&self) -> &[ResourceId] {
        &self.data_registries
    }

    /// Load the agent registry
    pub async fn agent_registry(&self) -> Result<AgentRegistry> {
        AgentRegistry::load(self.session(), &self.agent_registry).await
    }

    /// Load the authorization registry
    pub async fn authorization_registry(&self) -> Result<AuthorizationRegistry> {
        AuthorizationRegistry::load(self.session(), &self.authorization_registry).await
    }

    /// Load every data registry
    pub async fn data_registries(&self) -> Result<Vec<DataRegistry>> {
        let mut registries = Vec::with_capacity(self.data_registries.len());
        for id in &self.data_registries {
            registries.push(DataRegistry::load(self.session(), id).await?);
        }
        Ok(registries)
    }

    /// First data registration across all data registries holding `shape_tree`
    pub async fn find_data_registration(
        &self,
        shape_tree: &ResourceId,
    ) -> Result<Option<DataRegistration>> {
        for registry in self.data_registries().await? {
            if let Some(found) = registry.find_by_shape_tree(shape_tree).await? {
                return Ok(Some(found));
            }
        }
        Ok(None)
    }

    /// Point the set at a replacement agent registry
    pub async fn repoint_agent_registry(&mut self, registry: ResourceId) -> Result<()> {
        self.resource
            .graph_mut()
            .set(interop::HAS_AGENT_REGISTRY, registry.clone());
        self.resource.update().await?;
        tracing::info!(set = %self.id(), registry = %registry, "Re-pointed agent registry");
        self.agent_registry = registry;
        Ok(())
    }

    /// Point the set at a replacement authorization registry
    pub async fn repoint_authorization_registry(&mut self, registry: ResourceId) -> Result<()> {
        self.resource
            .graph_mut()
            .set(interop::HAS_AUTHORIZATION_REGISTRY, registry.clone());
        self.resource.update().await?;
        tracing::info!(set = %self.id(), registry = %registry, "Re-pointed authorization registry");
        self.authorization_registry = registry;
        Ok(())
    }

    /// Replace one data registry with another
    pub async fn repoint_data_registry(
        &mut self,
        previous: &ResourceId,
        registry: ResourceId,
    ) -> Result<()> {
        let Some(slot) = self.data_registries.iter().position(|id| id == previous) else {
            return Err(SaiError::not_found(previous));
        };
        let mut updated = self.data_registries.clone();
        updated[slot] = registry.clone();
        self.resource
            .graph_mut()
            .set_nodes(interop::HAS_DATA_REGISTRY, updated.iter());
        self.resource.update().await?;
        tracing::info!(set = %self.id(), from = %previous, to = %registry, "Re-pointed data registry");
        self.data_registries = updated;
        Ok(())
    }
}
