//! Social agent and application profiles
//!
//! A social agent's profile is the document behind their WebID. It names
//! the registry set, the authorization agent acting for them, their access
//! inbox and the identity providers they trust. Application profiles
//! describe an application and the access need groups it asks for.
//!
//! Both open read-only with `load` or for editing with `load_editable`;
//! setters on a read-only profile fail with `Unsupported`.

use sai_core::vocabulary::{interop, solid};
use sai_core::{Graph, ResourceId, Result, SaiError, Session, Value};
use sai_resources::{Resource, ResourceKind};

/// Profile document behind a social agent's WebID
#[derive(Debug, Clone)]
pub struct SocialAgentProfile {
    resource: Resource,
    registry_set: ResourceId,
    authorization_agent: ResourceId,
    access_inbox: ResourceId,
    oidc_issuers: Vec<ResourceId>,
}

impl SocialAgentProfile {
    /// Fetch the profile of `webid` read-only
    pub async fn load(session: &Session, webid: &ResourceId) -> Result<Self> {
        Self::from_resource(Resource::get(session, webid, ResourceKind::Readable).await?)
    }

    /// Fetch the profile of `webid` for editing
    pub async fn load_editable(session: &Session, webid: &ResourceId) -> Result<Self> {
        Self::from_resource(Resource::get(session, webid, ResourceKind::Crud).await?)
    }

    fn from_resource(resource: Resource) -> Result<Self> {
        let graph = resource.graph();
        let oidc_issuers = graph.nodes(solid::OIDC_ISSUER);
        if oidc_issuers.is_empty() {
            return Err(SaiError::invalid(format!(
                "{} names no identity provider",
                resource.id()
            )));
        }
        Ok(Self {
            registry_set: graph.require_node(interop::HAS_REGISTRY_SET)?,
            authorization_agent: graph.require_node(interop::HAS_AUTHORIZATION_AGENT)?,
            access_inbox: graph.require_node(interop::HAS_ACCESS_INBOX)?,
            oidc_issuers,
            resource,
        })
    }

    /// WebID
    pub fn id(&self) -> &ResourceId {
        self.resource.id()
    }

    /// Registry set of the social agent
    pub fn registry_set(&self) -> &ResourceId {
        &self.registry_set
    }

    /// Authorization agent acting for the social agent
    pub fn authorization_agent(&self) -> &ResourceId {
        &self.authorization_agent
    }

    /// Inbox receiving access requests
    pub fn access_inbox(&self) -> &ResourceId {
        &self.access_inbox
    }

    /// Trusted identity providers
    pub fn oidc_issuers(&self) -> &[ResourceId] {
        &self.oidc_issuers
    }

    /// Point the profile at another registry set
    pub fn set_registry_set(&mut self, registry_set: ResourceId) -> Result<()> {
        self.resource
            .graph_mut()?
            .set(interop::HAS_REGISTRY_SET, registry_set.clone());
        self.registry_set = registry_set;
        Ok(())
    }

    /// Hand the social agent to another authorization agent
    pub fn set_authorization_agent(&mut self, agent: ResourceId) -> Result<()> {
        self.resource
            .graph_mut()?
            .set(interop::HAS_AUTHORIZATION_AGENT, agent.clone());
        self.authorization_agent = agent;
        Ok(())
    }

    /// Move the access inbox
    pub fn set_access_inbox(&mut self, inbox: ResourceId) -> Result<()> {
        self.resource
            .graph_mut()?
            .set(interop::HAS_ACCESS_INBOX, inbox.clone());
        self.access_inbox = inbox;
        Ok(())
    }

    /// Persist edits, conditional on the observed entity tag
    pub async fn update(&mut self) -> Result<()> {
        self.resource.update().await?;
        tracing::info!(profile = %self.id(), "Updated social agent profile");
        Ok(())
    }
}

/// Profile document of an application
#[derive(Debug, Clone)]
pub struct ApplicationProfile {
    resource: Resource,
    name: String,
    description: String,
    author: ResourceId,
    thumbnail: Option<ResourceId>,
    access_need_groups: Vec<ResourceId>,
}

impl ApplicationProfile {
    /// Fetch the profile of application `id` read-only
    pub async fn load(session: &Session, id: &ResourceId) -> Result<Self> {
        Self::from_resource(Resource::get(session, id, ResourceKind::Readable).await?)
    }

    /// Fetch the profile of application `id` for editing
    pub async fn load_editable(session: &Session, id: &ResourceId) -> Result<Self> {
        Self::from_resource(Resource::get(session, id, ResourceKind::Crud).await?)
    }

    fn from_resource(resource: Resource) -> Result<Self> {
        let graph: &Graph = resource.graph();
        Ok(Self {
            name: graph.require_text(interop::APPLICATION_NAME)?.to_string(),
            description: graph.require_text(interop::APPLICATION_DESCRIPTION)?.to_string(),
            author: graph.require_node(interop::APPLICATION_AUTHOR)?,
            thumbnail: graph.node(interop::APPLICATION_THUMBNAIL),
            access_need_groups: graph.nodes(interop::HAS_ACCESS_NEED_GROUP),
            resource,
        })
    }

    /// Application identifier
    pub fn id(&self) -> &ResourceId {
        self.resource.id()
    }

    /// Display name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Description
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Author of the application
    pub fn author(&self) -> &ResourceId {
        &self.author
    }

    /// Logo
    pub fn thumbnail(&self) -> Option<&ResourceId> {
        self.thumbnail.as_ref()
    }

    /// Access need groups the application requests
    pub fn access_need_groups(&self) -> &[ResourceId] {
        &self.access_need_groups
    }

    /// Rename the application
    pub fn set_name(&mut self, name: impl Into<String>) -> Result<()> {
        let name = name.into();
        self.resource
            .graph_mut()?
            .set(interop::APPLICATION_NAME, Value::text(name.clone()));
        self.name = name;
        Ok(())
    }

    /// Replace the description
    pub fn set_description(&mut self, description: impl Into<String>) -> Result<()> {
        let description = description.into();
        self.resource
            .graph_mut()?
            .set(interop::APPLICATION_DESCRIPTION, Value::text(description.clone()));
        self.description = description;
        Ok(())
    }

    /// Request one more access need group. No-op if already requested.
    pub fn add_access_need_group(&mut self, group: ResourceId) -> Result<()> {
        if self.access_need_groups.contains(&group) {
            return Ok(());
        }
        self.resource
            .graph_mut()?
            .add(interop::HAS_ACCESS_NEED_GROUP, group.clone());
        self.access_need_groups.push(group);
        Ok(())
    }

    /// Persist edits, conditional on the observed entity tag
    pub async fn update(&mut self) -> Result<()> {
        self.resource.update().await?;
        tracing::info!(profile = %self.id(), "Updated application profile");
        Ok(())
    }
}
