//! Agent registry and agent registrations
//!
//! The agent registry links one registration per social agent or
//! application the owner has a relationship with. An application's
//! registration also records the access grant currently issued to it and
//! every grant that grant superseded.

use async_trait::async_trait;
use sai_core::vocabulary::interop;
use sai_core::{Graph, ResourceId, Result, SaiError, Session};
use sai_resources::CrudResource;

use crate::registration::{
    Registration, RegistrationCursor, RegistrationList, RegistrationMetadata,
};

/// Kind of registered agent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentKind {
    /// Person or organization
    SocialAgent {
        /// Registration the agent keeps for the owner in its own storage
        reciprocal_registration: Option<ResourceId>,
    },
    /// Piece of software acting for the owner
    Application,
}

impl AgentKind {
    fn type_term(&self) -> &'static str {
        match self {
            AgentKind::SocialAgent { .. } => interop::SOCIAL_AGENT_REGISTRATION,
            AgentKind::Application => interop::APPLICATION_REGISTRATION,
        }
    }
}

/// Registration of one social agent or application
#[derive(Debug, Clone)]
pub struct AgentRegistration {
    resource: CrudResource,
    kind: AgentKind,
    metadata: RegistrationMetadata,
    registered_agent: ResourceId,
    access_grant: Option<ResourceId>,
    superseded_grants: Vec<ResourceId>,
}

impl AgentRegistration {
    /// New, unpersisted application registration at `id`
    pub fn new_application(
        session: &Session,
        id: ResourceId,
        registered_agent: ResourceId,
        metadata: RegistrationMetadata,
    ) -> Self {
        Self::new(session, id, AgentKind::Application, registered_agent, metadata)
    }

    /// New, unpersisted social agent registration at `id`
    pub fn new_social_agent(
        session: &Session,
        id: ResourceId,
        registered_agent: ResourceId,
        reciprocal_registration: Option<ResourceId>,
        metadata: RegistrationMetadata,
    ) -> Self {
        Self::new(
            session,
            id,
            AgentKind::SocialAgent {
                reciprocal_registration,
            },
            registered_agent,
            metadata,
        )
    }

    fn new(
        session: &Session,
        id: ResourceId,
        kind: AgentKind,
        registered_agent: ResourceId,
        metadata: RegistrationMetadata,
    ) -> Self {
        Self {
            resource: CrudResource::new(session, id),
            kind,
            metadata,
            registered_agent,
            access_grant: None,
            superseded_grants: Vec::new(),
        }
    }

    fn from_resource(resource: CrudResource) -> Result<Self> {
        let graph = resource.graph();
        let kind = if graph.has_type(interop::APPLICATION_REGISTRATION) {
            AgentKind::Application
        } else if graph.has_type(interop::SOCIAL_AGENT_REGISTRATION) {
            AgentKind::SocialAgent {
                reciprocal_registration: graph.node(interop::RECIPROCAL_REGISTRATION),
            }
        } else {
            return Err(SaiError::invalid(format!(
                "{} is not an agent registration",
                resource.id()
            )));
        };
        Ok(Self {
            kind,
            metadata: RegistrationMetadata::from_graph(graph)?,
            registered_agent: graph.require_node(interop::REGISTERED_AGENT)?,
            access_grant: graph.node(interop::HAS_ACCESS_GRANT),
            superseded_grants: graph.nodes(interop::HAS_SUPERSEDED_ACCESS_GRANT),
            resource,
        })
    }

    fn write_graph(&mut self) -> Result<()> {
        let kind = self.kind.clone();
        let metadata = self.metadata.clone();
        let agent = self.registered_agent.clone();
        let grant = self.access_grant.clone();
        let superseded = self.superseded_grants.clone();

        let graph = self.resource.graph_mut();
        graph.set_type(kind.type_term())?;
        metadata.write_to(graph);
        graph.set(interop::REGISTERED_AGENT, agent);
        graph.set_optional(interop::HAS_ACCESS_GRANT, grant);
        graph.set_nodes(interop::HAS_SUPERSEDED_ACCESS_GRANT, superseded.iter());
        if let AgentKind::SocialAgent {
            reciprocal_registration,
        } = kind
        {
            graph.set_optional(interop::RECIPROCAL_REGISTRATION, reciprocal_registration);
        }
        Ok(())
    }

    /// Persist a new registration; fails `AlreadyExists` if the id is taken
    pub async fn create(&mut self) -> Result<()> {
        self.write_graph()?;
        self.resource.create_in_place().await
    }

    /// Persist local changes, conditional on the observed entity tag
    pub async fn update(&mut self) -> Result<()> {
        self.metadata.touch();
        self.write_graph()?;
        self.resource.update().await
    }

    /// Re-fetch, discarding local changes
    pub async fn refresh(&mut self) -> Result<()> {
        self.resource.refresh().await?;
        let resource = self.resource.clone();
        *self = Self::from_resource(resource)?;
        Ok(())
    }

    /// Delete the registration document
    pub async fn delete(&mut self) -> Result<()> {
        self.resource.delete().await
    }

    /// Kind of registered agent
    pub fn kind(&self) -> &AgentKind {
        &self.kind
    }

    /// True for application registrations
    pub fn is_application(&self) -> bool {
        matches!(self.kind, AgentKind::Application)
    }

    /// True for social agent registrations
    pub fn is_social_agent(&self) -> bool {
        matches!(self.kind, AgentKind::SocialAgent { .. })
    }

    /// Registration metadata
    pub fn metadata(&self) -> &RegistrationMetadata {
        &self.metadata
    }

    /// Agent this registration describes
    pub fn registered_agent(&self) -> &ResourceId {
        &self.registered_agent
    }

    /// Social agent's registration of the owner, in the agent's own storage
    pub fn reciprocal_registration(&self) -> Option<&ResourceId> {
        match &self.kind {
            AgentKind::SocialAgent {
                reciprocal_registration,
            } => reciprocal_registration.as_ref(),
            AgentKind::Application => None,
        }
    }

    /// Access grant currently issued to the agent
    pub fn access_grant(&self) -> Option<&ResourceId> {
        self.access_grant.as_ref()
    }

    /// Grants replaced by later grants, oldest first
    pub fn superseded_grants(&self) -> &[ResourceId] {
        &self.superseded_grants
    }

    /// True when `grant` was replaced by a later grant
    pub fn is_superseded(&self, grant: &ResourceId) -> bool {
        self.superseded_grants.contains(grant)
    }

    /// Make `grant` current, moving any previous grant to the superseded
    /// list. Local only until `update`. Returns the previous grant.
    pub fn set_access_grant(&mut self, grant: ResourceId) -> Option<ResourceId> {
        if self.access_grant.as_ref() == Some(&grant) {
            return None;
        }
        let previous = self.access_grant.replace(grant);
        if let Some(ref prior) = previous {
            if !self.superseded_grants.contains(prior) {
                self.superseded_grants.push(prior.clone());
            }
        }
        previous
    }

    /// Fresh identifier inside the registration container
    pub fn generate_contained_id(&self) -> Result<ResourceId> {
        self.id().generate_contained()
    }

    /// Cached graph
    pub fn graph(&self) -> &Graph {
        self.resource.graph()
    }
}

#[async_trait]
impl Registration for AgentRegistration {
    async fn load(session: &Session, id: &ResourceId) -> Result<Self> {
        Self::from_resource(CrudResource::get(session, id).await?)
    }

    fn id(&self) -> &ResourceId {
        self.resource.id()
    }
}

/// Registry of social agents and applications
#[derive(Debug, Clone)]
pub struct AgentRegistry {
    resource: CrudResource,
    social_agents: RegistrationList<AgentRegistration>,
    applications: RegistrationList<AgentRegistration>,
}

impl AgentRegistry {
    /// Fetch the agent registry at `id`
    pub async fn load(session: &Session, id: &ResourceId) -> Result<Self> {
        let resource = CrudResource::get(session, id).await?;
        Self::from_resource(resource)
    }

    fn from_resource(resource: CrudResource) -> Result<Self> {
        resource.graph().expect_type(interop::AGENT_REGISTRY)?;
        Ok(Self {
            social_agents: RegistrationList::from_graph(
                resource.graph(),
                interop::HAS_SOCIAL_AGENT_REGISTRATION,
            ),
            applications: RegistrationList::from_graph(
                resource.graph(),
                interop::HAS_APPLICATION_REGISTRATION,
            ),
            resource,
        })
    }

    /// Re-fetch the registry and its membership
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

    /// Social agent registrations
    pub fn social_agents(&self) -> &RegistrationList<AgentRegistration> {
        &self.social_agents
    }

    /// Application registrations
    pub fn applications(&self) -> &RegistrationList<AgentRegistration> {
        &self.applications
    }

    /// Lazy walk over social agent registrations
    pub fn social_agent_cursor(&self) -> RegistrationCursor<AgentRegistration> {
        RegistrationCursor::new(
            self.session().clone(),
            self.id().clone(),
            interop::HAS_SOCIAL_AGENT_REGISTRATION,
        )
    }

    /// Lazy walk over application registrations
    pub fn application_cursor(&self) -> RegistrationCursor<AgentRegistration> {
        RegistrationCursor::new(
            self.session().clone(),
            self.id().clone(),
            interop::HAS_APPLICATION_REGISTRATION,
        )
    }

    /// Registration of the social agent `agent`, if registered
    pub async fn find_social_agent(&self, agent: &ResourceId) -> Result<Option<AgentRegistration>> {
        Self::find(self.session(), &self.social_agents, agent).await
    }

    /// Registration of the application `agent`, if registered
    pub async fn find_application(&self, agent: &ResourceId) -> Result<Option<AgentRegistration>> {
        Self::find(self.session(), &self.applications, agent).await
    }

    async fn find(
        session: &Session,
        list: &RegistrationList<AgentRegistration>,
        agent: &ResourceId,
    ) -> Result<Option<AgentRegistration>> {
        for id in list.ids() {
            let registration = AgentRegistration::load(session, id).await?;
            if registration.registered_agent() == agent {
                return Ok(Some(registration));
            }
        }
        Ok(None)
    }

    /// Identifier for a new registration inside this registry
    pub fn generate_contained_id(&self) -> Result<ResourceId> {
        let id = self.id().generate_contained()?;
        ResourceId::parse(&format!("{id}/"))
    }

    /// Persist `registration` and link it from the registry.
    ///
    /// Two writes, not atomic: the registration is created first, then the
    /// registry membership is updated. If the second write fails the error is
    /// returned and the created registration stays in place, unlinked.
    pub async fn add_registration(&mut self, registration: &mut AgentRegistration) -> Result<()> {
        let id = registration.id().clone();
        let list = match registration.kind() {
            AgentKind::SocialAgent { .. } => &mut self.social_agents,
            AgentKind::Application => &mut self.applications,
        };
        if list.contains(&id) {
            return Err(SaiError::already_exists(&id, "agent registration already linked"));
        }

        registration.create().await?;

        list.insert(id.clone());
        list.write_to(self.resource.graph_mut());
        if let Err(e) = self.resource.update().await {
            tracing::warn!(
                registry = %self.resource.id(),
                registration = %id,
                error = %e,
                "Registration created but registry membership update failed"
            );
            list.remove(&id);
            list.write_to(self.resource.graph_mut());
            return Err(e);
        }
        tracing::info!(
            registry = %self.resource.id(),
            registration = %id,
            "Added agent registration"
        );
        Ok(())
    }

    /// Unlink `registration` from the registry, then delete it.
    ///
    /// Two writes, not atomic: if the delete fails the registration is
    /// already unlinked. If the unlink itself fails the cached membership is
    /// left as it was.
    pub async fn remove_registration(&mut self, registration: &mut AgentRegistration) -> Result<()> {
        let id = registration.id().clone();
        let list = match registration.kind() {
            AgentKind::SocialAgent { .. } => &mut self.social_agents,
            AgentKind::Application => &mut self.applications,
        };
        let previous = list.clone();
        if !list.remove(&id) {
            return Err(SaiError::not_found(&id));
        }
        list.write_to(self.resource.graph_mut());
        if let Err(e) = self.resource.update().await {
            tracing::warn!(
                registry = %self.resource.id(),
                registration = %id,
                error = %e,
                "Registry membership not written; registration stays linked"
            );
            *list = previous;
            list.write_to(self.resource.graph_mut());
            return Err(e);
        }
        registration.delete().await?;
        tracing::info!(registry = %self.resource.id(), registration = %id, "Removed agent registration");
        Ok(())
    }
}

