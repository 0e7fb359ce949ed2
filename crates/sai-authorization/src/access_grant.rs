//! Access grants: the compiled form of an access authorization

use chrono::{DateTime, Utc};
use sai_core::vocabulary::interop;
use sai_core::{Graph, ResourceId, Result, Session};
use sai_resources::ImmutableResource;

use crate::data_grant::DataGrant;
use crate::record;

/// Access grant owning the data grants resolved for one grantee
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessGrant {
    id: ResourceId,
    granted_by: ResourceId,
    granted_at: DateTime<Utc>,
    grantee: ResourceId,
    access_need_group: Option<ResourceId>,
    resolved_from: ResourceId,
    data_grants: Vec<DataGrant>,
    discriminator: Option<String>,
}

impl AccessGrant {
    pub(crate) fn assemble(
        container: &ResourceId,
        granted_by: ResourceId,
        grantee: ResourceId,
        access_need_group: Option<ResourceId>,
        resolved_from: ResourceId,
        data_grants: Vec<DataGrant>,
        discriminator: String,
    ) -> Result<Self> {
        let mut grant = Self {
            id: container.clone(),
            granted_by,
            granted_at: Utc::now(),
            grantee,
            access_need_group,
            resolved_from,
            data_grants,
            discriminator: None,
        };
        let (id, _) = record::address(container, grant.to_graph()?, &discriminator)?;
        grant.id = id;
        grant.discriminator = Some(discriminator);
        Ok(grant)
    }

    /// Fetch the access grant at `id` with every data grant it links
    pub async fn load(session: &Session, id: &ResourceId) -> Result<Self> {
        let record = ImmutableResource::get(session, id).await?;
        let graph = record.graph();
        graph.expect_type(interop::ACCESS_GRANT)?;
        let mut data_grants = Vec::new();
        for data_id in graph.nodes(interop::HAS_DATA_GRANT) {
            data_grants.push(DataGrant::load(session, &data_id).await?);
        }
        Ok(Self {
            id: id.clone(),
            granted_by: graph.require_node(interop::GRANTED_BY)?,
            granted_at: graph.require_datetime(interop::GRANTED_AT)?,
            grantee: graph.require_node(interop::GRANTEE)?,
            access_need_group: graph.node(interop::HAS_ACCESS_NEED_GROUP),
            resolved_from: graph.require_node(interop::HAS_ACCESS_AUTHORIZATION_SOURCE)?,
            data_grants,
            discriminator: None,
        })
    }

    /// Encode the access grant document
    pub fn to_graph(&self) -> Result<Graph> {
        let mut graph = Graph::new(self.id.clone());
        graph.set_type(interop::ACCESS_GRANT)?;
        graph.set(interop::GRANTED_BY, self.granted_by.clone());
        graph.set(interop::GRANTED_AT, self.granted_at);
        graph.set(interop::GRANTEE, self.grantee.clone());
        graph.set_optional(interop::HAS_ACCESS_NEED_GROUP, self.access_need_group.clone());
        graph.set(interop::HAS_ACCESS_AUTHORIZATION_SOURCE, self.resolved_from.clone());
        graph.set_nodes(
            interop::HAS_DATA_GRANT,
            self.data_grants.iter().map(DataGrant::id),
        );
        Ok(graph)
    }

    pub(crate) async fn persist(&self, session: &Session) -> Result<()> {
        record::persist(session, &self.id, self.to_graph()?, self.discriminator.as_deref()).await
    }

    /// Identifier
    pub fn id(&self) -> &ResourceId {
        &self.id
    }

    /// Social agent that issued the grant
    pub fn granted_by(&self) -> &ResourceId {
        &self.granted_by
    }

    /// Issuance time
    pub fn granted_at(&self) -> DateTime<Utc> {
        self.granted_at
    }

    /// Agent receiving access
    pub fn grantee(&self) -> &ResourceId {
        &self.grantee
    }

    /// Access need group the grant answers
    pub fn access_need_group(&self) -> Option<&ResourceId> {
        self.access_need_group.as_ref()
    }

    /// Access authorization this grant was resolved from
    pub fn resolved_from(&self) -> &ResourceId {
        &self.resolved_from
    }

    /// Data grants, parents before the grants inheriting from them
    pub fn data_grants(&self) -> &[DataGrant] {
        &self.data_grants
    }

    /// Data grant by identifier
    pub fn data_grant(&self, id: &ResourceId) -> Option<&DataGrant> {
        self.data_grants.iter().find(|grant| grant.id() == id)
    }

    /// Data grants inheriting directly from `parent`
    pub fn inheriting_grants<'a>(
        &'a self,
        parent: &'a ResourceId,
    ) -> impl Iterator<Item = &'a DataGrant> + 'a {
        self.data_grants
            .iter()
            .filter(move |grant| grant.scope().inherits_from() == Some(parent))
    }

    /// Data grants over `shape_tree`
    pub fn for_shape_tree<'a>(
        &'a self,
        shape_tree: &'a ResourceId,
    ) -> impl Iterator<Item = &'a DataGrant> + 'a {
        self.data_grants
            .iter()
            .filter(move |grant| grant.shape_tree() == shape_tree)
    }
}
