//! Access authorizations
//!
//! The owner's immutable statement granting one agent a bundle of data
//! authorizations. Resolution never edits it; a newer authorization for the
//! same grantee names this one in `replaces`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sai_core::vocabulary::interop;
use sai_core::{Graph, ResourceId, Result, SaiError, Session};
use sai_registry::{GranteeRegistration, Registration};
use sai_resources::ImmutableResource;
use uuid::Uuid;

use crate::data_authorization::DataAuthorization;
use crate::record;

/// Bundle of data authorizations issued to one grantee
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessAuthorization {
    id: ResourceId,
    granted_by: ResourceId,
    granted_with: ResourceId,
    granted_at: DateTime<Utc>,
    grantee: ResourceId,
    access_need_group: Option<ResourceId>,
    replaces: Option<ResourceId>,
    data_authorizations: Vec<DataAuthorization>,
    discriminator: Option<String>,
}

impl AccessAuthorization {
    /// Start building an access authorization
    pub fn builder() -> AccessAuthorizationBuilder {
        AccessAuthorizationBuilder::default()
    }

    fn from_graph(graph: &Graph, data_authorizations: Vec<DataAuthorization>) -> Result<Self> {
        graph.expect_type(interop::ACCESS_AUTHORIZATION)?;
        let builder = AccessAuthorizationBuilder {
            granted_by: graph.node(interop::GRANTED_BY),
            granted_with: graph.node(interop::GRANTED_WITH),
            granted_at: graph.datetime(interop::GRANTED_AT),
            grantee: graph.node(interop::GRANTEE),
            access_need_group: graph.node(interop::HAS_ACCESS_NEED_GROUP),
            replaces: graph.node(interop::REPLACES),
            data_authorizations,
        };
        builder.validate(graph.id().clone())
    }

    /// Encode the access authorization document
    pub fn to_graph(&self) -> Result<Graph> {
        let mut graph = Graph::new(self.id.clone());
        self.write_statements(&mut graph)?;
        Ok(graph)
    }

    fn write_statements(&self, graph: &mut Graph) -> Result<()> {
        graph.set_type(interop::ACCESS_AUTHORIZATION)?;
        graph.set(interop::GRANTED_BY, self.granted_by.clone());
        graph.set(interop::GRANTED_WITH, self.granted_with.clone());
        graph.set(interop::GRANTED_AT, self.granted_at);
        graph.set(interop::GRANTEE, self.grantee.clone());
        graph.set_optional(interop::HAS_ACCESS_NEED_GROUP, self.access_need_group.clone());
        graph.set_optional(interop::REPLACES, self.replaces.clone());
        graph.set_nodes(
            interop::HAS_DATA_AUTHORIZATION,
            self.data_authorizations.iter().map(DataAuthorization::id),
        );
        Ok(())
    }

    /// Write the data authorizations, then the access authorization.
    ///
    /// Each record is write-once; a failure part way leaves the records
    /// written so far in place.
    pub async fn persist(&self, session: &Session) -> Result<()> {
        for data_authorization in &self.data_authorizations {
            data_authorization.persist(session).await?;
        }
        record::persist(session, &self.id, self.to_graph()?, self.discriminator.as_deref()).await?;
        tracing::info!(
            authorization = %self.id,
            grantee = %self.grantee,
            data_authorizations = self.data_authorizations.len(),
            "Persisted access authorization"
        );
        Ok(())
    }

    /// Identifier
    pub fn id(&self) -> &ResourceId {
        &self.id
    }

    /// Social agent issuing the authorization
    pub fn granted_by(&self) -> &ResourceId {
        &self.granted_by
    }

    /// Application used to issue it
    pub fn granted_with(&self) -> &ResourceId {
        &self.granted_with
    }

    /// Issuance time
    pub fn granted_at(&self) -> DateTime<Utc> {
        self.granted_at
    }

    /// Agent receiving access
    pub fn grantee(&self) -> &ResourceId {
        &self.grantee
    }

    /// Access need group the authorization answers
    pub fn access_need_group(&self) -> Option<&ResourceId> {
        self.access_need_group.as_ref()
    }

    /// Authorization this one replaces
    pub fn replaces(&self) -> Option<&ResourceId> {
        self.replaces.as_ref()
    }

    /// Nested data authorizations, in declaration order
    pub fn data_authorizations(&self) -> &[DataAuthorization] {
        &self.data_authorizations
    }

    /// Nested data authorization by identifier
    pub fn data_authorization(&self, id: &ResourceId) -> Option<&DataAuthorization> {
        self.data_authorizations.iter().find(|d| d.id() == id)
    }
}

#[async_trait]
impl Registration for AccessAuthorization {
    /// Fetch the access authorization and every data authorization it links
    async fn load(session: &Session, id: &ResourceId) -> Result<Self> {
        let record = ImmutableResource::get(session, id).await?;
        let graph = record.graph();
        let mut data_authorizations = Vec::new();
        for data_id in graph.nodes(interop::HAS_DATA_AUTHORIZATION) {
            data_authorizations.push(DataAuthorization::load(session, &data_id).await?);
        }
        Self::from_graph(graph, data_authorizations)
    }

    fn id(&self) -> &ResourceId {
        &self.id
    }
}

impl GranteeRegistration for AccessAuthorization {
    fn grantee(&self) -> &ResourceId {
        &self.grantee
    }

    fn replaces(&self) -> Option<&ResourceId> {
        self.replaces.as_ref()
    }
}

/// Validating builder for `AccessAuthorization`
#[derive(Debug, Clone, Default)]
pub struct AccessAuthorizationBuilder {
    granted_by: Option<ResourceId>,
    granted_with: Option<ResourceId>,
    granted_at: Option<DateTime<Utc>>,
    grantee: Option<ResourceId>,
    access_need_group: Option<ResourceId>,
    replaces: Option<ResourceId>,
    data_authorizations: Vec<DataAuthorization>,
}

impl AccessAuthorizationBuilder {
    /// Social agent issuing the authorization
    pub fn granted_by(mut self, granted_by: ResourceId) -> Self {
        self.granted_by = Some(granted_by);
        self
    }

    /// Application used to issue it
    pub fn granted_with(mut self, granted_with: ResourceId) -> Self {
        self.granted_with = Some(granted_with);
        self
    }

    /// Issuance time; defaults to now
    pub fn granted_at(mut self, granted_at: DateTime<Utc>) -> Self {
        self.granted_at = Some(granted_at);
        self
    }

    /// Agent receiving access
    pub fn grantee(mut self, grantee: ResourceId) -> Self {
        self.grantee = Some(grantee);
        self
    }

    /// Access need group the authorization answers
    pub fn access_need_group(mut self, group: ResourceId) -> Self {
        self.access_need_group = Some(group);
        self
    }

    /// Authorization being replaced
    pub fn replaces(mut self, previous: ResourceId) -> Self {
        self.replaces = Some(previous);
        self
    }

    /// Add a data authorization
    pub fn data_authorization(mut self, authorization: DataAuthorization) -> Self {
        self.data_authorizations.push(authorization);
        self
    }

    /// Validate and address the authorization inside `container`.
    ///
    /// Parents named by inherited data authorizations are not checked here;
    /// resolution reports a missing parent as `InvalidInheritance`.
    pub fn build(mut self, container: &ResourceId) -> Result<AccessAuthorization> {
        if self.granted_at.is_none() {
            self.granted_at = Some(Utc::now());
        }
        let discriminator = Uuid::new_v4().to_string();
        let mut authorization = self.validate(container.clone())?;
        let mut graph = Graph::new(container.clone());
        authorization.write_statements(&mut graph)?;
        let (id, _) = record::address(container, graph, &discriminator)?;
        authorization.id = id;
        authorization.discriminator = Some(discriminator);
        Ok(authorization)
    }

    fn validate(self, id: ResourceId) -> Result<AccessAuthorization> {
        let missing =
            |field: &str| SaiError::invalid(format!("access authorization {id} has no {field}"));
        let granted_by = self.granted_by.clone().ok_or_else(|| missing("granted_by"))?;
        let granted_with = self.granted_with.clone().ok_or_else(|| missing("granted_with"))?;
        let granted_at = self.granted_at.ok_or_else(|| missing("granted_at"))?;
        let grantee = self.grantee.clone().ok_or_else(|| missing("grantee"))?;
        if self.data_authorizations.is_empty() {
            return Err(missing("data authorizations"));
        }
        if let Some(other) = self
            .data_authorizations
            .iter()
            .find(|d| d.grantee() != &grantee)
        {
            return Err(SaiError::invalid(format!(
                "data authorization {} is for {} but access authorization {id} is for {grantee}",
                other.id(),
                other.grantee()
            )));
        }
        Ok(AccessAuthorization {
            id,
            granted_by,
            granted_with,
            granted_at,
            grantee,
            access_need_group: self.access_need_group,
            replaces: self.replaces,
            data_authorizations: self.data_authorizations,
            discriminator: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::ScopeKind;
    use sai_core::AccessModes;

    fn id(value: &str) -> ResourceId {
        ResourceId::parse(value).unwrap()
    }

    fn data_authorization(grantee: &str) -> DataAuthorization {
        DataAuthorization::builder()
            .grantee(id(grantee))
            .granted_by(id("https://alice.example/profile#me"))
            .shape_tree(id("https://shapetrees.example/pm#ProjectTree"))
            .access_modes(AccessModes::read_only())
            .scope(ScopeKind::AllFromRegistry)
            .data_registration(id("https://alice.example/data/projects/"))
            .build(&id("https://alice.example/authorization/"))
            .unwrap()
    }

    fn builder() -> AccessAuthorizationBuilder {
        AccessAuthorization::builder()
            .granted_by(id("https://alice.example/profile#me"))
            .granted_with(id("https://authz.example/#id"))
            .grantee(id("https://projectron.example/#id"))
    }

    #[test]
    fn test_build_links_data_authorizations() {
        let nested = data_authorization("https://projectron.example/#id");
        let authorization = builder()
            .data_authorization(nested.clone())
            .build(&id("https://alice.example/authorization/"))
            .unwrap();
        let graph = authorization.to_graph().unwrap();
        assert_eq!(graph.nodes(interop::HAS_DATA_AUTHORIZATION), vec![nested.id().clone()]);
        assert!(authorization.data_authorization(nested.id()).is_some());
    }

    #[test]
    fn test_rejects_grantee_mismatch() {
        let err = builder()
            .data_authorization(data_authorization("https://other.example/#id"))
            .build(&id("https://alice.example/authorization/"))
            .unwrap_err();
        assert!(err.to_string().contains("https://other.example/#id"));
    }

    #[test]
    fn test_rejects_empty_bundle() {
        let err = builder()
            .build(&id("https://alice.example/authorization/"))
            .unwrap_err();
        assert!(matches!(err, SaiError::Invalid { .. }));
    }
}
