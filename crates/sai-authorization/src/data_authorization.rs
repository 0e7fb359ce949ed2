//! Data authorizations: one scope rule inside an access authorization
//!
//! Built through `DataAuthorizationBuilder`, which rejects incomplete or
//! contradictory state. Documents read back from the store pass through the
//! same checks, so a `DataAuthorization` value is always well formed.

use sai_core::vocabulary::interop;
use sai_core::{AccessModes, Graph, ResourceId, Result, SaiError, Session};
use sai_resources::ImmutableResource;
use uuid::Uuid;

use crate::record;
use crate::scope::{AuthorizationScope, ScopeKind};

/// One scope rule with its access modes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataAuthorization {
    id: ResourceId,
    grantee: ResourceId,
    granted_by: ResourceId,
    data_owner: Option<ResourceId>,
    shape_tree: ResourceId,
    access_modes: AccessModes,
    creator_modes: AccessModes,
    scope: AuthorizationScope,
    access_need: Option<ResourceId>,
    discriminator: Option<String>,
}

impl DataAuthorization {
    /// Start building a data authorization
    pub fn builder() -> DataAuthorizationBuilder {
        DataAuthorizationBuilder::default()
    }

    /// Fetch and validate the data authorization at `id`
    pub async fn load(session: &Session, id: &ResourceId) -> Result<Self> {
        let record = ImmutableResource::get(session, id).await?;
        Self::from_graph(record.graph())
    }

    /// Decode and validate a data authorization document
    pub fn from_graph(graph: &Graph) -> Result<Self> {
        graph.expect_type(interop::DATA_AUTHORIZATION)?;
        let builder = DataAuthorizationBuilder {
            grantee: graph.node(interop::GRANTEE),
            granted_by: graph.node(interop::GRANTED_BY),
            data_owner: graph.node(interop::DATA_OWNER),
            shape_tree: graph.node(interop::REGISTERED_SHAPE_TREE),
            access_modes: record::read_modes(graph, interop::ACCESS_MODE)?,
            creator_modes: record::read_modes(graph, interop::CREATOR_ACCESS_MODE)?,
            scope: Some(ScopeKind::read(graph, interop::SCOPE_OF_AUTHORIZATION)?),
            data_registration: graph.node(interop::HAS_DATA_REGISTRATION),
            instances: graph.nodes(interop::HAS_DATA_INSTANCE),
            inherits_from: graph.node(interop::INHERITS_FROM_AUTHORIZATION),
            tolerate_missing: graph
                .boolean(interop::TOLERATE_MISSING_INSTANCES)
                .unwrap_or(false),
            access_need: graph.node(interop::SATISFIES_ACCESS_NEED),
        };
        builder.validate(graph.id().clone())
    }

    /// Encode as a document, addressed at `id`
    pub fn to_graph(&self) -> Result<Graph> {
        let mut graph = Graph::new(self.id.clone());
        self.write_statements(&mut graph)?;
        Ok(graph)
    }

    fn write_statements(&self, graph: &mut Graph) -> Result<()> {
        graph.set_type(interop::DATA_AUTHORIZATION)?;
        graph.set(interop::GRANTEE, self.grantee.clone());
        graph.set(interop::GRANTED_BY, self.granted_by.clone());
        graph.set_optional(interop::DATA_OWNER, self.data_owner.clone());
        graph.set(interop::REGISTERED_SHAPE_TREE, self.shape_tree.clone());
        record::write_modes(graph, interop::ACCESS_MODE, &self.access_modes)?;
        record::write_modes(graph, interop::CREATOR_ACCESS_MODE, &self.creator_modes)?;
        record::write_scope(graph, interop::SCOPE_OF_AUTHORIZATION, self.scope.kind())?;
        graph.set_optional(interop::SATISFIES_ACCESS_NEED, self.access_need.clone());
        match &self.scope {
            AuthorizationScope::AllFromRegistry { data_registration } => {
                graph.set(interop::HAS_DATA_REGISTRATION, data_registration.clone());
            }
            AuthorizationScope::SelectedFromRegistry {
                data_registration,
                instances,
                tolerate_missing,
            } => {
                graph.set(interop::HAS_DATA_REGISTRATION, data_registration.clone());
                graph.set_nodes(interop::HAS_DATA_INSTANCE, instances.iter());
                if *tolerate_missing {
                    graph.set(interop::TOLERATE_MISSING_INSTANCES, true);
                }
            }
            AuthorizationScope::AllFromAgent => {}
            AuthorizationScope::Inherited {
                inherits_from,
                data_registration,
            } => {
                graph.set(interop::INHERITS_FROM_AUTHORIZATION, inherits_from.clone());
                graph.set_optional(interop::HAS_DATA_REGISTRATION, data_registration.clone());
            }
        }
        Ok(())
    }

    /// Write a freshly built authorization at its content address
    pub async fn persist(&self, session: &Session) -> Result<()> {
        record::persist(session, &self.id, self.to_graph()?, self.discriminator.as_deref()).await
    }

    /// Identifier
    pub fn id(&self) -> &ResourceId {
        &self.id
    }

    /// Agent receiving access
    pub fn grantee(&self) -> &ResourceId {
        &self.grantee
    }

    /// Social agent issuing the authorization
    pub fn granted_by(&self) -> &ResourceId {
        &self.granted_by
    }

    /// Owner of the data, when it differs from the issuer
    pub fn data_owner(&self) -> Option<&ResourceId> {
        self.data_owner.as_ref()
    }

    /// Shape tree of the authorized instances
    pub fn shape_tree(&self) -> &ResourceId {
        &self.shape_tree
    }

    /// Modes granted on every instance in scope
    pub fn access_modes(&self) -> &AccessModes {
        &self.access_modes
    }

    /// Extra modes on instances the grantee created
    pub fn creator_modes(&self) -> &AccessModes {
        &self.creator_modes
    }

    /// Scope rule
    pub fn scope(&self) -> &AuthorizationScope {
        &self.scope
    }

    /// Access need this authorization satisfies
    pub fn access_need(&self) -> Option<&ResourceId> {
        self.access_need.as_ref()
    }
}

/// Validating builder for `DataAuthorization`
#[derive(Debug, Clone, Default)]
pub struct DataAuthorizationBuilder {
    grantee: Option<ResourceId>,
    granted_by: Option<ResourceId>,
    data_owner: Option<ResourceId>,
    shape_tree: Option<ResourceId>,
    access_modes: AccessModes,
    creator_modes: AccessModes,
    scope: Option<ScopeKind>,
    data_registration: Option<ResourceId>,
    instances: Vec<ResourceId>,
    inherits_from: Option<ResourceId>,
    tolerate_missing: bool,
    access_need: Option<ResourceId>,
}

impl DataAuthorizationBuilder {
    /// Agent receiving access
    pub fn grantee(mut self, grantee: ResourceId) -> Self {
        self.grantee = Some(grantee);
        self
    }

    /// Social agent issuing the authorization
    pub fn granted_by(mut self, granted_by: ResourceId) -> Self {
        self.granted_by = Some(granted_by);
        self
    }

    /// Owner of the data; required for `AllFromAgent`
    pub fn data_owner(mut self, data_owner: ResourceId) -> Self {
        self.data_owner = Some(data_owner);
        self
    }

    /// Shape tree of the authorized instances
    pub fn shape_tree(mut self, shape_tree: ResourceId) -> Self {
        self.shape_tree = Some(shape_tree);
        self
    }

    /// Modes granted on every instance in scope
    pub fn access_modes(mut self, modes: AccessModes) -> Self {
        self.access_modes = modes;
        self
    }

    /// Extra modes on instances the grantee created
    pub fn creator_modes(mut self, modes: AccessModes) -> Self {
        self.creator_modes = modes;
        self
    }

    /// Scope kind
    pub fn scope(mut self, scope: ScopeKind) -> Self {
        self.scope = Some(scope);
        self
    }

    /// Data registration the scope draws from
    pub fn data_registration(mut self, registration: ResourceId) -> Self {
        self.data_registration = Some(registration);
        self
    }

    /// Select one instance
    pub fn instance(mut self, instance: ResourceId) -> Self {
        self.instances.push(instance);
        self
    }

    /// Select several instances
    pub fn instances(mut self, instances: impl IntoIterator<Item = ResourceId>) -> Self {
        self.instances.extend(instances);
        self
    }

    /// Parent data authorization
    pub fn inherits_from(mut self, parent: ResourceId) -> Self {
        self.inherits_from = Some(parent);
        self
    }

    /// Skip selected instances that no longer exist at resolution time
    pub fn tolerate_missing_instances(mut self, tolerate: bool) -> Self {
        self.tolerate_missing = tolerate;
        self
    }

    /// Access need the authorization satisfies
    pub fn access_need(mut self, access_need: ResourceId) -> Self {
        self.access_need = Some(access_need);
        self
    }

    /// Validate and address the authorization inside `container`
    pub fn build(self, container: &ResourceId) -> Result<DataAuthorization> {
        let discriminator = Uuid::new_v4().to_string();
        // Placeholder subject; replaced by the content address below
        let mut authorization = self.validate(container.clone())?;
        let mut graph = Graph::new(container.clone());
        authorization.write_statements(&mut graph)?;
        let (id, _) = record::address(container, graph, &discriminator)?;
        authorization.id = id;
        authorization.discriminator = Some(discriminator);
        Ok(authorization)
    }

    fn validate(self, id: ResourceId) -> Result<DataAuthorization> {
        let missing = |field: &str| SaiError::invalid(format!("data authorization {id} has no {field}"));
        let grantee = self.grantee.clone().ok_or_else(|| missing("grantee"))?;
        let granted_by = self.granted_by.clone().ok_or_else(|| missing("granted_by"))?;
        let shape_tree = self.shape_tree.clone().ok_or_else(|| missing("shape tree"))?;
        let kind = self.scope.ok_or_else(|| missing("scope"))?;
        if self.access_modes.is_empty() {
            return Err(SaiError::invalid(format!(
                "data authorization {id} grants no access modes"
            )));
        }
        if kind != ScopeKind::SelectedFromRegistry && !self.instances.is_empty() {
            return Err(SaiError::invalid(format!(
                "data authorization {id} lists instances but its scope is {kind}"
            )));
        }
        if kind != ScopeKind::Inherited && self.inherits_from.is_some() {
            return Err(SaiError::invalid(format!(
                "data authorization {id} names a parent but its scope is {kind}"
            )));
        }

        let scope = match kind {
            ScopeKind::AllFromRegistry => AuthorizationScope::AllFromRegistry {
                data_registration: self
                    .data_registration
                    .ok_or_else(|| missing("data registration"))?,
            },
            ScopeKind::SelectedFromRegistry => {
                let data_registration = self
                    .data_registration
                    .ok_or_else(|| missing("data registration"))?;
                if self.instances.is_empty() {
                    return Err(missing("selected instances"));
                }
                AuthorizationScope::SelectedFromRegistry {
                    data_registration,
                    instances: self.instances,
                    tolerate_missing: self.tolerate_missing,
                }
            }
            ScopeKind::AllFromAgent => {
                if self.data_owner.is_none() {
                    return Err(missing("data owner"));
                }
                if self.data_registration.is_some() {
                    return Err(SaiError::invalid(format!(
                        "data authorization {id} names a data registration but its scope is {kind}"
                    )));
                }
                AuthorizationScope::AllFromAgent
            }
            ScopeKind::Inherited => AuthorizationScope::Inherited {
                inherits_from: self.inherits_from.ok_or_else(|| missing("parent authorization"))?,
                data_registration: self.data_registration,
            },
        };

        Ok(DataAuthorization {
            id,
            grantee,
            granted_by,
            data_owner: self.data_owner,
            shape_tree,
            access_modes: self.access_modes,
            creator_modes: self.creator_modes,
            scope,
            access_need: self.access_need,
            discriminator: None,
        })
    }
}
