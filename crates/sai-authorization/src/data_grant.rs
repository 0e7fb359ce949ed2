//! Data grants: resolved, enforceable counterparts of data authorizations

use sai_core::vocabulary::interop;
use sai_core::{AccessModes, Graph, ResourceId, Result, SaiError, Session};
use sai_resources::ImmutableResource;

use crate::record;
use crate::scope::{GrantScope, ScopeKind};

/// Concrete grant over one data registration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataGrant {
    id: ResourceId,
    grantee: ResourceId,
    data_owner: ResourceId,
    shape_tree: ResourceId,
    data_registration: ResourceId,
    access_modes: AccessModes,
    creator_modes: AccessModes,
    scope: GrantScope,
    access_need: Option<ResourceId>,
    delegation_of: Option<ResourceId>,
    discriminator: Option<String>,
}

/// Fields of a data grant before it is addressed
#[derive(Debug, Clone)]
pub(crate) struct DataGrantFields {
    pub grantee: ResourceId,
    pub data_owner: ResourceId,
    pub shape_tree: ResourceId,
    pub data_registration: ResourceId,
    pub access_modes: AccessModes,
    pub creator_modes: AccessModes,
    pub scope: GrantScope,
    pub access_need: Option<ResourceId>,
    pub delegation_of: Option<ResourceId>,
}

impl DataGrant {
    /// Address a resolved grant inside `container`
    pub(crate) fn assemble(
        container: &ResourceId,
        fields: DataGrantFields,
        discriminator: String,
    ) -> Result<Self> {
        let mut grant = Self {
            id: container.clone(),
            grantee: fields.grantee,
            data_owner: fields.data_owner,
            shape_tree: fields.shape_tree,
            data_registration: fields.data_registration,
            access_modes: fields.access_modes,
            creator_modes: fields.creator_modes,
            scope: fields.scope,
            access_need: fields.access_need,
            delegation_of: fields.delegation_of,
            discriminator: None,
        };
        let (id, _) = record::address(container, grant.to_graph()?, &discriminator)?;
        grant.id = id;
        grant.discriminator = Some(discriminator);
        Ok(grant)
    }

    /// Fetch the data grant at `id`
    pub async fn load(session: &Session, id: &ResourceId) -> Result<Self> {
        let record = ImmutableResource::get(session, id).await?;
        Self::from_graph(record.graph())
    }

    /// Decode a data grant document
    pub fn from_graph(graph: &Graph) -> Result<Self> {
        graph.expect_type(interop::DATA_GRANT)?;
        let scope = match ScopeKind::read(graph, interop::SCOPE_OF_GRANT)? {
            ScopeKind::AllFromRegistry => GrantScope::AllFromRegistry,
            ScopeKind::SelectedFromRegistry => GrantScope::SelectedFromRegistry {
                instances: graph.nodes(interop::HAS_DATA_INSTANCE),
            },
            ScopeKind::Inherited => GrantScope::Inherited {
                inherits_from: graph.require_node(interop::INHERITS_FROM_GRANT)?,
            },
            ScopeKind::AllFromAgent => {
                return Err(SaiError::invalid(format!(
                    "data grant {} has unresolved scope {}",
                    graph.id(),
                    ScopeKind::AllFromAgent
                )));
            }
        };
        let access_modes = record::read_modes(graph, interop::ACCESS_MODE)?;
        if access_modes.is_empty() {
            return Err(SaiError::invalid(format!(
                "data grant {} grants no access modes",
                graph.id()
            )));
        }
        Ok(Self {
            id: graph.id().clone(),
            grantee: graph.require_node(interop::GRANTEE)?,
            data_owner: graph.require_node(interop::DATA_OWNER)?,
            shape_tree: graph.require_node(interop::REGISTERED_SHAPE_TREE)?,
            data_registration: graph.require_node(interop::HAS_DATA_REGISTRATION)?,
            access_modes,
            creator_modes: record::read_modes(graph, interop::CREATOR_ACCESS_MODE)?,
            scope,
            access_need: graph.node(interop::SATISFIES_ACCESS_NEED),
            delegation_of: graph.node(interop::DELEGATION_OF_GRANT),
            discriminator: None,
        })
    }

    /// Encode as a document
    pub fn to_graph(&self) -> Result<Graph> {
        let mut graph = Graph::new(self.id.clone());
        graph.set_type(interop::DATA_GRANT)?;
        graph.set(interop::GRANTEE, self.grantee.clone());
        graph.set(interop::DATA_OWNER, self.data_owner.clone());
        graph.set(interop::REGISTERED_SHAPE_TREE, self.shape_tree.clone());
        graph.set(interop::HAS_DATA_REGISTRATION, self.data_registration.clone());
        record::write_modes(&mut graph, interop::ACCESS_MODE, &self.access_modes)?;
        record::write_modes(&mut graph, interop::CREATOR_ACCESS_MODE, &self.creator_modes)?;
        record::write_scope(&mut graph, interop::SCOPE_OF_GRANT, self.scope.kind())?;
        graph.set_optional(interop::SATISFIES_ACCESS_NEED, self.access_need.clone());
        graph.set_optional(interop::DELEGATION_OF_GRANT, self.delegation_of.clone());
        match &self.scope {
            GrantScope::AllFromRegistry => {}
            GrantScope::SelectedFromRegistry { instances } => {
                graph.set_nodes(interop::HAS_DATA_INSTANCE, instances.iter());
            }
            GrantScope::Inherited { inherits_from } => {
                graph.set(interop::INHERITS_FROM_GRANT, inherits_from.clone());
            }
        }
        Ok(graph)
    }

    pub(crate) async fn persist(&self, session: &Session) -> Result<()> {
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

    /// Owner of the data in scope
    pub fn data_owner(&self) -> &ResourceId {
        &self.data_owner
    }

    /// Shape tree of the instances in scope
    pub fn shape_tree(&self) -> &ResourceId {
        &self.shape_tree
    }

    /// Registration holding the instances in scope
    pub fn data_registration(&self) -> &ResourceId {
        &self.data_registration
    }

    /// Modes on every instance in scope
    pub fn access_modes(&self) -> &AccessModes {
        &self.access_modes
    }

    /// Extra modes on instances the grantee created
    pub fn creator_modes(&self) -> &AccessModes {
        &self.creator_modes
    }

    /// Effective modes on an instance created by `creator`
    pub fn modes_for(&self, creator: Option<&ResourceId>) -> AccessModes {
        if creator == Some(&self.grantee) {
            self.access_modes.union(&self.creator_modes)
        } else {
            self.access_modes.clone()
        }
    }

    /// Resolved scope
    pub fn scope(&self) -> &GrantScope {
        &self.scope
    }

    /// Access need this grant satisfies
    pub fn access_need(&self) -> Option<&ResourceId> {
        self.access_need.as_ref()
    }

    /// Remote grant this one was delegated from
    pub fn delegation_of(&self) -> Option<&ResourceId> {
        self.delegation_of.as_ref()
    }

    /// True when other grants may inherit from this one.
    ///
    /// Delegated grants are not inheritable.
    pub fn is_inheritable(&self) -> bool {
        self.delegation_of.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sai_core::AccessMode;

    fn id(value: &str) -> ResourceId {
        ResourceId::parse(value).unwrap()
    }

    fn fields() -> DataGrantFields {
        DataGrantFields {
            grantee: id("https://projectron.example/#id"),
            data_owner: id("https://alice.example/profile#me"),
            shape_tree: id("https://shapetrees.example/pm#ProjectTree"),
            data_registration: id("https://alice.example/data/projects/"),
            access_modes: AccessModes::read_only(),
            creator_modes: [AccessMode::Update, AccessMode::Delete].into_iter().collect(),
            scope: GrantScope::SelectedFromRegistry {
                instances: vec![id("https://alice.example/data/projects/p1")],
            },
            access_need: None,
            delegation_of: None,
        }
    }

    #[test]
    fn test_assemble_and_decode() {
        let container = id("https://alice.example/agents/projectron/");
        let grant = DataGrant::assemble(&container, fields(), "issuance:0".to_string()).unwrap();
        assert_eq!(grant.id().parent_container(), Some(container));

        let decoded = DataGrant::from_graph(&grant.to_graph().unwrap()).unwrap();
        assert_eq!(decoded.scope(), grant.scope());
        assert_eq!(decoded.creator_modes(), grant.creator_modes());
        assert!(decoded.is_inheritable());
    }

    #[test]
    fn test_creator_modes_apply_to_grantee_only() {
        let container = id("https://alice.example/agents/projectron/");
        let grant = DataGrant::assemble(&container, fields(), "issuance:0".to_string()).unwrap();

        let own = grant.modes_for(Some(&id("https://projectron.example/#id")));
        assert!(own.contains(AccessMode::Update));
        assert!(own.contains(AccessMode::Read));

        let other = grant.modes_for(Some(&id("https://bob.example/profile#me")));
        assert_eq!(other, AccessModes::read_only());
        assert_eq!(grant.modes_for(None), AccessModes::read_only());
    }

    #[test]
    fn test_discriminator_separates_identical_grants() {
        let container = id("https://alice.example/agents/projectron/");
        let a = DataGrant::assemble(&container, fields(), "one:0".to_string()).unwrap();
        let b = DataGrant::assemble(&container, fields(), "one:1".to_string()).unwrap();
        assert_ne!(a.id(), b.id());
    }
}
