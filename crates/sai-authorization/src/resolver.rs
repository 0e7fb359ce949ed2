//! Grant resolution engine
//!
//! Turns an access authorization into an access grant in two phases:
//!
//! 1. `resolve` reads the registries and builds every data grant in memory.
//!    Nothing is written; any failure here leaves the store untouched.
//! 2. `persist` writes the data grants (parents first) and then the access
//!    grant as write-once records. The store offers no transaction, so a
//!    failure part way is reported as `PartialGrantFailure` naming what was
//!    already written. Cleanup is left to the caller.
//!
//! `issue` runs both phases and then records the new grant on the grantee's
//! agent registration, superseding the previous one.

use indexmap::{IndexMap, IndexSet};
use sai_core::{DanglingReferencePolicy, ResourceId, Result, SaiError, Session};
use sai_registry::{AgentRegistration, DataRegistration, Registration, RegistrySet};
use uuid::Uuid;

use crate::access_authorization::AccessAuthorization;
use crate::access_grant::AccessGrant;
use crate::data_authorization::DataAuthorization;
use crate::data_grant::{DataGrant, DataGrantFields};
use crate::scope::{AuthorizationScope, GrantScope, ScopeKind};

/// Access grant resolved in memory, ready to persist
#[derive(Debug, Clone)]
pub struct GrantPlan {
    registration: AgentRegistration,
    access_grant: AccessGrant,
}

impl GrantPlan {
    /// Grantee's agent registration; grants are addressed inside it
    pub fn registration(&self) -> &AgentRegistration {
        &self.registration
    }

    /// Resolved access grant
    pub fn access_grant(&self) -> &AccessGrant {
        &self.access_grant
    }

    /// Resolved data grants in write order
    pub fn data_grants(&self) -> &[DataGrant] {
        self.access_grant.data_grants()
    }
}

/// Resolves access authorizations against one owner's registries
#[derive(Debug, Clone)]
pub struct GrantResolver {
    session: Session,
    registry_set: RegistrySet,
}

impl GrantResolver {
    /// Resolver over the registries of `registry_set`
    pub fn new(session: Session, registry_set: RegistrySet) -> Self {
        Self {
            session,
            registry_set,
        }
    }

    /// Resolve, persist and supersede in one call
    pub async fn issue(&self, authorization: &AccessAuthorization) -> Result<AccessGrant> {
        let mut plan = self.resolve(authorization).await?;
        let persisted = self.persist(&plan).await?;

        let grant_id = plan.access_grant.id().clone();
        let previous = plan.registration.set_access_grant(grant_id.clone());
        if let Err(e) = plan.registration.update().await {
            return Err(SaiError::PartialGrantFailure {
                failed: plan.registration.id().clone(),
                persisted,
                source: Box::new(e),
            });
        }

        if let Some(ref previous) = previous {
            tracing::info!(
                registration = %plan.registration.id(),
                grant = %previous,
                "Superseded access grant"
            );
        }
        tracing::info!(
            grant = %grant_id,
            grantee = %authorization.grantee(),
            authorization = %authorization.id(),
            data_grants = plan.data_grants().len(),
            "Issued access grant"
        );
        Ok(plan.access_grant)
    }

    /// Build the access grant for `authorization` without writing anything
    pub async fn resolve(&self, authorization: &AccessAuthorization) -> Result<GrantPlan> {
        let registration = self.grantee_registration(authorization.grantee()).await?;
        let order = resolution_order(authorization)?;
        let container = registration.id().clone();
        let issuance = Uuid::new_v4();

        let mut data_grants: Vec<DataGrant> = Vec::new();
        let mut resolved: IndexMap<ResourceId, Vec<ResourceId>> = IndexMap::new();

        for data_authorization in order {
            let owner = data_authorization
                .data_owner()
                .unwrap_or(authorization.granted_by())
                .clone();
            let fields = match data_authorization.scope() {
                AuthorizationScope::AllFromRegistry { data_registration } => {
                    let registration = self
                        .data_registration(data_authorization, data_registration)
                        .await?;
                    vec![own_grant(
                        data_authorization,
                        owner,
                        &registration,
                        GrantScope::AllFromRegistry,
                    )]
                }
                AuthorizationScope::SelectedFromRegistry {
                    data_registration,
                    instances,
                    tolerate_missing,
                } => {
                    let registration = self
                        .data_registration(data_authorization, data_registration)
                        .await?;
                    let instances = self.selected_instances(
                        data_authorization,
                        &registration,
                        instances,
                        *tolerate_missing,
                    )?;
                    vec![own_grant(
                        data_authorization,
                        owner,
                        &registration,
                        GrantScope::SelectedFromRegistry { instances },
                    )]
                }
                AuthorizationScope::AllFromAgent => {
                    self.delegated(authorization, data_authorization, &owner).await?
                }
                AuthorizationScope::Inherited {
                    inherits_from,
                    data_registration,
                } => {
                    let parents = resolved.get(inherits_from).cloned().unwrap_or_default();
                    let mut fields = Vec::with_capacity(parents.len());
                    for parent_id in parents {
                        let Some(parent) = data_grants.iter().find(|g| g.id() == &parent_id) else {
                            continue;
                        };
                        let registration = self
                            .child_registration(
                                data_authorization,
                                parent,
                                data_registration.as_ref(),
                            )
                            .await?;
                        fields.push(own_grant(
                            data_authorization,
                            parent.data_owner().clone(),
                            &registration,
                            GrantScope::Inherited {
                                inherits_from: parent_id,
                            },
                        ));
                    }
                    fields
                }
            };

            let mut ids = Vec::with_capacity(fields.len());
            for grant_fields in fields {
                let discriminator = format!("{issuance}:{}", data_grants.len());
                let grant = DataGrant::assemble(&container, grant_fields, discriminator)?;
                tracing::debug!(
                    authorization = %data_authorization.id(),
                    grant = %grant.id(),
                    scope = %grant.scope().kind(),
                    "Resolved data grant"
                );
                ids.push(grant.id().clone());
                data_grants.push(grant);
            }
            resolved.insert(data_authorization.id().clone(), ids);
        }

        let access_grant = AccessGrant::assemble(
            &container,
            authorization.granted_by().clone(),
            authorization.grantee().clone(),
            authorization.access_need_group().cloned(),
            authorization.id().clone(),
            data_grants,
            issuance.to_string(),
        )?;
        Ok(GrantPlan {
            registration,
            access_grant,
        })
    }

    /// Write a resolved plan: data grants in order, then the access grant.
    ///
    /// Returns every identifier written, in write order.
    pub async fn persist(&self, plan: &GrantPlan) -> Result<Vec<ResourceId>> {
        let mut persisted = Vec::with_capacity(plan.data_grants().len() + 1);
        for grant in plan.data_grants() {
            if let Err(e) = grant.persist(&self.session).await {
                return Err(partial_failure(persisted, grant.id(), e));
            }
            persisted.push(grant.id().clone());
        }
        let access_grant = plan.access_grant();
        if let Err(e) = access_grant.persist(&self.session).await {
            return Err(partial_failure(persisted, access_grant.id(), e));
        }
        persisted.push(access_grant.id().clone());
        Ok(persisted)
    }

    async fn grantee_registration(&self, grantee: &ResourceId) -> Result<AgentRegistration> {
        let agents = self.registry_set.agent_registry().await?;
        if let Some(registration) = agents.find_application(grantee).await? {
            return Ok(registration);
        }
        if let Some(registration) = agents.find_social_agent(grantee).await? {
            return Ok(registration);
        }
        Err(SaiError::UnknownAgent {
            agent: grantee.clone(),
            registry: agents.id().clone(),
        })
    }

    async fn data_registration(
        &self,
        authorization: &DataAuthorization,
        id: &ResourceId,
    ) -> Result<DataRegistration> {
        let registration = match DataRegistration::load(&self.session, id).await {
            Ok(registration) => registration,
            Err(e) if e.is_not_found() => {
                return Err(SaiError::dangling_reference(authorization.id(), id));
            }
            Err(e) => return Err(e),
        };
        if registration.shape_tree() != authorization.shape_tree() {
            return Err(SaiError::invalid(format!(
                "data authorization {} is for {} but registration {id} holds {}",
                authorization.id(),
                authorization.shape_tree(),
                registration.shape_tree()
            )));
        }
        Ok(registration)
    }

    fn selected_instances(
        &self,
        authorization: &DataAuthorization,
        registration: &DataRegistration,
        selected: &[ResourceId],
        tolerate_missing: bool,
    ) -> Result<Vec<ResourceId>> {
        let skip = tolerate_missing
            || self.session.config().dangling_reference_policy == DanglingReferencePolicy::Skip;
        let mut instances = Vec::with_capacity(selected.len());
        for instance in selected {
            if registration.contains_instance(instance) {
                instances.push(instance.clone());
            } else if skip {
                tracing::warn!(
                    authorization = %authorization.id(),
                    instance = %instance,
                    registration = %registration.id(),
                    "Skipping selected instance missing from registration"
                );
            } else {
                return Err(SaiError::dangling_reference(authorization.id(), instance));
            }
        }
        Ok(instances)
    }

    /// Registration for the children of `parent`'s instances.
    ///
    /// Prefers a registration named by the authorization, then one in the
    /// data registry that holds the parent's registration, then any.
    async fn child_registration(
        &self,
        authorization: &DataAuthorization,
        parent: &DataGrant,
        named: Option<&ResourceId>,
    ) -> Result<DataRegistration> {
        if let Some(id) = named {
            return self.data_registration(authorization, id).await;
        }
        for registry in self.registry_set.data_registries().await? {
            if registry.registrations().contains(parent.data_registration()) {
                if let Some(found) = registry.find_by_shape_tree(authorization.shape_tree()).await? {
                    return Ok(found);
                }
            }
        }
        self.registry_set
            .find_data_registration(authorization.shape_tree())
            .await?
            .ok_or_else(|| {
                SaiError::dangling_reference(authorization.id(), authorization.shape_tree())
            })
    }

    /// Delegate what `owner` shared with the issuing agent.
    ///
    /// Follows the owner's reciprocal registration to the access grant the
    /// owner issued, takes its data grants for the same shape tree and
    /// narrows their modes. Inherited remote grants are not delegated.
    async fn delegated(
        &self,
        authorization: &AccessAuthorization,
        data_authorization: &DataAuthorization,
        owner: &ResourceId,
    ) -> Result<Vec<DataGrantFields>> {
        let agents = self.registry_set.agent_registry().await?;
        let Some(owner_registration) = agents.find_social_agent(owner).await? else {
            return Err(SaiError::UnknownAgent {
                agent: owner.clone(),
                registry: agents.id().clone(),
            });
        };
        let reciprocal = owner_registration.reciprocal_registration().ok_or_else(|| {
            SaiError::invalid(format!(
                "registration {} of {owner} has no reciprocal registration",
                owner_registration.id()
            ))
        })?;
        let remote_registration = AgentRegistration::load(&self.session, reciprocal).await?;
        let Some(remote_grant_id) = remote_registration.access_grant() else {
            tracing::warn!(
                authorization = %data_authorization.id(),
                owner = %owner,
                registration = %reciprocal,
                "Data owner has issued no access grant to delegate"
            );
            return Ok(Vec::new());
        };
        let remote_grant = AccessGrant::load(&self.session, remote_grant_id).await?;
        if remote_grant.grantee() != authorization.granted_by() {
            return Err(SaiError::invalid(format!(
                "access grant {} was issued to {}, not to {}",
                remote_grant.id(),
                remote_grant.grantee(),
                authorization.granted_by()
            )));
        }

        let mut fields = Vec::new();
        for remote in remote_grant.for_shape_tree(data_authorization.shape_tree()) {
            if remote.scope().kind() == ScopeKind::Inherited {
                tracing::debug!(grant = %remote.id(), "Not delegating inherited grant");
                continue;
            }
            let access_modes = data_authorization.access_modes().intersect(remote.access_modes());
            if access_modes.is_empty() {
                tracing::warn!(
                    authorization = %data_authorization.id(),
                    grant = %remote.id(),
                    requested = %data_authorization.access_modes(),
                    available = %remote.access_modes(),
                    "Skipping delegation with no modes in common"
                );
                continue;
            }
            fields.push(DataGrantFields {
                grantee: data_authorization.grantee().clone(),
                data_owner: remote.data_owner().clone(),
                shape_tree: remote.shape_tree().clone(),
                data_registration: remote.data_registration().clone(),
                access_modes,
                creator_modes: data_authorization
                    .creator_modes()
                    .intersect(remote.creator_modes()),
                scope: remote.scope().clone(),
                access_need: data_authorization.access_need().cloned(),
                delegation_of: Some(remote.id().clone()),
            });
        }
        Ok(fields)
    }
}

fn own_grant(
    authorization: &DataAuthorization,
    data_owner: ResourceId,
    registration: &DataRegistration,
    scope: GrantScope,
) -> DataGrantFields {
    DataGrantFields {
        grantee: authorization.grantee().clone(),
        data_owner,
        shape_tree: authorization.shape_tree().clone(),
        data_registration: registration.id().clone(),
        access_modes: authorization.access_modes().clone(),
        creator_modes: authorization.creator_modes().clone(),
        scope,
        access_need: authorization.access_need().cloned(),
        delegation_of: None,
    }
}

fn partial_failure(persisted: Vec<ResourceId>, failed: &ResourceId, source: SaiError) -> SaiError {
    tracing::warn!(
        failed = %failed,
        persisted = persisted.len(),
        error = %source,
        "Grant issuance stopped part way"
    );
    SaiError::PartialGrantFailure {
        persisted,
        failed: failed.clone(),
        source: Box::new(source),
    }
}

/// Data authorizations ordered parents first.
///
/// Cycles are reported before missing or non-inheritable parents, so a
/// mutual pair surfaces as `CyclicInheritance`.
fn resolution_order(authorization: &AccessAuthorization) -> Result<Vec<&DataAuthorization>> {
    let by_id: IndexMap<&ResourceId, &DataAuthorization> = authorization
        .data_authorizations()
        .iter()
        .map(|d| (d.id(), d))
        .collect();

    for start in by_id.values() {
        let mut path: IndexSet<&ResourceId> = IndexSet::new();
        path.insert(start.id());
        let mut current = *start;
        while let Some(parent) = current.scope().inherits_from() {
            if let Some(position) = path.get_index_of(parent) {
                let mut cycle: Vec<ResourceId> =
                    path.iter().skip(position).map(|id| (*id).clone()).collect();
                cycle.push(parent.clone());
                return Err(SaiError::CyclicInheritance { cycle });
            }
            let Some(next) = by_id.get(parent) else {
                break;
            };
            path.insert(parent);
            current = *next;
        }
    }

    for data_authorization in by_id.values() {
        let Some(parent) = data_authorization.scope().inherits_from() else {
            continue;
        };
        match by_id.get(parent) {
            None => {
                return Err(SaiError::invalid_inheritance(
                    data_authorization.id(),
                    format!(
                        "parent {parent} is not part of access authorization {}",
                        authorization.id()
                    ),
                ));
            }
            Some(parent) if !parent.scope().is_inheritable() => {
                return Err(SaiError::invalid_inheritance(
                    data_authorization.id(),
                    format!("parent {} has scope {}", parent.id(), parent.scope().kind()),
                ));
            }
            Some(_) => {}
        }
    }

    let mut ordered: IndexSet<&ResourceId> = IndexSet::new();
    for data_authorization in by_id.values() {
        let mut chain = vec![*data_authorization];
        let mut current = *data_authorization;
        while let Some(parent) = current.scope().inherits_from() {
            if ordered.contains(parent) {
                break;
            }
            let Some(next) = by_id.get(parent) else {
                break;
            };
            chain.push(*next);
            current = *next;
        }
        for link in chain.into_iter().rev() {
            ordered.insert(link.id());
        }
    }
    Ok(ordered
        .into_iter()
        .filter_map(|id| by_id.get(id).copied())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sai_core::Graph;
    use sai_core::vocabulary::interop;

    fn id(value: &str) -> ResourceId {
        ResourceId::parse(value).unwrap()
    }

    fn data_authorization(slug: &str, scope: ScopeKind, parent: Option<&str>) -> DataAuthorization {
        let mut graph = Graph::new(id(&format!("https://alice.example/authorization/{slug}")));
        graph.set_type(interop::DATA_AUTHORIZATION).unwrap();
        graph.set(interop::GRANTEE, id("https://projectron.example/#id"));
        graph.set(interop::GRANTED_BY, id("https://alice.example/profile#me"));
        graph.set(interop::DATA_OWNER, id("https://bob.example/profile#me"));
        graph.set(interop::REGISTERED_SHAPE_TREE, id("https://shapetrees.example/pm#Tree"));
        graph.set(interop::ACCESS_MODE, id(sai_core::vocabulary::acl::READ));
        graph.set(interop::SCOPE_OF_AUTHORIZATION, id(scope.term()));
        if scope == ScopeKind::AllFromRegistry {
            graph.set(interop::HAS_DATA_REGISTRATION, id("https://alice.example/data/projects/"));
        }
        if let Some(parent) = parent {
            graph.set(
                interop::INHERITS_FROM_AUTHORIZATION,
                id(&format!("https://alice.example/authorization/{parent}")),
            );
        }
        DataAuthorization::from_graph(&graph).unwrap()
    }

    fn bundle(items: Vec<DataAuthorization>) -> AccessAuthorization {
        let mut builder = AccessAuthorization::builder()
            .granted_by(id("https://alice.example/profile#me"))
            .granted_with(id("https://authz.example/#id"))
            .grantee(id("https://projectron.example/#id"));
        for item in items {
            builder = builder.data_authorization(item);
        }
        builder.build(&id("https://alice.example/authorization/")).unwrap()
    }

    fn slugs(order: &[&DataAuthorization]) -> Vec<String> {
        order
            .iter()
            .map(|d| d.id().as_str().rsplit('/').next().unwrap_or_default().to_string())
            .collect()
    }

    #[test]
    fn test_parents_before_children() {
        let authorization = bundle(vec![
            data_authorization("c", ScopeKind::Inherited, Some("b")),
            data_authorization("b", ScopeKind::Inherited, Some("a")),
            data_authorization("a", ScopeKind::AllFromRegistry, None),
        ]);
        let order = resolution_order(&authorization).unwrap();
        assert_eq!(slugs(&order), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_cycle_reported_with_path() {
        let authorization = bundle(vec![
            data_authorization("a", ScopeKind::Inherited, Some("b")),
            data_authorization("b", ScopeKind::Inherited, Some("a")),
        ]);
        match resolution_order(&authorization) {
            Err(SaiError::CyclicInheritance { cycle }) => {
                assert_eq!(cycle.len(), 3);
                assert_eq!(cycle.first(), cycle.last());
            }
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_parent() {
        let authorization = bundle(vec![data_authorization("b", ScopeKind::Inherited, Some("a"))]);
        assert!(matches!(
            resolution_order(&authorization),
            Err(SaiError::InvalidInheritance { .. })
        ));
    }

    #[test]
    fn test_parent_must_be_inheritable() {
        let authorization = bundle(vec![
            data_authorization("a", ScopeKind::AllFromAgent, None),
            data_authorization("b", ScopeKind::Inherited, Some("a")),
        ]);
        let err = resolution_order(&authorization).unwrap_err();
        assert!(err.to_string().contains("AllFromAgent"));
    }
}
