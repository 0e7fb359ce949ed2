//! Authorization registry
//!
//! Links the access authorizations the owner has issued. At most one
//! authorization per grantee is linked at a time; a newer authorization
//! names the one it `replaces`.

use sai_core::vocabulary::interop;
use sai_core::{Graph, ResourceId, Result, SaiError, Session, Value};
use sai_resources::CrudResource;

use crate::registration::{GranteeRegistration, RegistrationCursor};

/// Registry of access authorizations
#[derive(Debug, Clone)]
pub struct AuthorizationRegistry {
    resource: CrudResource,
}

impl AuthorizationRegistry {
    /// Fetch the authorization registry at `id`
    pub async fn load(session: &Session, id: &ResourceId) -> Result<Self> {
        let resource = CrudResource::get(session, id).await?;
        resource.graph().expect_type(interop::AUTHORIZATION_REGISTRY)?;
        Ok(Self { resource })
    }

    /// Re-fetch the registry
    pub async fn refresh(&mut self) -> Result<()> {
        self.resource.refresh().await
    }

    /// Identifier
    pub fn id(&self) -> &ResourceId {
        self.resource.id()
    }

    /// Linked authorization identifiers
    pub fn authorization_ids(&self) -> Vec<ResourceId> {
        self.resource.graph().nodes(interop::HAS_ACCESS_AUTHORIZATION)
    }

    /// True when `id` is linked
    pub fn contains(&self, id: &ResourceId) -> bool {
        self.resource
            .graph()
            .contains(interop::HAS_ACCESS_AUTHORIZATION, &Value::node(id))
    }

    /// Lazy walk over the linked authorizations
    pub fn cursor<A: GranteeRegistration>(&self) -> RegistrationCursor<A> {
        RegistrationCursor::new(
            self.resource.session().clone(),
            self.id().clone(),
            interop::HAS_ACCESS_AUTHORIZATION,
        )
    }

    /// Linked authorization whose grantee is `grantee`, if any
    pub async fn find_for_grantee<A: GranteeRegistration>(
        &self,
        grantee: &ResourceId,
    ) -> Result<Option<A>> {
        for id in self.authorization_ids() {
            let authorization = A::load(self.resource.session(), &id).await?;
            if authorization.grantee() == grantee {
                return Ok(Some(authorization));
            }
        }
        Ok(None)
    }

    /// Link an already persisted authorization.
    ///
    /// The authorization it `replaces` is unlinked first. Any other linked
    /// authorization for the same grantee fails the call with
    /// `AlreadyExists`; nothing is written in that case.
    pub async fn add<A: GranteeRegistration>(&mut self, authorization: &A) -> Result<()> {
        let id = authorization.id().clone();
        let replaced = authorization.replaces().cloned();

        for linked in self.authorization_ids() {
            if linked == id || Some(&linked) == replaced.as_ref() {
                continue;
            }
            let existing = A::load(self.resource.session(), &linked).await?;
            if existing.grantee() == authorization.grantee() {
                return Err(SaiError::already_exists(
                    &linked,
                    format!(
                        "authorization for grantee {} already linked; {id} must replace it",
                        authorization.grantee()
                    ),
                ));
            }
        }

        let previous = self.resource.graph().clone();
        let graph = self.resource.graph_mut();
        if let Some(ref replaced) = replaced {
            graph.remove_value(interop::HAS_ACCESS_AUTHORIZATION, &Value::node(replaced));
        }
        graph.add(interop::HAS_ACCESS_AUTHORIZATION, id.clone());
        self.write_links(previous).await?;
        tracing::info!(
            registry = %self.resource.id(),
            authorization = %id,
            replaces = ?replaced.as_ref().map(ResourceId::as_str),
            "Linked access authorization"
        );
        Ok(())
    }

    /// Unlink an authorization
    pub async fn remove(&mut self, id: &ResourceId) -> Result<()> {
        let previous = self.resource.graph().clone();
        if !self
            .resource
            .graph_mut()
            .remove_value(interop::HAS_ACCESS_AUTHORIZATION, &Value::node(id))
        {
            return Err(SaiError::not_found(id));
        }
        self.write_links(previous).await
    }

    /// Persist the links; on failure the cached links revert to `previous`
    async fn write_links(&mut self, previous: Graph) -> Result<()> {
        if let Err(e) = self.resource.update().await {
            tracing::warn!(
                registry = %self.resource.id(),
                error = %e,
                "Authorization links not written; keeping previous links"
            );
            *self.resource.graph_mut() = previous;
            return Err(e);
        }
        Ok(())
    }
}
