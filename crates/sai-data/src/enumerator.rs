//! Lazy, restartable walk over the instances a data grant covers
//!
//! The listing is computed on the first pull and again after `restart`:
//!
//! - all-from-registry: every instance the registration lists at that moment
//! - selected-from-registry: the grant's instances the registration still
//!   lists; removed instances are left out without error
//! - inherited: instances of the grant's registration that a parent
//!   instance links to, for every parent instance the parent grant yields.
//!   One level per grant; deeper trees are chains of inherited grants.
//!
//! Each pull fetches one instance. A listed instance whose document is gone
//! is skipped with a warning, as registry cursors do for registrations. The
//! access grant is re-checked whenever a listing is computed, so a
//! superseded grant fails with `GrantRevoked`.

use futures::future::{BoxFuture, FutureExt};
use futures::stream::{self, Stream};
use indexmap::IndexMap;
use sai_authorization::{DataGrant, GrantScope};
use sai_core::{AccessMode, ResourceId, Result, SaiError};
use sai_registry::{DataRegistration, Registration};
use sai_resources::CrudResource;
use std::collections::VecDeque;

use crate::active::ActiveGrant;
use crate::instance::{DataInstance, ParentLink};

type Listing = VecDeque<(ResourceId, Option<ParentLink>)>;

/// Pull-based sequence of the data instances in a grant's scope
#[derive(Debug)]
pub struct DataInstanceEnumerator {
    active: ActiveGrant,
    grant: DataGrant,
    pending: Option<Listing>,
}

impl DataInstanceEnumerator {
    pub(crate) fn new(active: ActiveGrant, grant: DataGrant) -> Self {
        Self {
            active,
            grant,
            pending: None,
        }
    }

    /// Grant being enumerated
    pub fn grant(&self) -> &DataGrant {
        &self.grant
    }

    /// Next instance, or `None` once the listing is exhausted
    pub async fn next(&mut self) -> Result<Option<DataInstance>> {
        if self.pending.is_none() {
            self.pending = Some(self.listing().await?);
        }
        loop {
            let Some((id, link)) = self.pending.as_mut().and_then(VecDeque::pop_front) else {
                return Ok(None);
            };
            let resource = match CrudResource::get(self.active.session(), &id).await {
                Ok(resource) => resource,
                Err(e) if e.is_not_found() => {
                    tracing::warn!(instance = %id, grant = %self.grant.id(), "Listed instance is gone");
                    continue;
                }
                Err(e) => return Err(e),
            };
            let instance = DataInstance::new(resource, self.grant.clone(), link);
            if instance.can(AccessMode::Read) {
                return Ok(Some(instance));
            }
        }
    }

    /// Start over; the next pull re-checks the grant and re-fetches listings
    pub fn restart(&mut self) {
        self.pending = None;
    }

    /// Drain the remaining instances
    pub async fn collect_all(&mut self) -> Result<Vec<DataInstance>> {
        let mut all = Vec::new();
        while let Some(instance) = self.next().await? {
            all.push(instance);
        }
        Ok(all)
    }

    /// Adapt into a `Stream`
    pub fn into_stream(self) -> impl Stream<Item = Result<DataInstance>> {
        stream::try_unfold(self, |mut enumerator| async move {
            Ok(enumerator.next().await?.map(|item| (item, enumerator)))
        })
    }

    fn listing(&self) -> BoxFuture<'_, Result<Listing>> {
        async move {
            let readable = self
                .grant
                .access_modes()
                .union(self.grant.creator_modes());
            if !readable.contains(AccessMode::Read) {
                return Err(SaiError::ModeNotGranted {
                    resource: self.grant.data_registration().clone(),
                    mode: AccessMode::Read,
                    grant: self.grant.id().clone(),
                });
            }
            self.active.check().await?;

            let registration =
                DataRegistration::load(self.active.session(), self.grant.data_registration())
                    .await?;
            let listing: Listing = match self.grant.scope() {
                GrantScope::AllFromRegistry => registration
                    .instances()
                    .map(|id| (id.clone(), None))
                    .collect(),
                GrantScope::SelectedFromRegistry { instances } => instances
                    .iter()
                    .filter(|id| registration.contains_instance(id))
                    .map(|id| (id.clone(), None))
                    .collect(),
                GrantScope::Inherited { inherits_from } => {
                    self.children(&registration, inherits_from).await?
                }
            };
            tracing::debug!(
                grant = %self.grant.id(),
                registration = %registration.id(),
                count = listing.len(),
                "Computed instance listing"
            );
            Ok(listing)
        }
        .boxed()
    }

    async fn children(
        &self,
        registration: &DataRegistration,
        parent_grant: &ResourceId,
    ) -> Result<Listing> {
        let parent_grant = self.active.data_grant(parent_grant)?.clone();
        let mut parents = DataInstanceEnumerator::new(self.active.clone(), parent_grant);
        let mut children: IndexMap<ResourceId, ParentLink> = IndexMap::new();
        while let Some(parent) = parents.next().await? {
            let graph = parent.graph();
            for term in graph.terms() {
                for child in graph.nodes(term) {
                    if registration.contains_instance(&child) && !children.contains_key(&child) {
                        let link = ParentLink {
                            parent: parent.id().clone(),
                            relation: term.to_string(),
                        };
                        children.insert(child, link);
                    }
                }
            }
        }
        Ok(children
            .into_iter()
            .map(|(id, link)| (id, Some(link)))
            .collect())
    }
}
