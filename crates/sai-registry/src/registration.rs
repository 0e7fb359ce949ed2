//! Registration lists and lazy registration cursors
//!
//! A registry document links its registrations through one term. The list
//! keeps those links indexed by identifier for O(1) membership; the cursor
//! walks them lazily, loading one registration per pull. A listed
//! registration whose document is gone is skipped with a warning, the same
//! way data instance enumeration treats listed instances.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::{self, Stream};
use indexmap::IndexSet;
use sai_core::vocabulary::interop;
use sai_core::{Graph, ResourceId, Result, Session};
use sai_resources::ReadableResource;
use std::collections::VecDeque;
use std::marker::PhantomData;

/// Document that can be loaded from a registry link
#[async_trait]
pub trait Registration: Sized + Send {
    /// Fetch and decode the registration at `id`
    async fn load(session: &Session, id: &ResourceId) -> Result<Self>;

    /// Identifier of the registration
    fn id(&self) -> &ResourceId;
}

/// Registration tied to a grantee, kept in the authorization registry
pub trait GranteeRegistration: Registration {
    /// Agent the registration grants access to
    fn grantee(&self) -> &ResourceId;

    /// Registration this one replaces, if any
    fn replaces(&self) -> Option<&ResourceId>;
}

/// Who registered something, with what, and when
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationMetadata {
    /// Social agent that created the registration
    pub registered_by: ResourceId,
    /// Application used to create it
    pub registered_with: ResourceId,
    /// Creation time
    pub registered_at: DateTime<Utc>,
    /// Last update time
    pub updated_at: DateTime<Utc>,
}

impl RegistrationMetadata {
    /// Metadata stamped now
    pub fn new(registered_by: ResourceId, registered_with: ResourceId) -> Self {
        let now = Utc::now();
        Self {
            registered_by,
            registered_with,
            registered_at: now,
            updated_at: now,
        }
    }

    /// Read the metadata terms of a registration graph
    pub fn from_graph(graph: &Graph) -> Result<Self> {
        let registered_at = graph.require_datetime(interop::REGISTERED_AT)?;
        Ok(Self {
            registered_by: graph.require_node(interop::REGISTERED_BY)?,
            registered_with: graph.require_node(interop::REGISTERED_WITH)?,
            registered_at,
            updated_at: graph.datetime(interop::UPDATED_AT).unwrap_or(registered_at),
        })
    }

    /// Write the metadata terms into a registration graph
    pub fn write_to(&self, graph: &mut Graph) {
        graph.set(interop::REGISTERED_BY, self.registered_by.clone());
        graph.set(interop::REGISTERED_WITH, self.registered_with.clone());
        graph.set(interop::REGISTERED_AT, self.registered_at);
        graph.set(interop::UPDATED_AT, self.updated_at);
    }

    /// Record a modification
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Membership of one registry term, indexed by identifier
#[derive(Debug, Clone)]
pub struct RegistrationList<T> {
    term: &'static str,
    members: IndexSet<ResourceId>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Registration> RegistrationList<T> {
    /// Members linked from `graph` through `term`
    pub fn from_graph(graph: &Graph, term: &'static str) -> Self {
        Self {
            term,
            members: graph.nodes(term).into_iter().collect(),
            _marker: PhantomData,
        }
    }

    /// Linking term
    pub fn term(&self) -> &'static str {
        self.term
    }

    /// O(1) membership check
    pub fn contains(&self, id: &ResourceId) -> bool {
        self.members.contains(id)
    }

    /// Number of members
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// True when there are no members
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Member identifiers in registry order
    pub fn ids(&self) -> impl Iterator<Item = &ResourceId> {
        self.members.iter()
    }

    /// Load a member; `None` when `id` is not linked from the registry
    pub async fn get(&self, session: &Session, id: &ResourceId) -> Result<Option<T>> {
        if !self.contains(id) {
            return Ok(None);
        }
        T::load(session, id).await.map(Some)
    }

    /// Add a member locally. Returns false when already present.
    pub fn insert(&mut self, id: ResourceId) -> bool {
        self.members.insert(id)
    }

    /// Remove a member locally, keeping the order of the rest
    pub fn remove(&mut self, id: &ResourceId) -> bool {
        self.members.shift_remove(id)
    }

    /// Write the membership back into the registry graph
    pub fn write_to(&self, graph: &mut Graph) {
        graph.set_nodes(self.term, self.members.iter());
    }
}

/// Lazy, finite, restartable walk over a registry's registrations.
///
/// The listing is fetched on the first pull and again after `restart`; each
/// registration is loaded only when it is pulled.
#[derive(Debug)]
pub struct RegistrationCursor<T> {
    session: Session,
    registry: ResourceId,
    term: &'static str,
    pending: Option<VecDeque<ResourceId>>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Registration> RegistrationCursor<T> {
    /// Cursor over the `term` links of `registry`
    pub fn new(session: Session, registry: ResourceId, term: &'static str) -> Self {
        Self {
            session,
            registry,
            term,
            pending: None,
            _marker: PhantomData,
        }
    }

    /// Next registration, or `None` once the listing is exhausted
    pub async fn next(&mut self) -> Result<Option<T>> {
        if self.pending.is_none() {
            let listing = ReadableResource::get(&self.session, &self.registry).await?;
            let members = listing.graph().nodes(self.term);
            tracing::debug!(
                registry = %self.registry,
                count = members.len(),
                "Fetched registry listing"
            );
            self.pending = Some(members.into());
        }
        while let Some(id) = self.pending.as_mut().and_then(VecDeque::pop_front) {
            match T::load(&self.session, &id).await {
                Ok(item) => return Ok(Some(item)),
                Err(e) if e.is_not_found() => {
                    tracing::warn!(registry = %self.registry, registration = %id, "Listed registration is gone");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(None)
    }

    /// Start over; the next pull re-fetches the listing
    pub fn restart(&mut self) {
        self.pending = None;
    }

    /// Drain the remaining registrations
    pub async fn collect_all(&mut self) -> Result<Vec<T>> {
        let mut all = Vec::new();
        while let Some(item) = self.next().await? {
            all.push(item);
        }
        Ok(all)
    }

    /// Adapt into a `Stream`
    pub fn into_stream(self) -> impl Stream<Item = Result<T>>
    where
        T: 'static,
    {
        stream::try_unfold(self, |mut cursor| async move {
            Ok(cursor.next().await?.map(|item| (item, cursor)))
        })
    }
}
