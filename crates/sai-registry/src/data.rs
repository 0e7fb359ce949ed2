//! Data registry and data registrations

use async_trait::async_trait;
use indexmap::IndexSet;
use sai_core::vocabulary::{interop, ldp};
use sai_core::{Graph, ResourceId, Result, SaiError, Session};
use sai_resources::CrudResource;

use crate::registration::{
    Registration, RegistrationCursor, RegistrationList, RegistrationMetadata,
};

/// Typed bucket of data instances sharing one shape tree
#[derive(Debug, Clone)]
pub struct DataRegistration {
    resource: CrudResource,
    metadata: RegistrationMetadata,
    shape_tree: ResourceId,
    instances: IndexSet<ResourceId>,
}

impl DataRegistration {
    /// New, unpersisted registration at `id` for `shape_tree`
    pub fn new(
        session: &Session,
        id: ResourceId,
        shape_tree: ResourceId,
        metadata: RegistrationMetadata,
    ) -> Self {
        Self {
            resource: CrudResource::new(session, id),
            metadata,
            shape_tree,
            instances: IndexSet::new(),
        }
    }

    fn from_resource(resource: CrudResource) -> Result<Self> {
        let graph = resource.graph();
        graph.expect_type(interop::DATA_REGISTRATION)?;
        Ok(Self {
            metadata: RegistrationMetadata::from_graph(graph)?,
            shape_tree: graph.require_node(interop::REGISTERED_SHAPE_TREE)?,
            instances: graph.nodes(ldp::CONTAINS).into_iter().collect(),
            resource,
        })
    }

    fn write_graph(&mut self) -> Result<()> {
        let metadata = self.metadata.clone();
        let shape_tree = self.shape_tree.clone();
        let instances: Vec<ResourceId> = self.instances.iter().cloned().collect();

        let graph = self.resource.graph_mut();
        graph.set_type(interop::DATA_REGISTRATION)?;
        metadata.write_to(graph);
        graph.set(interop::REGISTERED_SHAPE_TREE, shape_tree);
        graph.set_nodes(ldp::CONTAINS, instances.iter());
        Ok(())
    }

    /// Persist a new registration
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
        *self = Self::from_resource(self.resource.clone())?;
        Ok(())
    }

    /// Delete the registration document
    pub async fn delete(&mut self) -> Result<()> {
        self.resource.delete().await
    }

    /// Registration metadata
    pub fn metadata(&self) -> &RegistrationMetadata {
        &self.metadata
    }

    /// Shape tree of the instances
    pub fn shape_tree(&self) -> &ResourceId {
        &self.shape_tree
    }

    /// Instance identifiers, in listing order
    pub fn instances(&self) -> impl Iterator<Item = &ResourceId> {
        self.instances.iter()
    }

    /// Number of listed instances
    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    /// O(1) membership check against the cached listing
    pub fn contains_instance(&self, id: &ResourceId) -> bool {
        self.instances.contains(id)
    }

    /// List an instance and persist the listing. No-op if already listed.
    ///
    /// If the write fails the cached listing is left as it was.
    pub async fn add_instance(&mut self, id: ResourceId) -> Result<()> {
        if self.instances.contains(&id) {
            return Ok(());
        }
        let previous = self.instances.clone();
        self.instances.insert(id);
        self.write_listing(previous).await
    }

    /// Unlist an instance and persist the listing. No-op if not listed.
    ///
    /// If the write fails the cached listing is left as it was.
    pub async fn remove_instance(&mut self, id: &ResourceId) -> Result<()> {
        if !self.instances.contains(id) {
            return Ok(());
        }
        let previous = self.instances.clone();
        self.instances.shift_remove(id);
        self.write_listing(previous).await
    }

    async fn write_listing(&mut self, previous: IndexSet<ResourceId>) -> Result<()> {
        let metadata = self.metadata.clone();
        let graph = self.resource.graph().clone();
        if let Err(e) = self.update().await {
            tracing::warn!(
                registration = %self.id(),
                error = %e,
                "Instance listing not written; keeping previous listing"
            );
            self.instances = previous;
            self.metadata = metadata;
            *self.resource.graph_mut() = graph;
            return Err(e);
        }
        Ok(())
    }

    /// Fresh identifier for a new instance inside this registration
    pub fn generate_instance_id(&self) -> Result<ResourceId> {
        self.id().generate_contained()
    }

    /// Cached graph
    pub fn graph(&self) -> &Graph {
        self.resource.graph()
    }
}

#[async_trait]
impl Registration for DataRegistration {
    async fn load(session: &Session, id: &ResourceId) -> Result<Self> {
        Self::from_resource(CrudResource::get(session, id).await?)
    }

    fn id(&self) -> &ResourceId {
        self.resource.id()
    }
}

/// Registry of data registrations
#[derive(Debug, Clone)]
pub struct DataRegistry {
    resource: CrudResource,
    registrations: RegistrationList<DataRegistration>,
}

impl DataRegistry {
    /// Fetch the data registry at `id`
    pub async fn load(session: &Session, id: &ResourceId) -> Result<Self> {
        Self::from_resource(CrudResource::get(session, id).await?)
    }

    fn from_resource(resource: CrudResource) -> Result<Self> {
        resource.graph().expect_type(interop::DATA_REGISTRY)?;
        Ok(Self {
            registrations: RegistrationList::from_graph(
                resource.graph(),
                interop::HAS_DATA_REGISTRATION,
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

    /// Data registrations
    pub fn registrations(&self) -> &RegistrationList<DataRegistration> {
        &self.registrations
    }

    /// Lazy walk over data registrations
    pub fn cursor(&self) -> RegistrationCursor<DataRegistration> {
        RegistrationCursor::new(
            self.resource.session().clone(),
            self.id().clone(),
            interop::HAS_DATA_REGISTRATION,
        )
    }

    /// Registration holding instances of `shape_tree`, if any
    pub async fn find_by_shape_tree(&self, shape_tree: &ResourceId) -> Result<Option<DataRegistration>> {
        for id in self.registrations.ids() {
            let registration = DataRegistration::load(self.resource.session(), id).await?;
            if registration.shape_tree() == shape_tree {
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
    /// Two writes, not atomic: the registration is created, then the registry
    /// membership is updated. A failed second write is returned and leaves
    /// the created registration unlinked.
    pub async fn add_registration(&mut self, registration: &mut DataRegistration) -> Result<()> {
        let id = registration.id().clone();
        if self.registrations.contains(&id) {
            return Err(SaiError::already_exists(&id, "data registration already linked"));
        }

        registration.create().await?;

        self.registrations.insert(id.clone());
        self.registrations.write_to(self.resource.graph_mut());
        if let Err(e) = self.resource.update().await {
            tracing::warn!(
                registry = %self.resource.id(),
                registration = %id,
                error = %e,
                "Registration created but registry membership update failed"
            );
            self.registrations.remove(&id);
            self.registrations.write_to(self.resource.graph_mut());
            return Err(e);
        }
        tracing::info!(registry = %self.resource.id(), registration = %id, "Added data registration");
        Ok(())
    }

    /// Unlink `registration`, then delete it. Two writes, not atomic.
    ///
    /// A failed unlink leaves the cached membership as it was.
    pub async fn remove_registration(&mut self, registration: &mut DataRegistration) -> Result<()> {
        let id = registration.id().clone();
        let previous = self.registrations.clone();
        if !self.registrations.remove(&id) {
            return Err(SaiError::not_found(&id));
        }
        self.registrations.write_to(self.resource.graph_mut());
        if let Err(e) = self.resource.update().await {
            tracing::warn!(
                registry = %self.resource.id(),
                registration = %id,
                error = %e,
                "Registry membership not written; registration stays linked"
            );
            self.registrations = previous;
            self.registrations.write_to(self.resource.graph_mut());
            return Err(e);
        }
        registration.delete().await?;
        tracing::info!(registry = %self.resource.id(), registration = %id, "Removed data registration");
        Ok(())
    }
}
