//! Seeded storage layouts for tests
//!
//! A `PodFixture` writes the owner's profile and a registry set with one
//! agent registry, one data registry and one authorization registry under a
//! base URL, then offers
//! helpers to register agents, data registrations and instances. Documents
//! are seeded directly into the `MemoryStore`, so setup never shows up in the
//! request log.

use chrono::Utc;
use sai_core::vocabulary::{dcterms, interop, ldp, solid};
use sai_core::{Graph, ResourceId, Session};

use crate::store::MemoryStore;

/// Parse an identifier, panicking on malformed test input
pub fn rid(value: &str) -> ResourceId {
    ResourceId::parse(value).unwrap()
}

/// One owner's storage, seeded into a shared store
#[derive(Debug, Clone)]
pub struct PodFixture {
    /// Backing store
    pub store: MemoryStore,
    /// Owner's social agent identifier
    pub owner: ResourceId,
    /// Authorization agent application acting for the owner
    pub authorization_agent: ResourceId,
    /// Owner's access inbox
    pub access_inbox: ResourceId,
    /// Registry set document
    pub registry_set: ResourceId,
    /// Agent registry container
    pub agent_registry: ResourceId,
    /// Data registry container
    pub data_registry: ResourceId,
    /// Authorization registry container
    pub authorization_registry: ResourceId,
}

impl PodFixture {
    /// Seed the owner profile and an empty registry set at `base` (e.g. `https://alice.example/`)
    pub async fn seed(store: &MemoryStore, base: &str) -> Self {
        let base = rid(base);
        let fixture = Self {
            store: store.clone(),
            owner: rid(&format!("{base}profile#me")),
            authorization_agent: rid("https://authz.example/#id"),
            access_inbox: rid(&format!("{base}inbox/")),
            registry_set: base.child("registries").unwrap(),
            agent_registry: rid(&format!("{base}agents/")),
            data_registry: rid(&format!("{base}data/")),
            authorization_registry: rid(&format!("{base}authorization/")),
        };

        let mut profile = Graph::new(fixture.owner.clone());
        profile.set(interop::HAS_REGISTRY_SET, fixture.registry_set.clone());
        profile.set(
            interop::HAS_AUTHORIZATION_AGENT,
            fixture.authorization_agent.clone(),
        );
        profile.set(interop::HAS_ACCESS_INBOX, fixture.access_inbox.clone());
        profile.set(solid::OIDC_ISSUER, rid("https://idp.example/"));
        store.seed(&profile).await;

        let mut set = Graph::new(fixture.registry_set.clone());
        set.set_type(interop::REGISTRY_SET).unwrap();
        set.set(interop::HAS_AGENT_REGISTRY, fixture.agent_registry.clone());
        set.set(interop::HAS_DATA_REGISTRY, fixture.data_registry.clone());
        set.set(
            interop::HAS_AUTHORIZATION_REGISTRY,
            fixture.authorization_registry.clone(),
        );
        store.seed(&set).await;

        for (id, ty) in [
            (&fixture.agent_registry, interop::AGENT_REGISTRY),
            (&fixture.data_registry, interop::DATA_REGISTRY),
            (&fixture.authorization_registry, interop::AUTHORIZATION_REGISTRY),
        ] {
            let mut graph = Graph::new(id.clone());
            graph.set_type(ty).unwrap();
            store.seed(&graph).await;
        }
        fixture
    }

    /// Session over the shared store
    pub fn session(&self) -> Session {
        self.store.session()
    }

    fn registration_graph(&self, id: &ResourceId, ty: &str, agent: &ResourceId) -> Graph {
        let now = Utc::now();
        let mut graph = Graph::new(id.clone());
        graph.set_type(ty).unwrap();
        graph.set(interop::REGISTERED_BY, self.owner.clone());
        graph.set(interop::REGISTERED_WITH, self.authorization_agent.clone());
        graph.set(interop::REGISTERED_AT, now);
        graph.set(interop::UPDATED_AT, now);
        graph.set(interop::REGISTERED_AGENT, agent.clone());
        graph
    }

    /// Register an application; returns its registration container
    pub async fn add_application(&self, slug: &str, agent: &ResourceId) -> ResourceId {
        let id = rid(&format!("{}{slug}/", self.agent_registry));
        let graph = self.registration_graph(&id, interop::APPLICATION_REGISTRATION, agent);
        self.store.seed(&graph).await;
        self.store
            .modify(&self.agent_registry, |g| {
                g.add(interop::HAS_APPLICATION_REGISTRATION, id.clone());
            })
            .await;
        id
    }

    /// Register a social agent; returns its registration container
    pub async fn add_social_agent(
        &self,
        slug: &str,
        agent: &ResourceId,
        reciprocal: Option<&ResourceId>,
    ) -> ResourceId {
        let id = rid(&format!("{}{slug}/", self.agent_registry));
        let mut graph = self.registration_graph(&id, interop::SOCIAL_AGENT_REGISTRATION, agent);
        if let Some(reciprocal) = reciprocal {
            graph.set(interop::RECIPROCAL_REGISTRATION, reciprocal.clone());
        }
        self.store.seed(&graph).await;
        self.store
            .modify(&self.agent_registry, |g| {
                g.add(interop::HAS_SOCIAL_AGENT_REGISTRATION, id.clone());
            })
            .await;
        id
    }

    /// Add a data registration for `shape_tree`; returns its container
    pub async fn add_data_registration(&self, slug: &str, shape_tree: &str) -> ResourceId {
        let id = rid(&format!("{}{slug}/", self.data_registry));
        let now = Utc::now();
        let mut graph = Graph::new(id.clone());
        graph.set_type(interop::DATA_REGISTRATION).unwrap();
        graph.set(interop::REGISTERED_BY, self.owner.clone());
        graph.set(interop::REGISTERED_WITH, self.authorization_agent.clone());
        graph.set(interop::REGISTERED_AT, now);
        graph.set(interop::UPDATED_AT, now);
        graph.set(interop::REGISTERED_SHAPE_TREE, rid(shape_tree));
        self.store.seed(&graph).await;
        self.store
            .modify(&self.data_registry, |g| {
                g.add(interop::HAS_DATA_REGISTRATION, id.clone());
            })
            .await;
        id
    }

    /// Add an instance to a data registration; returns its identifier
    pub async fn add_instance(
        &self,
        registration: &ResourceId,
        slug: &str,
        creator: Option<&ResourceId>,
    ) -> ResourceId {
        let id = registration.child(slug).unwrap();
        let mut graph = Graph::new(id.clone());
        if let Some(creator) = creator {
            graph.set(dcterms::CREATOR, creator.clone());
        }
        self.store.seed(&graph).await;
        self.store
            .modify(registration, |g| {
                g.add(ldp::CONTAINS, id.clone());
            })
            .await;
        id
    }

    /// Add an instance and link it from `parent` through `relation`
    pub async fn add_child_instance(
        &self,
        registration: &ResourceId,
        slug: &str,
        parent: &ResourceId,
        relation: &str,
    ) -> ResourceId {
        let id = self.add_instance(registration, slug, None).await;
        self.store
            .modify(parent, |g| {
                g.add(relation, id.clone());
            })
            .await;
        id
    }

    /// Add an access authorization link to the authorization registry
    pub async fn link_authorization(&self, authorization: &ResourceId) {
        self.store
            .modify(&self.authorization_registry, |g| {
                g.add(interop::HAS_ACCESS_AUTHORIZATION, authorization.clone());
            })
            .await;
    }
}
