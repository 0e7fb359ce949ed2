//! Grant resolution tests against an in-memory store

use assert_matches::assert_matches;
use sai_authorization::{
    AccessAuthorization, AccessGrant, DataAuthorization, DataAuthorizationBuilder, GrantResolver,
    GrantScope, ScopeKind,
};
use sai_core::vocabulary::{acl, interop};
use sai_core::{
    AccessMode, AccessModes, DanglingReferencePolicy, Graph, HttpMethod, ResourceId, SaiConfig,
    SaiError, Session,
};
use sai_registry::{AgentRegistration, AuthorizationRegistry, Registration, RegistrySet};
use sai_testkit::{init_test_tracing, rid, MemoryStore, PodFixture};

const PROJECTS: &str = "https://shapetrees.example/pm#ProjectTree";
const TASKS: &str = "https://shapetrees.example/pm#TaskTree";
const HAS_TASK: &str = "https://vocab.example/pm#hasTask";

struct Setup {
    pod: PodFixture,
    app: ResourceId,
    app_registration: ResourceId,
}

async fn setup_on(store: &MemoryStore) -> Setup {
    init_test_tracing();
    let pod = PodFixture::seed(store, "https://alice.example/").await;
    let app = rid("https://projectron.example/#id");
    let app_registration = pod.add_application("projectron", &app).await;
    Setup {
        pod,
        app,
        app_registration,
    }
}

async fn setup() -> Setup {
    setup_on(&MemoryStore::new()).await
}

impl Setup {
    fn data_authorization(&self, shape_tree: &str) -> DataAuthorizationBuilder {
        DataAuthorization::builder()
            .grantee(self.app.clone())
            .granted_by(self.pod.owner.clone())
            .shape_tree(rid(shape_tree))
            .access_modes(AccessModes::read_only())
    }

    fn access_authorization(&self, items: Vec<DataAuthorization>) -> AccessAuthorization {
        let mut builder = AccessAuthorization::builder()
            .granted_by(self.pod.owner.clone())
            .granted_with(self.pod.authorization_agent.clone())
            .grantee(self.app.clone());
        for item in items {
            builder = builder.data_authorization(item);
        }
        builder.build(&self.pod.authorization_registry).unwrap()
    }

    /// Persisted authorization over a fresh all-from-registry projects scope
    async fn persisted_authorization(&self, replaces: Option<&ResourceId>) -> AccessAuthorization {
        let projects = rid(&format!("{}projects/", self.pod.data_registry));
        let data = self
            .data_authorization(PROJECTS)
            .scope(ScopeKind::AllFromRegistry)
            .data_registration(projects)
            .build(&self.pod.authorization_registry)
            .unwrap();
        let mut builder = AccessAuthorization::builder()
            .granted_by(self.pod.owner.clone())
            .granted_with(self.pod.authorization_agent.clone())
            .grantee(self.app.clone())
            .data_authorization(data);
        if let Some(previous) = replaces {
            builder = builder.replaces(previous.clone());
        }
        let authorization = builder.build(&self.pod.authorization_registry).unwrap();
        authorization.persist(&self.pod.session()).await.unwrap();
        authorization
    }

    async fn authorization_registry(&self) -> AuthorizationRegistry {
        AuthorizationRegistry::load(&self.pod.session(), &self.pod.authorization_registry)
            .await
            .unwrap()
    }

    async fn resolver_with(&self, session: Session) -> GrantResolver {
        let set = RegistrySet::open(&session, &self.pod.registry_set).await.unwrap();
        GrantResolver::new(session, set)
    }

    async fn resolver(&self) -> GrantResolver {
        self.resolver_with(self.pod.session()).await
    }
}

#[tokio::test]
async fn test_issue_all_from_registry() {
    let setup = setup().await;
    let projects = setup.pod.add_data_registration("projects", PROJECTS).await;
    for slug in ["p1", "p2", "p3"] {
        setup.pod.add_instance(&projects, slug, None).await;
    }

    let data = setup
        .data_authorization(PROJECTS)
        .scope(ScopeKind::AllFromRegistry)
        .data_registration(projects.clone())
        .build(&setup.pod.authorization_registry)
        .unwrap();
    let authorization = setup.access_authorization(vec![data]);
    let session = setup.pod.session();
    authorization.persist(&session).await.unwrap();
    let mut registry = AuthorizationRegistry::load(&session, &setup.pod.authorization_registry)
        .await
        .unwrap();
    registry.add(&authorization).await.unwrap();

    let grant = setup.resolver().await.issue(&authorization).await.unwrap();
    assert_eq!(grant.grantee(), &setup.app);
    assert_eq!(grant.resolved_from(), authorization.id());
    assert_eq!(grant.data_grants().len(), 1);
    let data_grant = &grant.data_grants()[0];
    assert_eq!(data_grant.scope(), &GrantScope::AllFromRegistry);
    assert_eq!(data_grant.data_registration(), &projects);
    assert_eq!(data_grant.data_owner(), &setup.pod.owner);
    assert_eq!(data_grant.access_modes(), &AccessModes::read_only());

    // grants live inside the grantee's registration
    assert_eq!(
        grant.id().parent_container().as_ref(),
        Some(&setup.app_registration)
    );
    let stored = AccessGrant::load(&session, grant.id()).await.unwrap();
    assert_eq!(stored.data_grants()[0].id(), data_grant.id());
    assert_eq!(stored.data_grants()[0].scope(), data_grant.scope());

    let registration = AgentRegistration::load(&session, &setup.app_registration)
        .await
        .unwrap();
    assert_eq!(registration.access_grant(), Some(grant.id()));
}

#[tokio::test]
async fn test_authorization_roundtrip_through_store() {
    let setup = setup().await;
    let projects = setup.pod.add_data_registration("projects", PROJECTS).await;
    let data = setup
        .data_authorization(PROJECTS)
        .access_modes([AccessMode::Read, AccessMode::Update].into_iter().collect())
        .creator_modes([AccessMode::Delete].into_iter().collect())
        .scope(ScopeKind::AllFromRegistry)
        .data_registration(projects)
        .build(&setup.pod.authorization_registry)
        .unwrap();
    let authorization = setup.access_authorization(vec![data]);
    let session = setup.pod.session();
    authorization.persist(&session).await.unwrap();

    let loaded = AccessAuthorization::load(&session, authorization.id()).await.unwrap();
    let (stored, built) = (&loaded.data_authorizations()[0], &authorization.data_authorizations()[0]);
    assert_eq!(stored.id(), built.id());
    assert_eq!(stored.scope(), built.scope());
    assert_eq!(stored.access_modes(), built.access_modes());
    assert_eq!(stored.creator_modes(), built.creator_modes());
    assert_eq!(loaded.grantee(), authorization.grantee());

    // loaded records are already persisted
    let err = loaded.persist(&session).await.unwrap_err();
    assert_matches!(err, SaiError::Invalid { .. });
}

#[tokio::test]
async fn test_unknown_grantee() {
    let setup = setup().await;
    let projects = setup.pod.add_data_registration("projects", PROJECTS).await;
    let data = DataAuthorization::builder()
        .grantee(rid("https://stranger.example/#id"))
        .granted_by(setup.pod.owner.clone())
        .shape_tree(rid(PROJECTS))
        .access_modes(AccessModes::read_only())
        .scope(ScopeKind::AllFromRegistry)
        .data_registration(projects)
        .build(&setup.pod.authorization_registry)
        .unwrap();
    let authorization = AccessAuthorization::builder()
        .granted_by(setup.pod.owner.clone())
        .granted_with(setup.pod.authorization_agent.clone())
        .grantee(rid("https://stranger.example/#id"))
        .data_authorization(data)
        .build(&setup.pod.authorization_registry)
        .unwrap();

    setup.pod.store.clear_requests().await;
    let err = setup.resolver().await.issue(&authorization).await.unwrap_err();
    assert_matches!(err, SaiError::UnknownAgent { ref registry, .. } if registry == &setup.pod.agent_registry);
    assert_eq!(setup.pod.store.count(HttpMethod::Put).await, 0);
}

#[tokio::test]
async fn test_missing_registration_is_dangling() {
    let setup = setup().await;
    let missing = rid("https://alice.example/data/nothing/");
    let data = setup
        .data_authorization(PROJECTS)
        .scope(ScopeKind::AllFromRegistry)
        .data_registration(missing.clone())
        .build(&setup.pod.authorization_registry)
        .unwrap();
    let authorization = setup.access_authorization(vec![data]);

    let err = setup.resolver().await.resolve(&authorization).await.unwrap_err();
    assert_matches!(err, SaiError::DanglingReference { ref reference, .. } if reference == &missing);
}

#[tokio::test]
async fn test_selected_dangling_instance_fails_by_default() {
    let setup = setup().await;
    let projects = setup.pod.add_data_registration("projects", PROJECTS).await;
    let p1 = setup.pod.add_instance(&projects, "p1", None).await;
    let gone = projects.child("gone").unwrap();

    let data = setup
        .data_authorization(PROJECTS)
        .scope(ScopeKind::SelectedFromRegistry)
        .data_registration(projects)
        .instances([p1, gone.clone()])
        .build(&setup.pod.authorization_registry)
        .unwrap();
    let authorization = setup.access_authorization(vec![data]);

    setup.pod.store.clear_requests().await;
    let err = setup.resolver().await.issue(&authorization).await.unwrap_err();
    assert_matches!(err, SaiError::DanglingReference { ref reference, .. } if reference == &gone);
    assert_eq!(setup.pod.store.count(HttpMethod::Put).await, 0);
}

#[tokio::test]
async fn test_selected_dangling_instance_skipped_by_policy() {
    let setup = setup().await;
    let projects = setup.pod.add_data_registration("projects", PROJECTS).await;
    let p1 = setup.pod.add_instance(&projects, "p1", None).await;
    let gone = projects.child("gone").unwrap();

    let data = setup
        .data_authorization(PROJECTS)
        .scope(ScopeKind::SelectedFromRegistry)
        .data_registration(projects)
        .instances([p1.clone(), gone])
        .build(&setup.pod.authorization_registry)
        .unwrap();
    let authorization = setup.access_authorization(vec![data]);

    let config = SaiConfig {
        dangling_reference_policy: DanglingReferencePolicy::Skip,
        ..SaiConfig::default()
    };
    let session = setup.pod.store.session_with(config);
    let plan = setup
        .resolver_with(session)
        .await
        .resolve(&authorization)
        .await
        .unwrap();
    assert_eq!(
        plan.data_grants()[0].scope(),
        &GrantScope::SelectedFromRegistry { instances: vec![p1] }
    );
}

#[tokio::test]
async fn test_tolerate_flag_overrides_fail_policy() {
    let setup = setup().await;
    let projects = setup.pod.add_data_registration("projects", PROJECTS).await;
    let p1 = setup.pod.add_instance(&projects, "p1", None).await;

    let data = setup
        .data_authorization(PROJECTS)
        .scope(ScopeKind::SelectedFromRegistry)
        .data_registration(projects.clone())
        .instances([p1.clone(), projects.child("gone").unwrap()])
        .tolerate_missing_instances(true)
        .build(&setup.pod.authorization_registry)
        .unwrap();
    let authorization = setup.access_authorization(vec![data]);

    let plan = setup.resolver().await.resolve(&authorization).await.unwrap();
    assert_eq!(
        plan.data_grants()[0].scope(),
        &GrantScope::SelectedFromRegistry { instances: vec![p1] }
    );
}

#[tokio::test]
async fn test_inherited_without_parent_in_bundle() {
    let setup = setup().await;
    let projects = setup.pod.add_data_registration("projects", PROJECTS).await;
    setup.pod.add_data_registration("tasks", TASKS).await;

    let parent = setup
        .data_authorization(PROJECTS)
        .scope(ScopeKind::AllFromRegistry)
        .data_registration(projects)
        .build(&setup.pod.authorization_registry)
        .unwrap();
    let child = setup
        .data_authorization(TASKS)
        .scope(ScopeKind::Inherited)
        .inherits_from(parent.id().clone())
        .build(&setup.pod.authorization_registry)
        .unwrap();
    // parent deliberately left out
    let authorization = setup.access_authorization(vec![child]);

    setup.pod.store.clear_requests().await;
    let err = setup.resolver().await.issue(&authorization).await.unwrap_err();
    assert_matches!(err, SaiError::InvalidInheritance { .. });
    assert_eq!(setup.pod.store.count(HttpMethod::Put).await, 0);
}

fn raw_inherited(pod: &PodFixture, app: &ResourceId, slug: &str, parent: &str) -> Graph {
    let mut graph = Graph::new(pod.authorization_registry.child(slug).unwrap());
    graph.set_type(interop::DATA_AUTHORIZATION).unwrap();
    graph.set(interop::GRANTEE, app.clone());
    graph.set(interop::GRANTED_BY, pod.owner.clone());
    graph.set(interop::REGISTERED_SHAPE_TREE, rid(TASKS));
    graph.set(interop::ACCESS_MODE, rid(acl::READ));
    graph.set(interop::SCOPE_OF_AUTHORIZATION, rid(interop::INHERITED));
    graph.set(
        interop::INHERITS_FROM_AUTHORIZATION,
        pod.authorization_registry.child(parent).unwrap(),
    );
    graph
}

#[tokio::test]
async fn test_cyclic_inheritance_before_any_write() {
    let setup = setup().await;
    let pod = &setup.pod;
    let a = raw_inherited(pod, &setup.app, "a", "b");
    let b = raw_inherited(pod, &setup.app, "b", "a");
    pod.store.seed(&a).await;
    pod.store.seed(&b).await;

    let mut access = Graph::new(pod.authorization_registry.child("cyclic").unwrap());
    access.set_type(interop::ACCESS_AUTHORIZATION).unwrap();
    access.set(interop::GRANTED_BY, pod.owner.clone());
    access.set(interop::GRANTED_WITH, pod.authorization_agent.clone());
    access.set(interop::GRANTED_AT, chrono::Utc::now());
    access.set(interop::GRANTEE, setup.app.clone());
    access.set_nodes(interop::HAS_DATA_AUTHORIZATION, [a.id(), b.id()]);
    pod.store.seed(&access).await;

    let session = pod.session();
    let authorization = AccessAuthorization::load(&session, access.id()).await.unwrap();

    pod.store.clear_requests().await;
    let err = setup.resolver().await.issue(&authorization).await.unwrap_err();
    match err {
        SaiError::CyclicInheritance { cycle } => {
            assert!(cycle.contains(a.id()));
            assert!(cycle.contains(b.id()));
        }
        other => panic!("expected cyclic inheritance, got {other}"),
    }
    assert_eq!(pod.store.count(HttpMethod::Put).await, 0);
}

#[tokio::test]
async fn test_inherited_grant_points_at_parent_grant() {
    let setup = setup().await;
    let projects = setup.pod.add_data_registration("projects", PROJECTS).await;
    let tasks = setup.pod.add_data_registration("tasks", TASKS).await;
    let p1 = setup.pod.add_instance(&projects, "p1", None).await;
    setup
        .pod
        .add_child_instance(&tasks, "t1", &p1, HAS_TASK)
        .await;

    let parent = setup
        .data_authorization(PROJECTS)
        .scope(ScopeKind::AllFromRegistry)
        .data_registration(projects.clone())
        .build(&setup.pod.authorization_registry)
        .unwrap();
    let child = setup
        .data_authorization(TASKS)
        .scope(ScopeKind::Inherited)
        .inherits_from(parent.id().clone())
        .build(&setup.pod.authorization_registry)
        .unwrap();
    // declaration order does not matter
    let authorization = setup.access_authorization(vec![child, parent]);

    let grant = setup.resolver().await.issue(&authorization).await.unwrap();
    let grants = grant.data_grants();
    assert_eq!(grants.len(), 2);
    assert_eq!(grants[0].data_registration(), &projects);
    assert_eq!(grants[1].data_registration(), &tasks);
    assert_eq!(grants[1].scope().inherits_from(), Some(grants[0].id()));

    let children: Vec<_> = grant.inheriting_grants(grants[0].id()).collect();
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].shape_tree(), &rid(TASKS));
}

#[tokio::test]
async fn test_reissue_supersedes_previous_grant() {
    let setup = setup().await;
    let projects = setup.pod.add_data_registration("projects", PROJECTS).await;
    let build = || {
        let data = setup
            .data_authorization(PROJECTS)
            .scope(ScopeKind::AllFromRegistry)
            .data_registration(projects.clone())
            .build(&setup.pod.authorization_registry)
            .unwrap();
        setup.access_authorization(vec![data])
    };

    let resolver = setup.resolver().await;
    let first = resolver.issue(&build()).await.unwrap();
    let second = resolver.issue(&build()).await.unwrap();
    assert_ne!(first.id(), second.id());

    let registration = AgentRegistration::load(&setup.pod.session(), &setup.app_registration)
        .await
        .unwrap();
    assert_eq!(registration.access_grant(), Some(second.id()));
    assert!(registration.is_superseded(first.id()));
    // superseded grants stay in the store
    assert!(setup.pod.store.contains(first.id()).await);
}

#[tokio::test]
async fn test_partial_grant_failure_names_written_records() {
    let setup = setup().await;
    let projects = setup.pod.add_data_registration("projects", PROJECTS).await;
    let tasks = setup.pod.add_data_registration("tasks", TASKS).await;
    let first = setup
        .data_authorization(PROJECTS)
        .scope(ScopeKind::AllFromRegistry)
        .data_registration(projects)
        .build(&setup.pod.authorization_registry)
        .unwrap();
    let second = setup
        .data_authorization(TASKS)
        .scope(ScopeKind::AllFromRegistry)
        .data_registration(tasks)
        .build(&setup.pod.authorization_registry)
        .unwrap();
    let authorization = setup.access_authorization(vec![first, second]);

    let resolver = setup.resolver().await;
    let plan = resolver.resolve(&authorization).await.unwrap();
    setup.pod.store.fail_puts_after(1, 503).await;
    let err = resolver.persist(&plan).await.unwrap_err();
    match err {
        SaiError::PartialGrantFailure {
            persisted,
            failed,
            source,
        } => {
            assert_eq!(persisted, vec![plan.data_grants()[0].id().clone()]);
            assert_eq!(&failed, plan.data_grants()[1].id());
            assert_matches!(*source, SaiError::Unreachable { .. });
        }
        other => panic!("expected partial failure, got {other}"),
    }
    assert!(setup.pod.store.contains(plan.data_grants()[0].id()).await);
    assert!(!setup.pod.store.contains(plan.access_grant().id()).await);
}

/// Bob shares projects with Alice; Alice delegates them to her application
async fn delegation_fixture(alice_modes: AccessModes) -> (Setup, ResourceId, AccessGrant) {
    let store = MemoryStore::new();
    let setup = setup_on(&store).await;
    let bob = PodFixture::seed(&store, "https://bob.example/").await;
    let bob_projects = bob.add_data_registration("projects", PROJECTS).await;
    bob.add_instance(&bob_projects, "b1", None).await;
    assert_eq!(bob_projects, rid("https://bob.example/data/projects/"));
    let bob_registration_of_alice = bob.add_social_agent("alice", &setup.pod.owner, None).await;

    let shared = DataAuthorization::builder()
        .grantee(setup.pod.owner.clone())
        .granted_by(bob.owner.clone())
        .shape_tree(rid(PROJECTS))
        .access_modes([AccessMode::Read, AccessMode::Update].into_iter().collect())
        .scope(ScopeKind::AllFromRegistry)
        .data_registration(bob_projects.clone())
        .build(&bob.authorization_registry)
        .unwrap();
    let bob_authorization = AccessAuthorization::builder()
        .granted_by(bob.owner.clone())
        .granted_with(bob.authorization_agent.clone())
        .grantee(setup.pod.owner.clone())
        .data_authorization(shared)
        .build(&bob.authorization_registry)
        .unwrap();
    let bob_set = RegistrySet::open(&bob.session(), &bob.registry_set).await.unwrap();
    let bob_grant = GrantResolver::new(bob.session(), bob_set)
        .issue(&bob_authorization)
        .await
        .unwrap();

    setup
        .pod
        .add_social_agent("bob", &bob.owner, Some(&bob_registration_of_alice))
        .await;

    let delegated = setup
        .data_authorization(PROJECTS)
        .access_modes(alice_modes)
        .scope(ScopeKind::AllFromAgent)
        .data_owner(bob.owner.clone())
        .build(&setup.pod.authorization_registry)
        .unwrap();
    let authorization = setup.access_authorization(vec![delegated]);
    let grant = setup.resolver().await.issue(&authorization).await.unwrap();
    let remote_grant = bob_grant.data_grants()[0].id().clone();
    (setup, remote_grant, grant)
}

#[tokio::test]
async fn test_delegation_intersects_modes() {
    let modes: AccessModes = [AccessMode::Read, AccessMode::Delete].into_iter().collect();
    let (setup, remote_grant, grant) = delegation_fixture(modes).await;

    assert_eq!(grant.data_grants().len(), 1);
    let delegated = &grant.data_grants()[0];
    assert_eq!(delegated.delegation_of(), Some(&remote_grant));
    assert_eq!(delegated.access_modes(), &AccessModes::read_only());
    assert_eq!(delegated.data_owner(), &rid("https://bob.example/profile#me"));
    assert_eq!(
        delegated.data_registration(),
        &rid("https://bob.example/data/projects/")
    );
    assert_eq!(delegated.grantee(), &setup.app);
    assert!(!delegated.is_inheritable());
}

#[tokio::test]
async fn test_delegation_without_common_modes_is_skipped() {
    let modes: AccessModes = [AccessMode::Delete].into_iter().collect();
    let (_, _, grant) = delegation_fixture(modes).await;
    assert!(grant.data_grants().is_empty());
}

#[tokio::test]
async fn test_registry_add_swaps_replaced_authorization() {
    let setup = setup().await;
    let first = setup.persisted_authorization(None).await;
    let second = setup.persisted_authorization(Some(first.id())).await;

    let mut registry = setup.authorization_registry().await;
    registry.add(&first).await.unwrap();
    registry.add(&second).await.unwrap();
    assert!(registry.contains(second.id()));
    assert!(!registry.contains(first.id()));

    let stored = setup.authorization_registry().await;
    assert_eq!(stored.authorization_ids(), vec![second.id().clone()]);

    let found = stored
        .find_for_grantee::<AccessAuthorization>(&setup.app)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.id(), second.id());
    assert_eq!(found.replaces(), Some(first.id()));
    let nobody = stored
        .find_for_grantee::<AccessAuthorization>(&rid("https://nobody.example/#id"))
        .await
        .unwrap();
    assert!(nobody.is_none());
}

#[tokio::test]
async fn test_registry_rejects_second_authorization_for_grantee() {
    let setup = setup().await;
    let first = setup.persisted_authorization(None).await;
    let second = setup.persisted_authorization(None).await;
    let mut registry = setup.authorization_registry().await;
    registry.add(&first).await.unwrap();

    setup.pod.store.clear_requests().await;
    let err = registry.add(&second).await.unwrap_err();
    assert_matches!(err, SaiError::AlreadyExists { .. });
    assert_eq!(setup.pod.store.count(HttpMethod::Put).await, 0);
    assert!(registry.contains(first.id()));
    assert!(!registry.contains(second.id()));

    // linking the same authorization again is not a second one
    registry.add(&first).await.unwrap();
    assert_eq!(registry.authorization_ids(), vec![first.id().clone()]);
}

#[tokio::test]
async fn test_failed_registry_write_keeps_cached_links() {
    let setup = setup().await;
    let first = setup.persisted_authorization(None).await;
    let mut registry = setup.authorization_registry().await;

    setup.pod.store.fail_puts_after(0, 503).await;
    let err = registry.add(&first).await.unwrap_err();
    assert_matches!(err, SaiError::Unreachable { .. });
    assert!(!registry.contains(first.id()));
    assert!(!setup.authorization_registry().await.contains(first.id()));

    setup.pod.store.allow_puts().await;
    registry.add(&first).await.unwrap();

    let second = setup.persisted_authorization(Some(first.id())).await;
    setup.pod.store.fail_puts_after(0, 503).await;
    let err = registry.add(&second).await.unwrap_err();
    assert_matches!(err, SaiError::Unreachable { .. });
    assert!(registry.contains(first.id()));
    assert!(!registry.contains(second.id()));

    let err = registry.remove(first.id()).await.unwrap_err();
    assert_matches!(err, SaiError::Unreachable { .. });
    assert!(registry.contains(first.id()));

    setup.pod.store.allow_puts().await;
    registry.remove(first.id()).await.unwrap();
    assert!(!setup.authorization_registry().await.contains(first.id()));
}
