//! Resource lifecycle tests against the in-memory store

use assert_matches::assert_matches;
use sai_core::vocabulary::{dcterms, interop};
use sai_core::{DuplicateCreatePolicy, Graph, HttpMethod, SaiConfig, SaiError, Value};
use sai_resources::{
    content_address, CrudResource, ImmutableResource, ReadableResource, Resource, ResourceKind,
};
use sai_testkit::{init_test_tracing, rid, MemoryStore};

fn project(id: &str, name: &str) -> Graph {
    let mut graph = Graph::new(rid(id));
    graph.set(interop::SATISFIES_ACCESS_NEED, Value::text(name));
    graph
}

#[tokio::test]
async fn test_fetch_missing_is_not_found() {
    init_test_tracing();
    let store = MemoryStore::new();
    let err = ReadableResource::get(&store.session(), &rid("https://alice.example/missing"))
        .await
        .unwrap_err();
    assert_matches!(err, SaiError::NotFound { .. });
}

#[tokio::test]
async fn test_fetch_offline_is_unreachable() {
    let store = MemoryStore::new();
    store.set_unreachable(true).await;
    let err = ReadableResource::get(&store.session(), &rid("https://alice.example/a"))
        .await
        .unwrap_err();
    assert_matches!(err, SaiError::Unreachable { .. });
}

#[tokio::test]
async fn test_readable_refresh_overwrites_cache() {
    let store = MemoryStore::new();
    let id = rid("https://alice.example/data/a");
    store.seed(&project(id.as_str(), "one")).await;

    let mut resource = ReadableResource::get(&store.session(), &id).await.unwrap();
    store
        .modify(&id, |g| g.set(interop::SATISFIES_ACCESS_NEED, Value::text("two")))
        .await;
    assert_eq!(resource.graph().text(interop::SATISFIES_ACCESS_NEED), Some("one"));

    resource.refresh().await.unwrap();
    assert_eq!(resource.graph().text(interop::SATISFIES_ACCESS_NEED), Some("two"));
    assert_matches!(resource.update(), Err(SaiError::Unsupported { .. }));
}

#[tokio::test]
async fn test_exists_uses_head() {
    let store = MemoryStore::new();
    let id = rid("https://alice.example/data/a");
    store.seed(&Graph::new(id.clone())).await;

    let resource = CrudResource::new(&store.session(), id);
    assert!(resource.exists().await.unwrap());
    let absent = CrudResource::new(&store.session(), rid("https://alice.example/data/b"));
    assert!(!absent.exists().await.unwrap());
    assert_eq!(store.count(HttpMethod::Head).await, 2);
    assert_eq!(store.count(HttpMethod::Get).await, 0);
}

#[tokio::test]
async fn test_crud_create_rejects_occupied_id() {
    let store = MemoryStore::new();
    let session = store.session();
    CrudResource::create(&session, project("https://alice.example/data/a", "one"))
        .await
        .unwrap();
    let err = CrudResource::create(&session, project("https://alice.example/data/a", "two"))
        .await
        .unwrap_err();
    assert_matches!(err, SaiError::AlreadyExists { .. });
}

#[tokio::test]
async fn test_update_after_refresh_succeeds() {
    let store = MemoryStore::new();
    let session = store.session();
    let id = rid("https://alice.example/data/a");
    store.seed(&project(id.as_str(), "one")).await;

    let mut resource = CrudResource::get(&session, &id).await.unwrap();
    resource
        .graph_mut()
        .set(interop::SATISFIES_ACCESS_NEED, Value::text("two"));
    assert!(resource.is_dirty());
    resource.update().await.unwrap();
    assert!(!resource.is_dirty());

    // The new entity tag is tracked, so a second update also succeeds
    resource
        .graph_mut()
        .set(interop::SATISFIES_ACCESS_NEED, Value::text("three"));
    resource.update().await.unwrap();

    let stored = store.read(&id).await.unwrap();
    assert_eq!(stored.text(interop::SATISFIES_ACCESS_NEED), Some("three"));
}

#[tokio::test]
async fn test_update_without_fetch_conflicts() {
    let store = MemoryStore::new();
    let id = rid("https://alice.example/data/a");
    store.seed(&project(id.as_str(), "one")).await;

    let mut resource = CrudResource::new(&store.session(), id);
    let err = resource.update().await.unwrap_err();
    assert_matches!(err, SaiError::Conflict { .. });
    assert_eq!(store.request_count().await, 0);
}

#[tokio::test]
async fn test_update_after_remote_change_conflicts_until_refresh() {
    let store = MemoryStore::new();
    let id = rid("https://alice.example/data/a");
    store.seed(&project(id.as_str(), "one")).await;

    let mut resource = CrudResource::get(&store.session(), &id).await.unwrap();
    store
        .modify(&id, |g| g.set(dcterms::CREATOR, rid("https://bob.example/#me")))
        .await;
    resource
        .graph_mut()
        .set(interop::SATISFIES_ACCESS_NEED, Value::text("mine"));

    let err = resource.update().await.unwrap_err();
    assert_matches!(err, SaiError::Conflict { ref resource, .. } if *resource == id);
    // The concurrent change was not overwritten
    let stored = store.read(&id).await.unwrap();
    assert_eq!(stored.text(interop::SATISFIES_ACCESS_NEED), Some("one"));

    resource.refresh().await.unwrap();
    resource
        .graph_mut()
        .set(interop::SATISFIES_ACCESS_NEED, Value::text("mine"));
    resource.update().await.unwrap();
    let stored = store.read(&id).await.unwrap();
    assert_eq!(stored.node(dcterms::CREATOR), Some(rid("https://bob.example/#me")));
}

#[tokio::test]
async fn test_simulated_change_conflicts() {
    let store = MemoryStore::new();
    let id = rid("https://alice.example/data/a");
    store.seed(&project(id.as_str(), "one")).await;

    let mut resource = CrudResource::get(&store.session(), &id).await.unwrap();
    store.simulate_remote_change(&id).await;
    assert_matches!(resource.update().await, Err(SaiError::Conflict { .. }));
}

#[tokio::test]
async fn test_delete_is_idempotent() {
    let store = MemoryStore::new();
    let id = rid("https://alice.example/data/a");
    store.seed(&Graph::new(id.clone())).await;

    let mut resource = CrudResource::get(&store.session(), &id).await.unwrap();
    resource.delete().await.unwrap();
    assert!(!store.contains(&id).await);
    resource.delete().await.unwrap();
}

#[tokio::test]
async fn test_immutable_same_content_same_id() {
    let store = MemoryStore::new();
    let session = store.session();
    let container = rid("https://alice.example/agents/projectron/");
    let graph = project("https://alice.example/tmp", "grant");

    let first = ImmutableResource::create(&session, &container, graph.clone(), b"d1")
        .await
        .unwrap();
    let second = ImmutableResource::create(&session, &container, graph.clone(), b"d1")
        .await
        .unwrap();
    assert_eq!(first.id(), second.id());
    assert_eq!(first.id(), &content_address(&container, &graph, b"d1").unwrap());
    assert_eq!(store.ids_under(&container).await.len(), 1);
}

#[tokio::test]
async fn test_immutable_duplicate_rejected_by_policy() {
    let store = MemoryStore::new();
    let session = store.session_with(SaiConfig {
        duplicate_create_policy: DuplicateCreatePolicy::Reject,
        ..SaiConfig::default()
    });
    let container = rid("https://alice.example/agents/projectron/");
    let graph = project("https://alice.example/tmp", "grant");

    ImmutableResource::create(&session, &container, graph.clone(), b"d1")
        .await
        .unwrap();
    let err = ImmutableResource::create(&session, &container, graph, b"d1")
        .await
        .unwrap_err();
    assert_matches!(err, SaiError::AlreadyExists { .. });
}

#[tokio::test]
async fn test_immutable_discriminator_allows_duplicates() {
    let store = MemoryStore::new();
    let session = store.session();
    let container = rid("https://alice.example/agents/projectron/");
    let graph = project("https://alice.example/tmp", "grant");

    let a = ImmutableResource::create(&session, &container, graph.clone(), b"d1")
        .await
        .unwrap();
    let b = ImmutableResource::create(&session, &container, graph, b"d2")
        .await
        .unwrap();
    assert_ne!(a.id(), b.id());
}

#[tokio::test]
async fn test_immutable_update_unsupported_and_delete_revokes() {
    let store = MemoryStore::new();
    let session = store.session();
    let container = rid("https://alice.example/agents/projectron/");
    let mut record = ImmutableResource::create(
        &session,
        &container,
        project("https://alice.example/tmp", "grant"),
        b"d1",
    )
    .await
    .unwrap();

    let before = store.request_count().await;
    assert_matches!(record.update(), Err(SaiError::Unsupported { .. }));
    assert_eq!(store.request_count().await, before);

    let id = record.id().clone();
    record.delete().await.unwrap();
    assert!(!store.contains(&id).await);
}

#[tokio::test]
async fn test_resource_union_dispatch() {
    let store = MemoryStore::new();
    let session = store.session();
    let id = rid("https://alice.example/data/a");
    store.seed(&project(id.as_str(), "one")).await;

    let mut readable: Resource = ReadableResource::get(&session, &id).await.unwrap().into();
    assert_eq!(readable.kind(), ResourceKind::Readable);
    assert_matches!(readable.update().await, Err(SaiError::Unsupported { .. }));
    assert_matches!(readable.delete().await, Err(SaiError::Unsupported { .. }));

    let mut crud: Resource = CrudResource::get(&session, &id).await.unwrap().into();
    assert_eq!(crud.kind(), ResourceKind::Crud);
    crud.update().await.unwrap();

    let mut immutable: Resource = ImmutableResource::create(
        &session,
        &rid("https://alice.example/grants/"),
        project("https://alice.example/tmp", "x"),
        b"",
    )
    .await
    .unwrap()
    .into();
    assert_matches!(immutable.update().await, Err(SaiError::Unsupported { .. }));
    immutable.refresh().await.unwrap();
    assert!(immutable.etag().is_some());
}

#[tokio::test]
async fn test_open_by_kind_guards_modification() {
    let store = MemoryStore::new();
    let session = store.session();
    let id = rid("https://alice.example/data/a");
    store.seed(&project(id.as_str(), "one")).await;

    let mut readable = Resource::get(&session, &id, ResourceKind::Readable).await.unwrap();
    assert_eq!(readable.kind(), ResourceKind::Readable);
    assert_matches!(readable.graph_mut(), Err(SaiError::Unsupported { .. }));

    let mut editable = Resource::get(&session, &id, ResourceKind::Crud).await.unwrap();
    editable
        .graph_mut()
        .unwrap()
        .set(interop::SATISFIES_ACCESS_NEED, Value::text("two"));
    editable.update().await.unwrap();
    let stored = store.read(&id).await.unwrap();
    assert_eq!(stored.text(interop::SATISFIES_ACCESS_NEED), Some("two"));

    let err = Resource::get(&session, &rid("https://alice.example/data/none"), ResourceKind::Immutable)
        .await
        .unwrap_err();
    assert_matches!(err, SaiError::NotFound { .. });
}
