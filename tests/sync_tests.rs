//! # Secret Sync Tests
//!
//! Behaviour of a single target sync against the in-memory store:
//! create on missing, update on drift, no write when equal, and the error
//! handling for failed reads and writes.

mod common;

use common::{data, secret, MemoryStore};
use namespace_secrets_patcher::controller::reconciler::{sync_target, SyncError, SyncOutcome};

#[tokio::test]
async fn test_creates_missing_copy() {
    let store = MemoryStore::new();
    store.add_namespace("source");
    store.add_namespace("target");
    let source = secret("source", "creds", &[("k", "v")]);
    store.put_secret(source.clone());
    let source = store.secret("source", "creds").unwrap();

    let outcome = sync_target(store.as_ref(), &source, "target").await.unwrap();

    assert_eq!(outcome, SyncOutcome::Created);
    let copy = store.secret("target", "creds").expect("copy should exist");
    assert_eq!(copy.data, Some(data(&[("k", "v")])));
    assert_eq!(copy.type_.as_deref(), Some("Opaque"));
    assert_eq!(store.creates.load(std::sync::atomic::Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_updates_drifted_copy_once() {
    let store = MemoryStore::new();
    store.add_namespace("source");
    store.add_namespace("target");
    store.put_secret(secret("source", "creds", &[("k", "v2")]));
    store.put_secret(secret("target", "creds", &[("k", "v1")]));
    let source = store.secret("source", "creds").unwrap();

    let outcome = sync_target(store.as_ref(), &source, "target").await.unwrap();

    assert_eq!(outcome, SyncOutcome::Updated);
    assert_eq!(
        store.secret("target", "creds").unwrap().data,
        Some(data(&[("k", "v2")]))
    );
    assert_eq!(store.updates.load(std::sync::atomic::Ordering::SeqCst), 1);
    assert_eq!(store.creates.load(std::sync::atomic::Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_update_removes_extra_keys() {
    let store = MemoryStore::new();
    store.add_namespace("target");
    store.put_secret(secret("target", "creds", &[("k", "v"), ("stale", "x")]));
    let source = secret("source", "creds", &[("k", "v")]);

    sync_target(store.as_ref(), &source, "target").await.unwrap();

    assert_eq!(
        store.secret("target", "creds").unwrap().data,
        Some(data(&[("k", "v")]))
    );
}

#[tokio::test]
async fn test_update_keeps_target_metadata() {
    let store = MemoryStore::new();
    store.add_namespace("target");
    let mut existing = secret("target", "creds", &[("k", "old")]);
    existing.metadata.labels = Some([("team".to_string(), "a".to_string())].into());
    store.put_secret(existing);
    let source = secret("source", "creds", &[("k", "new")]);

    sync_target(store.as_ref(), &source, "target").await.unwrap();

    let copy = store.secret("target", "creds").unwrap();
    assert_eq!(
        copy.metadata.labels,
        Some([("team".to_string(), "a".to_string())].into())
    );
}

#[tokio::test]
async fn test_no_write_when_equal() {
    let store = MemoryStore::new();
    store.add_namespace("target");
    store.put_secret(secret("target", "creds", &[("k", "v")]));
    let source = secret("source", "creds", &[("k", "v")]);

    let outcome = sync_target(store.as_ref(), &source, "target").await.unwrap();

    assert_eq!(outcome, SyncOutcome::Unchanged);
    assert_eq!(store.writes(), 0);
}

#[tokio::test]
async fn test_second_sync_is_noop() {
    let store = MemoryStore::new();
    store.add_namespace("target");
    let source = secret("source", "creds", &[("k", "v")]);

    assert_eq!(
        sync_target(store.as_ref(), &source, "target").await.unwrap(),
        SyncOutcome::Created
    );
    store.reset_counters();

    assert_eq!(
        sync_target(store.as_ref(), &source, "target").await.unwrap(),
        SyncOutcome::Unchanged
    );
    assert_eq!(store.writes(), 0);
}

#[tokio::test]
async fn test_missing_namespace_on_create_is_swallowed() {
    let store = MemoryStore::new();
    // "target" is never created: the namespace was deleted between list and create
    let source = secret("source", "creds", &[("k", "v")]);

    let outcome = sync_target(store.as_ref(), &source, "target").await.unwrap();

    assert_eq!(outcome, SyncOutcome::NamespaceGone);
    assert!(store.secret("target", "creds").is_none());
}

#[tokio::test]
async fn test_other_create_failure_is_propagated() {
    let store = MemoryStore::new();
    store.add_namespace("target");
    store.faults.lock().unwrap().create_secret.insert("target".to_string());
    let source = secret("source", "creds", &[("k", "v")]);

    let err = sync_target(store.as_ref(), &source, "target")
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::Create { .. }));
    assert!(err.to_string().contains("target/creds"));
}

#[tokio::test]
async fn test_update_failure_is_propagated() {
    let store = MemoryStore::new();
    store.add_namespace("target");
    store.put_secret(secret("target", "creds", &[("k", "old")]));
    store.faults.lock().unwrap().update_secret = true;
    let source = secret("source", "creds", &[("k", "new")]);

    let err = sync_target(store.as_ref(), &source, "target")
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::Update { .. }));
}

#[tokio::test]
async fn test_read_failure_skips_target() {
    let store = MemoryStore::new();
    store.add_namespace("target");
    store.put_secret(secret("target", "creds", &[("k", "old")]));
    store.faults.lock().unwrap().get_secret.insert("target".to_string());
    let source = secret("source", "creds", &[("k", "new")]);

    let outcome = sync_target(store.as_ref(), &source, "target").await.unwrap();

    assert_eq!(outcome, SyncOutcome::Skipped);
    assert_eq!(store.writes(), 0);
    assert_eq!(
        store.secret("target", "creds").unwrap().data,
        Some(data(&[("k", "old")]))
    );
}

#[tokio::test]
async fn test_empty_and_missing_data_are_equal() {
    let store = MemoryStore::new();
    store.add_namespace("target");
    let mut existing = secret("target", "creds", &[]);
    existing.data = None;
    store.put_secret(existing);
    let source = secret("source", "creds", &[]);

    let outcome = sync_target(store.as_ref(), &source, "target").await.unwrap();

    assert_eq!(outcome, SyncOutcome::Unchanged);
}

#[tokio::test]
async fn test_source_without_name_is_rejected() {
    let store = MemoryStore::new();
    let mut source = secret("source", "creds", &[("k", "v")]);
    source.metadata.name = None;

    let err = sync_target(store.as_ref(), &source, "target")
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::MissingSourceName));
}
