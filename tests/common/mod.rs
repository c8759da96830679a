//! Common test utilities
//!
//! An in-memory [`ObjectStore`] that behaves like the API server for the
//! operations the reconciler uses, with write counters and fault injection.

#![allow(dead_code, reason = "each test binary uses a different subset")]

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Namespace, Secret};
use k8s_openapi::ByteString;
use kube::api::ObjectMeta;
use namespace_secrets_patcher::controller::reconciler::PatcherLister;
use namespace_secrets_patcher::controller::store::{object_key, ObjectStore, StoreError};
use namespace_secrets_patcher::crd::{Patcher, PatcherSpec, TargetSpec};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
struct State {
    namespaces: BTreeSet<String>,
    secrets: BTreeMap<(String, String), Secret>,
    patchers: BTreeMap<(String, String), Patcher>,
    next_version: u64,
}

#[derive(Debug, Default)]
pub struct Faults {
    /// Namespaces whose secret reads fail with a non-not-found error
    pub get_secret: HashSet<String>,
    pub get_patcher: bool,
    pub list_namespaces: bool,
    /// Namespaces whose secret creates fail with a non-not-found error
    pub create_secret: HashSet<String>,
    pub update_secret: bool,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    pub faults: Mutex<Faults>,
    pub creates: AtomicUsize,
    pub updates: AtomicUsize,
}

fn backend_error(what: &str) -> StoreError {
    StoreError::Backend(format!("injected failure: {what}"))
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add_namespace(&self, name: &str) {
        self.state.lock().unwrap().namespaces.insert(name.to_string());
    }

    /// Delete a namespace and everything in it, like the API server would
    pub fn delete_namespace(&self, name: &str) {
        let mut state = self.state.lock().unwrap();
        state.namespaces.remove(name);
        state.secrets.retain(|(ns, _), _| ns != name);
        state.patchers.retain(|(ns, _), _| ns != name);
    }

    /// Seed a secret directly, bypassing the write counters
    pub fn put_secret(&self, secret: Secret) {
        let mut state = self.state.lock().unwrap();
        state.next_version += 1;
        let mut secret = secret;
        secret.metadata.resource_version = Some(state.next_version.to_string());
        let key = (
            secret.metadata.namespace.clone().unwrap(),
            secret.metadata.name.clone().unwrap(),
        );
        state.secrets.insert(key, secret);
    }

    pub fn secret(&self, namespace: &str, name: &str) -> Option<Secret> {
        self.state
            .lock()
            .unwrap()
            .secrets
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }

    pub fn secret_count(&self) -> usize {
        self.state.lock().unwrap().secrets.len()
    }

    pub fn put_patcher(&self, patcher: Patcher) {
        let key = (
            patcher.metadata.namespace.clone().unwrap(),
            patcher.metadata.name.clone().unwrap(),
        );
        self.state.lock().unwrap().patchers.insert(key, patcher);
    }

    pub fn delete_patcher(&self, namespace: &str, name: &str) {
        self.state
            .lock()
            .unwrap()
            .patchers
            .remove(&(namespace.to_string(), name.to_string()));
    }

    pub fn writes(&self) -> usize {
        self.creates.load(Ordering::SeqCst) + self.updates.load(Ordering::SeqCst)
    }

    pub fn reset_counters(&self) {
        self.creates.store(0, Ordering::SeqCst);
        self.updates.store(0, Ordering::SeqCst);
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn get_patcher(&self, namespace: &str, name: &str) -> Result<Patcher, StoreError> {
        if self.faults.lock().unwrap().get_patcher {
            return Err(backend_error("get patcher"));
        }
        self.state
            .lock()
            .unwrap()
            .patchers
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                kind: "Patcher",
                key: object_key(namespace, name),
            })
    }

    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Secret, StoreError> {
        if self.faults.lock().unwrap().get_secret.contains(namespace) {
            return Err(backend_error("get secret"));
        }
        self.secret(namespace, name).ok_or_else(|| StoreError::NotFound {
            kind: "Secret",
            key: object_key(namespace, name),
        })
    }

    async fn list_namespaces(&self) -> Result<Vec<Namespace>, StoreError> {
        if self.faults.lock().unwrap().list_namespaces {
            return Err(backend_error("list namespaces"));
        }
        Ok(self
            .state
            .lock()
            .unwrap()
            .namespaces
            .iter()
            .map(|name| namespace(name))
            .collect())
    }

    async fn create_secret(&self, secret: &Secret) -> Result<Secret, StoreError> {
        let namespace = secret.metadata.namespace.clone().unwrap();
        let name = secret.metadata.name.clone().unwrap();
        if self.faults.lock().unwrap().create_secret.contains(&namespace) {
            return Err(backend_error("create secret"));
        }
        assert!(
            secret.metadata.resource_version.is_none(),
            "create must not carry a resourceVersion"
        );
        let mut state = self.state.lock().unwrap();
        if !state.namespaces.contains(&namespace) {
            return Err(StoreError::NotFound {
                kind: "Namespace",
                key: namespace,
            });
        }
        let key = (namespace.clone(), name.clone());
        if state.secrets.contains_key(&key) {
            return Err(StoreError::Backend(format!(
                "secret {} already exists",
                object_key(&namespace, &name)
            )));
        }
        state.next_version += 1;
        let mut stored = secret.clone();
        stored.metadata.resource_version = Some(state.next_version.to_string());
        state.secrets.insert(key, stored.clone());
        self.creates.fetch_add(1, Ordering::SeqCst);
        Ok(stored)
    }

    async fn update_secret(&self, secret: &Secret) -> Result<Secret, StoreError> {
        if self.faults.lock().unwrap().update_secret {
            return Err(backend_error("update secret"));
        }
        let namespace = secret.metadata.namespace.clone().unwrap();
        let name = secret.metadata.name.clone().unwrap();
        let mut state = self.state.lock().unwrap();
        let key = (namespace.clone(), name.clone());
        let Some(current) = state.secrets.get(&key) else {
            return Err(StoreError::NotFound {
                kind: "Secret",
                key: object_key(&namespace, &name),
            });
        };
        if current.metadata.resource_version != secret.metadata.resource_version {
            return Err(StoreError::Backend("conflict: resourceVersion changed".to_string()));
        }
        state.next_version += 1;
        let mut stored = secret.clone();
        stored.metadata.resource_version = Some(state.next_version.to_string());
        state.secrets.insert(key, stored.clone());
        self.updates.fetch_add(1, Ordering::SeqCst);
        Ok(stored)
    }
}

/// Fixed set of Patchers for the mapping functions
#[derive(Debug, Default)]
pub struct StaticLister {
    pub patchers: Vec<Arc<Patcher>>,
    pub fail: bool,
}

impl PatcherLister for StaticLister {
    fn list_patchers(&self) -> Result<Vec<Arc<Patcher>>, StoreError> {
        if self.fail {
            return Err(backend_error("list patchers"));
        }
        Ok(self.patchers.clone())
    }
}

pub fn data(pairs: &[(&str, &str)]) -> BTreeMap<String, ByteString> {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), ByteString(v.as_bytes().to_vec())))
        .collect()
}

pub fn namespace(name: &str) -> Namespace {
    Namespace {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            ..Default::default()
        },
        ..Default::default()
    }
}

pub fn secret(namespace: &str, name: &str, pairs: &[(&str, &str)]) -> Secret {
    Secret {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        type_: Some("Opaque".to_string()),
        data: Some(data(pairs)),
        ..Default::default()
    }
}

pub fn patcher(namespace: &str, name: &str, secret: &str, targets: Vec<TargetSpec>) -> Patcher {
    let mut patcher = Patcher::new(
        name,
        PatcherSpec {
            secret: secret.to_string(),
            targets,
        },
    );
    patcher.metadata.namespace = Some(namespace.to_string());
    patcher
}
