//! # Object Store
//!
//! Read/write access to the objects the reconciler works with.
//!
//! The reconciler only talks to the cluster through [`ObjectStore`], so the
//! same reconciliation code runs against the Kubernetes API server
//! ([`KubeStore`]) and against in-memory stores in tests.
//!
//! Every method is a plain future: dropping it (controller shutdown) cancels
//! the request in flight.

use crate::crd::Patcher;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Namespace, Secret};
use kube::api::{Api, ListParams, PostParams};
use kube::Client;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The object (or, for creates, its namespace) does not exist
    #[error("{kind} {key} not found")]
    NotFound { kind: &'static str, key: String },
    /// The object is missing a field required to address it
    #[error("{kind} is missing {field}")]
    MissingField {
        kind: &'static str,
        field: &'static str,
    },
    /// Any other failure reported by the Kubernetes API
    #[error("Kubernetes API error for {kind} {key}: {source}")]
    Kube {
        kind: &'static str,
        key: String,
        #[source]
        source: kube::Error,
    },
    /// Failure reported by a non-Kubernetes backend
    #[error("{0}")]
    Backend(String),
}

impl StoreError {
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }

    fn from_kube(kind: &'static str, key: String, err: kube::Error) -> Self {
        match err {
            kube::Error::Api(api_err) if api_err.code == 404 => StoreError::NotFound { kind, key },
            source => StoreError::Kube { kind, key, source },
        }
    }
}

/// Format an object key the way Kubernetes tooling prints it
#[must_use]
pub fn object_key(namespace: &str, name: &str) -> String {
    format!("{namespace}/{name}")
}

/// Store operations needed by the reconciler
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Get a Patcher by namespace and name
    async fn get_patcher(&self, namespace: &str, name: &str) -> Result<Patcher, StoreError>;

    /// Get a Secret by namespace and name
    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Secret, StoreError>;

    /// List every namespace in the cluster
    async fn list_namespaces(&self) -> Result<Vec<Namespace>, StoreError>;

    /// Create a Secret in the namespace named by its metadata
    ///
    /// Returns `StoreError::NotFound` when that namespace does not exist.
    async fn create_secret(&self, secret: &Secret) -> Result<Secret, StoreError>;

    /// Replace an existing Secret (optimistic concurrency on its resourceVersion)
    async fn update_secret(&self, secret: &Secret) -> Result<Secret, StoreError>;
}

/// [`ObjectStore`] backed by the Kubernetes API server
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
}

impl std::fmt::Debug for KubeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeStore").finish_non_exhaustive()
    }
}

impl KubeStore {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn secrets(&self, namespace: &str) -> Api<Secret> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

fn secret_address(secret: &Secret) -> Result<(&str, &str), StoreError> {
    let namespace = secret
        .metadata
        .namespace
        .as_deref()
        .ok_or(StoreError::MissingField {
            kind: "Secret",
            field: "metadata.namespace",
        })?;
    let name = secret
        .metadata
        .name
        .as_deref()
        .ok_or(StoreError::MissingField {
            kind: "Secret",
            field: "metadata.name",
        })?;
    Ok((namespace, name))
}

#[async_trait]
impl ObjectStore for KubeStore {
    async fn get_patcher(&self, namespace: &str, name: &str) -> Result<Patcher, StoreError> {
        let api: Api<Patcher> = Api::namespaced(self.client.clone(), namespace);
        let key = object_key(namespace, name);
        match api.get_opt(name).await {
            Ok(Some(patcher)) => Ok(patcher),
            Ok(None) => Err(StoreError::NotFound {
                kind: "Patcher",
                key,
            }),
            Err(e) => Err(StoreError::from_kube("Patcher", key, e)),
        }
    }

    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Secret, StoreError> {
        let key = object_key(namespace, name);
        match self.secrets(namespace).get_opt(name).await {
            Ok(Some(secret)) => Ok(secret),
            Ok(None) => Err(StoreError::NotFound {
                kind: "Secret",
                key,
            }),
            Err(e) => Err(StoreError::from_kube("Secret", key, e)),
        }
    }

    async fn list_namespaces(&self) -> Result<Vec<Namespace>, StoreError> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        api.list(&ListParams::default())
            .await
            .map(|list| list.items)
            .map_err(|e| StoreError::from_kube("Namespace", "*".to_string(), e))
    }

    async fn create_secret(&self, secret: &Secret) -> Result<Secret, StoreError> {
        let (namespace, name) = secret_address(secret)?;
        self.secrets(namespace)
            .create(&PostParams::default(), secret)
            .await
            .map_err(|e| StoreError::from_kube("Secret", object_key(namespace, name), e))
    }

    async fn update_secret(&self, secret: &Secret) -> Result<Secret, StoreError> {
        let (namespace, name) = secret_address(secret)?;
        self.secrets(namespace)
            .replace(name, &PostParams::default(), secret)
            .await
            .map_err(|e| StoreError::from_kube("Secret", object_key(namespace, name), e))
    }
}
