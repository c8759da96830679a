//! # Watch Mapping
//!
//! Translates changes to Secrets and Namespaces into the Patchers that must
//! be reconciled again.
//!
//! These run on the shared watch-event path, so they are synchronous, read
//! only from a [`PatcherLister`] and never fail: a listing error maps the
//! event to no work at all.

use crate::controller::store::StoreError;
use crate::crd::Patcher;
use k8s_openapi::api::core::v1::{Namespace, Secret};
use kube_runtime::reflector::{ObjectRef, Store};
use std::sync::Arc;
use tracing::{debug, warn};

/// Source of the current set of Patchers
pub trait PatcherLister: Send + Sync {
    /// List every Patcher in the cluster
    ///
    /// # Errors
    ///
    /// Returns an error when the Patcher set cannot be read.
    fn list_patchers(&self) -> Result<Vec<Arc<Patcher>>, StoreError>;
}

/// The controller's reflector cache of Patchers
impl PatcherLister for Store<Patcher> {
    fn list_patchers(&self) -> Result<Vec<Arc<Patcher>>, StoreError> {
        Ok(self.state())
    }
}

fn list_or_empty<L>(lister: &L, event: &str) -> Vec<Arc<Patcher>>
where
    L: PatcherLister + ?Sized,
{
    lister.list_patchers().unwrap_or_else(|e| {
        warn!(event, error = %e, "Failed to list Patchers, dropping watch event");
        Vec::new()
    })
}

/// Patchers whose source secret has the same name as `secret`
///
/// Matches on name only: a same-named secret changing in any namespace,
/// including a target namespace, re-triggers every Patcher using that name.
pub fn patchers_for_secret<L>(lister: &L, secret: &Secret) -> Vec<ObjectRef<Patcher>>
where
    L: PatcherLister + ?Sized,
{
    let Some(secret_name) = secret.metadata.name.as_deref() else {
        return Vec::new();
    };
    let requests: Vec<ObjectRef<Patcher>> = list_or_empty(lister, "secret")
        .iter()
        .filter(|patcher| patcher.spec.secret == secret_name)
        .filter(|patcher| patcher.metadata.namespace.is_some())
        .map(|patcher| ObjectRef::from_obj(patcher.as_ref()))
        .collect();
    debug!(
        secret = secret_name,
        patchers = requests.len(),
        "Mapped secret change to Patchers"
    );
    requests
}

/// Patchers whose target rules select `namespace`
pub fn patchers_for_namespace<L>(lister: &L, namespace: &Namespace) -> Vec<ObjectRef<Patcher>>
where
    L: PatcherLister + ?Sized,
{
    let Some(namespace_name) = namespace.metadata.name.as_deref() else {
        return Vec::new();
    };
    let requests: Vec<ObjectRef<Patcher>> = list_or_empty(lister, "namespace")
        .iter()
        .filter(|patcher| patcher.namespace_is_target(namespace_name))
        .filter(|patcher| patcher.metadata.namespace.is_some())
        .map(|patcher| ObjectRef::from_obj(patcher.as_ref()))
        .collect();
    debug!(
        namespace = namespace_name,
        patchers = requests.len(),
        "Mapped namespace change to Patchers"
    );
    requests
}
