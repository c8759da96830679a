//! # Secret Sync
//!
//! Makes one target namespace's copy of a secret match the source.
//!
//! - Missing target: create a copy of the source in the target namespace
//! - Target with different `data`: overwrite `data` and update
//! - Target with equal `data`: no write
//!
//! Only `data` is kept in sync after creation; labels, annotations and type
//! of an existing copy are left alone.

use crate::controller::store::{object_key, ObjectStore, StoreError};
use crate::observability::metrics;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::ByteString;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("source secret has no name")]
    MissingSourceName,
    #[error("failed to create secret {key}: {source}")]
    Create {
        key: String,
        #[source]
        source: StoreError,
    },
    #[error("failed to update secret {key}: {source}")]
    Update {
        key: String,
        #[source]
        source: StoreError,
    },
}

/// What a single target sync did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Target did not exist and was created
    Created,
    /// Target existed with different data and was overwritten
    Updated,
    /// Target already matched the source; nothing written
    Unchanged,
    /// Target could not be read; left untouched
    Skipped,
    /// Target namespace disappeared before the copy could be created
    NamespaceGone,
}

impl SyncOutcome {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncOutcome::Created => "created",
            SyncOutcome::Updated => "updated",
            SyncOutcome::Unchanged => "unchanged",
            SyncOutcome::Skipped => "skipped",
            SyncOutcome::NamespaceGone => "namespace-gone",
        }
    }
}

/// Compare secret payloads; a missing map equals an empty one
#[must_use]
pub fn data_equal(
    left: Option<&BTreeMap<String, ByteString>>,
    right: Option<&BTreeMap<String, ByteString>>,
) -> bool {
    match (left, right) {
        (Some(l), Some(r)) => l == r,
        (Some(m), None) | (None, Some(m)) => m.is_empty(),
        (None, None) => true,
    }
}

/// Build a fresh copy of `source` addressed to `target_namespace`
///
/// Everything is carried over except server-assigned identity, which is
/// cleared so the API server treats the copy as a new object.
#[must_use]
pub fn target_copy(source: &Secret, target_namespace: &str) -> Secret {
    let mut copy = source.clone();
    let meta = &mut copy.metadata;
    meta.namespace = Some(target_namespace.to_string());
    meta.resource_version = None;
    meta.uid = None;
    meta.creation_timestamp = None;
    meta.deletion_timestamp = None;
    meta.deletion_grace_period_seconds = None;
    meta.generation = None;
    meta.managed_fields = None;
    meta.self_link = None;
    copy
}

/// Sync the copy of `source` in `target_namespace`
///
/// # Errors
///
/// Returns an error when a create (other than for a vanished namespace) or an
/// update fails. Read failures other than not-found skip the target instead.
pub async fn sync_target<S>(
    store: &S,
    source: &Secret,
    target_namespace: &str,
) -> Result<SyncOutcome, SyncError>
where
    S: ObjectStore + ?Sized,
{
    let name = source
        .metadata
        .name
        .as_deref()
        .ok_or(SyncError::MissingSourceName)?;
    let source_namespace = source.metadata.namespace.as_deref().unwrap_or_default();
    let key = object_key(target_namespace, name);

    let existing = match store.get_secret(target_namespace, name).await {
        Ok(existing) => existing,
        Err(e) if e.is_not_found() => {
            info!(
                source = source_namespace,
                target = target_namespace,
                secret = name,
                "Creating secret in target namespace"
            );
            let copy = target_copy(source, target_namespace);
            return match store.create_secret(&copy).await {
                Ok(_) => {
                    metrics::increment_secrets_created();
                    Ok(SyncOutcome::Created)
                }
                Err(e) if e.is_not_found() => {
                    debug!(
                        target = target_namespace,
                        secret = name,
                        "Target namespace disappeared before the copy was created"
                    );
                    Ok(SyncOutcome::NamespaceGone)
                }
                Err(source) => Err(SyncError::Create { key, source }),
            };
        }
        Err(e) => {
            warn!(
                target = target_namespace,
                secret = name,
                error = %e,
                "Failed to read secret in target namespace, skipping"
            );
            metrics::increment_targets_skipped();
            return Ok(SyncOutcome::Skipped);
        }
    };

    if data_equal(existing.data.as_ref(), source.data.as_ref()) {
        debug!(target = target_namespace, secret = name, "Secret already up to date");
        return Ok(SyncOutcome::Unchanged);
    }

    info!(
        source = source_namespace,
        target = target_namespace,
        secret = name,
        "Updating secret in target namespace"
    );
    let mut updated = existing;
    updated.data.clone_from(&source.data);
    store
        .update_secret(&updated)
        .await
        .map_err(|source| SyncError::Update { key, source })?;
    metrics::increment_secrets_updated();
    Ok(SyncOutcome::Updated)
}
