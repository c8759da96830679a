//! # Reconcile
//!
//! One reconciliation pass for a single Patcher.
//!
//! 1. Load the Patcher (gone ⇒ done; copies are never deleted)
//! 2. Load the source secret from the Patcher's namespace (missing ⇒ error, retried)
//! 3. List all namespaces (failure ⇒ error, retried)
//! 4. Sync every namespace selected by the Patcher's target rules
//!
//! Every pass starts from what the API server returns, so passes can be
//! repeated or interleaved across Patchers freely.

use crate::controller::reconciler::sync::sync_target;
use crate::controller::reconciler::types::{
    ReconcileOutcome, Reconciler, ReconcilerError, SyncSummary,
};
use crate::controller::store::{object_key, ObjectStore};
use crate::crd::Patcher;
use crate::observability::metrics;
use kube_runtime::controller::Action;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, Instrument};

/// Reconcile the Patcher at `namespace/name`
///
/// # Errors
///
/// Returns an error when the Patcher or its source secret cannot be loaded,
/// when namespaces cannot be listed, or when a target write fails.
pub async fn reconcile_patcher<S>(
    store: &S,
    namespace: &str,
    name: &str,
) -> Result<ReconcileOutcome, ReconcilerError>
where
    S: ObjectStore + ?Sized,
{
    let patcher_key = object_key(namespace, name);
    let patcher = match store.get_patcher(namespace, name).await {
        Ok(patcher) => patcher,
        Err(e) if e.is_not_found() => {
            debug!(patcher = patcher_key.as_str(), "Patcher not found, nothing to do");
            return Ok(ReconcileOutcome::PatcherNotFound);
        }
        Err(source) => {
            return Err(ReconcilerError::LoadPatcher {
                key: patcher_key,
                source,
            })
        }
    };

    let secret_name = patcher.spec.secret.as_str();
    let secret_key = object_key(namespace, secret_name);
    let source = store
        .get_secret(namespace, secret_name)
        .await
        .map_err(|source| {
            if source.is_not_found() {
                ReconcilerError::SourceSecretNotFound {
                    key: secret_key.clone(),
                }
            } else {
                ReconcilerError::LoadSourceSecret {
                    key: secret_key.clone(),
                    source,
                }
            }
        })?;

    let namespaces = store
        .list_namespaces()
        .await
        .map_err(ReconcilerError::ListNamespaces)?;

    let mut summary = SyncSummary::default();
    for target in namespaces
        .iter()
        .filter_map(|ns| ns.metadata.name.as_deref())
        .filter(|ns| patcher.namespace_is_target(ns))
    {
        let outcome = sync_target(store, &source, target).await?;
        debug!(
            patcher = patcher_key.as_str(),
            target,
            outcome = outcome.as_str(),
            "Target synced"
        );
        summary.record(outcome);
    }

    info!(
        patcher = patcher_key.as_str(),
        secret = secret_name,
        targets = summary.targets,
        created = summary.created,
        updated = summary.updated,
        skipped = summary.skipped,
        "Reconciliation complete"
    );
    Ok(ReconcileOutcome::Synced(summary))
}

/// Controller entry point
///
/// The cached object only supplies the key; the Patcher is re-read from the
/// store so every pass works on current state.
///
/// # Errors
///
/// Propagates [`reconcile_patcher`] errors to the error policy for requeueing.
pub async fn reconcile(
    obj: Arc<Patcher>,
    ctx: Arc<Reconciler>,
) -> Result<Action, ReconcilerError> {
    let name = obj
        .metadata
        .name
        .as_deref()
        .ok_or(ReconcilerError::MissingMetadata("metadata.name"))?;
    let namespace = obj
        .metadata
        .namespace
        .as_deref()
        .ok_or(ReconcilerError::MissingMetadata("metadata.namespace"))?;

    let span = tracing::span!(
        tracing::Level::INFO,
        "patcher.reconcile",
        patcher.name = name,
        patcher.namespace = namespace
    );

    metrics::increment_reconciliations();
    let start = Instant::now();
    let result = reconcile_patcher(ctx.store.as_ref(), namespace, name)
        .instrument(span)
        .await;
    metrics::observe_reconciliation_duration(start.elapsed().as_secs_f64());

    result?;
    ctx.reset_backoff(&object_key(namespace, name));
    Ok(Action::await_change())
}
