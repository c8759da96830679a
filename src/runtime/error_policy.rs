//! # Error Policy
//!
//! Requeue policy for failed reconciliations and classification of controller
//! stream errors.

use crate::config::ControllerConfig;
use crate::controller::reconciler::{BackoffState, Reconciler, ReconcilerError};
use crate::controller::store::object_key;
use crate::crd::Patcher;
use crate::observability::metrics;
use kube_runtime::controller::Action;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Requeue a failed Patcher with Fibonacci backoff
///
/// Backoff state is tracked per Patcher so one failing Patcher never slows
/// down another. It is cleared again after the next clean reconciliation.
pub fn handle_reconciliation_error(
    obj: Arc<Patcher>,
    error: &ReconcilerError,
    ctx: Arc<Reconciler>,
) -> Action {
    let name = obj.metadata.name.as_deref().unwrap_or("unknown");
    let namespace = obj.metadata.namespace.as_deref().unwrap_or("default");

    error!(
        patcher.name = name,
        patcher.namespace = namespace,
        error = %error,
        "Reconciliation failed"
    );
    metrics::increment_reconciliation_errors();

    let (min_secs, max_secs) = match ctx.controller_config.try_read() {
        Ok(config) => (config.backoff_min_secs, config.backoff_max_secs),
        Err(_) => {
            let defaults = ControllerConfig::default();
            (defaults.backoff_min_secs, defaults.backoff_max_secs)
        }
    };

    let resource_key = object_key(namespace, name);
    let (backoff_seconds, error_count) = match ctx.backoff_states.lock() {
        Ok(mut states) => {
            let state = states
                .entry(resource_key)
                .or_insert_with(|| BackoffState::new(min_secs, max_secs));
            state.increment_error();
            (state.backoff.next_backoff_seconds(), state.error_count)
        }
        Err(e) => {
            warn!("Failed to lock backoff_states: {}, using maximum backoff", e);
            (max_secs, 0)
        }
    };

    info!(
        patcher.name = name,
        patcher.namespace = namespace,
        backoff_seconds,
        error_count,
        "Requeueing with Fibonacci backoff"
    );
    metrics::increment_requeues_total("error-backoff");
    Action::requeue(Duration::from_secs(backoff_seconds))
}

/// Class of an error surfaced by the controller stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchErrorKind {
    /// A reconciliation failed; already handled by the error policy
    Reconcile,
    /// The referenced object disappeared from the cache
    NotFound,
    /// 401/403: credentials or RBAC problem
    Unauthorized,
    /// 410: resource version expired, the watcher relists
    Expired,
    /// 429: API server throttling or storage reinitializing
    Throttled,
    Other,
}

impl WatchErrorKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            WatchErrorKind::Reconcile => "reconcile",
            WatchErrorKind::NotFound => "not-found",
            WatchErrorKind::Unauthorized => "unauthorized",
            WatchErrorKind::Expired => "expired",
            WatchErrorKind::Throttled => "throttled",
            WatchErrorKind::Other => "other",
        }
    }
}

/// Classify a controller stream error from its debug rendering
#[must_use]
pub fn classify_watch_error(error_string: &str) -> WatchErrorKind {
    // 404 is checked before 401: a plain-text 404 body can surface as a
    // deserialization error that also mentions the watch failing.
    if error_string.contains("ReconcilerFailed") {
        WatchErrorKind::Reconcile
    } else if error_string.contains("ObjectNotFound")
        || error_string.contains("404")
        || error_string.contains("not found")
    {
        WatchErrorKind::NotFound
    } else if error_string.contains("401")
        || error_string.contains("403")
        || error_string.contains("Unauthorized")
        || error_string.contains("Forbidden")
    {
        WatchErrorKind::Unauthorized
    } else if error_string.contains("410")
        || error_string.contains("too old resource version")
        || error_string.contains("Expired")
        || error_string.contains("Gone")
    {
        WatchErrorKind::Expired
    } else if error_string.contains("429")
        || error_string.contains("storage is (re)initializing")
        || error_string.contains("TooManyRequests")
    {
        WatchErrorKind::Throttled
    } else {
        WatchErrorKind::Other
    }
}

/// Log a controller stream error and apply throttling backoff
///
/// The backoff doubles on every consecutive throttling error up to
/// `max_backoff_ms`, and is reset by the caller on the next success.
pub async fn handle_watch_stream_error(
    error_string: &str,
    backoff_ms: &AtomicU64,
    max_backoff_ms: u64,
) -> WatchErrorKind {
    let kind = classify_watch_error(error_string);
    match kind {
        WatchErrorKind::Reconcile => {
            // logged by the error policy
        }
        WatchErrorKind::NotFound => {
            warn!(error = error_string, "Object not found, it may have been deleted");
        }
        WatchErrorKind::Unauthorized => {
            error!(
                error = error_string,
                "Watch not authorized - check the ClusterRole grants get/list/watch on patchers, secrets and namespaces"
            );
        }
        WatchErrorKind::Expired => {
            warn!("Watch resource version expired (410), watcher will relist");
        }
        WatchErrorKind::Throttled => {
            let current = backoff_ms.load(Ordering::Relaxed);
            warn!(
                "API server throttling (429), backing off for {}ms",
                current
            );
            tokio::time::sleep(Duration::from_millis(current)).await;
            backoff_ms.store(current.saturating_mul(2).min(max_backoff_ms), Ordering::Relaxed);
        }
        WatchErrorKind::Other => {
            error!(error = error_string, "Controller stream error");
        }
    }
    kind
}
