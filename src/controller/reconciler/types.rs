//! # Types
//!
//! Core types for the reconciler.

use crate::config::SharedControllerConfig;
use crate::controller::backoff::FibonacciBackoff;
use crate::controller::reconciler::sync::{SyncError, SyncOutcome};
use crate::controller::store::{ObjectStore, StoreError};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconcilerError {
    #[error("Patcher is missing {0}")]
    MissingMetadata(&'static str),
    #[error("failed to load Patcher {key}: {source}")]
    LoadPatcher {
        key: String,
        #[source]
        source: StoreError,
    },
    #[error("source secret {key} not found")]
    SourceSecretNotFound { key: String },
    #[error("failed to load source secret {key}: {source}")]
    LoadSourceSecret {
        key: String,
        #[source]
        source: StoreError,
    },
    #[error("failed to list namespaces: {0}")]
    ListNamespaces(#[source] StoreError),
    #[error(transparent)]
    Sync(#[from] SyncError),
}

/// Result of one reconciliation pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The Patcher no longer exists; nothing to do (copies are kept)
    PatcherNotFound,
    /// Every matched namespace was visited
    Synced(SyncSummary),
}

/// Per-outcome counts for the targets visited in one pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncSummary {
    pub targets: usize,
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub namespace_gone: usize,
}

impl SyncSummary {
    pub fn record(&mut self, outcome: SyncOutcome) {
        self.targets += 1;
        match outcome {
            SyncOutcome::Created => self.created += 1,
            SyncOutcome::Updated => self.updated += 1,
            SyncOutcome::Unchanged => self.unchanged += 1,
            SyncOutcome::Skipped => self.skipped += 1,
            SyncOutcome::NamespaceGone => self.namespace_gone += 1,
        }
    }

    /// Number of writes issued during the pass
    #[must_use]
    pub fn writes(&self) -> usize {
        self.created + self.updated
    }
}

/// Backoff state for a specific Patcher
/// Tracks error count and backoff calculator for progressive retries
#[derive(Debug, Clone)]
pub struct BackoffState {
    pub backoff: FibonacciBackoff,
    pub error_count: u32,
}

impl BackoffState {
    #[must_use]
    pub fn new(min_secs: u64, max_secs: u64) -> Self {
        Self {
            backoff: FibonacciBackoff::new(min_secs, max_secs),
            error_count: 0,
        }
    }

    pub fn increment_error(&mut self) {
        self.error_count += 1;
    }

    pub fn reset(&mut self) {
        self.error_count = 0;
        self.backoff.reset();
    }
}

/// Shared context handed to every reconciliation
#[derive(Clone)]
pub struct Reconciler {
    pub store: Arc<dyn ObjectStore>,
    pub controller_config: SharedControllerConfig,
    // Retry bookkeeping for the error policy, keyed by namespace/name.
    // Reconciliation itself never reads it.
    pub backoff_states: Arc<Mutex<HashMap<String, BackoffState>>>,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler").finish_non_exhaustive()
    }
}

impl Reconciler {
    #[must_use]
    pub fn new(store: Arc<dyn ObjectStore>, controller_config: SharedControllerConfig) -> Self {
        Self {
            store,
            controller_config,
            backoff_states: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Forget accumulated backoff for a Patcher after it reconciled cleanly
    pub fn reset_backoff(&self, resource_key: &str) {
        if let Ok(mut states) = self.backoff_states.lock() {
            states.remove(resource_key);
        }
    }
}
