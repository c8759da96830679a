//! # Prelude
//!
//! Re-exports commonly used types and traits.
//!
//! ```rust
//! use namespace_secrets_patcher::prelude::*;
//! ```

// CRD types
pub use crate::crd::*;

// Store seam - implement to run the reconciler against another backend
pub use crate::controller::store::{KubeStore, ObjectStore, StoreError};

// Reconciler types
pub use crate::controller::reconciler::{
    patchers_for_namespace, patchers_for_secret, reconcile, reconcile_patcher, sync_target,
    PatcherLister, ReconcileOutcome, Reconciler, ReconcilerError, SyncError, SyncOutcome,
    SyncSummary,
};

// Config types
pub use crate::config::{ControllerConfig, SharedControllerConfig};
