//! # Reconciler
//!
//! Core reconciliation logic for `Patcher` resources.
//!
//! ## Reconciliation Flow
//!
//! 1. Load the Patcher and its source secret
//! 2. List namespaces and keep the ones selected by the target rules
//! 3. Create or update the secret copy in each selected namespace
//!
//! Secret and Namespace watch events are mapped back to Patchers by
//! [`mapping`].

pub mod mapping;
pub mod reconcile;
pub mod sync;
pub mod types;

// Re-export public API
pub use mapping::{patchers_for_namespace, patchers_for_secret, PatcherLister};
pub use reconcile::{reconcile, reconcile_patcher};
pub use sync::{data_equal, sync_target, target_copy, SyncError, SyncOutcome};
pub use types::{BackoffState, ReconcileOutcome, Reconciler, ReconcilerError, SyncSummary};
