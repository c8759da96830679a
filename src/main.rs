//! # Namespace Secrets Patcher
//!
//! A Kubernetes controller that copies a Secret into every namespace selected
//! by a `Patcher` resource.
//!
//! ## Overview
//!
//! 1. **Watching Patchers** - Reconciles each Patcher on create and update
//! 2. **Watching Secrets** - A change to a secret re-reconciles every Patcher
//!    using a secret of that name
//! 3. **Watching Namespaces** - A new or changed namespace re-reconciles every
//!    Patcher whose target rules select it
//! 4. **Syncing** - Creates missing copies and overwrites drifted copy data
//!
//! Copies are never deleted, not even when their Patcher is.
//!
//! ## Features
//!
//! - **Prometheus metrics**: `/metrics`
//! - **Health probes**: `/healthz` and `/readyz`
//! - **Fibonacci backoff**: failed Patchers are retried with growing delays

use anyhow::Result;
use namespace_secrets_patcher::runtime::{initialize, run_watch_loop};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let init = initialize().await?;

    run_watch_loop(
        init.client,
        init.reconciler,
        init.server_state,
        init.controller_config,
    )
    .await?;

    info!("Controller stopped");
    Ok(())
}
