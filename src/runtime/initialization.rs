//! # Initialization
//!
//! Controller initialization: rustls setup, tracing, metrics, server startup,
//! Kubernetes client and reconciler context.

use crate::config::{create_shared_config, SharedControllerConfig};
use crate::controller::reconciler::Reconciler;
use crate::controller::server::{start_server, ServerState};
use crate::controller::store::KubeStore;
use crate::crd::Patcher;
use crate::observability::metrics;
use anyhow::{Context, Result};
use kube::api::{Api, ListParams};
use kube::Client;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Everything the watch loop needs to run
pub struct InitializationResult {
    /// Kubernetes client
    pub client: Client,
    /// Reconciler context
    pub reconciler: Arc<Reconciler>,
    /// Server state for health checks
    pub server_state: Arc<ServerState>,
    /// Shared controller configuration
    pub controller_config: SharedControllerConfig,
}

impl std::fmt::Debug for InitializationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InitializationResult")
            .field("server_ready", &self.server_state.ready())
            .finish_non_exhaustive()
    }
}

/// Initialize the controller runtime
///
/// # Errors
///
/// Fails when metrics cannot be registered, the HTTP server does not come up,
/// or no Kubernetes client configuration is available.
pub async fn initialize() -> Result<InitializationResult> {
    // Required for rustls 0.23+ when no default provider is set via features.
    // Err only means a provider is already installed.
    let _already_installed = rustls::crypto::ring::default_provider()
        .install_default()
        .is_err();

    let controller_config = create_shared_config();
    let log_level = controller_config.read().await.log_level.clone();
    init_tracing(&log_level);

    info!("Starting Namespace Secrets Patcher");
    info!(
        "Build info: timestamp={}, datetime={}, git_hash={}",
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_DATETIME"),
        env!("BUILD_GIT_HASH")
    );

    metrics::register_metrics().context("Failed to register metrics")?;

    let server_state = Arc::new(ServerState::new());
    let server_port = controller_config.read().await.metrics_port;
    let server_state_clone = Arc::clone(&server_state);
    let server_handle = tokio::spawn(async move {
        if let Err(e) = start_server(server_port, server_state_clone).await {
            error!("HTTP server error: {}", e);
        }
    });
    wait_for_server_ready(&server_state, &server_handle, &controller_config).await?;

    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;

    check_crd_installed(&client).await;

    let store = Arc::new(KubeStore::new(client.clone()));
    let reconciler = Arc::new(Reconciler::new(store, Arc::clone(&controller_config)));

    info!("Controller initialized, starting watch loop...");

    Ok(InitializationResult {
        client,
        reconciler,
        server_state,
        controller_config,
    })
}

/// Install the global tracing subscriber
///
/// `RUST_LOG` wins; otherwise the crate logs at `log_level`.
pub fn init_tracing(log_level: &str) {
    let default_filter = format!("namespace_secrets_patcher={}", log_level.to_lowercase());
    if let Err(e) = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .try_init()
    {
        eprintln!("Tracing subscriber already initialized: {e}");
    }
}

/// Wait for the HTTP server to become ready
async fn wait_for_server_ready(
    server_state: &Arc<ServerState>,
    server_handle: &tokio::task::JoinHandle<()>,
    controller_config: &SharedControllerConfig,
) -> Result<()> {
    let config = controller_config.read().await;
    let startup_timeout = config.server_startup_timeout();
    let poll_interval = config.server_poll_interval();
    drop(config);
    let start_time = std::time::Instant::now();

    loop {
        if server_handle.is_finished() {
            return Err(anyhow::anyhow!("HTTP server failed to start"));
        }

        if server_state.ready() {
            info!("HTTP server is ready and accepting connections");
            return Ok(());
        }

        if start_time.elapsed() > startup_timeout {
            return Err(anyhow::anyhow!(
                "HTTP server failed to become ready within {} seconds",
                startup_timeout.as_secs()
            ));
        }

        tokio::time::sleep(poll_interval).await;
    }
}

/// Warn early when the Patcher CRD is not installed
///
/// The controller still starts; its watch keeps retrying until the CRD exists.
async fn check_crd_installed(client: &Client) {
    let patchers: Api<Patcher> = Api::all(client.clone());
    match patchers.list(&ListParams::default().limit(1)).await {
        Ok(list) => {
            info!(
                existing = list.items.len(),
                "Patcher CRD is queryable"
            );
        }
        Err(e) => {
            error!("Patcher CRD is not queryable; {:?}. Is the CRD installed?", e);
            error!("Installation: cargo run --bin crdgen | kubectl apply -f -");
            warn!("Continuing despite CRD queryability check failure - controller will retry");
        }
    }
}
