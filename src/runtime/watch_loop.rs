//! # Watch Loop
//!
//! Runs the Patcher controller: watches Patchers directly, and Secrets and
//! Namespaces through the mapping functions, feeding reconcile requests into
//! the controller's queue.
//!
//! The queue deduplicates requests by Patcher and never runs two
//! reconciliations of the same Patcher at once; distinct Patchers reconcile
//! concurrently up to `max_concurrent_reconciliations`.

use crate::config::SharedControllerConfig;
use crate::controller::reconciler::{
    patchers_for_namespace, patchers_for_secret, reconcile, Reconciler,
};
use crate::controller::server::ServerState;
use crate::crd::Patcher;
use crate::observability::metrics;
use crate::runtime::error_policy::{handle_reconciliation_error, handle_watch_stream_error};
use futures::StreamExt;
use k8s_openapi::api::core::v1::{Namespace, Secret};
use kube::api::Api;
use kube::Client;
use kube_runtime::{controller, watcher, Controller};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Run the controller until a shutdown signal is received
///
/// # Errors
///
/// Currently never fails; the signature leaves room for startup errors.
pub async fn run_watch_loop(
    client: Client,
    reconciler: Arc<Reconciler>,
    server_state: Arc<ServerState>,
    controller_config: SharedControllerConfig,
) -> Result<(), anyhow::Error> {
    spawn_shutdown_listener(Arc::clone(&server_state));

    let restart_delay = controller_config.read().await.watch_restart_delay_duration();
    let backoff_start_ms = u64::try_from(restart_delay.as_millis()).unwrap_or(u64::MAX);
    let backoff_ms = Arc::new(AtomicU64::new(backoff_start_ms));

    loop {
        if !server_state.ready() {
            info!("Shutdown requested, exiting watch loop");
            break;
        }

        let config = controller_config.read().await;
        let concurrency = config.max_concurrent_reconciliations;
        let max_backoff_ms = config.backoff_max_secs.saturating_mul(1000);
        drop(config);

        info!(concurrency, "Starting controller watch loop...");

        let patchers: Api<Patcher> = Api::all(client.clone());
        let secrets: Api<Secret> = Api::all(client.clone());
        let namespaces: Api<Namespace> = Api::all(client.clone());

        let controller = Controller::new(patchers, watcher::Config::default().any_semantic())
            .with_config(controller::Config::default().concurrency(concurrency));

        // Mapping functions read Patchers from the controller's own cache.
        let secret_lister = controller.store();
        let namespace_lister = controller.store();

        let backoff = Arc::clone(&backoff_ms);
        controller
            .watches(secrets, watcher::Config::default(), move |secret: Secret| {
                let requests = patchers_for_secret(&secret_lister, &secret);
                metrics::increment_watch_requests("secret", requests.len());
                requests
            })
            .watches(
                namespaces,
                watcher::Config::default(),
                move |namespace: Namespace| {
                    let requests = patchers_for_namespace(&namespace_lister, &namespace);
                    metrics::increment_watch_requests("namespace", requests.len());
                    requests
                },
            )
            .shutdown_on_signal()
            .run(reconcile, handle_reconciliation_error, Arc::clone(&reconciler))
            .for_each(|result| {
                let backoff = Arc::clone(&backoff);
                async move {
                    match result {
                        Ok((obj_ref, action)) => {
                            backoff.store(backoff_start_ms, Ordering::Relaxed);
                            debug!(patcher = %obj_ref, ?action, "watch.event.reconciled");
                        }
                        Err(e) => {
                            let error_string = format!("{e:?}");
                            let kind =
                                handle_watch_stream_error(&error_string, &backoff, max_backoff_ms)
                                    .await;
                            debug!(kind = kind.as_str(), "watch.event.error");
                        }
                    }
                }
            })
            .await;

        if !server_state.ready() {
            info!("Shutdown requested, exiting watch loop");
            break;
        }

        let delay = controller_config
            .read()
            .await
            .watch_restart_delay_after_end_duration();
        warn!(
            "Controller watch stream ended, restarting in {} seconds...",
            delay.as_secs()
        );
        tokio::time::sleep(delay).await;
    }

    info!("Controller stopped gracefully");
    Ok(())
}

/// Mark the server not ready as soon as SIGINT or SIGTERM arrives
///
/// The controller drains its own in-flight reconciliations through
/// `shutdown_on_signal`; this only flips readiness so traffic and the
/// restart loop stop.
fn spawn_shutdown_listener(server_state: Arc<ServerState>) {
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        info!("Received shutdown signal, waiting for in-flight reconciliations to complete...");
        server_state.set_ready(false);
    });
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};
    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            tokio::select! {
                () = signal_or_pending("SIGINT", tokio::signal::ctrl_c()) => {}
                _ = sigterm.recv() => {}
            }
        }
        Err(e) => {
            warn!("Failed to install SIGTERM handler: {}", e);
            signal_or_pending("SIGINT", tokio::signal::ctrl_c()).await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    signal_or_pending("ctrl-c", tokio::signal::ctrl_c()).await;
}

/// Resolve when `signal` fires; a handler that cannot be installed never fires
async fn signal_or_pending<F>(name: &str, signal: F)
where
    F: std::future::Future<Output = std::io::Result<()>>,
{
    if let Err(e) = signal.await {
        error!(signal = name, error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
