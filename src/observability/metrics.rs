//! # Metrics
//!
//! Prometheus metrics for monitoring the controller.
//!
//! ## Metrics Exposed
//!
//! - `secrets_patcher_reconciliations_total` - Total number of reconciliations
//! - `secrets_patcher_reconciliation_errors_total` - Total number of reconciliation errors
//! - `secrets_patcher_reconciliation_duration_seconds` - Duration of reconciliations
//! - `secrets_patcher_secrets_created_total` - Secret copies created in target namespaces
//! - `secrets_patcher_secrets_updated_total` - Secret copies overwritten after drift
//! - `secrets_patcher_targets_skipped_total` - Targets skipped because they could not be read
//! - `secrets_patcher_watch_requests_total` - Reconcile requests produced by watch mapping
//! - `secrets_patcher_requeues_total` - Requeues scheduled, by reason

use anyhow::Result;
use prometheus::{Histogram, IntCounter, IntCounterVec, Opts, Registry};
use std::sync::LazyLock;

pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static RECONCILIATIONS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "secrets_patcher_reconciliations_total",
        "Total number of reconciliations",
    )
    .expect("Failed to create RECONCILIATIONS_TOTAL metric - this should never happen")
});

static RECONCILIATION_ERRORS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "secrets_patcher_reconciliation_errors_total",
        "Total number of reconciliation errors",
    )
    .expect("Failed to create RECONCILIATION_ERRORS_TOTAL metric - this should never happen")
});

static RECONCILIATION_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "secrets_patcher_reconciliation_duration_seconds",
            "Duration of reconciliation in seconds",
        )
        .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0]),
    )
    .expect("Failed to create RECONCILIATION_DURATION metric - this should never happen")
});

static SECRETS_CREATED_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "secrets_patcher_secrets_created_total",
        "Total number of secret copies created in target namespaces",
    )
    .expect("Failed to create SECRETS_CREATED_TOTAL metric - this should never happen")
});

static SECRETS_UPDATED_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "secrets_patcher_secrets_updated_total",
        "Total number of secret copies overwritten to match the source",
    )
    .expect("Failed to create SECRETS_UPDATED_TOTAL metric - this should never happen")
});

static TARGETS_SKIPPED_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "secrets_patcher_targets_skipped_total",
        "Total number of target namespaces skipped because the copy could not be read",
    )
    .expect("Failed to create TARGETS_SKIPPED_TOTAL metric - this should never happen")
});

static WATCH_REQUESTS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "secrets_patcher_watch_requests_total",
            "Total number of reconcile requests produced by watch mapping",
        ),
        &["source"],
    )
    .expect("Failed to create WATCH_REQUESTS_TOTAL metric - this should never happen")
});

static REQUEUES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "secrets_patcher_requeues_total",
            "Total number of requeues scheduled",
        ),
        &["reason"],
    )
    .expect("Failed to create REQUEUES_TOTAL metric - this should never happen")
});

/// Register all metrics with the registry
///
/// # Errors
///
/// Returns an error if a metric is registered twice.
pub fn register_metrics() -> Result<()> {
    REGISTRY.register(Box::new(RECONCILIATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_DURATION.clone()))?;
    REGISTRY.register(Box::new(SECRETS_CREATED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(SECRETS_UPDATED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(TARGETS_SKIPPED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(WATCH_REQUESTS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(REQUEUES_TOTAL.clone()))?;
    Ok(())
}

pub(crate) fn gather() -> Vec<prometheus::proto::MetricFamily> {
    REGISTRY.gather()
}

pub fn increment_reconciliations() {
    RECONCILIATIONS_TOTAL.inc();
}

pub fn increment_reconciliation_errors() {
    RECONCILIATION_ERRORS_TOTAL.inc();
}

pub fn observe_reconciliation_duration(duration: f64) {
    RECONCILIATION_DURATION.observe(duration);
}

pub fn increment_secrets_created() {
    SECRETS_CREATED_TOTAL.inc();
}

pub fn increment_secrets_updated() {
    SECRETS_UPDATED_TOTAL.inc();
}

pub fn increment_targets_skipped() {
    TARGETS_SKIPPED_TOTAL.inc();
}

/// Count reconcile requests emitted for a watched resource kind
pub fn increment_watch_requests(source: &str, count: usize) {
    WATCH_REQUESTS_TOTAL
        .with_label_values(&[source])
        .inc_by(u64::try_from(count).unwrap_or(u64::MAX));
}

pub fn increment_requeues_total(reason: &str) {
    REQUEUES_TOTAL.with_label_values(&[reason]).inc();
}
