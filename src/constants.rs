//! # Constants
//!
//! Shared constants used throughout the controller.
//!
//! These values are defaults and can be overridden via environment variables
//! (see [`crate::config::ControllerConfig`]).

/// Default HTTP server port for metrics and health probes
pub const DEFAULT_METRICS_PORT: u16 = 5000;

/// Default HTTP server startup timeout (how long to wait for server to be ready)
pub const DEFAULT_SERVER_STARTUP_TIMEOUT_SECS: u64 = 10;

/// Default HTTP server readiness poll interval
pub const DEFAULT_SERVER_POLL_INTERVAL_MS: u64 = 50;

/// Default number of Patchers reconciled at the same time
pub const DEFAULT_MAX_CONCURRENT_RECONCILIATIONS: u16 = 10;

/// Default first retry delay after a failed reconciliation (seconds)
pub const DEFAULT_BACKOFF_MIN_SECS: u64 = 5;

/// Default upper bound for retry delays (seconds)
pub const DEFAULT_BACKOFF_MAX_SECS: u64 = 300;

/// Default delay before restarting watch stream after unknown errors (seconds)
pub const DEFAULT_WATCH_RESTART_DELAY_SECS: u64 = 5;

/// Default delay before restarting watch stream after it ends (seconds)
pub const DEFAULT_WATCH_RESTART_DELAY_AFTER_END_SECS: u64 = 1;

/// Default log level when `RUST_LOG` is not set
pub const DEFAULT_LOG_LEVEL: &str = "info";
