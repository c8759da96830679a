//! # Controller
//!
//! Core controller modules for the Namespace Secrets Patcher.
//!
//! - `backoff`: Fibonacci backoff for failed reconciliations
//! - `matching`: Namespace selection by target rules
//! - `reconciler`: Reconciliation, secret sync and watch mapping
//! - `server`: HTTP server for metrics and health checks
//! - `store`: Object store abstraction over the Kubernetes API

pub mod backoff;
pub mod matching;
pub mod reconciler;
pub mod server;
pub mod store;
