//! # Configuration
//!
//! Controller configuration loaded from environment variables, shared behind
//! an async `RwLock` so every task reads the same values.

mod controller;

pub use controller::ControllerConfig;

use std::sync::Arc;
use tokio::sync::RwLock;

pub type SharedControllerConfig = Arc<RwLock<ControllerConfig>>;

/// Load configuration from the environment and wrap it for sharing
#[must_use]
pub fn create_shared_config() -> SharedControllerConfig {
    shared(ControllerConfig::from_env())
}

/// Wrap an existing configuration for sharing
#[must_use]
pub fn shared(config: ControllerConfig) -> SharedControllerConfig {
    Arc::new(RwLock::new(config))
}
