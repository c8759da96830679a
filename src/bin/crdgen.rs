//! # CRD Generator
//!
//! Generates the Patcher CustomResourceDefinition YAML from the Rust types.
//!
//! ## Usage
//!
//! ```bash
//! # Generate CRD YAML
//! cargo run --bin crdgen > config/crd/patcher.yaml
//!
//! # Generate and apply directly
//! cargo run --bin crdgen | kubectl apply -f -
//! ```

use anyhow::{Context, Result};
use kube::core::CustomResourceExt;
use namespace_secrets_patcher::crd::Patcher;

fn main() -> Result<()> {
    let crd = Patcher::crd();
    let yaml = serde_yaml::to_string(&crd).context("Failed to serialize Patcher CRD to YAML")?;
    print!("{yaml}");
    Ok(())
}
