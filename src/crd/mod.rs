//! # Custom Resource Definitions
//!
//! CRD types for the Namespace Secrets Patcher.
//!
//! ## Module Structure
//!
//! - `spec.rs` - The `Patcher` resource and its target rules
//! - `status.rs` - Status subresource (reserved, currently empty)

mod spec;
mod status;

// Re-export all public types
pub use spec::{Patcher, PatcherSpec, TargetSpec, TargetType};
pub use status::PatcherStatus;
