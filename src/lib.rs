//! Namespace Secrets Patcher Library
//!
//! Copies a source Secret into every namespace selected by a `Patcher`
//! resource's target rules, and keeps the copies' data in sync with the
//! source.
//!
//! ## Quick Start
//!
//! ```rust
//! use namespace_secrets_patcher::prelude::*;
//! ```

pub mod config;
pub mod constants;
pub mod controller;
pub mod crd;
pub mod observability;
pub mod prelude;
pub mod runtime;
