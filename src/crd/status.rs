//! # Patcher Status
//!
//! Status subresource of the Patcher.

use serde::{Deserialize, Serialize};

/// Status of the Patcher resource
///
/// Reserved for observed-state reporting; the controller never writes it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[allow(
    clippy::empty_structs_with_brackets,
    reason = "status must serialize as an object, not null"
)]
pub struct PatcherStatus {}
