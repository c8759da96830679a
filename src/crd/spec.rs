//! # Patcher Spec
//!
//! The `Patcher` custom resource: one source Secret and the rules selecting
//! which namespaces receive a copy of it.

use schemars::{Schema, SchemaGenerator};
use serde::{Deserialize, Serialize};

/// Patcher Custom Resource Definition
///
/// Copies the Secret named by `spec.secret` (looked up in the Patcher's own
/// namespace) into every namespace matched by one of `spec.targets`.
///
/// # Example
///
/// ```yaml
/// apiVersion: namespace-secrets-patcher.infrabits.nl/v1
/// kind: Patcher
/// metadata:
///   name: registry-credentials
///   namespace: platform
/// spec:
///   secret: registry-credentials
///   targets:
///     - name: dev-
///       type: prefix
///     - name: billing
///       type: match
/// ```
#[derive(kube::CustomResource, Debug, Clone, Deserialize, Serialize, schemars::JsonSchema)]
#[kube(
    kind = "Patcher",
    group = "namespace-secrets-patcher.infrabits.nl",
    version = "v1",
    namespaced,
    status = "crate::crd::PatcherStatus",
    shortname = "patcher",
    printcolumn = r#"{"name":"Secret", "type":"string", "jsonPath":".spec.secret"}, {"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct PatcherSpec {
    /// Name of the source Secret, resolved in the Patcher's namespace.
    /// Target copies always carry the same name.
    pub secret: String,
    /// Namespace selection rules. A namespace is a target if any rule matches.
    /// An empty list targets nothing.
    #[serde(default)]
    pub targets: Vec<TargetSpec>,
}

/// A single namespace selection rule
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
pub struct TargetSpec {
    /// Namespace name (`match`) or namespace name prefix (`prefix`)
    pub name: String,
    /// How `name` is compared against namespace names
    #[serde(rename = "type")]
    #[schemars(schema_with = "target_type_schema")]
    pub target_type: TargetType,
}

fn target_type_schema(_gen: &mut SchemaGenerator) -> Schema {
    // Free-form string: rule types this controller does not know must still
    // be admitted, they just never match.
    schemars::json_schema!({
        "type": "string",
        "description": "Rule type: `prefix` or `match`. Any other value never matches."
    })
}

/// Rule kind for [`TargetSpec`]
///
/// Values other than `prefix` and `match` deserialize to `Unknown`, which
/// never matches any namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum TargetType {
    /// Namespace name starts with the rule name
    Prefix,
    /// Namespace name equals the rule name
    Match,
    #[serde(other)]
    Unknown,
}

impl TargetSpec {
    #[must_use]
    pub fn prefix(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target_type: TargetType::Prefix,
        }
    }

    #[must_use]
    pub fn exact(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target_type: TargetType::Match,
        }
    }
}
