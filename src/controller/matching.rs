//! # Namespace Matching
//!
//! Decides whether a namespace is in scope for a Patcher.
//!
//! Pure predicates, no I/O. Comparisons are case-sensitive and byte-wise:
//! - `match` rules require the namespace name to equal the rule name
//! - `prefix` rules require the namespace name to start with the rule name
//!   (an empty prefix matches every namespace)
//! - any other rule type never matches

use crate::crd::{Patcher, PatcherSpec, TargetSpec, TargetType};

impl TargetSpec {
    /// Returns true if this rule selects `namespace`
    #[must_use]
    pub fn matches(&self, namespace: &str) -> bool {
        match self.target_type {
            TargetType::Prefix => namespace.starts_with(self.name.as_str()),
            TargetType::Match => namespace == self.name,
            TargetType::Unknown => false,
        }
    }
}

impl PatcherSpec {
    /// Returns true if any target rule selects `namespace`
    #[must_use]
    pub fn namespace_is_target(&self, namespace: &str) -> bool {
        self.targets.iter().any(|target| target.matches(namespace))
    }
}

impl Patcher {
    /// Returns true if `namespace` should receive a copy of this Patcher's secret
    #[must_use]
    pub fn namespace_is_target(&self, namespace: &str) -> bool {
        self.spec.namespace_is_target(namespace)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(targets: Vec<TargetSpec>) -> PatcherSpec {
        PatcherSpec {
            secret: "source-secret".to_string(),
            targets,
        }
    }

    #[test]
    fn test_prefix_rule() {
        let spec = spec(vec![TargetSpec::prefix("dev-")]);
        assert!(spec.namespace_is_target("dev-team1"));
        assert!(spec.namespace_is_target("dev-"));
        assert!(!spec.namespace_is_target("production"));
        assert!(!spec.namespace_is_target(""));
    }

    #[test]
    fn test_exact_rule() {
        let spec = spec(vec![TargetSpec::exact("billing")]);
        assert!(spec.namespace_is_target("billing"));
        assert!(!spec.namespace_is_target("billing-2"));
        assert!(!spec.namespace_is_target("bill"));
        assert!(!spec.namespace_is_target("Billing"));
        assert!(!spec.namespace_is_target(""));
    }

    #[test]
    fn test_prefix_is_case_sensitive() {
        let spec = spec(vec![TargetSpec::prefix("Dev-")]);
        assert!(!spec.namespace_is_target("dev-team1"));
    }

    #[test]
    fn test_empty_prefix_matches_everything() {
        let spec = spec(vec![TargetSpec::prefix("")]);
        assert!(spec.namespace_is_target(""));
        assert!(spec.namespace_is_target("kube-system"));
    }

    #[test]
    fn test_no_targets_matches_nothing() {
        let spec = spec(vec![]);
        assert!(!spec.namespace_is_target("default"));
        assert!(!spec.namespace_is_target(""));
    }

    #[test]
    fn test_unknown_type_never_matches() {
        let spec = spec(vec![TargetSpec {
            name: String::new(),
            target_type: TargetType::Unknown,
        }]);
        assert!(!spec.namespace_is_target("default"));
        assert!(!spec.namespace_is_target(""));
    }

    #[test]
    fn test_any_rule_matches() {
        let spec = spec(vec![
            TargetSpec::exact("billing"),
            TargetSpec::prefix("dev-"),
        ]);
        assert!(spec.namespace_is_target("billing"));
        assert!(spec.namespace_is_target("dev-a"));
        assert!(!spec.namespace_is_target("prod-a"));
    }
}
