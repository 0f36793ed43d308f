//! Workspace configuration and gate policy knobs.

use std::path::PathBuf;

use crate::domain::{QualityGateError, Result};

/// Default location of the gate document, relative to the workspace root.
pub const DEFAULT_STATE_PATH: &str = ".qgate/state.json";

/// Policy applied by the gate subsystems.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatePolicy {
    /// Batch size used when a caller does not supply one.
    pub default_max_batch_size: usize,
    /// Failed integration batches a change may go through before it is
    /// marked `integration_failed`.
    pub max_integration_attempts: u32,
    /// Require an approved test submission before recording a gate result.
    pub require_approved_test: bool,
    /// Only the QA assignee may propose tests for a change.
    pub enforce_qa_assignee: bool,
}

impl Default for GatePolicy {
    fn default() -> Self {
        Self {
            default_max_batch_size: 5,
            max_integration_attempts: 3,
            require_approved_test: false,
            enforce_qa_assignee: true,
        }
    }
}

impl GatePolicy {
    pub fn with_default_max_batch_size(mut self, size: usize) -> Self {
        self.default_max_batch_size = size;
        self
    }

    pub fn with_max_integration_attempts(mut self, attempts: u32) -> Self {
        self.max_integration_attempts = attempts;
        self
    }

    pub fn with_require_approved_test(mut self, require: bool) -> Self {
        self.require_approved_test = require;
        self
    }

    pub fn with_enforce_qa_assignee(mut self, enforce: bool) -> Self {
        self.enforce_qa_assignee = enforce;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.default_max_batch_size == 0 {
            return Err(QualityGateError::InvalidArgument(
                "default_max_batch_size must be at least 1".to_string(),
            ));
        }
        if self.max_integration_attempts == 0 {
            return Err(QualityGateError::InvalidArgument(
                "max_integration_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Where the workspace document lives and which policy governs it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateConfig {
    pub state_path: PathBuf,
    pub policy: GatePolicy,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            state_path: PathBuf::from(DEFAULT_STATE_PATH),
            policy: GatePolicy::default(),
        }
    }
}

impl GateConfig {
    pub fn new(state_path: impl Into<PathBuf>) -> Self {
        Self {
            state_path: state_path.into(),
            policy: GatePolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: GatePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Create from environment variables
    ///
    /// Reads:
    /// - QGATE_STATE_PATH (optional, default: ".qgate/state.json")
    /// - QGATE_MAX_BATCH_SIZE (optional, default: 5)
    /// - QGATE_MAX_INTEGRATION_ATTEMPTS (optional, default: 3)
    /// - QGATE_REQUIRE_APPROVED_TEST (optional, default: "false")
    /// - QGATE_ENFORCE_QA_ASSIGNEE (optional, default: "true")
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`GateConfig::from_env`] with an explicit variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = GatePolicy::default();
        let state_path = lookup("QGATE_STATE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_PATH));

        let policy = GatePolicy {
            default_max_batch_size: parse_var(
                &lookup,
                "QGATE_MAX_BATCH_SIZE",
                defaults.default_max_batch_size,
            )?,
            max_integration_attempts: parse_var(
                &lookup,
                "QGATE_MAX_INTEGRATION_ATTEMPTS",
                defaults.max_integration_attempts,
            )?,
            require_approved_test: parse_var(
                &lookup,
                "QGATE_REQUIRE_APPROVED_TEST",
                defaults.require_approved_test,
            )?,
            enforce_qa_assignee: parse_var(
                &lookup,
                "QGATE_ENFORCE_QA_ASSIGNEE",
                defaults.enforce_qa_assignee,
            )?,
        };
        policy.validate()?;

        Ok(Self { state_path, policy })
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T> {
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw.trim().to_lowercase().parse().map_err(|_| {
            QualityGateError::InvalidArgument(format!("{key} has invalid value {raw:?}"))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = GateConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config, GateConfig::default());
        assert_eq!(config.state_path, PathBuf::from(DEFAULT_STATE_PATH));
    }

    #[test]
    fn test_overrides() {
        let config = GateConfig::from_lookup(lookup_from(&[
            ("QGATE_STATE_PATH", "/tmp/ws/state.json"),
            ("QGATE_MAX_BATCH_SIZE", "2"),
            ("QGATE_MAX_INTEGRATION_ATTEMPTS", "1"),
            ("QGATE_REQUIRE_APPROVED_TEST", "TRUE"),
            ("QGATE_ENFORCE_QA_ASSIGNEE", "false"),
        ]))
        .unwrap();
        assert_eq!(config.state_path, PathBuf::from("/tmp/ws/state.json"));
        assert_eq!(config.policy.default_max_batch_size, 2);
        assert_eq!(config.policy.max_integration_attempts, 1);
        assert!(config.policy.require_approved_test);
        assert!(!config.policy.enforce_qa_assignee);
    }

    #[test]
    fn test_malformed_value_is_an_error() {
        let err =
            GateConfig::from_lookup(lookup_from(&[("QGATE_MAX_BATCH_SIZE", "lots")])).unwrap_err();
        assert!(err.to_string().contains("QGATE_MAX_BATCH_SIZE"));
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        assert!(GateConfig::from_lookup(lookup_from(&[("QGATE_MAX_BATCH_SIZE", "0")])).is_err());
    }

    #[test]
    fn test_policy_builder() {
        let policy = GatePolicy::default()
            .with_default_max_batch_size(2)
            .with_require_approved_test(true);
        assert_eq!(policy.default_max_batch_size, 2);
        assert!(policy.require_approved_test);
        assert!(policy.enforce_qa_assignee);
    }
}
