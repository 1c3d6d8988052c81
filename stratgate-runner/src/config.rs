//! Validation configuration — one explicit value wired into every component.
//!
//! No globals: parallel evaluations of different strategies can carry
//! independent thresholds. The blake3 hash of the canonical JSON encoding is
//! recorded in results and reports so a run can be tied back to the exact
//! configuration that produced it.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use stratgate_core::WindowConfig;

use crate::lifecycle::LifecycleConfig;
use crate::risk::RiskConfig;

/// Full configuration for a validation run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationConfig {
    #[serde(default)]
    pub wfa: WindowConfig,
    #[serde(default)]
    pub risk: RiskConfig,
    #[serde(default)]
    pub lifecycle: LifecycleConfig,
}

/// Errors from configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

impl ValidationConfig {
    /// Load from a TOML file. Missing sections and fields fall back to
    /// defaults.
    pub fn from_toml_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Deterministic content hash of this configuration.
    pub fn config_hash(&self) -> String {
        // Struct field order fixes the JSON key order, so equal configs hash
        // equal.
        let json = serde_json::to_string(self).unwrap_or_default();
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stratgate_core::CalendarSpan;

    #[test]
    fn empty_toml_gives_defaults() {
        let config: ValidationConfig = toml::from_str("").unwrap();
        assert_eq!(config, ValidationConfig::default());
    }

    #[test]
    fn partial_toml_overrides_only_named_fields() {
        let config: ValidationConfig = toml::from_str(
            r#"
            [wfa]
            min_train_bars = 500

            [lifecycle]
            min_sharpe = 1.5

            [risk.overfit]
            max_overfit_ratio = 1.8
            "#,
        )
        .unwrap();

        assert_eq!(config.wfa.min_train_bars, 500);
        assert_eq!(config.wfa.training_span, CalendarSpan::Years(3));
        assert!((config.lifecycle.min_sharpe - 1.5).abs() < 1e-10);
        assert!((config.risk.overfit.max_overfit_ratio - 1.8).abs() < 1e-10);
        assert!((config.risk.fragility.max_fragility - 0.5).abs() < 1e-10);
    }

    #[test]
    fn span_toml_encoding() {
        let config: ValidationConfig = toml::from_str(
            r#"
            [wfa]
            training_span = { months = 18 }
            "#,
        )
        .unwrap();
        assert_eq!(config.wfa.training_span, CalendarSpan::Months(18));
    }

    #[test]
    fn config_hash_is_deterministic() {
        let a = ValidationConfig::default();
        let b = ValidationConfig::default();
        assert_eq!(a.config_hash(), b.config_hash());
        assert!(!a.config_hash().is_empty());
    }

    #[test]
    fn config_hash_changes_with_thresholds() {
        let a = ValidationConfig::default();
        let mut b = ValidationConfig::default();
        b.lifecycle.min_sharpe = 1.5;
        assert_ne!(a.config_hash(), b.config_hash());
    }
}
