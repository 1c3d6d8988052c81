//! Model-risk analysis — independent detectors composed into one rating.
//!
//! Each detector consumes the shared `RiskEvidence` bundle and produces a
//! `RiskFinding`; detectors never share mutable state. The rating composer is
//! a pure, total function of the triggered set:
//! - zero triggers → LOW
//! - one → MEDIUM
//! - two → HIGH, except overfit + fragility together → CRITICAL
//! - three or more → CRITICAL
//!
//! Absence of evidence is not evidence of risk: a detector handed no input
//! for its dimension reports safe/not-triggered. Malformed input it cannot
//! assign a convention to (zero fragility baseline, non-positive total regime
//! PnL, NaN metrics) surfaces as `RiskError::InvalidMetric`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use stratgate_core::AggregateMetrics;

pub mod drift;
pub mod fragility;
pub mod overfit;
pub mod regime;
pub mod stability;

pub use drift::{DriftConfig, DriftDetector};
pub use fragility::{FragilityConfig, FragilityDetector};
pub use overfit::{OverfitConfig, OverfitDetector};
pub use regime::{RegimeDependencyConfig, RegimeDependencyDetector};
pub use stability::{StabilityConfig, StabilityDetector};

// ─── Detector names ──────────────────────────────────────────────────

pub const OVERFIT: &str = "overfit";
pub const STABILITY: &str = "stability";
pub const DRIFT: &str = "drift";
pub const REGIME_DEPENDENCY: &str = "regime_dependency";
pub const FRAGILITY: &str = "fragility";

// ─── Evidence ────────────────────────────────────────────────────────

/// Kind of perturbation experiment behind a fragility measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerturbationKind {
    PriceShock,
    YieldShock,
    ParameterNoise,
    CyclePhase,
}

impl std::fmt::Display for PerturbationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PerturbationKind::PriceShock => "price_shock",
            PerturbationKind::YieldShock => "yield_shock",
            PerturbationKind::ParameterNoise => "parameter_noise",
            PerturbationKind::CyclePhase => "cycle_phase",
        };
        f.write_str(s)
    }
}

/// One perturbation experiment: the PnL the strategy produced under it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Perturbation {
    pub kind: PerturbationKind,
    pub pnl: f64,
}

/// Baseline PnL plus the perturbation experiments run against it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FragilityEvidence {
    pub baseline_pnl: f64,
    pub perturbations: Vec<Perturbation>,
}

/// Everything the detectors may consume. All fields optional/empty by
/// default; a detector with nothing to look at reports safe.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RiskEvidence {
    /// Aggregated walk-forward metrics (overfit and stability detectors).
    pub wfa: Option<AggregateMetrics>,
    /// Trailing window of parameter-weight snapshots, oldest first.
    pub weight_snapshots: Vec<BTreeMap<String, f64>>,
    /// Consecutive regime labels observed over the trailing window.
    pub regime_labels: Vec<String>,
    /// PnL attributed to each regime label.
    pub regime_pnl: BTreeMap<String, f64>,
    /// Perturbation experiments (fragility detector).
    pub fragility: Option<FragilityEvidence>,
}

// ─── Findings ────────────────────────────────────────────────────────

/// Verdict of one detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskFinding {
    pub detector: String,
    pub triggered: bool,
    #[serde(with = "stratgate_core::aggregate::non_finite_serde")]
    pub score: f64,
    pub is_safe: bool,
    pub detail: String,
}

impl RiskFinding {
    /// A finding for a detector that had nothing to examine.
    pub fn no_evidence(detector: &str, detail: impl Into<String>) -> Self {
        Self {
            detector: detector.to_string(),
            triggered: false,
            score: 0.0,
            is_safe: true,
            detail: detail.into(),
        }
    }

    /// A finding backed by a measured score.
    pub fn measured(detector: &str, score: f64, triggered: bool, detail: impl Into<String>) -> Self {
        Self {
            detector: detector.to_string(),
            triggered,
            score,
            is_safe: !triggered,
            detail: detail.into(),
        }
    }
}

/// Composed model-risk rating, ordered by severity.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskRating {
    #[default]
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for RiskRating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RiskRating::Low => "LOW",
            RiskRating::Medium => "MEDIUM",
            RiskRating::High => "HIGH",
            RiskRating::Critical => "CRITICAL",
        };
        f.write_str(s)
    }
}

/// Findings from every detector plus the composed rating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRiskReport {
    pub findings: BTreeMap<String, RiskFinding>,
    pub rating: RiskRating,
}

impl ModelRiskReport {
    pub fn triggered_count(&self) -> usize {
        self.findings.values().filter(|f| f.triggered).count()
    }
}

/// Errors from risk analysis.
#[derive(Debug, Error)]
pub enum RiskError {
    #[error("invalid metric for {detector} detector: {reason}")]
    InvalidMetric {
        detector: &'static str,
        reason: String,
    },
}

// ─── Detector capability ─────────────────────────────────────────────

/// Model-risk detector capability. Implementations are stateless with respect
/// to evidence: `detect` is a pure function of its input.
pub trait Detector: Send + Sync {
    fn name(&self) -> &'static str;
    fn detect(&self, evidence: &RiskEvidence) -> Result<RiskFinding, RiskError>;
}

// ─── Composer ────────────────────────────────────────────────────────

/// Map a finding set to a rating by ordinal severity.
///
/// Total over any finding set: unknown detector names only contribute to the
/// trigger count; the overfit+fragility escalation keys on the canonical
/// names.
pub fn compose_rating(findings: &BTreeMap<String, RiskFinding>) -> RiskRating {
    let triggered = findings.values().filter(|f| f.triggered).count();
    let overfit_and_fragility = findings.get(OVERFIT).is_some_and(|f| f.triggered)
        && findings.get(FRAGILITY).is_some_and(|f| f.triggered);

    match triggered {
        0 => RiskRating::Low,
        1 => RiskRating::Medium,
        2 if overfit_and_fragility => RiskRating::Critical,
        2 => RiskRating::High,
        _ => RiskRating::Critical,
    }
}

// ─── Analyzer ────────────────────────────────────────────────────────

/// Thresholds for the default detector battery.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskConfig {
    #[serde(default)]
    pub overfit: OverfitConfig,
    #[serde(default)]
    pub stability: StabilityConfig,
    #[serde(default)]
    pub drift: DriftConfig,
    #[serde(default)]
    pub regime: RegimeDependencyConfig,
    #[serde(default)]
    pub fragility: FragilityConfig,
}

/// Runs a set of injected detectors over one evidence bundle and composes
/// their findings into a report.
pub struct ModelRiskAnalyzer {
    detectors: Vec<Box<dyn Detector>>,
}

impl ModelRiskAnalyzer {
    /// Build an analyzer from an arbitrary detector set (real or test
    /// doubles).
    pub fn new(detectors: Vec<Box<dyn Detector>>) -> Self {
        Self { detectors }
    }

    /// The standard five-detector battery with the given thresholds.
    pub fn with_default_detectors(config: &RiskConfig) -> Self {
        Self::new(vec![
            Box::new(OverfitDetector::new(config.overfit.clone())),
            Box::new(StabilityDetector::new(config.stability.clone())),
            Box::new(DriftDetector::new(config.drift.clone())),
            Box::new(RegimeDependencyDetector::new(config.regime.clone())),
            Box::new(FragilityDetector::new(config.fragility.clone())),
        ])
    }

    /// Run every detector and compose the rating.
    pub fn analyze(&self, evidence: &RiskEvidence) -> Result<ModelRiskReport, RiskError> {
        let mut findings = BTreeMap::new();
        for detector in &self.detectors {
            let finding = detector.detect(evidence)?;
            tracing::debug!(
                detector = detector.name(),
                triggered = finding.triggered,
                score = finding.score,
                "risk detector finding"
            );
            findings.insert(detector.name().to_string(), finding);
        }
        let rating = compose_rating(&findings);
        Ok(ModelRiskReport { findings, rating })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finding(detector: &str, triggered: bool) -> RiskFinding {
        RiskFinding::measured(detector, 1.0, triggered, "test")
    }

    fn findings_with(triggered: &[&str]) -> BTreeMap<String, RiskFinding> {
        [OVERFIT, STABILITY, DRIFT, REGIME_DEPENDENCY, FRAGILITY]
            .iter()
            .map(|&name| {
                (
                    name.to_string(),
                    finding(name, triggered.contains(&name)),
                )
            })
            .collect()
    }

    // ─── Composer table ──────────────────────────────────────────

    #[test]
    fn zero_triggers_is_low() {
        assert_eq!(compose_rating(&findings_with(&[])), RiskRating::Low);
    }

    #[test]
    fn one_trigger_is_medium() {
        assert_eq!(
            compose_rating(&findings_with(&[STABILITY])),
            RiskRating::Medium
        );
        assert_eq!(
            compose_rating(&findings_with(&[OVERFIT])),
            RiskRating::Medium
        );
    }

    #[test]
    fn two_triggers_is_high() {
        assert_eq!(
            compose_rating(&findings_with(&[STABILITY, DRIFT])),
            RiskRating::High
        );
        assert_eq!(
            compose_rating(&findings_with(&[OVERFIT, STABILITY])),
            RiskRating::High
        );
    }

    #[test]
    fn overfit_plus_fragility_escalates_to_critical() {
        assert_eq!(
            compose_rating(&findings_with(&[OVERFIT, FRAGILITY])),
            RiskRating::Critical
        );
    }

    #[test]
    fn three_or_more_triggers_is_critical() {
        assert_eq!(
            compose_rating(&findings_with(&[STABILITY, DRIFT, REGIME_DEPENDENCY])),
            RiskRating::Critical
        );
        assert_eq!(
            compose_rating(&findings_with(&[
                OVERFIT,
                STABILITY,
                DRIFT,
                REGIME_DEPENDENCY,
                FRAGILITY
            ])),
            RiskRating::Critical
        );
    }

    #[test]
    fn rating_ordering() {
        assert!(RiskRating::Low < RiskRating::Medium);
        assert!(RiskRating::Medium < RiskRating::High);
        assert!(RiskRating::High < RiskRating::Critical);
    }

    // ─── Analyzer ────────────────────────────────────────────────

    #[test]
    fn empty_evidence_rates_low() {
        let analyzer = ModelRiskAnalyzer::with_default_detectors(&RiskConfig::default());
        let report = analyzer.analyze(&RiskEvidence::default()).unwrap();

        assert_eq!(report.findings.len(), 5);
        assert_eq!(report.triggered_count(), 0);
        assert_eq!(report.rating, RiskRating::Low);
        for f in report.findings.values() {
            assert!(f.is_safe);
        }
    }

    #[test]
    fn injected_test_double_detector() {
        struct AlwaysTriggered;
        impl Detector for AlwaysTriggered {
            fn name(&self) -> &'static str {
                "always"
            }
            fn detect(&self, _: &RiskEvidence) -> Result<RiskFinding, RiskError> {
                Ok(RiskFinding::measured("always", 9.0, true, "doubled"))
            }
        }

        let analyzer = ModelRiskAnalyzer::new(vec![Box::new(AlwaysTriggered)]);
        let report = analyzer.analyze(&RiskEvidence::default()).unwrap();
        assert_eq!(report.triggered_count(), 1);
        assert_eq!(report.rating, RiskRating::Medium);
    }

    #[test]
    fn report_serialization_round_trip() {
        let report = ModelRiskReport {
            findings: findings_with(&[OVERFIT]),
            rating: RiskRating::Medium,
        };
        let json = serde_json::to_string(&report).unwrap();
        let back: ModelRiskReport = serde_json::from_str(&json).unwrap();
        assert_eq!(report, back);
    }
}
