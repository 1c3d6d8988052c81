//! Overfit detector — flags strategies whose in-sample performance dwarfs
//! their out-of-sample performance.

use serde::{Deserialize, Serialize};

use super::{Detector, RiskError, RiskEvidence, RiskFinding, OVERFIT};

/// Thresholds for the overfit detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverfitConfig {
    /// Maximum tolerated train/OOS Sharpe ratio (default 2.0).
    #[serde(default = "default_max_overfit_ratio")]
    pub max_overfit_ratio: f64,
}

fn default_max_overfit_ratio() -> f64 {
    2.0
}

impl Default for OverfitConfig {
    fn default() -> Self {
        Self {
            max_overfit_ratio: default_max_overfit_ratio(),
        }
    }
}

/// Triggers when the walk-forward overfit index exceeds the configured ratio.
/// An infinite index (non-positive OOS Sharpe) always triggers.
#[derive(Debug, Clone)]
pub struct OverfitDetector {
    config: OverfitConfig,
}

impl OverfitDetector {
    pub fn new(config: OverfitConfig) -> Self {
        Self { config }
    }
}

impl Detector for OverfitDetector {
    fn name(&self) -> &'static str {
        OVERFIT
    }

    fn detect(&self, evidence: &RiskEvidence) -> Result<RiskFinding, RiskError> {
        let Some(wfa) = &evidence.wfa else {
            return Ok(RiskFinding::no_evidence(OVERFIT, "no walk-forward evidence"));
        };

        let index = wfa.overfit_index;
        if index.is_nan() {
            return Err(RiskError::InvalidMetric {
                detector: OVERFIT,
                reason: "overfit index is NaN".into(),
            });
        }

        let triggered = index > self.config.max_overfit_ratio;
        let detail = format!(
            "overfit index {:.3} against limit {:.3}",
            index, self.config.max_overfit_ratio
        );
        Ok(RiskFinding::measured(OVERFIT, index, triggered, detail))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stratgate_core::AggregateMetrics;

    fn evidence_with_overfit_index(index: f64) -> RiskEvidence {
        RiskEvidence {
            wfa: Some(AggregateMetrics {
                window_count: 5,
                mean_train_sharpe: 2.0,
                mean_oos_sharpe: 1.0,
                median_oos_sharpe: 1.0,
                std_oos_sharpe: 0.2,
                mean_oos_return: 0.05,
                stability_score: 1.0,
                win_rate: 0.6,
                positive_windows: 3,
                negative_windows: 2,
                overfit_index: index,
            }),
            ..RiskEvidence::default()
        }
    }

    #[test]
    fn under_threshold_is_safe() {
        let detector = OverfitDetector::new(OverfitConfig::default());
        let finding = detector.detect(&evidence_with_overfit_index(1.3)).unwrap();
        assert!(!finding.triggered);
        assert!(finding.is_safe);
        assert!((finding.score - 1.3).abs() < 1e-10);
    }

    #[test]
    fn over_threshold_triggers() {
        let detector = OverfitDetector::new(OverfitConfig::default());
        let finding = detector.detect(&evidence_with_overfit_index(2.5)).unwrap();
        assert!(finding.triggered);
        assert!(!finding.is_safe);
    }

    #[test]
    fn infinite_index_triggers() {
        let detector = OverfitDetector::new(OverfitConfig::default());
        let finding = detector
            .detect(&evidence_with_overfit_index(f64::INFINITY))
            .unwrap();
        assert!(finding.triggered);
        assert_eq!(finding.score, f64::INFINITY);
    }

    #[test]
    fn absent_evidence_is_safe() {
        let detector = OverfitDetector::new(OverfitConfig::default());
        let finding = detector.detect(&RiskEvidence::default()).unwrap();
        assert!(!finding.triggered);
        assert!(finding.is_safe);
    }

    #[test]
    fn nan_index_is_invalid_metric() {
        let detector = OverfitDetector::new(OverfitConfig::default());
        let err = detector
            .detect(&evidence_with_overfit_index(f64::NAN))
            .unwrap_err();
        assert!(matches!(err, RiskError::InvalidMetric { detector: OVERFIT, .. }));
    }

    #[test]
    fn custom_threshold_respected() {
        let detector = OverfitDetector::new(OverfitConfig {
            max_overfit_ratio: 1.2,
        });
        let finding = detector.detect(&evidence_with_overfit_index(1.3)).unwrap();
        assert!(finding.triggered);
    }
}
