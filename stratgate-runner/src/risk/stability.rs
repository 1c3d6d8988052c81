//! Stability detector — flags strategies whose out-of-sample returns are
//! noise-dominated across validation windows.

use serde::{Deserialize, Serialize};

use super::{Detector, RiskError, RiskEvidence, RiskFinding, STABILITY};

/// Thresholds for the stability detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StabilityConfig {
    /// Minimum acceptable OOS stability score (default 0.5).
    #[serde(default = "default_min_stability_score")]
    pub min_stability_score: f64,
}

fn default_min_stability_score() -> f64 {
    0.5
}

impl Default for StabilityConfig {
    fn default() -> Self {
        Self {
            min_stability_score: default_min_stability_score(),
        }
    }
}

/// Triggers when the walk-forward stability score falls below the minimum.
#[derive(Debug, Clone)]
pub struct StabilityDetector {
    config: StabilityConfig,
}

impl StabilityDetector {
    pub fn new(config: StabilityConfig) -> Self {
        Self { config }
    }
}

impl Detector for StabilityDetector {
    fn name(&self) -> &'static str {
        STABILITY
    }

    fn detect(&self, evidence: &RiskEvidence) -> Result<RiskFinding, RiskError> {
        let Some(wfa) = &evidence.wfa else {
            return Ok(RiskFinding::no_evidence(
                STABILITY,
                "no walk-forward evidence",
            ));
        };

        let score = wfa.stability_score;
        if !score.is_finite() {
            return Err(RiskError::InvalidMetric {
                detector: STABILITY,
                reason: format!("stability score is {score}"),
            });
        }

        let triggered = score < self.config.min_stability_score;
        let detail = format!(
            "stability score {:.3} against minimum {:.3}",
            score, self.config.min_stability_score
        );
        Ok(RiskFinding::measured(STABILITY, score, triggered, detail))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stratgate_core::AggregateMetrics;

    fn evidence_with_stability(score: f64) -> RiskEvidence {
        RiskEvidence {
            wfa: Some(AggregateMetrics {
                window_count: 5,
                mean_train_sharpe: 1.5,
                mean_oos_sharpe: 1.0,
                median_oos_sharpe: 1.0,
                std_oos_sharpe: 0.2,
                mean_oos_return: 0.05,
                stability_score: score,
                win_rate: 0.6,
                positive_windows: 3,
                negative_windows: 2,
                overfit_index: 1.5,
            }),
            ..RiskEvidence::default()
        }
    }

    #[test]
    fn high_stability_is_safe() {
        let detector = StabilityDetector::new(StabilityConfig::default());
        let finding = detector.detect(&evidence_with_stability(2.0)).unwrap();
        assert!(!finding.triggered);
    }

    #[test]
    fn low_stability_triggers() {
        let detector = StabilityDetector::new(StabilityConfig::default());
        let finding = detector.detect(&evidence_with_stability(0.1)).unwrap();
        assert!(finding.triggered);
        assert!(!finding.is_safe);
    }

    #[test]
    fn neutral_zero_score_triggers_under_default_minimum() {
        // The zero-variance convention maps to 0.0, which is below the 0.5
        // default minimum: a flat OOS profile is not evidence of stability.
        let detector = StabilityDetector::new(StabilityConfig::default());
        let finding = detector.detect(&evidence_with_stability(0.0)).unwrap();
        assert!(finding.triggered);
    }

    #[test]
    fn absent_evidence_is_safe() {
        let detector = StabilityDetector::new(StabilityConfig::default());
        let finding = detector.detect(&RiskEvidence::default()).unwrap();
        assert!(finding.is_safe);
    }

    #[test]
    fn non_finite_score_is_invalid_metric() {
        let detector = StabilityDetector::new(StabilityConfig::default());
        let err = detector
            .detect(&evidence_with_stability(f64::NAN))
            .unwrap_err();
        assert!(matches!(
            err,
            RiskError::InvalidMetric {
                detector: STABILITY,
                ..
            }
        ));
    }
}
