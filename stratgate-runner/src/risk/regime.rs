//! Regime-dependency detector — flags strategies whose profit concentrates
//! in a single market regime instead of being diversified across conditions.

use serde::{Deserialize, Serialize};

use super::{Detector, RiskError, RiskEvidence, RiskFinding, REGIME_DEPENDENCY};

/// Thresholds for the regime-dependency detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeDependencyConfig {
    /// Maximum tolerated share of total PnL from one regime (default 0.8).
    #[serde(default = "default_max_dependency")]
    pub max_dependency: f64,
}

fn default_max_dependency() -> f64 {
    0.8
}

impl Default for RegimeDependencyConfig {
    fn default() -> Self {
        Self {
            max_dependency: default_max_dependency(),
        }
    }
}

/// Triggers when `max(regime_pnl) / sum(regime_pnl)` exceeds the configured
/// share. A non-positive total PnL has no defined dependency share and is
/// surfaced as an invalid metric.
#[derive(Debug, Clone)]
pub struct RegimeDependencyDetector {
    config: RegimeDependencyConfig,
}

impl RegimeDependencyDetector {
    pub fn new(config: RegimeDependencyConfig) -> Self {
        Self { config }
    }
}

impl Detector for RegimeDependencyDetector {
    fn name(&self) -> &'static str {
        REGIME_DEPENDENCY
    }

    fn detect(&self, evidence: &RiskEvidence) -> Result<RiskFinding, RiskError> {
        if evidence.regime_pnl.is_empty() {
            return Ok(RiskFinding::no_evidence(
                REGIME_DEPENDENCY,
                "no per-regime PnL attribution",
            ));
        }

        for (label, &pnl) in &evidence.regime_pnl {
            if !pnl.is_finite() {
                return Err(RiskError::InvalidMetric {
                    detector: REGIME_DEPENDENCY,
                    reason: format!("PnL for regime '{label}' is {pnl}"),
                });
            }
        }

        let total: f64 = evidence.regime_pnl.values().sum();
        if total <= 0.0 {
            return Err(RiskError::InvalidMetric {
                detector: REGIME_DEPENDENCY,
                reason: format!("total regime PnL {total} is non-positive"),
            });
        }

        // BTreeMap iteration order makes the argmax deterministic under ties.
        let (top_label, top_pnl) = evidence
            .regime_pnl
            .iter()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(label, &pnl)| (label.clone(), pnl))
            .unwrap_or_default();

        let score = top_pnl / total;
        let triggered = score > self.config.max_dependency;
        let detail = format!(
            "{:.1}% of PnL from regime '{}' against limit {:.1}%",
            score * 100.0,
            top_label,
            self.config.max_dependency * 100.0
        );
        Ok(RiskFinding::measured(
            REGIME_DEPENDENCY,
            score,
            triggered,
            detail,
        ))
    }
}
