//! Fragility detector — flags strategies whose PnL is hypersensitive to
//! small input perturbations (price shocks, yield shocks, parameter noise,
//! cycle-phase shifts).

use serde::{Deserialize, Serialize};

use super::{Detector, RiskError, RiskEvidence, RiskFinding, FRAGILITY};

/// Thresholds for the fragility detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FragilityConfig {
    /// Maximum tolerated fragility index (default 0.5).
    #[serde(default = "default_max_fragility")]
    pub max_fragility: f64,
}

fn default_max_fragility() -> f64 {
    0.5
}

impl Default for FragilityConfig {
    fn default() -> Self {
        Self {
            max_fragility: default_max_fragility(),
        }
    }
}

/// Computes the fragility index — mean absolute relative PnL change across
/// perturbation experiments — and triggers when it exceeds the limit.
///
/// A zero or non-finite baseline PnL leaves relative change undefined and is
/// surfaced as an invalid metric rather than defaulted.
#[derive(Debug, Clone)]
pub struct FragilityDetector {
    config: FragilityConfig,
}

impl FragilityDetector {
    pub fn new(config: FragilityConfig) -> Self {
        Self { config }
    }
}

impl Detector for FragilityDetector {
    fn name(&self) -> &'static str {
        FRAGILITY
    }

    fn detect(&self, evidence: &RiskEvidence) -> Result<RiskFinding, RiskError> {
        let Some(fragility) = &evidence.fragility else {
            return Ok(RiskFinding::no_evidence(
                FRAGILITY,
                "no perturbation evidence",
            ));
        };
        if fragility.perturbations.is_empty() {
            return Ok(RiskFinding::no_evidence(
                FRAGILITY,
                "no perturbation experiments",
            ));
        }

        let baseline = fragility.baseline_pnl;
        if !baseline.is_finite() || baseline == 0.0 {
            return Err(RiskError::InvalidMetric {
                detector: FRAGILITY,
                reason: format!("baseline PnL {baseline} leaves relative change undefined"),
            });
        }

        let mut sum = 0.0;
        for p in &fragility.perturbations {
            if !p.pnl.is_finite() {
                return Err(RiskError::InvalidMetric {
                    detector: FRAGILITY,
                    reason: format!("perturbed PnL for {} is {}", p.kind, p.pnl),
                });
            }
            sum += ((p.pnl - baseline) / baseline).abs();
        }
        let index = sum / fragility.perturbations.len() as f64;

        let triggered = index > self.config.max_fragility;
        let detail = format!(
            "fragility index {:.3} across {} experiments against limit {:.3}",
            index,
            fragility.perturbations.len(),
            self.config.max_fragility
        );
        Ok(RiskFinding::measured(FRAGILITY, index, triggered, detail))
    }
}
