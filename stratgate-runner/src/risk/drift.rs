//! Drift detector — flags strategies whose parameter weights or regime
//! assignment wander over the trailing window.
//!
//! Two independent signals, either of which triggers the finding:
//! - weight drift: worst per-weight mean absolute change across consecutive
//!   snapshots, against `max_weight_drift`
//! - regime instability: fraction of consecutive observations whose regime
//!   label changed, against `max_regime_instability`

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{Detector, RiskError, RiskEvidence, RiskFinding, DRIFT};

/// Thresholds for the drift detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftConfig {
    /// Maximum tolerated mean absolute change per tracked weight (default 0.25).
    #[serde(default = "default_max_weight_drift")]
    pub max_weight_drift: f64,
    /// Maximum tolerated fraction of regime-label flips (default 0.4).
    #[serde(default = "default_max_regime_instability")]
    pub max_regime_instability: f64,
}

fn default_max_weight_drift() -> f64 {
    0.25
}

fn default_max_regime_instability() -> f64 {
    0.4
}

impl Default for DriftConfig {
    fn default() -> Self {
        Self {
            max_weight_drift: default_max_weight_drift(),
            max_regime_instability: default_max_regime_instability(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DriftDetector {
    config: DriftConfig,
}

impl DriftDetector {
    pub fn new(config: DriftConfig) -> Self {
        Self { config }
    }
}

impl Detector for DriftDetector {
    fn name(&self) -> &'static str {
        DRIFT
    }

    fn detect(&self, evidence: &RiskEvidence) -> Result<RiskFinding, RiskError> {
        let weight = worst_weight_drift(&evidence.weight_snapshots)?;
        let regime = regime_flip_fraction(&evidence.regime_labels);

        if weight.is_none() && regime.is_none() {
            return Ok(RiskFinding::no_evidence(DRIFT, "no drift evidence"));
        }

        let mut parts = Vec::new();
        let mut triggered = false;
        // Score: worst threshold ratio across the two signals (>1.0 = breach).
        let mut score = 0.0_f64;

        if let Some((name, drift)) = &weight {
            let breached = *drift > self.config.max_weight_drift;
            triggered |= breached;
            score = score.max(drift / self.config.max_weight_drift);
            parts.push(format!(
                "weight '{}' drift {:.4} against limit {:.4}",
                name, drift, self.config.max_weight_drift
            ));
        }
        if let Some(fraction) = regime {
            let breached = fraction > self.config.max_regime_instability;
            triggered |= breached;
            score = score.max(fraction / self.config.max_regime_instability);
            parts.push(format!(
                "regime flip fraction {:.3} against limit {:.3}",
                fraction, self.config.max_regime_instability
            ));
        }

        Ok(RiskFinding::measured(
            DRIFT,
            score,
            triggered,
            parts.join("; "),
        ))
    }
}

/// Mean absolute change of the worst-drifting weight across consecutive
/// snapshots. `None` with fewer than two snapshots.
fn worst_weight_drift(
    snapshots: &[BTreeMap<String, f64>],
) -> Result<Option<(String, f64)>, RiskError> {
    if snapshots.len() < 2 {
        return Ok(None);
    }
    for snapshot in snapshots {
        for (name, &value) in snapshot {
            if !value.is_finite() {
                return Err(RiskError::InvalidMetric {
                    detector: DRIFT,
                    reason: format!("weight '{name}' is {value}"),
                });
            }
        }
    }

    let mut sums: BTreeMap<&str, (f64, usize)> = BTreeMap::new();
    for pair in snapshots.windows(2) {
        for (name, &next) in &pair[1] {
            if let Some(&prev) = pair[0].get(name) {
                let entry = sums.entry(name).or_insert((0.0, 0));
                entry.0 += (next - prev).abs();
                entry.1 += 1;
            }
        }
    }

    Ok(sums
        .into_iter()
        .filter(|(_, (_, n))| *n > 0)
        .map(|(name, (sum, n))| (name.to_string(), sum / n as f64))
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal)))
}

/// Fraction of consecutive observations where the regime label changed.
/// `None` with fewer than two labels.
fn regime_flip_fraction(labels: &[String]) -> Option<f64> {
    if labels.len() < 2 {
        return None;
    }
    let flips = labels.windows(2).filter(|pair| pair[0] != pair[1]).count();
    Some(flips as f64 / (labels.len() - 1) as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
        pairs.iter().map(|&(k, v)| (k.to_string(), v)).collect()
    }

    fn labels(seq: &[&str]) -> Vec<String> {
        seq.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn stable_weights_are_safe() {
        let detector = DriftDetector::new(DriftConfig::default());
        let evidence = RiskEvidence {
            weight_snapshots: vec![
                snapshot(&[("momentum", 0.50), ("carry", 0.30)]),
                snapshot(&[("momentum", 0.52), ("carry", 0.29)]),
                snapshot(&[("momentum", 0.51), ("carry", 0.31)]),
            ],
            ..RiskEvidence::default()
        };
        let finding = detector.detect(&evidence).unwrap();
        assert!(!finding.triggered);
        assert!(finding.score < 1.0);
    }

    #[test]
    fn large_weight_swings_trigger() {
        let detector = DriftDetector::new(DriftConfig::default());
        let evidence = RiskEvidence {
            weight_snapshots: vec![
                snapshot(&[("momentum", 0.9)]),
                snapshot(&[("momentum", 0.1)]),
                snapshot(&[("momentum", 0.8)]),
            ],
            ..RiskEvidence::default()
        };
        let finding = detector.detect(&evidence).unwrap();
        assert!(finding.triggered);
        assert!(finding.detail.contains("momentum"));
    }

    #[test]
    fn stable_regime_sequence_is_safe() {
        let detector = DriftDetector::new(DriftConfig::default());
        let evidence = RiskEvidence {
            regime_labels: labels(&["bull", "bull", "bull", "bear", "bear"]),
            ..RiskEvidence::default()
        };
        // One flip over four transitions = 0.25, under the 0.4 limit.
        let finding = detector.detect(&evidence).unwrap();
        assert!(!finding.triggered);
    }

    #[test]
    fn churning_regimes_trigger() {
        let detector = DriftDetector::new(DriftConfig::default());
        let evidence = RiskEvidence {
            regime_labels: labels(&["bull", "bear", "bull", "bear", "bull"]),
            ..RiskEvidence::default()
        };
        // Every transition flips: fraction 1.0.
        let finding = detector.detect(&evidence).unwrap();
        assert!(finding.triggered);
        assert!((finding.score - 1.0 / 0.4).abs() < 1e-10);
    }

    #[test]
    fn either_signal_alone_triggers() {
        let detector = DriftDetector::new(DriftConfig::default());
        let evidence = RiskEvidence {
            weight_snapshots: vec![
                snapshot(&[("momentum", 0.50)]),
                snapshot(&[("momentum", 0.51)]),
            ],
            regime_labels: labels(&["bull", "bear", "bull", "bear"]),
            ..RiskEvidence::default()
        };
        let finding = detector.detect(&evidence).unwrap();
        assert!(finding.triggered, "regime churn alone must trigger");
    }

    #[test]
    fn no_evidence_is_safe() {
        let detector = DriftDetector::new(DriftConfig::default());
        let finding = detector.detect(&RiskEvidence::default()).unwrap();
        assert!(finding.is_safe);
        assert!(!finding.triggered);
    }

    #[test]
    fn single_snapshot_is_no_evidence() {
        let detector = DriftDetector::new(DriftConfig::default());
        let evidence = RiskEvidence {
            weight_snapshots: vec![snapshot(&[("momentum", 0.5)])],
            ..RiskEvidence::default()
        };
        let finding = detector.detect(&evidence).unwrap();
        assert!(finding.is_safe);
    }

    #[test]
    fn non_finite_weight_is_invalid_metric() {
        let detector = DriftDetector::new(DriftConfig::default());
        let evidence = RiskEvidence {
            weight_snapshots: vec![
                snapshot(&[("momentum", 0.5)]),
                snapshot(&[("momentum", f64::NAN)]),
            ],
            ..RiskEvidence::default()
        };
        assert!(matches!(
            detector.detect(&evidence),
            Err(RiskError::InvalidMetric { detector: DRIFT, .. })
        ));
    }

    #[test]
    fn disjoint_weight_keys_are_skipped() {
        // A weight that appears in only one snapshot contributes nothing.
        let detector = DriftDetector::new(DriftConfig::default());
        let evidence = RiskEvidence {
            weight_snapshots: vec![
                snapshot(&[("momentum", 0.5)]),
                snapshot(&[("carry", 0.9)]),
            ],
            ..RiskEvidence::default()
        };
        let finding = detector.detect(&evidence).unwrap();
        assert!(!finding.triggered);
    }
}
