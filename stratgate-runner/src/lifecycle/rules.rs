//! Promotion and demotion rules — pure functions of metrics against
//! configured thresholds.
//!
//! The asymmetry is deliberate: promotion requires every criterion to hold
//! (AND), demotion fires on any single breach (OR). Easy to demote, strict to
//! promote.

use serde::{Deserialize, Serialize};

use stratgate_core::AggregateMetrics;

use super::status::{HealthRecord, HealthState, LiveMetrics, PaperMetrics};

// ─── Configuration ───────────────────────────────────────────────────

/// Thresholds for the lifecycle rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifecycleConfig {
    // WFA_PASSED → PAPER_TRADING (all must hold)
    /// Minimum mean OOS Sharpe (default 1.0). Also the paper-Sharpe minimum
    /// for the paper → live gate.
    #[serde(default = "default_min_sharpe")]
    pub min_sharpe: f64,
    /// Maximum walk-forward overfit index (default 2.0).
    #[serde(default = "default_max_overfit_ratio")]
    pub max_overfit_ratio: f64,
    /// Minimum walk-forward win rate (default 0.5).
    #[serde(default = "default_min_win_rate")]
    pub min_win_rate: f64,
    /// Minimum walk-forward stability score (default 0.5).
    #[serde(default = "default_min_stability")]
    pub min_stability: f64,

    // PAPER_TRADING → LIVE_TRADING (all must hold)
    /// Maximum paper-trading drawdown (default 0.20).
    #[serde(default = "default_max_paper_drawdown")]
    pub max_paper_drawdown: f64,
    /// Minimum evaluation cycles spent in paper trading (default 30).
    #[serde(default = "default_min_paper_days")]
    pub min_paper_days: u32,
    /// Whether the paper → live gate additionally requires a manual approval
    /// flag (default false).
    #[serde(default)]
    pub require_manual_approval: bool,

    // LIVE_TRADING → DISABLED (any suffices)
    /// Live drawdown above this forces demotion (default 0.12).
    #[serde(default = "default_max_drawdown_limit")]
    pub max_drawdown_limit: f64,
    /// Live Sharpe below this floor forces demotion (default 0.0).
    #[serde(default = "default_min_sharpe_floor")]
    pub min_sharpe_floor: f64,
    /// Consecutive health FAILs at or above this force demotion (default 3).
    #[serde(default = "default_consecutive_failure_limit")]
    pub consecutive_failure_limit: u32,
    /// Position drift beyond this percentage forces demotion (default 5.0).
    #[serde(default = "default_max_position_drift_pct")]
    pub max_position_drift_pct: f64,
}

fn default_min_sharpe() -> f64 {
    1.0
}
fn default_max_overfit_ratio() -> f64 {
    2.0
}
fn default_min_win_rate() -> f64 {
    0.5
}
fn default_min_stability() -> f64 {
    0.5
}
fn default_max_paper_drawdown() -> f64 {
    0.20
}
fn default_min_paper_days() -> u32 {
    30
}
fn default_max_drawdown_limit() -> f64 {
    0.12
}
fn default_min_sharpe_floor() -> f64 {
    0.0
}
fn default_consecutive_failure_limit() -> u32 {
    3
}
fn default_max_position_drift_pct() -> f64 {
    5.0
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            min_sharpe: default_min_sharpe(),
            max_overfit_ratio: default_max_overfit_ratio(),
            min_win_rate: default_min_win_rate(),
            min_stability: default_min_stability(),
            max_paper_drawdown: default_max_paper_drawdown(),
            min_paper_days: default_min_paper_days(),
            require_manual_approval: false,
            max_drawdown_limit: default_max_drawdown_limit(),
            min_sharpe_floor: default_min_sharpe_floor(),
            consecutive_failure_limit: default_consecutive_failure_limit(),
            max_position_drift_pct: default_max_position_drift_pct(),
        }
    }
}

// ─── Gate outcomes ───────────────────────────────────────────────────

/// Outcome of a promotion gate: pass/fail plus a reason that names every
/// failing metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateCheck {
    pub passed: bool,
    pub reason: String,
}

impl GateCheck {
    fn from_failures(failures: Vec<String>) -> Self {
        if failures.is_empty() {
            Self {
                passed: true,
                reason: "all promotion criteria met".into(),
            }
        } else {
            Self {
                passed: false,
                reason: failures.join("; "),
            }
        }
    }
}

/// WFA_PASSED → PAPER_TRADING gate: all four walk-forward criteria must hold.
pub fn evaluate_wfa_promotion(metrics: &AggregateMetrics, config: &LifecycleConfig) -> GateCheck {
    let mut failures = Vec::new();

    if metrics.mean_oos_sharpe < config.min_sharpe {
        failures.push(format!(
            "mean OOS Sharpe {:.2} below minimum {:.2}",
            metrics.mean_oos_sharpe, config.min_sharpe
        ));
    }
    if metrics.overfit_index > config.max_overfit_ratio {
        failures.push(format!(
            "overfit index {:.2} above maximum {:.2}",
            metrics.overfit_index, config.max_overfit_ratio
        ));
    }
    if metrics.win_rate < config.min_win_rate {
        failures.push(format!(
            "win rate {:.2} below minimum {:.2}",
            metrics.win_rate, config.min_win_rate
        ));
    }
    if metrics.stability_score < config.min_stability {
        failures.push(format!(
            "stability score {:.2} below minimum {:.2}",
            metrics.stability_score, config.min_stability
        ));
    }

    GateCheck::from_failures(failures)
}

/// PAPER_TRADING → LIVE_TRADING gate.
pub fn evaluate_paper_promotion(
    paper: &PaperMetrics,
    days_in_state: u32,
    manual_approval: bool,
    config: &LifecycleConfig,
) -> GateCheck {
    let mut failures = Vec::new();

    if paper.sharpe < config.min_sharpe {
        failures.push(format!(
            "paper Sharpe {:.2} below minimum {:.2}",
            paper.sharpe, config.min_sharpe
        ));
    }
    if paper.max_drawdown > config.max_paper_drawdown {
        failures.push(format!(
            "paper drawdown {:.2} above maximum {:.2}",
            paper.max_drawdown, config.max_paper_drawdown
        ));
    }
    if days_in_state < config.min_paper_days {
        failures.push(format!(
            "{} cycles in paper trading, minimum {}",
            days_in_state, config.min_paper_days
        ));
    }
    if config.require_manual_approval && !manual_approval {
        failures.push("manual approval required but not granted".into());
    }

    GateCheck::from_failures(failures)
}

/// LIVE_TRADING → DISABLED check: returns the breach reason when any demotion
/// condition holds.
pub fn evaluate_live_demotion(
    live: Option<&LiveMetrics>,
    health: Option<&HealthRecord>,
    config: &LifecycleConfig,
) -> Option<String> {
    if let Some(live) = live {
        if live.max_drawdown > config.max_drawdown_limit {
            return Some(format!(
                "live drawdown {:.2} exceeds limit {:.2}",
                live.max_drawdown, config.max_drawdown_limit
            ));
        }
        if live.sharpe < config.min_sharpe_floor {
            return Some(format!(
                "live Sharpe {:.2} below floor {:.2}",
                live.sharpe, config.min_sharpe_floor
            ));
        }
        if live.position_drift_pct > config.max_position_drift_pct {
            return Some(format!(
                "position drift {:.1}% exceeds tolerance {:.1}%",
                live.position_drift_pct, config.max_position_drift_pct
            ));
        }
    }
    if let Some(health) = health {
        if health.status == HealthState::Fail
            && health.consecutive_failures >= config.consecutive_failure_limit
        {
            return Some(format!(
                "{} consecutive health failures, limit {}",
                health.consecutive_failures, config.consecutive_failure_limit
            ));
        }
    }
    None
}
