//! Lifecycle status — the persisted per-strategy record and its input types.

use serde::{Deserialize, Serialize};

use stratgate_core::AggregateMetrics;

use crate::risk::RiskRating;

/// Current schema version written into every status record.
pub const STATUS_VERSION: &str = "1";

/// Stage a strategy occupies in the promotion pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleState {
    Research,
    WfaPassed,
    PaperTrading,
    LiveTrading,
    Disabled,
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LifecycleState::Research => "RESEARCH",
            LifecycleState::WfaPassed => "WFA_PASSED",
            LifecycleState::PaperTrading => "PAPER_TRADING",
            LifecycleState::LiveTrading => "LIVE_TRADING",
            LifecycleState::Disabled => "DISABLED",
        };
        f.write_str(s)
    }
}

/// Paper-trading performance supplied by the external paper engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PaperMetrics {
    pub sharpe: f64,
    /// Maximum drawdown as a positive fraction (0.08 = 8%).
    pub max_drawdown: f64,
}

/// Live-trading performance supplied by the external monitoring collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LiveMetrics {
    pub sharpe: f64,
    /// Maximum drawdown as a positive fraction.
    pub max_drawdown: f64,
    /// Absolute deviation of actual vs intended position sizing, percent.
    pub position_drift_pct: f64,
}

/// Health check status from the external monitor. Read-only to this core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HealthState {
    Ok,
    Warn,
    Fail,
}

/// One health record: current status plus the FAIL streak length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthRecord {
    pub status: HealthState,
    pub consecutive_failures: u32,
}

/// Typed metadata carried on a status record. Named optional fields, never a
/// free-form map: a missing metric is visible at the type level.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusMetadata {
    pub last_wfa: Option<AggregateMetrics>,
    pub last_paper: Option<PaperMetrics>,
    pub last_live: Option<LiveMetrics>,
    pub last_health: Option<HealthRecord>,
    pub last_risk_rating: Option<RiskRating>,
    pub last_transition_reason: Option<String>,
}

/// The persisted lifecycle record for one strategy, keyed by name.
///
/// Owned exclusively by the state machine: mutation happens only through
/// `evaluate_cycle` and the explicit operator actions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyStatus {
    pub strategy_name: String,
    pub state: LifecycleState,
    /// Evaluation cycles spent in the current state; resets to 0 on every
    /// transition.
    pub days_in_state: u32,
    pub metadata: StatusMetadata,
    pub version: String,
}

impl StrategyStatus {
    /// Fresh record for a strategy referenced for the first time.
    pub fn new(strategy_name: impl Into<String>) -> Self {
        Self {
            strategy_name: strategy_name.into(),
            state: LifecycleState::Research,
            days_in_state: 0,
            metadata: StatusMetadata::default(),
            version: STATUS_VERSION.to_string(),
        }
    }
}

/// Outcome of one lifecycle evaluation. `from == to` means the strategy
/// stayed put; the reason always explains why.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionDecision {
    pub from: LifecycleState,
    pub to: LifecycleState,
    pub reason: String,
}

impl TransitionDecision {
    pub fn hold(state: LifecycleState, reason: impl Into<String>) -> Self {
        Self {
            from: state,
            to: state,
            reason: reason.into(),
        }
    }

    pub fn transition(
        from: LifecycleState,
        to: LifecycleState,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            from,
            to,
            reason: reason.into(),
        }
    }

    pub fn changed(&self) -> bool {
        self.from != self.to
    }
}
