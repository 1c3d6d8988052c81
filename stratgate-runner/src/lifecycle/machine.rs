//! Lifecycle state machine — applies promotion/demotion rules to persisted
//! strategy status.
//!
//! State graph:
//! `RESEARCH → WFA_PASSED → PAPER_TRADING → LIVE_TRADING`, with `DISABLED`
//! reachable automatically from LIVE_TRADING on failure and by operator
//! action from any non-Research state. The machine never auto-promotes out
//! of RESEARCH; `mark_wfa_passed` is the manual step.
//!
//! Every cycle runs load → decide → apply → save under the store's writer
//! guard, so concurrent cycles on the same strategy cannot interleave.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use stratgate_core::AggregateMetrics;

use crate::risk::RiskRating;

use super::rules::{
    evaluate_live_demotion, evaluate_paper_promotion, evaluate_wfa_promotion, LifecycleConfig,
};
use super::status::{
    HealthRecord, LifecycleState, LiveMetrics, PaperMetrics, StrategyStatus, TransitionDecision,
};
use super::store::{StatusStore, StoreError};

/// Everything one evaluation cycle may consume. All evidence is optional;
/// a state with no fresh evidence simply holds.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CycleInputs {
    pub wfa: Option<AggregateMetrics>,
    pub risk_rating: Option<RiskRating>,
    pub paper: Option<PaperMetrics>,
    pub live: Option<LiveMetrics>,
    pub health: Option<HealthRecord>,
    #[serde(default)]
    pub manual_approval: bool,
}

/// Errors from lifecycle operations.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("strategy '{name}' cannot move {from} → {to}: {reason}")]
    InvalidTransition {
        name: String,
        from: LifecycleState,
        to: LifecycleState,
        reason: String,
    },
}

/// The lifecycle state machine over an injected status store.
pub struct LifecycleStateMachine<S: StatusStore> {
    store: S,
    config: LifecycleConfig,
}

impl<S: StatusStore> LifecycleStateMachine<S> {
    pub fn new(store: S, config: LifecycleConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    /// Current status for a strategy, if one has been recorded.
    pub fn status(&self, name: &str) -> Result<Option<StrategyStatus>, LifecycleError> {
        Ok(self.store.load(name)?)
    }

    /// Run one evaluation cycle for a strategy.
    ///
    /// The status record is created on first reference (state RESEARCH).
    /// `days_in_state` increments when the state holds and resets to 0 on a
    /// transition. Criteria not being met is an ordinary hold decision, never
    /// an error.
    pub fn evaluate_cycle(
        &self,
        name: &str,
        inputs: &CycleInputs,
    ) -> Result<TransitionDecision, LifecycleError> {
        let _guard = self.store.begin_write(name)?;

        let mut status = match self.store.load(name)? {
            Some(s) => s,
            None => StrategyStatus::new(name),
        };

        let decision = decide(&status, inputs, &self.config);
        apply_decision(&mut status, &decision);
        record_inputs(&mut status, inputs);
        self.store.save(&status)?;

        if decision.changed() {
            tracing::info!(
                strategy = name,
                from = %decision.from,
                to = %decision.to,
                reason = %decision.reason,
                "lifecycle transition"
            );
        } else {
            tracing::debug!(
                strategy = name,
                state = %decision.from,
                reason = %decision.reason,
                "lifecycle hold"
            );
        }
        Ok(decision)
    }

    /// Manual/external action: record that a strategy passed walk-forward
    /// review. The only way out of RESEARCH.
    pub fn mark_wfa_passed(&self, name: &str) -> Result<TransitionDecision, LifecycleError> {
        let _guard = self.store.begin_write(name)?;

        let mut status = match self.store.load(name)? {
            Some(s) => s,
            None => StrategyStatus::new(name),
        };
        if status.state != LifecycleState::Research {
            return Err(LifecycleError::InvalidTransition {
                name: name.to_string(),
                from: status.state,
                to: LifecycleState::WfaPassed,
                reason: "only RESEARCH strategies can be marked WFA_PASSED".into(),
            });
        }

        let decision = TransitionDecision::transition(
            LifecycleState::Research,
            LifecycleState::WfaPassed,
            "walk-forward review approved by operator",
        );
        apply_decision(&mut status, &decision);
        self.store.save(&status)?;
        tracing::info!(strategy = name, "marked WFA_PASSED by operator");
        Ok(decision)
    }

    /// Operator action: force a strategy into DISABLED from any non-Research
    /// state.
    pub fn disable(&self, name: &str, reason: &str) -> Result<TransitionDecision, LifecycleError> {
        let _guard = self.store.begin_write(name)?;

        let mut status = match self.store.load(name)? {
            Some(s) => s,
            None => StrategyStatus::new(name),
        };
        if matches!(
            status.state,
            LifecycleState::Research | LifecycleState::Disabled
        ) {
            return Err(LifecycleError::InvalidTransition {
                name: name.to_string(),
                from: status.state,
                to: LifecycleState::Disabled,
                reason: "nothing to disable in this state".into(),
            });
        }

        let decision = TransitionDecision::transition(
            status.state,
            LifecycleState::Disabled,
            format!("disabled by operator: {reason}"),
        );
        apply_decision(&mut status, &decision);
        self.store.save(&status)?;
        tracing::info!(strategy = name, reason, "disabled by operator");
        Ok(decision)
    }
}

// ─── Pure decision logic ─────────────────────────────────────────────

fn decide(
    status: &StrategyStatus,
    inputs: &CycleInputs,
    config: &LifecycleConfig,
) -> TransitionDecision {
    match status.state {
        LifecycleState::Research => TransitionDecision::hold(
            LifecycleState::Research,
            "research strategies advance only by manual WFA approval",
        ),
        LifecycleState::WfaPassed => match &inputs.wfa {
            Some(metrics) => {
                let check = evaluate_wfa_promotion(metrics, config);
                if check.passed {
                    TransitionDecision::transition(
                        LifecycleState::WfaPassed,
                        LifecycleState::PaperTrading,
                        check.reason,
                    )
                } else {
                    TransitionDecision::hold(LifecycleState::WfaPassed, check.reason)
                }
            }
            None => TransitionDecision::hold(
                LifecycleState::WfaPassed,
                "no walk-forward evidence this cycle",
            ),
        },
        LifecycleState::PaperTrading => match &inputs.paper {
            Some(paper) => {
                let check = evaluate_paper_promotion(
                    paper,
                    status.days_in_state,
                    inputs.manual_approval,
                    config,
                );
                if check.passed {
                    TransitionDecision::transition(
                        LifecycleState::PaperTrading,
                        LifecycleState::LiveTrading,
                        check.reason,
                    )
                } else {
                    TransitionDecision::hold(LifecycleState::PaperTrading, check.reason)
                }
            }
            None => TransitionDecision::hold(
                LifecycleState::PaperTrading,
                "no paper-trading evidence this cycle",
            ),
        },
        LifecycleState::LiveTrading => {
            match evaluate_live_demotion(inputs.live.as_ref(), inputs.health.as_ref(), config) {
                Some(reason) => TransitionDecision::transition(
                    LifecycleState::LiveTrading,
                    LifecycleState::Disabled,
                    reason,
                ),
                None => TransitionDecision::hold(
                    LifecycleState::LiveTrading,
                    "no demotion condition met",
                ),
            }
        }
        LifecycleState::Disabled => TransitionDecision::hold(
            LifecycleState::Disabled,
            "disabled strategies require operator intervention",
        ),
    }
}

fn apply_decision(status: &mut StrategyStatus, decision: &TransitionDecision) {
    if decision.changed() {
        status.state = decision.to;
        status.days_in_state = 0;
        status.metadata.last_transition_reason = Some(decision.reason.clone());
    } else {
        status.days_in_state += 1;
    }
}

fn record_inputs(status: &mut StrategyStatus, inputs: &CycleInputs) {
    if let Some(wfa) = &inputs.wfa {
        status.metadata.last_wfa = Some(wfa.clone());
    }
    if let Some(paper) = inputs.paper {
        status.metadata.last_paper = Some(paper);
    }
    if let Some(live) = inputs.live {
        status.metadata.last_live = Some(live);
    }
    if let Some(health) = inputs.health {
        status.metadata.last_health = Some(health);
    }
    if let Some(rating) = inputs.risk_rating {
        status.metadata.last_risk_rating = Some(rating);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::store::MemoryStatusStore;
    use crate::lifecycle::status::HealthState;

    fn machine() -> LifecycleStateMachine<MemoryStatusStore> {
        LifecycleStateMachine::new(MemoryStatusStore::new(), LifecycleConfig::default())
    }

    fn good_wfa() -> AggregateMetrics {
        AggregateMetrics {
            window_count: 5,
            mean_train_sharpe: 1.56,
            mean_oos_sharpe: 1.2,
            median_oos_sharpe: 1.1,
            std_oos_sharpe: 0.2,
            mean_oos_return: 0.06,
            stability_score: 2.0,
            win_rate: 0.6,
            positive_windows: 3,
            negative_windows: 2,
            overfit_index: 1.3,
        }
    }

    #[test]
    fn first_reference_creates_research_record() {
        let m = machine();
        let decision = m.evaluate_cycle("fresh", &CycleInputs::default()).unwrap();
        assert!(!decision.changed());
        assert_eq!(decision.from, LifecycleState::Research);

        let status = m.status("fresh").unwrap().unwrap();
        assert_eq!(status.state, LifecycleState::Research);
        assert_eq!(status.days_in_state, 1);
    }

    #[test]
    fn research_never_auto_promotes() {
        let m = machine();
        let inputs = CycleInputs {
            wfa: Some(good_wfa()),
            ..CycleInputs::default()
        };
        let decision = m.evaluate_cycle("stuck", &inputs).unwrap();
        assert_eq!(decision.to, LifecycleState::Research);
    }

    #[test]
    fn manual_wfa_approval_then_auto_promotion() {
        let m = machine();
        let decision = m.mark_wfa_passed("trend_a").unwrap();
        assert_eq!(decision.to, LifecycleState::WfaPassed);

        let inputs = CycleInputs {
            wfa: Some(good_wfa()),
            ..CycleInputs::default()
        };
        let decision = m.evaluate_cycle("trend_a", &inputs).unwrap();
        assert_eq!(decision.to, LifecycleState::PaperTrading);

        let status = m.status("trend_a").unwrap().unwrap();
        assert_eq!(status.days_in_state, 0);
        assert!(status.metadata.last_wfa.is_some());
    }

    #[test]
    fn failing_sharpe_blocks_with_named_reason() {
        let m = machine();
        m.mark_wfa_passed("trend_a").unwrap();

        let mut wfa = good_wfa();
        wfa.mean_oos_sharpe = 0.5;
        let inputs = CycleInputs {
            wfa: Some(wfa),
            ..CycleInputs::default()
        };
        let decision = m.evaluate_cycle("trend_a", &inputs).unwrap();
        assert!(!decision.changed());
        assert!(decision.reason.contains("Sharpe"));
    }

    #[test]
    fn days_in_state_counts_holds_and_resets_on_transition() {
        let m = machine();
        m.mark_wfa_passed("trend_a").unwrap();
        assert_eq!(m.status("trend_a").unwrap().unwrap().days_in_state, 0);

        // Hold twice without evidence.
        m.evaluate_cycle("trend_a", &CycleInputs::default()).unwrap();
        m.evaluate_cycle("trend_a", &CycleInputs::default()).unwrap();
        assert_eq!(m.status("trend_a").unwrap().unwrap().days_in_state, 2);

        // Promote: counter resets.
        let inputs = CycleInputs {
            wfa: Some(good_wfa()),
            ..CycleInputs::default()
        };
        m.evaluate_cycle("trend_a", &inputs).unwrap();
        assert_eq!(m.status("trend_a").unwrap().unwrap().days_in_state, 0);
    }

    #[test]
    fn paper_to_live_needs_seasoning() {
        let m = machine();
        m.mark_wfa_passed("trend_a").unwrap();
        m.evaluate_cycle(
            "trend_a",
            &CycleInputs {
                wfa: Some(good_wfa()),
                ..CycleInputs::default()
            },
        )
        .unwrap();

        let paper_inputs = CycleInputs {
            paper: Some(PaperMetrics {
                sharpe: 1.5,
                max_drawdown: 0.06,
            }),
            ..CycleInputs::default()
        };

        // Too few cycles in paper: holds.
        let decision = m.evaluate_cycle("trend_a", &paper_inputs).unwrap();
        assert!(!decision.changed());

        // Season it past min_paper_days.
        for _ in 0..30 {
            m.evaluate_cycle("trend_a", &paper_inputs).unwrap();
        }
        let status = m.status("trend_a").unwrap().unwrap();
        assert_eq!(status.state, LifecycleState::LiveTrading);
    }

    #[test]
    fn live_drawdown_breach_disables() {
        let m = machine();
        seed_live(&m, "trend_a");

        let inputs = CycleInputs {
            live: Some(LiveMetrics {
                sharpe: 2.0,
                max_drawdown: 0.15,
                position_drift_pct: 0.1,
            }),
            ..CycleInputs::default()
        };
        let decision = m.evaluate_cycle("trend_a", &inputs).unwrap();
        assert_eq!(decision.to, LifecycleState::Disabled);
        assert!(decision.reason.contains("drawdown"));
    }

    #[test]
    fn health_fail_streak_disables() {
        let m = machine();
        seed_live(&m, "trend_a");

        let inputs = CycleInputs {
            health: Some(HealthRecord {
                status: HealthState::Fail,
                consecutive_failures: 4,
            }),
            ..CycleInputs::default()
        };
        let decision = m.evaluate_cycle("trend_a", &inputs).unwrap();
        assert_eq!(decision.to, LifecycleState::Disabled);
    }

    #[test]
    fn disabled_is_terminal_for_evaluation() {
        let m = machine();
        seed_live(&m, "trend_a");
        m.disable("trend_a", "incident review").unwrap();

        let decision = m
            .evaluate_cycle(
                "trend_a",
                &CycleInputs {
                    wfa: Some(good_wfa()),
                    ..CycleInputs::default()
                },
            )
            .unwrap();
        assert_eq!(decision.to, LifecycleState::Disabled);
        assert!(!decision.changed());
    }

    #[test]
    fn mark_wfa_passed_rejected_outside_research() {
        let m = machine();
        m.mark_wfa_passed("trend_a").unwrap();
        let err = m.mark_wfa_passed("trend_a").unwrap_err();
        assert!(matches!(err, LifecycleError::InvalidTransition { .. }));
    }

    #[test]
    fn disable_rejected_in_research() {
        let m = machine();
        m.evaluate_cycle("fresh", &CycleInputs::default()).unwrap();
        let err = m.disable("fresh", "no reason").unwrap_err();
        assert!(matches!(err, LifecycleError::InvalidTransition { .. }));
    }

    /// Drive a fresh strategy to LIVE_TRADING.
    fn seed_live(m: &LifecycleStateMachine<MemoryStatusStore>, name: &str) {
        m.mark_wfa_passed(name).unwrap();
        m.evaluate_cycle(
            name,
            &CycleInputs {
                wfa: Some(good_wfa()),
                ..CycleInputs::default()
            },
        )
        .unwrap();
        let paper_inputs = CycleInputs {
            paper: Some(PaperMetrics {
                sharpe: 1.5,
                max_drawdown: 0.06,
            }),
            ..CycleInputs::default()
        };
        for _ in 0..=30 {
            m.evaluate_cycle(name, &paper_inputs).unwrap();
        }
        assert_eq!(
            m.status(name).unwrap().unwrap().state,
            LifecycleState::LiveTrading
        );
    }
}
