//! Validation pipeline — wires the walk-forward engine, risk detectors, and
//! lifecycle machine into one evaluation cycle.
//!
//! Windows within a run execute sequentially and in order so reporting stays
//! reproducible. Different strategies are fully independent and fan out over
//! rayon in `run_validation_batch`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use rayon::prelude::*;

use stratgate_core::{
    aggregate, execute_window, split_windows, AggregateError, AggregateMetrics, ExecuteError,
    SplitError, StrategyEvaluator, TimeSeries, WindowConfig, WindowResult,
};

use crate::config::ValidationConfig;
use crate::lifecycle::{
    CycleInputs, HealthRecord, LifecycleError, LifecycleStateMachine, LiveMetrics, PaperMetrics,
    StatusStore, StrategyStatus, TransitionDecision,
};
use crate::report::ValidationReport;
use crate::risk::{
    FragilityEvidence, ModelRiskAnalyzer, ModelRiskReport, RiskError, RiskEvidence,
};

/// Errors from the validation pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("window generation failed: {0}")]
    Split(#[from] SplitError),
    #[error("window execution failed: {0}")]
    Execute(#[from] ExecuteError),
    #[error("aggregation failed: {0}")]
    Aggregate(#[from] AggregateError),
    #[error("risk analysis failed: {0}")]
    Risk(#[from] RiskError),
    #[error("lifecycle evaluation failed: {0}")]
    Lifecycle(#[from] LifecycleError),
}

/// A complete walk-forward run: every window result plus the aggregate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WfaRun {
    pub windows: Vec<WindowResult>,
    pub aggregate: AggregateMetrics,
}

/// Run walk-forward analysis over one series.
///
/// Windows execute sequentially, in chronological order.
pub fn run_wfa(
    series: &TimeSeries,
    config: &WindowConfig,
    evaluator: &dyn StrategyEvaluator,
) -> Result<WfaRun, PipelineError> {
    let windows = split_windows(&series.dates(), config)?;
    tracing::debug!(window_count = windows.len(), "walk-forward windows generated");

    let mut results = Vec::with_capacity(windows.len());
    for window in &windows {
        results.push(execute_window(window, series, evaluator)?);
    }

    let aggregate = aggregate(&results)?;
    Ok(WfaRun {
        windows: results,
        aggregate,
    })
}

/// Caller-supplied context for one evaluation cycle: risk evidence beyond the
/// walk-forward run, plus paper/live/health signals for the lifecycle gates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CycleContext {
    pub weight_snapshots: Vec<BTreeMap<String, f64>>,
    pub regime_labels: Vec<String>,
    pub regime_pnl: BTreeMap<String, f64>,
    pub fragility: Option<FragilityEvidence>,
    pub paper: Option<PaperMetrics>,
    pub live: Option<LiveMetrics>,
    pub health: Option<HealthRecord>,
    #[serde(default)]
    pub manual_approval: bool,
}

/// Outcome of one full validation cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub wfa: WfaRun,
    pub risk: ModelRiskReport,
    pub decision: TransitionDecision,
    pub status: StrategyStatus,
    pub config_hash: String,
}

impl ValidationOutcome {
    /// Assemble the durable report artifact for this outcome.
    pub fn report(&self) -> ValidationReport {
        ValidationReport {
            strategy_name: self.status.strategy_name.clone(),
            config_hash: self.config_hash.clone(),
            aggregate: self.wfa.aggregate.clone(),
            risk: self.risk.clone(),
            decision: self.decision.clone(),
            status: self.status.clone(),
        }
    }
}

/// Run one full validation cycle for a strategy: walk-forward analysis, risk
/// detection, lifecycle evaluation, status persistence.
pub fn run_validation_cycle<S: StatusStore>(
    strategy_name: &str,
    series: &TimeSeries,
    evaluator: &dyn StrategyEvaluator,
    analyzer: &ModelRiskAnalyzer,
    machine: &LifecycleStateMachine<S>,
    config: &ValidationConfig,
    context: &CycleContext,
) -> Result<ValidationOutcome, PipelineError> {
    tracing::info!(strategy = strategy_name, "validation cycle started");

    let wfa = run_wfa(series, &config.wfa, evaluator)?;

    let evidence = RiskEvidence {
        wfa: Some(wfa.aggregate.clone()),
        weight_snapshots: context.weight_snapshots.clone(),
        regime_labels: context.regime_labels.clone(),
        regime_pnl: context.regime_pnl.clone(),
        fragility: context.fragility.clone(),
    };
    let risk = analyzer.analyze(&evidence)?;

    let inputs = CycleInputs {
        wfa: Some(wfa.aggregate.clone()),
        risk_rating: Some(risk.rating),
        paper: context.paper,
        live: context.live,
        health: context.health,
        manual_approval: context.manual_approval,
    };
    let decision = machine.evaluate_cycle(strategy_name, &inputs)?;
    let status = machine
        .status(strategy_name)?
        .unwrap_or_else(|| StrategyStatus::new(strategy_name));

    tracing::info!(
        strategy = strategy_name,
        rating = %risk.rating,
        state = %status.state,
        "validation cycle finished"
    );

    Ok(ValidationOutcome {
        wfa,
        risk,
        decision,
        status,
        config_hash: config.config_hash(),
    })
}

/// One strategy queued for batch validation.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub name: String,
    pub series: TimeSeries,
    pub context: CycleContext,
}

/// Validate a batch of independent strategies in parallel.
///
/// Strategy names must be distinct: the per-strategy writer guard turns
/// duplicates into `StoreError::Conflict` for the loser.
pub fn run_validation_batch<S: StatusStore>(
    candidates: &[Candidate],
    evaluator: &dyn StrategyEvaluator,
    analyzer: &ModelRiskAnalyzer,
    machine: &LifecycleStateMachine<S>,
    config: &ValidationConfig,
) -> Vec<(String, Result<ValidationOutcome, PipelineError>)> {
    candidates
        .par_iter()
        .map(|candidate| {
            let outcome = run_validation_cycle(
                &candidate.name,
                &candidate.series,
                evaluator,
                analyzer,
                machine,
                config,
                &candidate.context,
            );
            (candidate.name.clone(), outcome)
        })
        .collect()
}
