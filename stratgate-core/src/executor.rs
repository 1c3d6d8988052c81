//! Window execution — evaluate a strategy on one train/test window pair.
//!
//! The strategy itself is an injected `StrategyEvaluator` capability; this
//! module only slices the series and records results. The evaluator is handed
//! the train slice and the test slice separately, so nothing derived from the
//! test interval can reach the in-sample evaluation (the anti-look-ahead
//! invariant).

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::series::TimeSeries;
use crate::window::Window;

// ─── Evaluator capability ────────────────────────────────────────────

/// Performance summary returned by an evaluator for one slice.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Performance {
    pub sharpe: f64,
    pub total_return: f64,
}

/// Full evaluation of one slice: headline performance plus the per-bar PnL
/// series behind it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub performance: Performance,
    pub pnl: Vec<f64>,
}

/// Errors an evaluator may surface.
#[derive(Debug, Error)]
pub enum EvaluateError {
    #[error("cannot evaluate an empty slice")]
    EmptySlice,
    #[error("evaluation failed: {reason}")]
    Failed { reason: String },
}

/// Strategy-evaluation capability supplied by the external backtest engine.
///
/// Implementations must be deterministic for identical input slices and must
/// not consult data outside the slice they are handed.
pub trait StrategyEvaluator: Send + Sync {
    fn evaluate(&self, slice: &TimeSeries) -> Result<Evaluation, EvaluateError>;
}

// ─── Window result ───────────────────────────────────────────────────

/// Result of evaluating one window. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowResult {
    pub window: Window,
    pub train_performance: Performance,
    pub oos_performance: Performance,
    /// Per-bar PnL over the test range.
    pub oos_pnl: Vec<f64>,
}

/// Errors from window execution.
#[derive(Debug, Error)]
pub enum ExecuteError {
    #[error("train slice of window {index} holds no observations")]
    EmptyTrainSlice { index: usize },
    #[error("test slice of window {index} holds no observations")]
    EmptyTestSlice { index: usize },
    #[error("evaluator failed on {half} slice of window {index}: {source}")]
    Evaluator {
        index: usize,
        half: &'static str,
        #[source]
        source: EvaluateError,
    },
}

/// Evaluate one window: the train slice in-sample, the test slice
/// out-of-sample.
///
/// The input series is never mutated; the only state the evaluator sees is
/// the slice it is given.
pub fn execute_window(
    window: &Window,
    series: &TimeSeries,
    evaluator: &dyn StrategyEvaluator,
) -> Result<WindowResult, ExecuteError> {
    let train = series.slice_range(window.train_start, window.train_end);
    let test = series.slice_range(window.test_start, window.test_end);

    if train.is_empty() {
        return Err(ExecuteError::EmptyTrainSlice {
            index: window.index,
        });
    }
    if test.is_empty() {
        return Err(ExecuteError::EmptyTestSlice {
            index: window.index,
        });
    }

    let train_eval = evaluator
        .evaluate(&train)
        .map_err(|source| ExecuteError::Evaluator {
            index: window.index,
            half: "train",
            source,
        })?;
    let oos_eval = evaluator
        .evaluate(&test)
        .map_err(|source| ExecuteError::Evaluator {
            index: window.index,
            half: "test",
            source,
        })?;

    Ok(WindowResult {
        window: window.clone(),
        train_performance: train_eval.performance,
        oos_performance: oos_eval.performance,
        oos_pnl: oos_eval.pnl,
    })
}

// ─── Reference evaluator ─────────────────────────────────────────────

/// Buy-and-hold reference evaluator: performance of simply holding the asset
/// over the slice. Used by the CLI when no external engine is wired in, and
/// by tests as a deterministic stand-in.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuyAndHoldEvaluator;

impl StrategyEvaluator for BuyAndHoldEvaluator {
    fn evaluate(&self, slice: &TimeSeries) -> Result<Evaluation, EvaluateError> {
        if slice.is_empty() {
            return Err(EvaluateError::EmptySlice);
        }
        let returns = slice.simple_returns();
        let values = slice.values();
        let first = values[0];
        let last = values[values.len() - 1];
        let total_return = if first > 0.0 { (last - first) / first } else { 0.0 };

        Ok(Evaluation {
            performance: Performance {
                sharpe: annualized_sharpe(&returns),
                total_return,
            },
            pnl: returns,
        })
    }
}

/// Annualized Sharpe ratio from daily returns.
///
/// Zero-variance returns yield Sharpe = 0 by convention (never NaN or
/// infinity); fewer than 2 observations also yield 0.
pub fn annualized_sharpe(returns: &[f64]) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }
    let mean = returns.iter().sum::<f64>() / returns.len() as f64;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>()
        / (returns.len() - 1) as f64;
    let std = variance.sqrt();
    if std < 1e-15 {
        return 0.0;
    }
    (mean / std) * (252.0_f64).sqrt()
}
