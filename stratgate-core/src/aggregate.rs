//! Walk-forward aggregation — reduce window results into summary statistics.
//!
//! Numeric conventions (these are conventions, not errors):
//! - overfit index with non-positive mean OOS Sharpe → +infinity
//! - stability score with zero-variance OOS returns → 0.0
//!
//! Malformed input (non-finite member metrics, empty result list) surfaces as
//! an error and is never silently defaulted.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::executor::WindowResult;

/// Summary statistics over an ordered list of window results.
///
/// Pure function of the input list: recomputing from the same list yields a
/// bit-identical value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateMetrics {
    pub window_count: usize,
    pub mean_train_sharpe: f64,
    pub mean_oos_sharpe: f64,
    pub median_oos_sharpe: f64,
    pub std_oos_sharpe: f64,
    pub mean_oos_return: f64,
    /// Signal-to-noise of OOS returns across windows: mean / std, 0.0 when
    /// the std is zero.
    pub stability_score: f64,
    /// Fraction of windows with strictly positive OOS return.
    pub win_rate: f64,
    pub positive_windows: usize,
    pub negative_windows: usize,
    /// mean train Sharpe / mean OOS Sharpe; +infinity when the denominator is
    /// non-positive.
    #[serde(with = "non_finite_serde")]
    pub overfit_index: f64,
}

/// Errors from aggregation.
#[derive(Debug, Error)]
pub enum AggregateError {
    #[error("cannot aggregate an empty window-result list")]
    Empty,
    #[error("window {index} carries a non-finite {metric}: {value}")]
    InvalidMetric {
        index: usize,
        metric: &'static str,
        value: f64,
    },
}

/// Reduce a chronologically ordered list of window results.
///
/// The caller guarantees chronological order; this function does not re-sort.
pub fn aggregate(results: &[WindowResult]) -> Result<AggregateMetrics, AggregateError> {
    if results.is_empty() {
        return Err(AggregateError::Empty);
    }
    for (i, r) in results.iter().enumerate() {
        check_finite(i, "train Sharpe", r.train_performance.sharpe)?;
        check_finite(i, "OOS Sharpe", r.oos_performance.sharpe)?;
        check_finite(i, "OOS return", r.oos_performance.total_return)?;
    }

    let train_sharpes: Vec<f64> = results.iter().map(|r| r.train_performance.sharpe).collect();
    let oos_sharpes: Vec<f64> = results.iter().map(|r| r.oos_performance.sharpe).collect();
    let oos_returns: Vec<f64> = results
        .iter()
        .map(|r| r.oos_performance.total_return)
        .collect();

    let mean_train_sharpe = mean(&train_sharpes);
    let mean_oos_sharpe = mean(&oos_sharpes);
    let positive_windows = oos_returns.iter().filter(|&&r| r > 0.0).count();

    Ok(AggregateMetrics {
        window_count: results.len(),
        mean_train_sharpe,
        mean_oos_sharpe,
        median_oos_sharpe: median(&oos_sharpes),
        std_oos_sharpe: std_dev(&oos_sharpes),
        mean_oos_return: mean(&oos_returns),
        stability_score: compute_stability_score(&oos_returns),
        win_rate: positive_windows as f64 / results.len() as f64,
        positive_windows,
        negative_windows: results.len() - positive_windows,
        overfit_index: compute_overfit_index(mean_train_sharpe, mean_oos_sharpe),
    })
}

fn check_finite(index: usize, metric: &'static str, value: f64) -> Result<(), AggregateError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(AggregateError::InvalidMetric {
            index,
            metric,
            value,
        })
    }
}

/// Overfit index: mean in-sample Sharpe over mean out-of-sample Sharpe.
///
/// A non-positive OOS mean signals maximal overfitting risk and maps to
/// +infinity rather than an error.
pub fn compute_overfit_index(mean_train_sharpe: f64, mean_oos_sharpe: f64) -> f64 {
    if mean_oos_sharpe <= 0.0 {
        f64::INFINITY
    } else {
        mean_train_sharpe / mean_oos_sharpe
    }
}

/// Stability score: mean OOS return over its standard deviation.
///
/// A zero std (flat or single-sample returns) is treated as neutral: 0.0.
pub fn compute_stability_score(oos_returns: &[f64]) -> f64 {
    let std = std_dev(oos_returns);
    if std < 1e-15 {
        return 0.0;
    }
    mean(oos_returns) / std
}

// ─── Statistics helpers ──────────────────────────────────────────────

pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub(crate) fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let variance =
        values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

pub(crate) fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let n = sorted.len();
    if n % 2 == 0 {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    } else {
        sorted[n / 2]
    }
}

// ─── Non-finite float serde ──────────────────────────────────────────

/// JSON cannot carry infinities; the overfit index legitimately reaches
/// +infinity by convention. Encode non-finite values as the strings "inf" /
/// "-inf" / "nan" and accept either representation on read.
pub mod non_finite_serde {
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Finite(f64),
        Special(String),
    }

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            serializer.serialize_f64(*value)
        } else if value.is_nan() {
            serializer.serialize_str("nan")
        } else if *value > 0.0 {
            serializer.serialize_str("inf")
        } else {
            serializer.serialize_str("-inf")
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Finite(v) => Ok(v),
            Repr::Special(s) => match s.as_str() {
                "inf" => Ok(f64::INFINITY),
                "-inf" => Ok(f64::NEG_INFINITY),
                "nan" => Ok(f64::NAN),
                other => Err(serde::de::Error::custom(format!(
                    "unrecognized float encoding '{other}'"
                ))),
            },
        }
    }
}
