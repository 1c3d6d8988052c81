//! StratGate Core — validation engine for trading-strategy evidence.
//!
//! This crate provides the time-windowed machinery that turns a price series
//! and a pluggable strategy evaluator into out-of-sample evidence:
//! - Validated time series and calendar-span arithmetic
//! - Train/test window generation without look-ahead
//! - Per-window execution against an injected evaluator
//! - Aggregation into summary statistics with defined numeric conventions
//! - Seeded synthetic price data for development and tests

pub mod aggregate;
pub mod executor;
pub mod series;
pub mod synthetic;
pub mod window;

pub use aggregate::{
    aggregate, compute_overfit_index, compute_stability_score, AggregateError, AggregateMetrics,
};
pub use executor::{
    annualized_sharpe, execute_window, BuyAndHoldEvaluator, EvaluateError, Evaluation,
    ExecuteError, Performance, StrategyEvaluator, WindowResult,
};
pub use series::{SeriesError, TimeSeries};
pub use synthetic::synthetic_daily_series;
pub use window::{split_windows, CalendarSpan, SplitError, Window, WindowConfig};
