//! Window splitting — calendar-relative train/test window generation.
//!
//! Splits an observed date range into non-overlapping train/test window pairs.
//! Spans are calendar offsets (years/months/days) resolved against the dates
//! actually present, so "3 years of training" means 3 calendar years of
//! whatever bars exist, never 3 × 252 raw entries.
//!
//! Invariants:
//! - `train_end == test_start` for every window
//! - no window's test range overlaps another window's test range
//! - every emitted window satisfies the configured minimum bar counts
//! - identical inputs always produce an identical window list

use chrono::{Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ─── Calendar spans ──────────────────────────────────────────────────

/// A calendar-relative offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalendarSpan {
    Years(u32),
    Months(u32),
    Days(u32),
}

impl CalendarSpan {
    /// Advance a date by this span, clamping end-of-month overflow the way
    /// chrono does (Jan 31 + 1 month = Feb 28/29).
    pub fn add_to(&self, date: NaiveDate) -> NaiveDate {
        let result = match *self {
            CalendarSpan::Years(n) => date.checked_add_months(Months::new(n * 12)),
            CalendarSpan::Months(n) => date.checked_add_months(Months::new(n)),
            CalendarSpan::Days(n) => date.checked_add_days(Days::new(n as u64)),
        };
        result.unwrap_or(NaiveDate::MAX)
    }

    /// True when advancing by this span does not move the date at all.
    pub fn is_zero(&self) -> bool {
        matches!(
            *self,
            CalendarSpan::Years(0) | CalendarSpan::Months(0) | CalendarSpan::Days(0)
        )
    }
}

impl std::fmt::Display for CalendarSpan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            CalendarSpan::Years(n) => write!(f, "{n}Y"),
            CalendarSpan::Months(n) => write!(f, "{n}M"),
            CalendarSpan::Days(n) => write!(f, "{n}D"),
        }
    }
}

// ─── Configuration ───────────────────────────────────────────────────

/// Configuration for train/test window generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowConfig {
    /// Calendar length of each training range (default 3 years).
    #[serde(default = "default_training_span")]
    pub training_span: CalendarSpan,
    /// Calendar length of each testing range (default 1 year).
    #[serde(default = "default_testing_span")]
    pub testing_span: CalendarSpan,
    /// Calendar distance between consecutive window anchors (default 1 year).
    #[serde(default = "default_step_span")]
    pub step_span: CalendarSpan,
    /// Minimum observations required in each training range (default 252).
    #[serde(default = "default_min_train_bars")]
    pub min_train_bars: usize,
    /// Minimum observations required in each testing range (default 63).
    #[serde(default = "default_min_test_bars")]
    pub min_test_bars: usize,
    /// Whether a final window whose test range runs past the last observation
    /// may still be emitted (default false).
    #[serde(default)]
    pub allow_partial_final: bool,
}

fn default_training_span() -> CalendarSpan {
    CalendarSpan::Years(3)
}
fn default_testing_span() -> CalendarSpan {
    CalendarSpan::Years(1)
}
fn default_step_span() -> CalendarSpan {
    CalendarSpan::Years(1)
}
fn default_min_train_bars() -> usize {
    252
}
fn default_min_test_bars() -> usize {
    63
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            training_span: default_training_span(),
            testing_span: default_testing_span(),
            step_span: default_step_span(),
            min_train_bars: default_min_train_bars(),
            min_test_bars: default_min_test_bars(),
            allow_partial_final: false,
        }
    }
}

// ─── Window ──────────────────────────────────────────────────────────

/// One train/test window pair. Ranges are half-open: `[start, end)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    pub index: usize,
    /// Training range start (inclusive).
    pub train_start: NaiveDate,
    /// Training range end (exclusive). Always equal to `test_start`.
    pub train_end: NaiveDate,
    /// Testing range start (inclusive).
    pub test_start: NaiveDate,
    /// Testing range end (exclusive).
    pub test_end: NaiveDate,
    /// Observations in the training range.
    pub train_bars: usize,
    /// Observations in the testing range.
    pub test_bars: usize,
    /// Whether the test range extends past the last available observation.
    pub partial: bool,
}

/// Errors from window generation.
#[derive(Debug, Error)]
pub enum SplitError {
    #[error(
        "insufficient data: span {first}..{last} cannot form a {training}+{testing} window \
         with at least {min_train_bars}/{min_test_bars} bars"
    )]
    InsufficientData {
        first: NaiveDate,
        last: NaiveDate,
        training: CalendarSpan,
        testing: CalendarSpan,
        min_train_bars: usize,
        min_test_bars: usize,
    },
    #[error("no timestamps supplied")]
    EmptyInput,
    #[error("step span {0} does not advance the anchor; window generation would not terminate")]
    ZeroStep(CalendarSpan),
}

// ─── Generation ──────────────────────────────────────────────────────

/// Generate train/test windows over an ordered timestamp sequence.
///
/// Starting at the first timestamp, each anchor produces
/// `train = [anchor, anchor + training_span)` and
/// `test = [train_end, train_end + testing_span)`; the anchor then advances by
/// `step_span`. Generation stops at the first window whose train or test
/// slice holds zero observations. A window below the minimum bar counts, or
/// whose test range would overlap the previously emitted window's test range
/// (step shorter than the testing span), is rejected and generation
/// continues. A partial final window (test range past the last observation)
/// is emitted only when `allow_partial_final` is set and the minimums still
/// hold.
///
/// The caller guarantees `timestamps` is strictly increasing (the `TimeSeries`
/// invariant).
pub fn split_windows(
    timestamps: &[NaiveDate],
    config: &WindowConfig,
) -> Result<Vec<Window>, SplitError> {
    let (&first, &last) = match (timestamps.first(), timestamps.last()) {
        (Some(f), Some(l)) => (f, l),
        _ => return Err(SplitError::EmptyInput),
    };
    if config.step_span.is_zero() {
        return Err(SplitError::ZeroStep(config.step_span));
    }

    let mut windows = Vec::new();
    let mut anchor = first;
    let mut index = 0;
    let mut last_test_end: Option<NaiveDate> = None;

    loop {
        let train_end = config.training_span.add_to(anchor);
        let test_end = config.testing_span.add_to(train_end);

        let train_bars = count_in_range(timestamps, anchor, train_end);
        let test_bars = count_in_range(timestamps, train_end, test_end);
        if train_bars == 0 || test_bars == 0 {
            break;
        }

        // Partial: the test range claims dates beyond the last observation.
        let partial = test_end > last + Days::new(1);
        let meets_minimums =
            train_bars >= config.min_train_bars && test_bars >= config.min_test_bars;
        // Test ranges must stay disjoint even when the step is shorter than
        // the testing span.
        let disjoint = last_test_end.map_or(true, |prev_end| train_end >= prev_end);

        if partial {
            if config.allow_partial_final && meets_minimums && disjoint {
                windows.push(Window {
                    index,
                    train_start: anchor,
                    train_end,
                    test_start: train_end,
                    test_end,
                    train_bars,
                    test_bars,
                    partial,
                });
            }
            break;
        }

        if meets_minimums && disjoint {
            windows.push(Window {
                index,
                train_start: anchor,
                train_end,
                test_start: train_end,
                test_end,
                train_bars,
                test_bars,
                partial,
            });
            index += 1;
            last_test_end = Some(test_end);
        }

        let next = config.step_span.add_to(anchor);
        if next <= anchor {
            return Err(SplitError::ZeroStep(config.step_span));
        }
        anchor = next;
    }

    if windows.is_empty() {
        return Err(SplitError::InsufficientData {
            first,
            last,
            training: config.training_span,
            testing: config.testing_span,
            min_train_bars: config.min_train_bars,
            min_test_bars: config.min_test_bars,
        });
    }

    Ok(windows)
}

/// Observations in the half-open range `[start, end)` of a sorted slice.
fn count_in_range(timestamps: &[NaiveDate], start: NaiveDate, end: NaiveDate) -> usize {
    let lo = timestamps.partition_point(|&d| d < start);
    let hi = timestamps.partition_point(|&d| d < end);
    hi - lo
}
