//! Time series — ordered (date, value) observations with validated construction.
//!
//! `TimeSeries` is the single data carrier for prices and derived PnL/return
//! series. Construction enforces strictly increasing timestamps and finite
//! values; everything downstream can assume both.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from time-series construction.
#[derive(Debug, Error)]
pub enum SeriesError {
    #[error("timestamps must be strictly increasing: {prev} then {next} at index {index}")]
    OutOfOrder {
        index: usize,
        prev: NaiveDate,
        next: NaiveDate,
    },
    #[error("non-finite value {value} at index {index}")]
    NonFiniteValue { index: usize, value: f64 },
}

/// An ordered sequence of (date, value) observations.
///
/// Invariants (enforced at construction):
/// - dates strictly increasing, no duplicates
/// - all values finite
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    points: Vec<(NaiveDate, f64)>,
}

impl TimeSeries {
    /// Build a series from (date, value) pairs, validating the invariants.
    pub fn new(points: Vec<(NaiveDate, f64)>) -> Result<Self, SeriesError> {
        for (i, &(date, value)) in points.iter().enumerate() {
            if !value.is_finite() {
                return Err(SeriesError::NonFiniteValue { index: i, value });
            }
            if i > 0 && points[i - 1].0 >= date {
                return Err(SeriesError::OutOfOrder {
                    index: i,
                    prev: points[i - 1].0,
                    next: date,
                });
            }
        }
        Ok(Self { points })
    }

    /// Build a series from parallel date/value vectors.
    pub fn from_parts(dates: Vec<NaiveDate>, values: Vec<f64>) -> Result<Self, SeriesError> {
        Self::new(dates.into_iter().zip(values).collect())
    }

    /// Internal constructor for slices of an already-validated series.
    fn from_validated(points: Vec<(NaiveDate, f64)>) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[(NaiveDate, f64)] {
        &self.points
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.first().map(|&(d, _)| d)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|&(d, _)| d)
    }

    /// All observation dates, in order.
    pub fn dates(&self) -> Vec<NaiveDate> {
        self.points.iter().map(|&(d, _)| d).collect()
    }

    /// All observation values, in order.
    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|&(_, v)| v).collect()
    }

    /// Observations falling in the half-open date range `[start, end)`.
    pub fn slice_range(&self, start: NaiveDate, end: NaiveDate) -> TimeSeries {
        let lo = self.points.partition_point(|&(d, _)| d < start);
        let hi = self.points.partition_point(|&(d, _)| d < end);
        TimeSeries::from_validated(self.points[lo..hi].to_vec())
    }

    /// Number of observations in the half-open date range `[start, end)`.
    pub fn count_in_range(&self, start: NaiveDate, end: NaiveDate) -> usize {
        let lo = self.points.partition_point(|&(d, _)| d < start);
        let hi = self.points.partition_point(|&(d, _)| d < end);
        hi - lo
    }

    /// Simple (arithmetic) returns between consecutive observations.
    ///
    /// A non-positive predecessor value yields a 0.0 return for that step.
    pub fn simple_returns(&self) -> Vec<f64> {
        if self.points.len() < 2 {
            return Vec::new();
        }
        self.points
            .windows(2)
            .map(|w| {
                if w[0].1 > 0.0 {
                    (w[1].1 - w[0].1) / w[0].1
                } else {
                    0.0
                }
            })
            .collect()
    }
}
