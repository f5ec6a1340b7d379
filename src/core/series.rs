//! Cleaned daily price series and its chronological partitions.

use chrono::NaiveDate;
use serde::Serialize;

use crate::error::{PipelineError, Result};
use crate::utils::stats::{describe, DescriptiveStats};

/// A single dated price observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimePoint {
    pub timestamp: NaiveDate,
    pub price: f64,
}

impl TimePoint {
    pub fn new(timestamp: NaiveDate, price: f64) -> Self {
        Self { timestamp, price }
    }
}

/// Ordered price observations with unique, strictly increasing dates.
///
/// A series is immutable once built. Partitioning never reorders points, so
/// the train partition always precedes the test partition in time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceSeries {
    points: Vec<TimePoint>,
}

/// Two contiguous, disjoint partitions of a series.
#[derive(Debug, Clone, PartialEq)]
pub struct Split {
    pub train: PriceSeries,
    pub test: PriceSeries,
}

impl PriceSeries {
    /// Build a series, checking date order and price validity.
    ///
    /// # Errors
    /// `TimestampError` if dates are not strictly increasing,
    /// `InvalidParameter` if a price is negative or not finite.
    pub fn new(points: Vec<TimePoint>) -> Result<Self> {
        for pair in points.windows(2) {
            if pair[1].timestamp <= pair[0].timestamp {
                return Err(PipelineError::TimestampError(format!(
                    "timestamps must be strictly increasing: {} follows {}",
                    pair[1].timestamp, pair[0].timestamp
                )));
            }
        }
        if let Some(bad) = points
            .iter()
            .find(|p| !p.price.is_finite() || p.price < 0.0)
        {
            return Err(PipelineError::InvalidParameter(format!(
                "price at {} must be finite and non-negative, got {}",
                bad.timestamp, bad.price
            )));
        }
        Ok(Self { points })
    }

    /// Build a series from parallel date and price vectors.
    pub fn from_parts(timestamps: Vec<NaiveDate>, prices: Vec<f64>) -> Result<Self> {
        if timestamps.len() != prices.len() {
            return Err(PipelineError::InvalidShape {
                expected: format!("{} prices", timestamps.len()),
                got: format!("{} prices", prices.len()),
            });
        }
        Self::new(
            timestamps
                .into_iter()
                .zip(prices)
                .map(|(t, p)| TimePoint::new(t, p))
                .collect(),
        )
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[TimePoint] {
        &self.points
    }

    pub fn timestamps(&self) -> Vec<NaiveDate> {
        self.points.iter().map(|p| p.timestamp).collect()
    }

    pub fn prices(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.price).collect()
    }

    pub fn first(&self) -> Option<&TimePoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&TimePoint> {
        self.points.last()
    }

    /// Summary statistics of the prices, `None` for an empty series.
    pub fn describe(&self) -> Option<DescriptiveStats> {
        describe(&self.prices())
    }

    /// Points dated on or after `start`.
    pub fn since(&self, start: NaiveDate) -> PriceSeries {
        Self {
            points: self
                .points
                .iter()
                .filter(|p| p.timestamp >= start)
                .copied()
                .collect(),
        }
    }

    /// Split so that the first `floor(len * train_fraction)` points train.
    ///
    /// # Errors
    /// `InvalidParameter` if the fraction is outside `(0, 1)`,
    /// `InsufficientData` if either side would be empty.
    pub fn split_fraction(&self, train_fraction: f64) -> Result<Split> {
        if !(train_fraction > 0.0 && train_fraction < 1.0) {
            return Err(PipelineError::InvalidParameter(format!(
                "train fraction must be in (0, 1), got {}",
                train_fraction
            )));
        }
        let train_len = (self.len() as f64 * train_fraction).floor() as usize;
        if train_len == 0 || train_len == self.len() {
            return Err(PipelineError::InsufficientData {
                needed: 2,
                got: self.len(),
            });
        }
        Ok(self.split_at(train_len))
    }

    /// Hold out the last `holdout` points as the test partition.
    ///
    /// # Errors
    /// `InsufficientData` unless at least one training point remains.
    pub fn split_holdout(&self, holdout: usize) -> Result<Split> {
        if holdout == 0 || self.len() <= holdout {
            return Err(PipelineError::InsufficientData {
                needed: holdout + 1,
                got: self.len(),
            });
        }
        Ok(self.split_at(self.len() - holdout))
    }

    fn split_at(&self, index: usize) -> Split {
        let (train, test) = self.points.split_at(index);
        Split {
            train: Self {
                points: train.to_vec(),
            },
            test: Self {
                points: test.to_vec(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn day(offset: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 1, 1).unwrap() + chrono::Duration::days(offset)
    }

    fn series(n: usize) -> PriceSeries {
        PriceSeries::new((0..n).map(|i| TimePoint::new(day(i as i64), 2.0 + i as f64)).collect())
            .unwrap()
    }

    #[test]
    fn rejects_unordered_timestamps() {
        let points = vec![TimePoint::new(day(1), 2.0), TimePoint::new(day(0), 3.0)];
        assert!(matches!(
            PriceSeries::new(points),
            Err(PipelineError::TimestampError(_))
        ));
    }

    #[test]
    fn rejects_duplicate_timestamps() {
        let points = vec![TimePoint::new(day(0), 2.0), TimePoint::new(day(0), 3.0)];
        assert!(PriceSeries::new(points).is_err());
    }

    #[test]
    fn rejects_negative_price() {
        let points = vec![TimePoint::new(day(0), -2.0)];
        assert!(matches!(
            PriceSeries::new(points),
            Err(PipelineError::InvalidParameter(_))
        ));
    }

    #[test]
    fn fraction_split_is_chronological_and_disjoint() {
        let s = series(120);
        let split = s.split_fraction(0.95).unwrap();

        assert_eq!(split.train.len(), 114);
        assert_eq!(split.test.len(), 6);
        assert!(split.train.last().unwrap().timestamp < split.test.first().unwrap().timestamp);
    }

    #[test]
    fn fraction_split_rejects_degenerate_sides() {
        let s = series(3);
        assert!(s.split_fraction(0.1).is_err());
        assert!(s.split_fraction(1.0).is_err());
        assert!(s.split_fraction(0.0).is_err());
    }

    #[test]
    fn holdout_split_keeps_tail() {
        let s = series(100);
        let split = s.split_holdout(60).unwrap();
        assert_eq!(split.train.len(), 40);
        assert_eq!(split.test.len(), 60);
        assert_relative_eq!(split.test.first().unwrap().price, 42.0);

        assert!(matches!(
            s.split_holdout(100),
            Err(PipelineError::InsufficientData { needed: 101, got: 100 })
        ));
    }

    #[test]
    fn since_filters_by_date() {
        let s = series(10);
        let recent = s.since(day(7));
        assert_eq!(recent.len(), 3);
        assert_eq!(recent.first().unwrap().timestamp, day(7));
    }

    #[test]
    fn describe_summarises_prices() {
        let stats = series(5).describe().unwrap();
        assert_eq!(stats.count, 5);
        assert_relative_eq!(stats.min, 2.0);
        assert_relative_eq!(stats.max, 6.0);
        assert_relative_eq!(stats.median, 4.0);
        assert!(PriceSeries::empty().describe().is_none());
    }
}
