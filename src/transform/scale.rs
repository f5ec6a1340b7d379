//! Robust scaling fitted on the training partition.

use serde::Serialize;

use crate::error::{PipelineError, Result};
use crate::utils::stats::quantile;

/// Median and interquartile range of the training prices.
///
/// `transform` maps `x` to `(x - center) / scale`; `inverse` undoes it. The
/// same state is applied to every partition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScalerState {
    pub center: f64,
    pub scale: f64,
}

impl ScalerState {
    /// Fit on training values only.
    ///
    /// A degenerate interquartile range falls back to a unit scale.
    pub fn fit(train: &[f64]) -> Result<Self> {
        if train.is_empty() {
            return Err(PipelineError::InsufficientData { needed: 1, got: 0 });
        }
        if train.iter().any(|x| !x.is_finite()) {
            return Err(PipelineError::InvalidParameter(
                "scaler input must be finite".to_string(),
            ));
        }

        let center = quantile(train, 0.5);
        let iqr = quantile(train, 0.75) - quantile(train, 0.25);
        let scale = if iqr < 1e-10 { 1.0 } else { iqr };

        Ok(Self { center, scale })
    }

    pub fn transform_value(&self, x: f64) -> f64 {
        (x - self.center) / self.scale
    }

    pub fn inverse_value(&self, scaled: f64) -> f64 {
        scaled * self.scale + self.center
    }

    pub fn transform(&self, values: &[f64]) -> Vec<f64> {
        values.iter().map(|&x| self.transform_value(x)).collect()
    }

    pub fn inverse(&self, scaled: &[f64]) -> Vec<f64> {
        scaled.iter().map(|&x| self.inverse_value(x)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn fit_uses_median_and_iqr() {
        let state = ScalerState::fit(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        assert_relative_eq!(state.center, 3.0);
        assert_relative_eq!(state.scale, 2.0);
    }

    #[test]
    fn resists_outliers() {
        let state = ScalerState::fit(&[1.0, 2.0, 3.0, 4.0, 500.0]).unwrap();
        assert_relative_eq!(state.center, 3.0);
        assert_relative_eq!(state.scale, 2.0);
    }

    #[test]
    fn constant_training_data_uses_unit_scale() {
        let state = ScalerState::fit(&[4.0; 10]).unwrap();
        assert_relative_eq!(state.center, 4.0);
        assert_relative_eq!(state.scale, 1.0);
        assert_relative_eq!(state.transform_value(5.0), 1.0);
    }

    #[test]
    fn same_state_applies_to_unseen_data() {
        let state = ScalerState::fit(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        let test = [7.0, 3.0];
        assert_eq!(state.transform(&test), vec![2.0, 0.0]);

        let back = state.inverse(&state.transform(&test));
        for (a, b) in back.iter().zip(&test) {
            assert_relative_eq!(a, b, epsilon = 1e-12);
        }
    }

    #[test]
    fn empty_or_non_finite_training_data() {
        assert!(matches!(
            ScalerState::fit(&[]),
            Err(PipelineError::InsufficientData { .. })
        ));
        assert!(ScalerState::fit(&[1.0, f64::NAN]).is_err());
    }
}
