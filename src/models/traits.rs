//! Forecaster trait defining the common interface for forecasting models.

use crate::core::Forecast;
use crate::error::Result;

/// Common interface for models that extend a univariate series.
///
/// This trait is object-safe and can be used with `Box<dyn Forecaster>`.
pub trait Forecaster {
    /// Fit the model to a series of observations.
    fn fit(&mut self, series: &[f64]) -> Result<()>;

    /// Predict the `horizon` values following the fitted series.
    fn predict(&self, horizon: usize) -> Result<Forecast>;

    /// In-sample one-step predictions on the model's working scale.
    fn fitted_values(&self) -> Option<&[f64]>;

    /// In-sample residuals on the model's working scale.
    fn residuals(&self) -> Option<&[f64]>;

    fn name(&self) -> &str;

    /// Check if the model has been fitted.
    fn is_fitted(&self) -> bool {
        self.fitted_values().is_some()
    }
}
