use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::diff::{difference, integrate, seasonal_difference, seasonal_integrate};
use crate::core::Forecast;
use crate::error::{PipelineError, Result};
use crate::models::Forecaster;
use crate::utils::optimization::{nelder_mead, NelderMeadConfig};

/// Non-seasonal order `(p, d, q)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArimaOrder {
    pub p: usize,
    pub d: usize,
    pub q: usize,
}

impl ArimaOrder {
    pub fn new(p: usize, d: usize, q: usize) -> Self {
        Self { p, d, q }
    }
}

/// Seasonal order `(P, D, Q, s)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonalOrder {
    pub p: usize,
    pub d: usize,
    pub q: usize,
    pub period: usize,
}

impl SeasonalOrder {
    pub fn new(p: usize, d: usize, q: usize, period: usize) -> Self {
        Self { p, d, q, period }
    }

    /// No seasonal component.
    pub fn none() -> Self {
        Self::new(0, 0, 0, 1)
    }
}

/// Coefficients split into the four factor polynomials.
#[derive(Debug, Clone, Default, PartialEq)]
struct Coefficients {
    ar: Vec<f64>,
    seasonal_ar: Vec<f64>,
    ma: Vec<f64>,
    seasonal_ma: Vec<f64>,
}

impl Coefficients {
    fn from_params(params: &[f64], order: ArimaOrder, seasonal: SeasonalOrder) -> Self {
        let (ar, rest) = params.split_at(order.p);
        let (seasonal_ar, rest) = rest.split_at(seasonal.p);
        let (ma, seasonal_ma) = rest.split_at(order.q);
        Self {
            ar: ar.to_vec(),
            seasonal_ar: seasonal_ar.to_vec(),
            ma: ma.to_vec(),
            seasonal_ma: seasonal_ma.to_vec(),
        }
    }

    /// AR recursion weights `a_k` such that `w_t = sum a_k w_{t-k} + ...`.
    fn expanded_ar(&self, period: usize) -> Vec<f64> {
        let nonseasonal = lag_polynomial(&self.ar, 1, -1.0);
        let seasonal = lag_polynomial(&self.seasonal_ar, period, -1.0);
        multiply(&nonseasonal, &seasonal)
            .iter()
            .skip(1)
            .map(|c| -c)
            .collect()
    }

    /// MA recursion weights `b_k` such that `w_t = ... + e_t + sum b_k e_{t-k}`.
    fn expanded_ma(&self, period: usize) -> Vec<f64> {
        let nonseasonal = lag_polynomial(&self.ma, 1, 1.0);
        let seasonal = lag_polynomial(&self.seasonal_ma, period, 1.0);
        multiply(&nonseasonal, &seasonal).into_iter().skip(1).collect()
    }
}

/// `1 + sign * (c_1 L^lag + c_2 L^{2 lag} + ...)` as a dense coefficient vector.
fn lag_polynomial(coefficients: &[f64], lag: usize, sign: f64) -> Vec<f64> {
    let mut poly = vec![0.0; coefficients.len() * lag + 1];
    poly[0] = 1.0;
    for (i, c) in coefficients.iter().enumerate() {
        poly[(i + 1) * lag] = sign * c;
    }
    poly
}

fn multiply(a: &[f64], b: &[f64]) -> Vec<f64> {
    let mut product = vec![0.0; a.len() + b.len() - 1];
    for (i, x) in a.iter().enumerate() {
        for (j, y) in b.iter().enumerate() {
            product[i + j] += x * y;
        }
    }
    product
}

/// One-step predictions and residuals of the ARMA recursion over `w`.
///
/// Residuals before the first full AR lag are zero.
fn arma_filter(w: &[f64], ar: &[f64], ma: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let start = ar.len();
    let mut fitted = vec![f64::NAN; w.len()];
    let mut residuals = vec![0.0; w.len()];
    for t in start..w.len() {
        let pred = one_step(w, &residuals, t, ar, ma);
        fitted[t] = pred;
        residuals[t] = w[t] - pred;
    }
    (fitted, residuals)
}

fn one_step(w: &[f64], residuals: &[f64], t: usize, ar: &[f64], ma: &[f64]) -> f64 {
    let ar_part: f64 = ar
        .iter()
        .enumerate()
        .filter(|(k, _)| t > *k)
        .map(|(k, a)| a * w[t - 1 - k])
        .sum();
    let ma_part: f64 = ma
        .iter()
        .enumerate()
        .filter(|(k, _)| t > *k)
        .map(|(k, b)| b * residuals[t - 1 - k])
        .sum();
    ar_part + ma_part
}

/// Seasonal ARIMA forecaster without intercept.
#[derive(Debug, Clone)]
pub struct SARIMA {
    order: ArimaOrder,
    seasonal: SeasonalOrder,
    solver: NelderMeadConfig,
    coefficients: Coefficients,
    /// Input series as passed to `fit`.
    original: Option<Vec<f64>>,
    /// After non-seasonal differencing, before seasonal differencing.
    integrated_once: Option<Vec<f64>>,
    /// Fully differenced series the ARMA part is fitted on.
    differenced: Option<Vec<f64>>,
    fitted: Option<Vec<f64>>,
    residuals: Option<Vec<f64>>,
    residual_variance: Option<f64>,
    aic: Option<f64>,
    bic: Option<f64>,
    iterations: usize,
}

impl SARIMA {
    pub fn new(order: ArimaOrder, seasonal: SeasonalOrder) -> Self {
        Self {
            order,
            seasonal,
            solver: NelderMeadConfig {
                max_iter: 2000,
                tolerance: 1e-8,
                ..Default::default()
            },
            coefficients: Coefficients::default(),
            original: None,
            integrated_once: None,
            differenced: None,
            fitted: None,
            residuals: None,
            residual_variance: None,
            aic: None,
            bic: None,
            iterations: 0,
        }
    }

    /// Set the optimizer's iteration budget and tolerance.
    pub fn with_solver(mut self, max_iterations: usize, tolerance: f64) -> Self {
        self.solver.max_iter = max_iterations;
        self.solver.tolerance = tolerance;
        self
    }

    pub fn order(&self) -> ArimaOrder {
        self.order
    }

    pub fn seasonal_order(&self) -> SeasonalOrder {
        self.seasonal
    }

    pub fn ar_coefficients(&self) -> &[f64] {
        &self.coefficients.ar
    }

    pub fn seasonal_ar_coefficients(&self) -> &[f64] {
        &self.coefficients.seasonal_ar
    }

    pub fn ma_coefficients(&self) -> &[f64] {
        &self.coefficients.ma
    }

    pub fn seasonal_ma_coefficients(&self) -> &[f64] {
        &self.coefficients.seasonal_ma
    }

    /// Mean squared one-step residual.
    pub fn residual_variance(&self) -> Option<f64> {
        self.residual_variance
    }

    pub fn aic(&self) -> Option<f64> {
        self.aic
    }

    pub fn bic(&self) -> Option<f64> {
        self.bic
    }

    /// Optimizer iterations used by the last fit.
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    fn num_params(&self) -> usize {
        self.order.p + self.order.q + self.seasonal.p + self.seasonal.q
    }

    fn max_ar_lag(&self) -> usize {
        self.order.p + self.seasonal.p * self.seasonal.period
    }

    /// Mean conditional squared residual for a parameter vector.
    fn css(&self, w: &[f64], params: &[f64]) -> f64 {
        let coefficients = Coefficients::from_params(params, self.order, self.seasonal);
        let ar = coefficients.expanded_ar(self.seasonal.period);
        let ma = coefficients.expanded_ma(self.seasonal.period);
        let (_, residuals) = arma_filter(w, &ar, &ma);
        let effective = &residuals[ar.len()..];
        effective.iter().map(|e| e * e).sum::<f64>() / effective.len() as f64
    }

    fn estimate(&mut self, w: &[f64]) -> Result<()> {
        let n_params = self.num_params();
        if n_params == 0 {
            self.coefficients = Coefficients::default();
            self.iterations = 0;
            return Ok(());
        }

        let initial: Vec<f64> = (0..n_params)
            .map(|i| 0.1 / (i % 2 + 1) as f64)
            .collect();
        let bounds = vec![(-0.99, 0.99); n_params];

        let result = nelder_mead(
            |params| self.css(w, params),
            &initial,
            Some(&bounds),
            self.solver.clone(),
        )
        .require_convergence()?;

        debug!(
            iterations = result.iterations,
            criterion = result.optimal_value,
            "SARIMA optimizer converged"
        );
        self.iterations = result.iterations;
        self.coefficients = Coefficients::from_params(&result.optimal_point, self.order, self.seasonal);
        Ok(())
    }

    fn compute_diagnostics(&mut self, w: &[f64]) {
        let ar = self.coefficients.expanded_ar(self.seasonal.period);
        let ma = self.coefficients.expanded_ma(self.seasonal.period);
        let (fitted, residuals) = arma_filter(w, &ar, &ma);

        let effective = &residuals[ar.len()..];
        let n_eff = effective.len() as f64;
        let variance = effective.iter().map(|e| e * e).sum::<f64>() / n_eff;
        // Parameters plus the innovation variance.
        let k = (self.num_params() + 1) as f64;
        let ll = -0.5 * n_eff * (1.0 + variance.ln() + (2.0 * std::f64::consts::PI).ln());

        self.residual_variance = Some(variance);
        self.aic = Some(-2.0 * ll + 2.0 * k);
        self.bic = Some(-2.0 * ll + k * n_eff.ln());
        self.fitted = Some(fitted);
        self.residuals = Some(residuals);
    }
}

impl Default for SARIMA {
    fn default() -> Self {
        Self::new(ArimaOrder::new(1, 1, 1), SeasonalOrder::new(1, 0, 0, 1))
    }
}

impl Forecaster for SARIMA {
    fn fit(&mut self, series: &[f64]) -> Result<()> {
        if self.seasonal.period == 0 {
            return Err(PipelineError::InvalidParameter(
                "seasonal period must be positive".to_string(),
            ));
        }
        let lost = self.order.d + self.seasonal.d * self.seasonal.period;
        let needed = lost + self.max_ar_lag() + self.num_params() + 2;
        if series.len() < needed {
            return Err(PipelineError::InsufficientData {
                needed,
                got: series.len(),
            });
        }
        if series.iter().any(|x| !x.is_finite()) {
            return Err(PipelineError::InvalidParameter(
                "series contains non-finite values".to_string(),
            ));
        }

        let integrated_once = difference(series, self.order.d);
        let w = seasonal_difference(&integrated_once, self.seasonal.d, self.seasonal.period);

        self.estimate(&w)?;
        self.compute_diagnostics(&w);

        info!(
            ar = ?self.coefficients.ar,
            seasonal_ar = ?self.coefficients.seasonal_ar,
            ma = ?self.coefficients.ma,
            seasonal_ma = ?self.coefficients.seasonal_ma,
            sigma2 = self.residual_variance.unwrap_or(f64::NAN),
            aic = self.aic.unwrap_or(f64::NAN),
            "SARIMA fitted"
        );

        self.original = Some(series.to_vec());
        self.integrated_once = Some(integrated_once);
        self.differenced = Some(w);
        Ok(())
    }

    fn predict(&self, horizon: usize) -> Result<Forecast> {
        let original = self.original.as_ref().ok_or(PipelineError::FitRequired)?;
        let integrated_once = self.integrated_once.as_ref().ok_or(PipelineError::FitRequired)?;
        let w = self.differenced.as_ref().ok_or(PipelineError::FitRequired)?;
        let residuals = self.residuals.as_ref().ok_or(PipelineError::FitRequired)?;

        if horizon == 0 {
            return Ok(Forecast::new());
        }

        let ar = self.coefficients.expanded_ar(self.seasonal.period);
        let ma = self.coefficients.expanded_ma(self.seasonal.period);

        let mut extended = w.clone();
        let mut extended_residuals = residuals.clone();
        for _ in 0..horizon {
            let t = extended.len();
            let pred = one_step(&extended, &extended_residuals, t, &ar, &ma);
            extended.push(pred);
            // Future shocks have zero expectation.
            extended_residuals.push(0.0);
        }
        let ahead = &extended[w.len()..];

        let seasonal_undone =
            seasonal_integrate(ahead, integrated_once, self.seasonal.d, self.seasonal.period);
        let values = integrate(&seasonal_undone, original, self.order.d);

        Ok(Forecast::from_values(values))
    }

    fn fitted_values(&self) -> Option<&[f64]> {
        self.fitted.as_deref()
    }

    fn residuals(&self) -> Option<&[f64]> {
        self.residuals.as_deref()
    }

    fn name(&self) -> &str {
        "SARIMA"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rand_distr::{Distribution, Normal};

    fn ar1_series(phi: f64, n: usize, seed: u64) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        let noise = Normal::new(0.0, 1.0).unwrap();
        let mut values = vec![0.0];
        for t in 1..n {
            values.push(phi * values[t - 1] + noise.sample(&mut rng));
        }
        values
    }

    fn random_walk(steps: &[f64]) -> Vec<f64> {
        steps
            .iter()
            .scan(100.0, |level, s| {
                *level += s;
                Some(*level)
            })
            .collect()
    }

    #[test]
    fn polynomial_expansion_multiplies_factors() {
        let c = Coefficients {
            ar: vec![0.5],
            seasonal_ar: vec![0.4],
            ma: vec![0.3],
            seasonal_ma: vec![],
        };
        // (1 - 0.5L)(1 - 0.4L^2) = 1 - 0.5L - 0.4L^2 + 0.2L^3
        let ar = c.expanded_ar(2);
        assert_eq!(ar.len(), 3);
        assert_relative_eq!(ar[0], 0.5);
        assert_relative_eq!(ar[1], 0.4);
        assert_relative_eq!(ar[2], -0.2);

        assert_eq!(c.expanded_ma(2), vec![0.3]);
    }

    #[test]
    fn recovers_ar1_coefficient() {
        let series = ar1_series(0.6, 400, 7);
        let mut model = SARIMA::new(ArimaOrder::new(1, 0, 0), SeasonalOrder::none());
        model.fit(&series).unwrap();

        assert_relative_eq!(model.ar_coefficients()[0], 0.6, epsilon = 0.1);
        assert!(model.residual_variance().unwrap() > 0.5);
        assert!(model.aic().unwrap() < model.bic().unwrap());
    }

    #[test]
    fn default_orders_fit_and_forecast() {
        let series = random_walk(&ar1_series(0.3, 200, 11));
        let mut model = SARIMA::default();
        model.fit(&series).unwrap();

        assert_eq!(model.ar_coefficients().len(), 1);
        assert_eq!(model.seasonal_ar_coefficients().len(), 1);
        assert_eq!(model.ma_coefficients().len(), 1);
        assert!(model.is_fitted());

        let forecast = model.predict(12).unwrap();
        assert_eq!(forecast.horizon(), 12);
        assert!(forecast.values().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn forecast_of_pure_ar_decays_geometrically() {
        let series = ar1_series(0.6, 400, 3);
        let mut model = SARIMA::new(ArimaOrder::new(1, 0, 0), SeasonalOrder::none());
        model.fit(&series).unwrap();

        let phi = model.ar_coefficients()[0];
        let last = *series.last().unwrap();
        let forecast = model.predict(3).unwrap();

        assert_relative_eq!(forecast.values()[0], phi * last, epsilon = 1e-12);
        assert_relative_eq!(forecast.values()[2], phi.powi(3) * last, epsilon = 1e-12);
    }

    #[test]
    fn differenced_random_walk_forecast_is_level_continuation() {
        let walk = random_walk(&ar1_series(0.0, 150, 5));

        let mut model = SARIMA::new(ArimaOrder::new(0, 1, 1), SeasonalOrder::none());
        model.fit(&walk).unwrap();
        let forecast = model.predict(5).unwrap();

        // Beyond the first step an MA(1) difference forecast is zero, so the level is flat.
        assert_relative_eq!(forecast.values()[1], forecast.values()[4], epsilon = 1e-12);
    }

    #[test]
    fn exhausted_budget_is_non_convergence() {
        let series = ar1_series(0.3, 200, 11);
        let mut model = SARIMA::default().with_solver(2, 1e-14);

        assert!(matches!(
            model.fit(&series),
            Err(PipelineError::NonConvergence { iterations: 2, .. })
        ));
        assert!(!model.is_fitted());
    }

    #[test]
    fn predict_requires_fit() {
        let model = SARIMA::default();
        assert!(matches!(model.predict(3), Err(PipelineError::FitRequired)));
    }

    #[test]
    fn short_series_is_insufficient() {
        let mut model = SARIMA::default();
        assert!(matches!(
            model.fit(&[0.1, 0.2, 0.3]),
            Err(PipelineError::InsufficientData { .. })
        ));
    }
}
