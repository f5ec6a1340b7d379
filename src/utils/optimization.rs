//! Derivative-free minimisation used to estimate seasonal model coefficients.

use crate::error::{PipelineError, Result};

/// Outcome of a Nelder-Mead run.
#[derive(Debug, Clone)]
pub struct NelderMeadResult {
    /// Best vertex found.
    pub optimal_point: Vec<f64>,
    /// Objective value at `optimal_point`.
    pub optimal_value: f64,
    /// Iterations performed.
    pub iterations: usize,
    /// Whether the simplex met the tolerance before the iteration budget ran out.
    pub converged: bool,
}

impl NelderMeadResult {
    /// Turn a run that exhausted its budget into `NonConvergence`.
    pub fn require_convergence(self) -> Result<Self> {
        if self.converged {
            Ok(self)
        } else {
            Err(PipelineError::NonConvergence {
                iterations: self.iterations,
                criterion: self.optimal_value,
            })
        }
    }
}

/// Configuration for Nelder-Mead optimization.
#[derive(Debug, Clone)]
pub struct NelderMeadConfig {
    /// Iteration budget.
    pub max_iter: usize,
    /// Spread of objective values (and of the simplex) that counts as converged.
    pub tolerance: f64,
    /// Reflection coefficient.
    pub alpha: f64,
    /// Expansion coefficient.
    pub gamma: f64,
    /// Contraction coefficient.
    pub rho: f64,
    /// Shrink coefficient.
    pub sigma: f64,
    /// Relative step used to build the initial simplex.
    pub initial_step: f64,
}

impl Default for NelderMeadConfig {
    fn default() -> Self {
        Self {
            max_iter: 1000,
            tolerance: 1e-8,
            alpha: 1.0,
            gamma: 2.0,
            rho: 0.5,
            sigma: 0.5,
            initial_step: 0.05,
        }
    }
}

/// Vertices of the simplex together with their objective values.
struct Simplex<'a, F> {
    vertices: Vec<Vec<f64>>,
    values: Vec<f64>,
    objective: F,
    bounds: Option<&'a [(f64, f64)]>,
}

impl<'a, F> Simplex<'a, F>
where
    F: Fn(&[f64]) -> f64,
{
    fn around(initial: &[f64], step: f64, objective: F, bounds: Option<&'a [(f64, f64)]>) -> Self {
        let mut vertices = Vec::with_capacity(initial.len() + 1);
        vertices.push(clamp(initial.to_vec(), bounds));
        for i in 0..initial.len() {
            let mut vertex = initial.to_vec();
            vertex[i] += if initial[i].abs() > 1e-10 {
                step * initial[i].abs()
            } else {
                step
            };
            vertices.push(clamp(vertex, bounds));
        }
        let values = vertices.iter().map(|v| objective(v)).collect();
        Self {
            vertices,
            values,
            objective,
            bounds,
        }
    }

    fn evaluate(&self, point: Vec<f64>) -> (Vec<f64>, f64) {
        let point = clamp(point, self.bounds);
        let value = (self.objective)(&point);
        (point, value)
    }

    /// Indices of the best, second-worst and worst vertices.
    fn rank(&self) -> (usize, usize, usize) {
        let mut order: Vec<usize> = (0..self.values.len()).collect();
        order.sort_by(|&a, &b| self.values[a].total_cmp(&self.values[b]));
        let n = order.len() - 1;
        (order[0], order[n - 1], order[n])
    }

    fn centroid_without(&self, excluded: usize) -> Vec<f64> {
        let dim = self.vertices[0].len();
        let count = (self.vertices.len() - 1) as f64;
        let mut centroid = vec![0.0; dim];
        for (_, vertex) in self.vertices.iter().enumerate().filter(|(i, _)| *i != excluded) {
            for (c, x) in centroid.iter_mut().zip(vertex) {
                *c += x / count;
            }
        }
        centroid
    }

    fn replace(&mut self, index: usize, (point, value): (Vec<f64>, f64)) {
        self.vertices[index] = point;
        self.values[index] = value;
    }

    fn shrink_towards(&mut self, best: usize, sigma: f64) {
        let anchor = self.vertices[best].clone();
        for i in 0..self.vertices.len() {
            if i == best {
                continue;
            }
            let moved = lerp(&anchor, &self.vertices[i], sigma);
            let evaluated = self.evaluate(moved);
            self.replace(i, evaluated);
        }
    }

    fn diameter(&self, centroid: &[f64]) -> f64 {
        self.vertices
            .iter()
            .map(|v| euclidean_distance(v, centroid))
            .fold(0.0, f64::max)
    }
}

/// Minimise `objective` with the Nelder-Mead simplex method.
///
/// # Arguments
/// * `objective` - Function to minimise
/// * `initial` - Starting point
/// * `bounds` - Optional `(min, max)` box applied to every candidate
/// * `config` - Coefficients and stopping rule
///
/// # Example
/// ```
/// use spot_anomaly::utils::optimization::{nelder_mead, NelderMeadConfig};
///
/// let result = nelder_mead(
///     |x| (x[0] - 2.0).powi(2) + (x[1] - 3.0).powi(2),
///     &[0.0, 0.0],
///     None,
///     NelderMeadConfig::default(),
/// );
///
/// assert!(result.converged);
/// assert!((result.optimal_point[0] - 2.0).abs() < 0.01);
/// ```
pub fn nelder_mead<F>(
    objective: F,
    initial: &[f64],
    bounds: Option<&[(f64, f64)]>,
    config: NelderMeadConfig,
) -> NelderMeadResult
where
    F: Fn(&[f64]) -> f64,
{
    if initial.is_empty() {
        return NelderMeadResult {
            optimal_point: vec![],
            optimal_value: f64::NAN,
            iterations: 0,
            converged: false,
        };
    }

    let mut simplex = Simplex::around(initial, config.initial_step, objective, bounds);
    let mut iterations = 0;
    let mut converged = false;

    while iterations < config.max_iter {
        iterations += 1;

        let (best, second_worst, worst) = simplex.rank();
        let centroid = simplex.centroid_without(worst);

        if simplex.values[worst] - simplex.values[best] < config.tolerance
            || simplex.diameter(&centroid) < config.tolerance
        {
            converged = true;
            break;
        }

        let (reflected, reflected_value) =
            simplex.evaluate(lerp(&centroid, &simplex.vertices[worst], -config.alpha));

        if reflected_value < simplex.values[best] {
            let expanded = simplex.evaluate(lerp(&centroid, &reflected, config.gamma));
            if expanded.1 < reflected_value {
                simplex.replace(worst, expanded);
            } else {
                simplex.replace(worst, (reflected, reflected_value));
            }
            continue;
        }

        if reflected_value < simplex.values[second_worst] {
            simplex.replace(worst, (reflected, reflected_value));
            continue;
        }

        // Outside contraction when the reflection beat the worst vertex,
        // inside contraction otherwise.
        let contracted = if reflected_value < simplex.values[worst] {
            let c = simplex.evaluate(lerp(&centroid, &reflected, config.rho));
            (c.1 <= reflected_value).then_some(c)
        } else {
            let c = simplex.evaluate(lerp(&centroid, &simplex.vertices[worst], config.rho));
            (c.1 < simplex.values[worst]).then_some(c)
        };

        match contracted {
            Some(c) => simplex.replace(worst, c),
            None => simplex.shrink_towards(best, config.sigma),
        }
    }

    let (best, _, _) = simplex.rank();
    NelderMeadResult {
        optimal_point: simplex.vertices[best].clone(),
        optimal_value: simplex.values[best],
        iterations,
        converged,
    }
}

/// Point at `from + t * (to - from)`.
fn lerp(from: &[f64], to: &[f64], t: f64) -> Vec<f64> {
    from.iter().zip(to).map(|(a, b)| a + t * (b - a)).collect()
}

fn clamp(mut point: Vec<f64>, bounds: Option<&[(f64, f64)]>) -> Vec<f64> {
    if let Some(bounds) = bounds {
        for (x, &(lo, hi)) in point.iter_mut().zip(bounds) {
            *x = x.clamp(lo, hi);
        }
    }
    point
}

fn euclidean_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn nelder_mead_quadratic_2d() {
        let result = nelder_mead(
            |x| (x[0] - 2.0).powi(2) + (x[1] - 3.0).powi(2),
            &[0.0, 0.0],
            None,
            NelderMeadConfig::default(),
        );

        assert!(result.converged);
        assert_relative_eq!(result.optimal_point[0], 2.0, epsilon = 1e-3);
        assert_relative_eq!(result.optimal_point[1], 3.0, epsilon = 1e-3);
        assert_relative_eq!(result.optimal_value, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn nelder_mead_rosenbrock() {
        let config = NelderMeadConfig {
            max_iter: 5000,
            tolerance: 1e-12,
            ..Default::default()
        };

        let result = nelder_mead(
            |x| (1.0 - x[0]).powi(2) + 100.0 * (x[1] - x[0].powi(2)).powi(2),
            &[0.0, 0.0],
            None,
            config,
        );

        assert_relative_eq!(result.optimal_point[0], 1.0, epsilon = 1e-2);
        assert_relative_eq!(result.optimal_point[1], 1.0, epsilon = 1e-2);
    }

    #[test]
    fn nelder_mead_with_bounds() {
        // Unconstrained minimum at 5 lies outside the box.
        let result = nelder_mead(
            |x| (x[0] - 5.0).powi(2),
            &[1.0],
            Some(&[(0.0, 3.0)]),
            NelderMeadConfig::default(),
        );

        assert_relative_eq!(result.optimal_point[0], 3.0, epsilon = 1e-4);
    }

    #[test]
    fn exhausted_budget_is_non_convergence() {
        let config = NelderMeadConfig {
            max_iter: 1,
            ..Default::default()
        };
        let result = nelder_mead(
            |x| (x[0] - 50.0).powi(2) + (x[1] + 20.0).powi(2),
            &[0.0, 0.0],
            None,
            config,
        );

        assert!(!result.converged);
        match result.require_convergence() {
            Err(PipelineError::NonConvergence {
                iterations,
                criterion,
            }) => {
                assert_eq!(iterations, 1);
                assert!(criterion > 0.0);
            }
            other => panic!("expected NonConvergence, got {:?}", other),
        }
    }

    #[test]
    fn empty_initial_point() {
        let result = nelder_mead(|_| 0.0, &[], None, NelderMeadConfig::default());
        assert!(!result.converged);
        assert!(result.optimal_point.is_empty());
    }
}
