//! Ordinary least squares for the augmented Dickey-Fuller regression.

use crate::error::{PipelineError, Result};

/// Fitted OLS regression `y = X b + e`.
#[derive(Debug, Clone)]
pub struct OlsFit {
    /// Coefficients, one per design-matrix column.
    pub coefficients: Vec<f64>,
    /// Standard errors of the coefficients.
    pub std_errors: Vec<f64>,
    /// Residual sum of squares.
    pub ssr: f64,
    /// Number of observations.
    pub nobs: usize,
}

impl OlsFit {
    /// t statistic of coefficient `index`.
    pub fn t_stat(&self, index: usize) -> f64 {
        self.coefficients[index] / self.std_errors[index]
    }

    /// Gaussian log-likelihood at the OLS estimate.
    pub fn log_likelihood(&self) -> f64 {
        let n = self.nobs as f64;
        -0.5 * n * ((2.0 * std::f64::consts::PI).ln() + (self.ssr / n).ln() + 1.0)
    }

    /// Akaike information criterion.
    pub fn aic(&self) -> f64 {
        -2.0 * self.log_likelihood() + 2.0 * self.coefficients.len() as f64
    }
}

/// Fit OLS on row-major design matrix `x` (no implicit intercept).
///
/// # Errors
/// `InvalidShape` if rows disagree in width or count, `InsufficientData` if
/// there are no residual degrees of freedom, `InvalidParameter` if `X'X` is
/// singular.
pub fn ols_fit(y: &[f64], x: &[Vec<f64>]) -> Result<OlsFit> {
    let n = y.len();
    if x.len() != n {
        return Err(PipelineError::InvalidShape {
            expected: format!("{} rows", n),
            got: format!("{} rows", x.len()),
        });
    }
    let k = x.first().map(|row| row.len()).unwrap_or(0);
    if k == 0 || n <= k {
        return Err(PipelineError::InsufficientData {
            needed: k + 1,
            got: n,
        });
    }
    if let Some(row) = x.iter().find(|row| row.len() != k) {
        return Err(PipelineError::InvalidShape {
            expected: format!("{} columns", k),
            got: format!("{} columns", row.len()),
        });
    }

    let mut xtx = vec![vec![0.0; k]; k];
    let mut xty = vec![0.0; k];
    for (row, &target) in x.iter().zip(y) {
        for i in 0..k {
            xty[i] += row[i] * target;
            for j in i..k {
                xtx[i][j] += row[i] * row[j];
            }
        }
    }
    for i in 0..k {
        for j in 0..i {
            xtx[i][j] = xtx[j][i];
        }
    }

    let inverse = invert(xtx)?;
    let coefficients: Vec<f64> = (0..k)
        .map(|i| (0..k).map(|j| inverse[i][j] * xty[j]).sum())
        .collect();

    let ssr: f64 = x
        .iter()
        .zip(y)
        .map(|(row, &target)| {
            let fitted: f64 = row.iter().zip(&coefficients).map(|(a, b)| a * b).sum();
            (target - fitted).powi(2)
        })
        .sum();

    let sigma_sq = ssr / (n - k) as f64;
    let std_errors = (0..k).map(|i| (sigma_sq * inverse[i][i]).sqrt()).collect();

    Ok(OlsFit {
        coefficients,
        std_errors,
        ssr,
        nobs: n,
    })
}

/// Gauss-Jordan inversion with partial pivoting.
fn invert(mut a: Vec<Vec<f64>>) -> Result<Vec<Vec<f64>>> {
    let n = a.len();
    let mut inv: Vec<Vec<f64>> = (0..n)
        .map(|i| (0..n).map(|j| if i == j { 1.0 } else { 0.0 }).collect())
        .collect();

    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&r1, &r2| a[r1][col].abs().total_cmp(&a[r2][col].abs()))
            .unwrap_or(col);
        if a[pivot][col].abs() < 1e-12 {
            return Err(PipelineError::InvalidParameter(
                "singular design matrix".to_string(),
            ));
        }
        a.swap(col, pivot);
        inv.swap(col, pivot);

        let p = a[col][col];
        for j in 0..n {
            a[col][j] /= p;
            inv[col][j] /= p;
        }

        for row in 0..n {
            if row == col {
                continue;
            }
            let factor = a[row][col];
            if factor == 0.0 {
                continue;
            }
            for j in 0..n {
                a[row][j] -= factor * a[col][j];
                inv[row][j] -= factor * inv[col][j];
            }
        }
    }

    Ok(inv)
}
