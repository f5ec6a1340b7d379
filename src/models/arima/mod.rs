//! Seasonal ARIMA estimated by conditional sum of squares.
//!
//! A SARIMA(p, d, q)(P, D, Q)\[s\] model differences the input `d` times at
//! lag 1 and `D` times at lag `s`, then fits
//!
//! ```text
//! phi(L) Phi(L^s) w_t = theta(L) Theta(L^s) e_t
//! ```
//!
//! with the lag polynomials multiplied out into a single ARMA recursion.

mod diff;
mod sarima;

pub use diff::{difference, integrate, seasonal_difference, seasonal_integrate};
pub use sarima::{ArimaOrder, SeasonalOrder, SARIMA};
