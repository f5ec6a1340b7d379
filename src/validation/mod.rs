//! Statistical validation of the forecasting transform.
//!
//! # Example
//!
//! ```
//! use spot_anomaly::validation::adf_test;
//!
//! let mut state = 7u64;
//! let series: Vec<f64> = (0..200)
//!     .map(|_| {
//!         state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
//!         (state >> 33) as f64 / (1u64 << 31) as f64 - 0.5
//!     })
//!     .collect();
//! let result = adf_test(&series, None, 0.05).unwrap();
//! assert!(result.is_stationary);
//! ```

pub mod stationarity;

pub use stationarity::{adf_test, test_stationarity, CriticalValues, StationarityResult};
