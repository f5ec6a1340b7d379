//! Data transformations for the detection and forecasting paths.
//!
//! # Example
//!
//! ```
//! use spot_anomaly::transform::{make_windows, ScalerState};
//!
//! let train = vec![2.0, 2.5, 3.0, 3.5, 4.0, 4.5];
//! let scaler = ScalerState::fit(&train).unwrap();
//! let scaled = scaler.transform(&train);
//!
//! let set = make_windows(&scaled, 3);
//! assert_eq!(set.len(), 3);
//! ```

pub mod scale;
pub mod stationary;
pub mod window;

pub use scale::ScalerState;
pub use stationary::{reconstruct_forecast, stationarize};
pub use window::{make_windows, WindowSet};
