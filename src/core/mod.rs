//! Core value objects: the cleaned price series and model forecasts.

mod forecast;
mod series;

pub use forecast::Forecast;
pub use series::{PriceSeries, Split, TimePoint};
