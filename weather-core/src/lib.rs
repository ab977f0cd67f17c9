//! Core library for the weather dashboard server.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - The OpenWeather provider client behind a provider trait
//! - City resolution and day-bucketed forecast aggregation
//! - Unit conversion and the response shapes served to the dashboard
//!
//! It is used by `weather-server`, but has no HTTP framework dependency of its own.

pub mod aggregator;
pub mod cache;
pub mod config;
pub mod error;
pub mod model;
pub mod provider;
pub mod report;
pub mod resolver;
pub mod service;
pub mod units;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::Config;
pub use error::{Result, WeatherError};
pub use model::{
    AirQuality, ConditionCode, CurrentConditions, Forecast, ForecastDay, Location,
};
pub use provider::{OpenWeatherProvider, WeatherProvider};
pub use report::{ForecastReport, Suggestion, WeatherReport};
pub use service::WeatherService;
pub use units::UnitSystem;
