use async_trait::async_trait;
use std::fmt::Debug;

use crate::error::Result;
use crate::model::{AirQuality, CurrentConditions, Location, SampleSeries};

pub mod openweather;

pub use openweather::OpenWeatherProvider;

/// Upstream geocoding and weather data source.
///
/// Implementations translate transport and HTTP failures into
/// [`crate::WeatherError`] and validate every payload before it leaves the
/// provider boundary.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    /// Candidates for a free-text query, in the provider's relevance order.
    async fn geocode(&self, query: &str, limit: usize) -> Result<Vec<Location>>;

    async fn current_weather(&self, location: &Location) -> Result<CurrentConditions>;

    /// Raw interval samples covering at least `horizon_days` days.
    async fn forecast(&self, lat: f64, lon: f64, horizon_days: u32) -> Result<SampleSeries>;

    async fn air_quality(&self, lat: f64, lon: f64) -> Result<AirQuality>;
}
