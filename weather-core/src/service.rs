use std::sync::Arc;
use tracing::debug;

use crate::aggregator::ForecastAggregator;
use crate::config::{Config, ForecastSettings, LookupSettings};
use crate::error::{Result, WeatherError};
use crate::provider::{OpenWeatherProvider, WeatherProvider};
use crate::report::{ForecastReport, Suggestion, WeatherReport};
use crate::resolver::CityResolver;
use crate::units::UnitSystem;

/// Orchestrates resolution, aggregation and response shaping for the
/// dashboard endpoints. Faults from below pass through unchanged.
#[derive(Debug)]
pub struct WeatherService {
    resolver: CityResolver,
    aggregator: ForecastAggregator,
    forecast: ForecastSettings,
    lookup: LookupSettings,
}

impl WeatherService {
    pub fn new(provider: Arc<dyn WeatherProvider>, config: &Config) -> Self {
        Self {
            resolver: CityResolver::new(provider.clone(), &config.lookup, &config.cache),
            aggregator: ForecastAggregator::new(provider, &config.forecast, &config.cache),
            forecast: config.forecast.clone(),
            lookup: config.lookup.clone(),
        }
    }

    /// Service backed by OpenWeather. Fails without a credential.
    pub fn from_config(config: &Config) -> Result<Self> {
        let provider = OpenWeatherProvider::new(&config.provider)?;
        Ok(Self::new(Arc::new(provider), config))
    }

    pub async fn weather_by_city(&self, city: &str, units: UnitSystem) -> Result<WeatherReport> {
        let location = self.resolver.locate(city).await?;
        let current = self.aggregator.current(&location).await?;
        Ok(WeatherReport::new(&current, units))
    }

    pub async fn forecast_by_city(
        &self,
        city: &str,
        days: Option<u32>,
        units: UnitSystem,
    ) -> Result<ForecastReport> {
        let horizon = self.horizon(days);
        let location = self.resolver.locate(city).await?;
        let forecast = self.aggregator.forecast(&location, horizon).await?;
        Ok(ForecastReport::new(&forecast, units))
    }

    /// Requested days clamped to `[1, max_horizon_days]`; the maximum when absent.
    pub fn horizon(&self, requested: Option<u32>) -> u32 {
        let max = self.forecast.max_horizon_days.max(1);
        requested.unwrap_or(max).clamp(1, max)
    }

    pub async fn autocomplete(&self, prefix: &str) -> Result<Vec<Suggestion>> {
        let prefix = prefix.trim();
        if prefix.is_empty() {
            return Err(WeatherError::invalid_query("search text must not be empty"));
        }

        if prefix.chars().count() < self.lookup.autocomplete_min_chars {
            debug!(prefix, "autocomplete prefix too short");
            return Ok(Vec::new());
        }

        let locations = self
            .resolver
            .resolve(prefix, self.lookup.autocomplete_limit)
            .await?;
        Ok(locations.iter().map(Suggestion::from).collect())
    }

    pub fn popular_cities(&self) -> &[String] {
        &self.lookup.popular_cities
    }
}
