//! In-memory provider double for unit tests.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::Result;
use crate::model::{
    AirQuality, ConditionCode, CurrentConditions, Location, RawSample, SampleSeries,
};
use crate::provider::WeatherProvider;

#[derive(Debug)]
pub(crate) struct FakeProvider {
    geocode: Result<Vec<Location>>,
    current: Result<CurrentConditions>,
    forecast: Result<SampleSeries>,
    air_quality: Result<AirQuality>,
    geocode_calls: AtomicUsize,
    current_calls: AtomicUsize,
    forecast_calls: AtomicUsize,
    air_quality_calls: AtomicUsize,
    last_forecast: Mutex<Option<(f64, f64, u32)>>,
}

impl FakeProvider {
    pub(crate) fn new() -> Self {
        Self {
            geocode: Ok(Vec::new()),
            current: Ok(current_conditions(&loc("London", Some("England"), "GB", 51.5073, -0.1276))),
            forecast: Ok(SampleSeries {
                utc_offset_secs: Some(0),
                samples: Vec::new(),
            }),
            air_quality: AirQuality::from_index(2),
            geocode_calls: AtomicUsize::new(0),
            current_calls: AtomicUsize::new(0),
            forecast_calls: AtomicUsize::new(0),
            air_quality_calls: AtomicUsize::new(0),
            last_forecast: Mutex::new(None),
        }
    }

    pub(crate) fn with_geocode(mut self, locations: Vec<Location>) -> Self {
        self.geocode = Ok(locations);
        self
    }

    pub(crate) fn with_geocode_result(mut self, result: Result<Vec<Location>>) -> Self {
        self.geocode = result;
        self
    }

    pub(crate) fn with_current_result(mut self, result: Result<CurrentConditions>) -> Self {
        self.current = result;
        self
    }

    pub(crate) fn with_forecast(mut self, series: SampleSeries) -> Self {
        self.forecast = Ok(series);
        self
    }

    pub(crate) fn with_forecast_result(mut self, result: Result<SampleSeries>) -> Self {
        self.forecast = result;
        self
    }

    pub(crate) fn with_air_quality_result(mut self, result: Result<AirQuality>) -> Self {
        self.air_quality = result;
        self
    }

    pub(crate) fn geocode_calls(&self) -> usize {
        self.geocode_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn current_calls(&self) -> usize {
        self.current_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn forecast_calls(&self) -> usize {
        self.forecast_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn air_quality_calls(&self) -> usize {
        self.air_quality_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn last_forecast_request(&self) -> Option<(f64, f64, u32)> {
        *self.last_forecast.lock()
    }
}

#[async_trait]
impl WeatherProvider for FakeProvider {
    async fn geocode(&self, _query: &str, limit: usize) -> Result<Vec<Location>> {
        self.geocode_calls.fetch_add(1, Ordering::SeqCst);
        self.geocode.clone().map(|mut locations| {
            locations.truncate(limit);
            locations
        })
    }

    async fn current_weather(&self, location: &Location) -> Result<CurrentConditions> {
        self.current_calls.fetch_add(1, Ordering::SeqCst);
        self.current.clone().map(|mut conditions| {
            conditions.location = location.clone();
            conditions
        })
    }

    async fn forecast(&self, lat: f64, lon: f64, horizon_days: u32) -> Result<SampleSeries> {
        self.forecast_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_forecast.lock() = Some((lat, lon, horizon_days));
        self.forecast.clone()
    }

    async fn air_quality(&self, _lat: f64, _lon: f64) -> Result<AirQuality> {
        self.air_quality_calls.fetch_add(1, Ordering::SeqCst);
        self.air_quality.clone()
    }
}

pub(crate) fn loc(name: &str, region: Option<&str>, country: &str, lat: f64, lon: f64) -> Location {
    Location::new(name, region.map(String::from), country, lat, lon).expect("valid test location")
}

pub(crate) fn utc(year: i32, month: u32, day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, 0, 0)
        .single()
        .expect("valid test timestamp")
}

pub(crate) fn sample(
    at: DateTime<Utc>,
    kelvin: f64,
    condition: ConditionCode,
    pop: Option<f64>,
) -> RawSample {
    RawSample {
        at,
        temperature: kelvin,
        humidity_pct: 60,
        condition,
        condition_text: condition.as_str().to_string(),
        precipitation_probability: pop,
        wind_speed: 3.0,
    }
}

/// Three-hourly samples starting at `start`, warming by 1 K per step.
pub(crate) fn three_hourly(start: DateTime<Utc>, count: usize) -> Vec<RawSample> {
    (0..count)
        .map(|step| {
            let at = start + chrono::Duration::hours(3 * step as i64);
            sample(at, 280.0 + step as f64, ConditionCode::Clouds, Some(0.1))
        })
        .collect()
}

pub(crate) fn current_conditions(location: &Location) -> CurrentConditions {
    CurrentConditions {
        location: location.clone(),
        observed_at: utc(2025, 1, 15, 12),
        temperature: 288.15,
        feels_like: 287.15,
        humidity_pct: 72,
        condition: ConditionCode::Clouds,
        condition_text: "broken clouds".to_string(),
        wind_speed: 4.0,
        wind_direction_deg: Some(250),
        pressure_hpa: Some(1012),
        clouds_pct: Some(75),
        visibility_m: Some(10_000),
        sunrise: Some(utc(2025, 1, 15, 8)),
        sunset: Some(utc(2025, 1, 15, 16)),
        utc_offset_secs: 0,
        air_quality: None,
    }
}
