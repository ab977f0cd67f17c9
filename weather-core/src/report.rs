//! Response shapes for the dashboard. Unit conversion happens here and
//! nowhere earlier.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::model::{
    ConditionCode, CurrentConditions, Forecast, ForecastDay, Location, fixed_offset,
};
use crate::units::UnitSystem;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherReport {
    pub city: String,
    pub country: String,
    pub region: Option<String>,
    pub temperature: f64,
    pub feels_like: f64,
    pub humidity: u8,
    pub condition: String,
    pub condition_code: ConditionCode,
    pub wind_speed: f64,
    pub wind_direction: Option<u16>,
    pub pressure: Option<u32>,
    pub clouds: Option<u8>,
    pub visibility_km: Option<f64>,
    /// Local wall-clock time, `HH:MM`.
    pub sunrise: Option<String>,
    pub sunset: Option<String>,
    pub observed_at: DateTime<Utc>,
    /// Air quality index 1 to 5, `null` when the lookup failed.
    pub aqi: Option<u8>,
    pub aqi_label: Option<&'static str>,
    pub units: UnitSystem,
    pub temperature_unit: &'static str,
    pub wind_speed_unit: &'static str,
}

impl WeatherReport {
    pub fn new(current: &CurrentConditions, units: UnitSystem) -> Self {
        let offset = fixed_offset(current.utc_offset_secs);
        let local_clock = |at: DateTime<Utc>| at.with_timezone(&offset).format("%H:%M").to_string();

        Self {
            city: current.location.name().to_string(),
            country: current.location.country().to_string(),
            region: current.location.region().map(String::from),
            temperature: round1(units.temperature(current.temperature)),
            feels_like: round1(units.temperature(current.feels_like)),
            humidity: current.humidity_pct,
            condition: capitalize(&current.condition_text),
            condition_code: current.condition,
            wind_speed: round1(units.wind_speed(current.wind_speed)),
            wind_direction: current.wind_direction_deg,
            pressure: current.pressure_hpa,
            clouds: current.clouds_pct,
            visibility_km: current
                .visibility_m
                .map(|metres| round1(f64::from(metres) / 1000.0)),
            sunrise: current.sunrise.map(local_clock),
            sunset: current.sunset.map(local_clock),
            observed_at: current.observed_at,
            aqi: current.air_quality.map(|air| air.index),
            aqi_label: current.air_quality.map(|air| air.label),
            units,
            temperature_unit: units.temperature_unit().symbol(),
            wind_speed_unit: units.wind_speed_label(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastDayReport {
    pub date: NaiveDate,
    /// e.g. "Mon, Jan 06".
    pub label: String,
    pub min: f64,
    pub max: f64,
    pub condition: &'static str,
    pub condition_code: ConditionCode,
    /// Percentage, 0 to 100.
    pub precipitation_chance: Option<u8>,
}

impl ForecastDayReport {
    fn new(day: &ForecastDay, units: UnitSystem) -> Self {
        Self {
            date: day.date,
            label: day.date.format("%a, %b %d").to_string(),
            min: round1(units.temperature(day.min_temp)),
            max: round1(units.temperature(day.max_temp)),
            condition: day.dominant_condition.label(),
            condition_code: day.dominant_condition,
            precipitation_chance: day
                .precipitation_probability
                .map(|p| (p.clamp(0.0, 1.0) * 100.0).round() as u8),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastReport {
    pub city: String,
    pub country: String,
    pub region: Option<String>,
    pub units: UnitSystem,
    pub temperature_unit: &'static str,
    pub days: Vec<ForecastDayReport>,
}

impl ForecastReport {
    pub fn new(forecast: &Forecast, units: UnitSystem) -> Self {
        Self {
            city: forecast.location.name().to_string(),
            country: forecast.location.country().to_string(),
            region: forecast.location.region().map(String::from),
            units,
            temperature_unit: units.temperature_unit().symbol(),
            days: forecast
                .days
                .iter()
                .map(|day| ForecastDayReport::new(day, units))
                .collect(),
        }
    }
}

/// Autocomplete entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Suggestion {
    pub name: String,
    pub country: String,
    pub region: Option<String>,
    pub lat: f64,
    pub lon: f64,
    pub display: String,
}

impl From<&Location> for Suggestion {
    fn from(location: &Location) -> Self {
        Self {
            name: location.name().to_string(),
            country: location.country().to_string(),
            region: location.region().map(String::from),
            lat: location.lat(),
            lon: location.lon(),
            display: location.display_name(),
        }
    }
}

pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
