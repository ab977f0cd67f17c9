use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};
use serde::Serialize;

use crate::error::{Result, WeatherError};

/// A resolved place. Coordinates are validated on construction and the
/// record is read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Location {
    name: String,
    region: Option<String>,
    country: String,
    lat: f64,
    lon: f64,
}

impl Location {
    pub fn new(
        name: impl Into<String>,
        region: Option<String>,
        country: impl Into<String>,
        lat: f64,
        lon: f64,
    ) -> Result<Self> {
        if !valid_coordinates(lat, lon) {
            return Err(WeatherError::parse(format!(
                "coordinates out of range: {lat}, {lon}"
            )));
        }

        let region = region
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());

        Ok(Self {
            name: name.into(),
            region,
            country: country.into(),
            lat,
            lon,
        })
    }

    /// A location known only by its coordinates.
    pub fn from_coordinates(lat: f64, lon: f64) -> Result<Self> {
        Self::new(coordinate_label(lat, lon), None, "", lat, lon)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }

    pub fn country(&self) -> &str {
        &self.country
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    pub fn lon(&self) -> f64 {
        self.lon
    }

    /// "Name, Region, CC (lat, lon)" as shown in autocomplete lists.
    pub fn display_name(&self) -> String {
        let mut parts = vec![self.name.as_str()];
        if let Some(region) = self.region() {
            parts.push(region);
        }
        if !self.country.is_empty() {
            parts.push(&self.country);
        }
        format!("{} ({:.2}, {:.2})", parts.join(", "), self.lat, self.lon)
    }
}

pub fn valid_coordinates(lat: f64, lon: f64) -> bool {
    lat.is_finite()
        && lon.is_finite()
        && (-90.0..=90.0).contains(&lat)
        && (-180.0..=180.0).contains(&lon)
}

pub fn coordinate_label(lat: f64, lon: f64) -> String {
    format!("{lat:.4},{lon:.4}")
}

/// Solar-time approximation used when the provider reports no offset:
/// one hour per 15 degrees of longitude.
pub fn longitude_offset_secs(lon: f64) -> i32 {
    let hours = (lon / 15.0).round().clamp(-12.0, 14.0) as i32;
    hours * 3600
}

/// Offset for local-time arithmetic; falls back to UTC if `secs` is out of range.
pub fn fixed_offset(secs: i32) -> FixedOffset {
    FixedOffset::east_opt(secs).unwrap_or_else(|| Utc.fix())
}

/// Condition family derived from the provider's numeric condition id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConditionCode {
    Thunderstorm,
    Drizzle,
    Rain,
    Snow,
    Atmosphere,
    Clear,
    Clouds,
    Unknown,
}

impl ConditionCode {
    pub fn from_provider_id(id: u16) -> Self {
        match id {
            200..=299 => ConditionCode::Thunderstorm,
            300..=399 => ConditionCode::Drizzle,
            500..=599 => ConditionCode::Rain,
            600..=699 => ConditionCode::Snow,
            700..=799 => ConditionCode::Atmosphere,
            800 => ConditionCode::Clear,
            801..=804 => ConditionCode::Clouds,
            _ => ConditionCode::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ConditionCode::Thunderstorm => "thunderstorm",
            ConditionCode::Drizzle => "drizzle",
            ConditionCode::Rain => "rain",
            ConditionCode::Snow => "snow",
            ConditionCode::Atmosphere => "atmosphere",
            ConditionCode::Clear => "clear",
            ConditionCode::Clouds => "clouds",
            ConditionCode::Unknown => "unknown",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ConditionCode::Thunderstorm => "Thunderstorm",
            ConditionCode::Drizzle => "Drizzle",
            ConditionCode::Rain => "Rain",
            ConditionCode::Snow => "Snow",
            ConditionCode::Atmosphere => "Mist",
            ConditionCode::Clear => "Clear",
            ConditionCode::Clouds => "Clouds",
            ConditionCode::Unknown => "Unknown",
        }
    }
}

/// OpenWeather air quality index, 1 (good) to 5 (very poor).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AirQuality {
    pub index: u8,
    pub label: &'static str,
}

impl AirQuality {
    pub fn from_index(index: u8) -> Result<Self> {
        let label = match index {
            1 => "Good",
            2 => "Fair",
            3 => "Moderate",
            4 => "Poor",
            5 => "Very Poor",
            _ => {
                return Err(WeatherError::parse(format!(
                    "air quality index {index} out of range"
                )));
            }
        };
        Ok(Self { index, label })
    }
}

/// Observation for one location, temperatures in Kelvin and wind in m/s.
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentConditions {
    pub location: Location,
    pub observed_at: DateTime<Utc>,
    pub temperature: f64,
    pub feels_like: f64,
    pub humidity_pct: u8,
    pub condition: ConditionCode,
    pub condition_text: String,
    pub wind_speed: f64,
    pub wind_direction_deg: Option<u16>,
    pub pressure_hpa: Option<u32>,
    pub clouds_pct: Option<u8>,
    pub visibility_m: Option<u32>,
    pub sunrise: Option<DateTime<Utc>>,
    pub sunset: Option<DateTime<Utc>>,
    pub utc_offset_secs: i32,
    /// Filled in separately from the observation; absent when unavailable.
    pub air_quality: Option<AirQuality>,
}

/// One provider-native forecast interval (3 hours for OpenWeather).
#[derive(Debug, Clone, PartialEq)]
pub struct RawSample {
    pub at: DateTime<Utc>,
    pub temperature: f64,
    pub humidity_pct: u8,
    pub condition: ConditionCode,
    pub condition_text: String,
    /// Probability in `0.0..=1.0`.
    pub precipitation_probability: Option<f64>,
    pub wind_speed: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SampleSeries {
    /// Offset reported by the provider for the forecast location.
    pub utc_offset_secs: Option<i32>,
    pub samples: Vec<RawSample>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForecastDay {
    pub date: NaiveDate,
    pub min_temp: f64,
    pub max_temp: f64,
    pub dominant_condition: ConditionCode,
    pub precipitation_probability: Option<f64>,
    pub samples: Vec<RawSample>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Forecast {
    pub location: Location,
    pub utc_offset_secs: i32,
    pub days: Vec<ForecastDay>,
}
