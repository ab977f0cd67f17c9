use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::ProviderSettings;
use crate::error::{Result, WeatherError};
use crate::model::{
    AirQuality, ConditionCode, CurrentConditions, Location, RawSample, SampleSeries,
    longitude_offset_secs,
};

use super::WeatherProvider;

const GEOCODE_PATH: &str = "/geo/1.0/direct";
const CURRENT_PATH: &str = "/data/2.5/weather";
const FORECAST_PATH: &str = "/data/2.5/forecast";
const AIR_POLLUTION_PATH: &str = "/data/2.5/air_pollution";
/// The direct geocoding endpoint never returns more than five matches.
const MAX_GEOCODE_RESULTS: usize = 5;
const SAMPLES_PER_DAY: u32 = 8;
const MAX_FORECAST_SAMPLES: u32 = 40;
const MAX_UTC_OFFSET_SECS: i32 = 14 * 3600;

/// OpenWeather client. Requests use the provider's standard units
/// (Kelvin, m/s); conversion happens at the presentation boundary.
#[derive(Clone)]
pub struct OpenWeatherProvider {
    api_key: String,
    base_url: String,
    http: Client,
}

impl fmt::Debug for OpenWeatherProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenWeatherProvider")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl OpenWeatherProvider {
    /// Fails with [`WeatherError::Configuration`] when no credential is set,
    /// so a misconfigured process never reaches the network.
    pub fn new(settings: &ProviderSettings) -> Result<Self> {
        let api_key = settings
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                WeatherError::configuration("no API key configured for the weather provider")
            })?;

        let http = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .user_agent(concat!("weather-core/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|error| {
                WeatherError::configuration(format!("failed to build HTTP client: {error}"))
            })?;

        Ok(Self {
            api_key: api_key.to_string(),
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    async fn fetch(&self, path: &str, query: &[(&str, String)]) -> Result<String> {
        let url = format!("{}{}", self.base_url, path);

        let res = self
            .http
            .get(&url)
            .query(query)
            .query(&[("appid", self.api_key.as_str())])
            .send()
            .await
            .map_err(|error| transport_error(path, error))?;

        let status = res.status();
        if !status.is_success() {
            let retry_after = retry_after_secs(res.headers());
            warn!(path, status = status.as_u16(), "OpenWeather request rejected");
            return Err(status_error(status, retry_after));
        }

        res.text()
            .await
            .map_err(|error| transport_error(path, error))
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    async fn geocode(&self, query: &str, limit: usize) -> Result<Vec<Location>> {
        let body = self
            .fetch(
                GEOCODE_PATH,
                &[
                    ("q", query.to_string()),
                    ("limit", limit.clamp(1, MAX_GEOCODE_RESULTS).to_string()),
                ],
            )
            .await?;

        let locations = parse_geocode(&body)?;
        debug!(query, count = locations.len(), "geocode response parsed");
        Ok(locations)
    }

    async fn current_weather(&self, location: &Location) -> Result<CurrentConditions> {
        let body = self
            .fetch(
                CURRENT_PATH,
                &[
                    ("lat", location.lat().to_string()),
                    ("lon", location.lon().to_string()),
                ],
            )
            .await?;

        parse_current(&body, location)
    }

    async fn forecast(&self, lat: f64, lon: f64, horizon_days: u32) -> Result<SampleSeries> {
        // One extra day so a partial leading day can be dropped.
        let count = horizon_days
            .saturating_add(1)
            .saturating_mul(SAMPLES_PER_DAY)
            .min(MAX_FORECAST_SAMPLES);

        let body = self
            .fetch(
                FORECAST_PATH,
                &[
                    ("lat", lat.to_string()),
                    ("lon", lon.to_string()),
                    ("cnt", count.to_string()),
                ],
            )
            .await?;

        let series = parse_forecast(&body)?;
        debug!(lat, lon, samples = series.samples.len(), "forecast response parsed");
        Ok(series)
    }

    async fn air_quality(&self, lat: f64, lon: f64) -> Result<AirQuality> {
        let body = self
            .fetch(
                AIR_POLLUTION_PATH,
                &[("lat", lat.to_string()), ("lon", lon.to_string())],
            )
            .await?;

        parse_air_quality(&body)
    }
}

/// Request URLs carry the credential, so the reqwest error is stripped of
/// its URL before it is logged and only the path reaches the error value.
fn transport_error(path: &str, error: reqwest::Error) -> WeatherError {
    let error = error.without_url();
    warn!(path, error = %error, "OpenWeather transport failure");

    if error.is_timeout() {
        WeatherError::upstream(format!("{path}: request timed out"))
    } else {
        WeatherError::upstream(format!("{path}: request failed"))
    }
}

fn retry_after_secs(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
}

fn status_error(status: StatusCode, retry_after_secs: Option<u64>) -> WeatherError {
    match status.as_u16() {
        401 | 403 => WeatherError::Authentication(format!("provider answered {status}")),
        404 => WeatherError::NotFound(format!("provider answered {status}")),
        429 => WeatherError::RateLimited { retry_after_secs },
        500..=599 => WeatherError::upstream(format!("provider answered {status}")),
        _ => WeatherError::upstream(format!("unexpected provider status {status}")),
    }
}

#[derive(Debug, Deserialize)]
struct OwGeocodeEntry {
    name: String,
    lat: f64,
    lon: f64,
    country: Option<String>,
    state: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    feels_like: Option<f64>,
    humidity: f64,
    pressure: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    id: u16,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Default, Deserialize)]
struct OwWind {
    #[serde(default)]
    speed: f64,
    deg: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OwClouds {
    all: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OwSys {
    sunrise: Option<i64>,
    sunset: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    dt: i64,
    timezone: Option<i32>,
    main: OwMain,
    #[serde(default)]
    weather: Vec<OwWeather>,
    wind: Option<OwWind>,
    clouds: Option<OwClouds>,
    visibility: Option<f64>,
    sys: Option<OwSys>,
}

#[derive(Debug, Deserialize)]
struct OwForecastEntry {
    dt: i64,
    main: OwMain,
    #[serde(default)]
    weather: Vec<OwWeather>,
    wind: Option<OwWind>,
    pop: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OwCity {
    timezone: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct OwForecastResponse {
    list: Vec<OwForecastEntry>,
    city: Option<OwCity>,
}

#[derive(Debug, Deserialize)]
struct OwPollutionMain {
    aqi: u8,
}

#[derive(Debug, Deserialize)]
struct OwPollutionEntry {
    main: OwPollutionMain,
}

#[derive(Debug, Deserialize)]
struct OwPollutionResponse {
    list: Vec<OwPollutionEntry>,
}

fn parse_geocode(body: &str) -> Result<Vec<Location>> {
    let entries: Vec<OwGeocodeEntry> = serde_json::from_str(body)
        .map_err(|error| WeatherError::parse(format!("geocode payload: {error}")))?;

    entries
        .into_iter()
        .map(|entry| {
            let name = entry.name.trim();
            if name.is_empty() {
                return Err(WeatherError::parse("geocode payload: empty location name"));
            }

            let country = entry.country.unwrap_or_default();
            Location::new(name, entry.state, country.trim(), entry.lat, entry.lon)
        })
        .collect()
}

fn parse_current(body: &str, location: &Location) -> Result<CurrentConditions> {
    let payload: OwCurrentResponse = serde_json::from_str(body)
        .map_err(|error| WeatherError::parse(format!("current payload: {error}")))?;

    let temperature = kelvin(payload.main.temp, "main.temp")?;
    let feels_like = match payload.main.feels_like {
        Some(value) => kelvin(value, "main.feels_like")?,
        None => temperature,
    };
    let (condition, condition_text) = condition_of(&payload.weather);
    let wind = payload.wind.unwrap_or_default();
    let sys = payload.sys;

    let utc_offset_secs = match payload.timezone {
        Some(offset) => utc_offset(offset)?,
        None => longitude_offset_secs(location.lon()),
    };

    Ok(CurrentConditions {
        location: location.clone(),
        observed_at: timestamp(payload.dt, "dt")?,
        temperature,
        feels_like,
        humidity_pct: humidity(payload.main.humidity)?,
        condition,
        condition_text,
        wind_speed: wind_speed(wind.speed)?,
        wind_direction_deg: wind
            .deg
            .filter(|deg| deg.is_finite())
            .map(|deg| (deg.rem_euclid(360.0).round() as u16) % 360),
        pressure_hpa: payload.main.pressure.and_then(non_negative_u32),
        clouds_pct: payload
            .clouds
            .and_then(|clouds| clouds.all)
            .filter(|pct| pct.is_finite() && (0.0..=100.0).contains(pct))
            .map(|pct| pct.round() as u8),
        visibility_m: payload.visibility.and_then(non_negative_u32),
        sunrise: sys
            .as_ref()
            .and_then(|sys| sys.sunrise)
            .filter(|ts| *ts > 0)
            .and_then(|ts| DateTime::from_timestamp(ts, 0)),
        sunset: sys
            .as_ref()
            .and_then(|sys| sys.sunset)
            .filter(|ts| *ts > 0)
            .and_then(|ts| DateTime::from_timestamp(ts, 0)),
        utc_offset_secs,
        air_quality: None,
    })
}

fn parse_air_quality(body: &str) -> Result<AirQuality> {
    let payload: OwPollutionResponse = serde_json::from_str(body)
        .map_err(|error| WeatherError::parse(format!("air pollution payload: {error}")))?;

    let entry = payload
        .list
        .first()
        .ok_or_else(|| WeatherError::parse("air pollution payload: empty list"))?;

    AirQuality::from_index(entry.main.aqi)
}

fn parse_forecast(body: &str) -> Result<SampleSeries> {
    let payload: OwForecastResponse = serde_json::from_str(body)
        .map_err(|error| WeatherError::parse(format!("forecast payload: {error}")))?;

    let utc_offset_secs = payload
        .city
        .and_then(|city| city.timezone)
        .map(utc_offset)
        .transpose()?;

    let samples = payload
        .list
        .into_iter()
        .map(parse_sample)
        .collect::<Result<Vec<_>>>()?;

    Ok(SampleSeries {
        utc_offset_secs,
        samples,
    })
}

fn parse_sample(entry: OwForecastEntry) -> Result<RawSample> {
    let precipitation_probability = entry
        .pop
        .map(|pop| {
            if pop.is_finite() && (0.0..=1.0).contains(&pop) {
                Ok(pop)
            } else {
                Err(WeatherError::parse(format!(
                    "forecast payload: precipitation probability {pop} out of range"
                )))
            }
        })
        .transpose()?;

    let (condition, condition_text) = condition_of(&entry.weather);

    Ok(RawSample {
        at: timestamp(entry.dt, "list.dt")?,
        temperature: kelvin(entry.main.temp, "list.main.temp")?,
        humidity_pct: humidity(entry.main.humidity)?,
        condition,
        condition_text,
        precipitation_probability,
        wind_speed: wind_speed(entry.wind.unwrap_or_default().speed)?,
    })
}

fn condition_of(weather: &[OwWeather]) -> (ConditionCode, String) {
    match weather.first() {
        Some(entry) => {
            let code = ConditionCode::from_provider_id(entry.id);
            let text = entry.description.trim();
            if text.is_empty() {
                (code, code.as_str().to_string())
            } else {
                (code, text.to_string())
            }
        }
        None => (ConditionCode::Unknown, ConditionCode::Unknown.as_str().to_string()),
    }
}

fn kelvin(value: f64, field: &str) -> Result<f64> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(WeatherError::parse(format!(
            "{field}: {value} is not a Kelvin temperature"
        )))
    }
}

fn humidity(value: f64) -> Result<u8> {
    if value.is_finite() && (0.0..=100.0).contains(&value) {
        Ok(value.round() as u8)
    } else {
        Err(WeatherError::parse(format!("humidity {value} out of range")))
    }
}

fn wind_speed(value: f64) -> Result<f64> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(WeatherError::parse(format!("wind speed {value} out of range")))
    }
}

fn timestamp(ts: i64, field: &str) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp(ts, 0)
        .ok_or_else(|| WeatherError::parse(format!("{field}: invalid timestamp {ts}")))
}

fn utc_offset(secs: i32) -> Result<i32> {
    if secs.abs() <= MAX_UTC_OFFSET_SECS {
        Ok(secs)
    } else {
        Err(WeatherError::parse(format!("utc offset {secs} out of range")))
    }
}

fn non_negative_u32(value: f64) -> Option<u32> {
    (value.is_finite() && (0.0..=f64::from(u32::MAX)).contains(&value))
        .then(|| value.round() as u32)
}
