//! Day-bucketed forecast summaries built from the provider's interval samples.
//!
//! All temperature math stays in Kelvin. Calendar days are computed in the
//! forecast location's UTC offset, never in the server's local time.

use chrono::{DateTime, FixedOffset, NaiveDate, Timelike, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::cache::TtlCache;
use crate::config::{CacheSettings, ForecastSettings};
use crate::error::Result;
use crate::model::{
    ConditionCode, CurrentConditions, Forecast, ForecastDay, Location, RawSample,
    fixed_offset, longitude_offset_secs,
};
use crate::provider::WeatherProvider;

const LOCAL_NOON_SECS: i64 = 12 * 3600;

/// Coordinates rounded to 0.01° plus the horizon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct ForecastKey {
    lat_centi: i32,
    lon_centi: i32,
    horizon_days: u32,
}

impl ForecastKey {
    fn new(location: &Location, horizon_days: u32) -> Self {
        Self {
            lat_centi: (location.lat() * 100.0).round() as i32,
            lon_centi: (location.lon() * 100.0).round() as i32,
            horizon_days,
        }
    }
}

#[derive(Debug)]
pub struct ForecastAggregator {
    provider: Arc<dyn WeatherProvider>,
    cache: TtlCache<ForecastKey, Forecast>,
    min_first_day_samples: usize,
}

impl ForecastAggregator {
    pub fn new(
        provider: Arc<dyn WeatherProvider>,
        forecast: &ForecastSettings,
        cache: &CacheSettings,
    ) -> Self {
        Self {
            provider,
            cache: TtlCache::new(Duration::from_secs(cache.ttl_secs), cache.max_entries),
            min_first_day_samples: forecast.min_first_day_samples,
        }
    }

    /// Current conditions are always fetched fresh. Air quality is
    /// supplementary: if that lookup fails the observation is still returned
    /// without it.
    pub async fn current(&self, location: &Location) -> Result<CurrentConditions> {
        let mut conditions = self.provider.current_weather(location).await?;
        info!(location = location.name(), "fetched current conditions");

        conditions.air_quality = match self
            .provider
            .air_quality(location.lat(), location.lon())
            .await
        {
            Ok(air) => Some(air),
            Err(err) => {
                warn!(location = location.name(), kind = err.kind(), error = %err, "air quality unavailable");
                None
            }
        };

        Ok(conditions)
    }

    pub async fn forecast(&self, location: &Location, horizon_days: u32) -> Result<Forecast> {
        let key = ForecastKey::new(location, horizon_days);

        if let Some(mut cached) = self.cache.get(&key) {
            debug!(location = location.name(), horizon_days, "forecast cache hit");
            cached.location = location.clone();
            return Ok(cached);
        }
        debug!(location = location.name(), horizon_days, "forecast cache miss");

        let series = self
            .provider
            .forecast(location.lat(), location.lon(), horizon_days)
            .await?;

        let utc_offset_secs = series
            .utc_offset_secs
            .unwrap_or_else(|| longitude_offset_secs(location.lon()));

        let days = summarize_days(
            series.samples,
            utc_offset_secs,
            horizon_days,
            self.min_first_day_samples,
        );
        info!(
            location = location.name(),
            days = days.len(),
            "fetched forecast"
        );

        let forecast = Forecast {
            location: location.clone(),
            utc_offset_secs,
            days,
        };

        let mut stored = self.cache.insert(key, forecast);
        stored.location = location.clone();
        Ok(stored)
    }
}

/// Group samples by local calendar date. Each bucket is chronological.
pub fn bucket_samples(
    mut samples: Vec<RawSample>,
    utc_offset_secs: i32,
) -> BTreeMap<NaiveDate, Vec<RawSample>> {
    let offset = fixed_offset(utc_offset_secs);
    samples.sort_by_key(|sample| sample.at);

    let mut days: BTreeMap<NaiveDate, Vec<RawSample>> = BTreeMap::new();
    for sample in samples {
        let date = sample.at.with_timezone(&offset).date_naive();
        days.entry(date).or_default().push(sample);
    }
    days
}

/// Bucket, summarize, drop a partial leading day and cut to `horizon_days`.
pub fn summarize_days(
    samples: Vec<RawSample>,
    utc_offset_secs: i32,
    horizon_days: u32,
    min_first_day_samples: usize,
) -> Vec<ForecastDay> {
    let offset = fixed_offset(utc_offset_secs);

    let mut days: Vec<ForecastDay> = bucket_samples(samples, utc_offset_secs)
        .into_iter()
        .filter_map(|(date, samples)| summarize_day(date, samples, offset))
        .collect();

    if days
        .first()
        .is_some_and(|day| day.samples.len() < min_first_day_samples)
    {
        days.remove(0);
    }

    days.truncate(usize::try_from(horizon_days).unwrap_or(usize::MAX));
    days
}

fn summarize_day(
    date: NaiveDate,
    samples: Vec<RawSample>,
    offset: FixedOffset,
) -> Option<ForecastDay> {
    let dominant_condition = dominant_condition(&samples, offset)?;

    let (min_temp, max_temp) = samples.iter().fold(
        (f64::INFINITY, f64::NEG_INFINITY),
        |(lo, hi), sample| (lo.min(sample.temperature), hi.max(sample.temperature)),
    );

    let precipitation_probability = samples
        .iter()
        .filter_map(|sample| sample.precipitation_probability)
        .reduce(f64::max);

    Some(ForecastDay {
        date,
        min_temp,
        max_temp,
        dominant_condition,
        precipitation_probability,
        samples,
    })
}

/// Plurality condition. On a tie the tied sample nearest local noon decides;
/// at equal distance the earlier sample wins. `None` for no samples.
pub fn dominant_condition(samples: &[RawSample], offset: FixedOffset) -> Option<ConditionCode> {
    let mut counts: HashMap<ConditionCode, usize> = HashMap::new();
    for sample in samples {
        *counts.entry(sample.condition).or_default() += 1;
    }

    let top = counts.values().copied().max()?;
    let tied: Vec<ConditionCode> = counts
        .into_iter()
        .filter(|(_, count)| *count == top)
        .map(|(code, _)| code)
        .collect();

    if let [only] = tied.as_slice() {
        return Some(*only);
    }

    samples
        .iter()
        .filter(|sample| tied.contains(&sample.condition))
        .min_by_key(|sample| noon_distance_secs(sample.at, offset))
        .map(|sample| sample.condition)
}

fn noon_distance_secs(at: DateTime<Utc>, offset: FixedOffset) -> u64 {
    let local = at.with_timezone(&offset);
    (i64::from(local.num_seconds_from_midnight()) - LOCAL_NOON_SECS).unsigned_abs()
}
