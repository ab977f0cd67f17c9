//! Free-text city query to candidate locations.

use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::cache::TtlCache;
use crate::config::{CacheSettings, LookupSettings};
use crate::error::{Result, WeatherError};
use crate::model::Location;
use crate::provider::WeatherProvider;

pub const MAX_QUERY_CHARS: usize = 100;

/// What a user typed into the city box.
#[derive(Debug, Clone, PartialEq)]
pub enum LocationQuery {
    Name(String),
    /// `"lat,lon"` or `"lat lon"`; skips geocoding.
    Coordinates(Location),
}

impl LocationQuery {
    pub fn parse(raw: &str) -> Result<Self> {
        let query = normalize_query(raw)?;

        if let Some((lat, lon)) = split_coordinates(query) {
            return Location::from_coordinates(lat, lon)
                .map(LocationQuery::Coordinates)
                .map_err(|_| {
                    WeatherError::invalid_query(format!("coordinates out of range: {query}"))
                });
        }

        Ok(LocationQuery::Name(query.to_string()))
    }
}

fn normalize_query(raw: &str) -> Result<&str> {
    let query = raw.trim();

    if query.is_empty() {
        return Err(WeatherError::invalid_query("city name must not be empty"));
    }

    if query.chars().count() > MAX_QUERY_CHARS {
        return Err(WeatherError::invalid_query(format!(
            "city name must be at most {MAX_QUERY_CHARS} characters"
        )));
    }

    Ok(query)
}

fn split_coordinates(query: &str) -> Option<(f64, f64)> {
    let (lat, lon) = query
        .split_once(',')
        .or_else(|| query.split_once(char::is_whitespace))?;

    let lat = lat.trim().parse::<f64>().ok()?;
    let lon = lon.trim().parse::<f64>().ok()?;
    Some((lat, lon))
}

#[derive(Debug)]
pub struct CityResolver {
    provider: Arc<dyn WeatherProvider>,
    cache: TtlCache<(String, usize), Vec<Location>>,
    tolerance_deg: f64,
    default_limit: usize,
}

impl CityResolver {
    pub fn new(
        provider: Arc<dyn WeatherProvider>,
        lookup: &LookupSettings,
        cache: &CacheSettings,
    ) -> Self {
        Self {
            provider,
            cache: TtlCache::new(Duration::from_secs(cache.ttl_secs), cache.max_entries),
            tolerance_deg: lookup.dedup_tolerance_deg,
            default_limit: lookup.resolve_limit,
        }
    }

    /// Deduplicated candidates in provider relevance order, at most `limit`.
    /// No match is an empty list, not an error.
    pub async fn resolve(&self, query: &str, limit: usize) -> Result<Vec<Location>> {
        let query = normalize_query(query)?;
        if limit == 0 {
            return Ok(Vec::new());
        }

        let key = (query.to_lowercase(), limit);
        if let Some(hit) = self.cache.get(&key) {
            debug!(query, limit, "geocode cache hit");
            return Ok(hit);
        }

        let candidates = self.provider.geocode(query, limit).await?;
        let received = candidates.len();

        let mut locations = dedupe(candidates, self.tolerance_deg);
        locations.truncate(limit);
        debug!(query, received, kept = locations.len(), "resolved city query");

        Ok(self.cache.insert(key, locations))
    }

    /// Single location for a city box entry: coordinates are taken as-is,
    /// names resolve to the most relevant candidate.
    pub async fn locate(&self, query: &str) -> Result<Location> {
        match LocationQuery::parse(query)? {
            LocationQuery::Coordinates(location) => Ok(location),
            LocationQuery::Name(name) => {
                let candidates = self.resolve(&name, self.default_limit).await?;
                candidates
                    .into_iter()
                    .next()
                    .ok_or(WeatherError::AmbiguousOrNotFound(name))
            }
        }
    }
}

/// Collapse candidates that name the same place.
///
/// Two entries match when their names agree case-insensitively, their
/// country codes agree case-insensitively and both coordinates lie within
/// `tolerance_deg`. A later match only replaces the kept entry if it adds a
/// region the kept one lacks.
pub fn dedupe(candidates: Vec<Location>, tolerance_deg: f64) -> Vec<Location> {
    let mut kept: Vec<Location> = Vec::with_capacity(candidates.len());

    for candidate in candidates {
        match kept
            .iter_mut()
            .find(|existing| same_place(existing, &candidate, tolerance_deg))
        {
            Some(existing) => {
                if existing.region().is_none() && candidate.region().is_some() {
                    *existing = candidate;
                }
            }
            None => kept.push(candidate),
        }
    }

    kept
}

fn same_place(a: &Location, b: &Location, tolerance_deg: f64) -> bool {
    a.name().to_lowercase() == b.name().to_lowercase()
        && a.country().eq_ignore_ascii_case(b.country())
        && (a.lat() - b.lat()).abs() <= tolerance_deg
        && (a.lon() - b.lon()).abs() <= tolerance_deg
}
