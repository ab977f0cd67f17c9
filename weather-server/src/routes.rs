use axum::Json;
use axum::Router;
use axum::extract::{FromRequestParts, Path, Query, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::routing::get;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{self, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::error;
use weather_core::{
    ForecastReport, Suggestion, UnitSystem, WeatherError, WeatherReport, WeatherService,
};

use crate::error::{ApiError, envelope};

#[derive(Debug, Clone)]
pub struct AppState {
    pub service: Arc<WeatherService>,
}

impl AppState {
    pub fn new(service: WeatherService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}

pub fn router(state: AppState) -> Router {
    let cors_layer = CorsLayer::new()
        .allow_origin(cors::Any)
        .allow_methods(cors::Any)
        .allow_headers(cors::Any);

    Router::new()
        .route("/api/weather/{city}", get(weather))
        .route("/api/forecast/{city}", get(forecast))
        .route("/api/autocomplete/{query}", get(autocomplete))
        .route("/api/weather/", get(missing_query))
        .route("/api/forecast/", get(missing_query))
        .route("/api/autocomplete/", get(missing_query))
        .route("/api/cities", get(cities))
        .fallback(not_found)
        .with_state(state)
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
}

/// `Path` whose rejection uses the error envelope.
#[derive(Debug, FromRequestParts)]
#[from_request(via(Path), rejection(ApiError))]
struct CityPath<T>(T);

/// `Query` whose rejection uses the error envelope.
#[derive(Debug, FromRequestParts)]
#[from_request(via(Query), rejection(ApiError))]
struct Params<T>(T);

#[derive(Debug, Deserialize)]
struct UnitsParams {
    units: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ForecastParams {
    days: Option<String>,
    units: Option<String>,
}

#[derive(Debug, Serialize)]
struct CitiesResponse {
    cities: Vec<String>,
}

async fn weather(
    State(state): State<AppState>,
    CityPath(city): CityPath<String>,
    Params(params): Params<UnitsParams>,
) -> Result<Json<WeatherReport>, ApiError> {
    let units = UnitSystem::parse(params.units.as_deref())?;
    let report = state.service.weather_by_city(&city, units).await?;
    Ok(Json(report))
}

async fn forecast(
    State(state): State<AppState>,
    CityPath(city): CityPath<String>,
    Params(params): Params<ForecastParams>,
) -> Result<Json<ForecastReport>, ApiError> {
    let units = UnitSystem::parse(params.units.as_deref())?;
    let days = parse_days(params.days.as_deref())?;
    let report = state.service.forecast_by_city(&city, days, units).await?;
    Ok(Json(report))
}

/// `units` does not change the suggestions but is still validated so every
/// endpoint answers an unknown unit the same way.
async fn autocomplete(
    State(state): State<AppState>,
    CityPath(query): CityPath<String>,
    Params(params): Params<UnitsParams>,
) -> Result<Json<Vec<Suggestion>>, ApiError> {
    UnitSystem::parse(params.units.as_deref())?;
    let suggestions = state.service.autocomplete(&query).await?;
    Ok(Json(suggestions))
}

async fn cities(State(state): State<AppState>) -> Json<CitiesResponse> {
    Json(CitiesResponse {
        cities: state.service.popular_cities().to_vec(),
    })
}

async fn missing_query() -> ApiError {
    ApiError(WeatherError::invalid_query("city name must not be empty"))
}

async fn not_found() -> Response {
    envelope(
        StatusCode::NOT_FOUND,
        "NotFound",
        "No such endpoint.".to_string(),
        None,
    )
}

fn panic_response(_panic: Box<dyn Any + Send + 'static>) -> Response {
    error!("handler panicked");
    envelope(
        StatusCode::INTERNAL_SERVER_ERROR,
        "InternalError",
        "Internal server error.".to_string(),
        None,
    )
}

/// `days` is optional; a value that is not a whole number is rejected
/// rather than silently defaulted. Out-of-range numbers are clamped later.
fn parse_days(raw: Option<&str>) -> Result<Option<u32>, WeatherError> {
    let Some(raw) = raw.map(str::trim).filter(|value| !value.is_empty()) else {
        return Ok(None);
    };

    let days = raw.parse::<i64>().map_err(|_| {
        WeatherError::invalid_query(format!("days must be a whole number, got '{raw}'"))
    })?;

    Ok(Some(days.clamp(0, i64::from(u32::MAX)) as u32))
}
