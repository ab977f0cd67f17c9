//! HTTP surface of the weather dashboard.
//!
//! Handlers in [`routes`] only parse transport input and hand off to
//! [`weather_core::WeatherService`]; [`error::ApiError`] is the single place
//! where core faults become HTTP responses.

pub mod error;
pub mod routes;
pub mod web;

pub use error::ApiError;
pub use routes::{AppState, router};
