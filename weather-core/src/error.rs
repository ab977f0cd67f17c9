//! Error taxonomy shared by every component of the core.
//!
//! Components never swallow these: they propagate with `?` up to the
//! request layer, which is the only place that turns them into an external
//! response.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, WeatherError>;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum WeatherError {
    /// Bad or empty user input.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// Resolution produced no candidate for the query.
    #[error("no location matches '{0}'")]
    AmbiguousOrNotFound(String),

    /// The provider answered 404.
    #[error("not found: {0}")]
    NotFound(String),

    #[error("rate limited by the weather provider")]
    RateLimited { retry_after_secs: Option<u64> },

    /// Timeout, transport failure or a 5xx from the provider.
    #[error("weather provider unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("weather provider rejected the credential: {0}")]
    Authentication(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("unrecognized unit '{0}'")]
    InvalidUnit(String),

    /// The provider answered with a body that failed validation.
    #[error("malformed provider response: {0}")]
    Parse(String),
}

impl WeatherError {
    pub fn invalid_query<S: Into<String>>(message: S) -> Self {
        Self::InvalidQuery(message.into())
    }

    pub fn upstream<S: Into<String>>(message: S) -> Self {
        Self::UpstreamUnavailable(message.into())
    }

    pub fn parse<S: Into<String>>(message: S) -> Self {
        Self::Parse(message.into())
    }

    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration(message.into())
    }

    /// Stable machine-readable identifier used in the external error envelope.
    pub fn kind(&self) -> &'static str {
        match self {
            WeatherError::InvalidQuery(_) => "InvalidQuery",
            WeatherError::AmbiguousOrNotFound(_) => "AmbiguousOrNotFound",
            WeatherError::NotFound(_) => "NotFound",
            WeatherError::RateLimited { .. } => "RateLimited",
            WeatherError::UpstreamUnavailable(_) => "UpstreamUnavailable",
            WeatherError::Authentication(_) => "AuthenticationError",
            WeatherError::Configuration(_) => "ConfigurationError",
            WeatherError::InvalidUnit(_) => "InvalidUnit",
            WeatherError::Parse(_) => "ParseError",
        }
    }

    /// Message that is safe to show to API clients.
    ///
    /// Upstream and credential faults get a fixed sentence; their detail only
    /// goes to the logs.
    pub fn user_message(&self) -> String {
        match self {
            WeatherError::InvalidQuery(message) => format!("Invalid query: {message}"),
            WeatherError::AmbiguousOrNotFound(query) => {
                format!("No city found matching '{query}'.")
            }
            WeatherError::NotFound(_) => {
                "The weather provider has no data for this location.".to_string()
            }
            WeatherError::RateLimited { .. } => {
                "Too many requests to the weather provider. Please retry later.".to_string()
            }
            WeatherError::UpstreamUnavailable(_) => {
                "The weather provider is currently unavailable. Please try again later."
                    .to_string()
            }
            WeatherError::Authentication(_) | WeatherError::Configuration(_) => {
                "The weather service is misconfigured.".to_string()
            }
            WeatherError::InvalidUnit(unit) => {
                format!("Unrecognized unit '{unit}'. Use 'metric' or 'imperial'.")
            }
            WeatherError::Parse(_) => {
                "The weather provider returned an unexpected response.".to_string()
            }
        }
    }
}
