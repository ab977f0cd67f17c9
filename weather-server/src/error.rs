//! Translation of core faults into the external error envelope.
//!
//! Every error response has the shape
//! `{"error": {"kind": "...", "message": "...", "retryAfterSecs": n}}`.

use axum::Json;
use axum::extract::rejection::{PathRejection, QueryRejection};
use axum::http::header::RETRY_AFTER;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::{error, warn};
use weather_core::WeatherError;

#[derive(Debug)]
pub struct ApiError(pub WeatherError);

impl From<WeatherError> for ApiError {
    fn from(err: WeatherError) -> Self {
        Self(err)
    }
}

/// A path segment that cannot be decoded is a malformed query.
impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self(WeatherError::invalid_query(rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self(WeatherError::invalid_query(rejection.body_text()))
    }
}

#[derive(Debug, Serialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    kind: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    retry_after_secs: Option<u64>,
}

pub fn status_for(err: &WeatherError) -> StatusCode {
    match err {
        WeatherError::InvalidQuery(_) | WeatherError::InvalidUnit(_) => StatusCode::BAD_REQUEST,
        WeatherError::AmbiguousOrNotFound(_) | WeatherError::NotFound(_) => StatusCode::NOT_FOUND,
        WeatherError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
        WeatherError::UpstreamUnavailable(_) | WeatherError::Parse(_) => StatusCode::BAD_GATEWAY,
        WeatherError::Authentication(_) | WeatherError::Configuration(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

pub(crate) fn envelope(
    status: StatusCode,
    kind: &'static str,
    message: String,
    retry_after_secs: Option<u64>,
) -> Response {
    let body = ErrorEnvelope {
        error: ErrorBody {
            kind,
            message,
            retry_after_secs,
        },
    };
    (status, Json(body)).into_response()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = self.0;
        let status = status_for(&err);
        let kind = err.kind();

        if status.is_server_error() {
            error!(kind, status = %status, error = %err, "request failed");
        } else {
            warn!(kind, status = %status, error = %err, "request rejected");
        }

        let retry_after_secs = match err {
            WeatherError::RateLimited { retry_after_secs } => retry_after_secs,
            _ => None,
        };

        let mut response = envelope(status, kind, err.user_message(), retry_after_secs);
        if let Some(secs) = retry_after_secs {
            response
                .headers_mut()
                .insert(RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}
