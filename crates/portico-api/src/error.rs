//! Error responses
//!
//! Every failure leaves the API as JSON:
//!
//! ```json
//! {"code": "InternalError", "message": "...", "health": {...}, "attempts": [...]}
//! ```
//!
//! `health` and `attempts` are present only when the error carries them.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use portico_core::types::{AttemptLog, HealthSnapshot};
use portico_core::Error;
use serde::Serialize;
use tracing::{debug, error};

/// Error response wrapper
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    code: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    health: Option<&'a HealthSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    attempts: Option<&'a AttemptLog>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = self.0;
        let status =
            StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            error!(code = err.code(), "Request failed: {}", err);
        } else {
            debug!(code = err.code(), "Request rejected: {}", err);
        }

        let body = ErrorBody {
            code: err.code(),
            message: err.to_string(),
            health: err.health(),
            attempts: err.attempts(),
        };

        (status, Json(body)).into_response()
    }
}
