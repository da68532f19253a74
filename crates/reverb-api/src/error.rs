//! Error types for the API server.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use reverb_logs::LogError;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

/// Result type alias for API operations.
pub type ApiResult<T> = Result<T, ApiError>;

/// Errors returned by request handlers.
///
/// Every variant renders as `{"error": "<message>"}`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Failed to bind to the specified address.
    #[error("failed to bind to {0}: {1}")]
    BindFailed(std::net::SocketAddr, std::io::Error),

    /// Malformed request.
    #[error("{0}")]
    BadRequest(String),

    /// Resource or page not found.
    #[error("{0}")]
    NotFound(String),

    /// Server-side failure; the message is safe to show clients.
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    /// Maps a query-engine error, hiding store details behind `public`.
    pub fn from_log_error(err: LogError, public: &str) -> Self {
        match err {
            LogError::Validation(message) => {
                warn!(%message, "rejected request");
                Self::BadRequest(message)
            }
            LogError::NotFound(message) => Self::NotFound(message),
            other @ (LogError::Store(_) | LogError::Serialization(_)) => {
                error!(error = %other, "{public}");
                Self::Internal(public.to_string())
            }
        }
    }

    /// Returns a closure for `map_err` that maps with [`Self::from_log_error`].
    pub fn or_internal(public: &'static str) -> impl Fn(LogError) -> Self {
        move |err| Self::from_log_error(err, public)
    }

    const fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BindFailed(_, _) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// JSON error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorResponse {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_json(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_validation_maps_to_bad_request() {
        let err = ApiError::from_log_error(
            LogError::validation("startTime and endTime must be provided together and be valid"),
            "Error retrieving event logs",
        );
        let (status, json) = body_json(err).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            json["error"],
            "startTime and endTime must be provided together and be valid"
        );
    }

    #[tokio::test]
    async fn test_not_found_keeps_message() {
        let err = ApiError::from_log_error(LogError::NotFound("Page not found".into()), "unused");
        let (status, json) = body_json(err).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"], "Page not found");
    }

    #[tokio::test]
    async fn test_store_error_is_hidden() {
        let err = ApiError::from_log_error(
            LogError::store("connection refused at 10.0.0.4"),
            "Error retrieving event logs",
        );
        let (status, json) = body_json(err).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json, serde_json::json!({ "error": "Error retrieving event logs" }));
    }

    #[test]
    fn test_or_internal_closure() {
        let map = ApiError::or_internal("Error retrieving logs");
        assert!(matches!(map(LogError::store("down")), ApiError::Internal(_)));
        assert!(matches!(map(LogError::validation("bad")), ApiError::BadRequest(_)));
    }
}
