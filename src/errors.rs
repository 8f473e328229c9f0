use crate::services::redirect_service::RedirectError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

/// A lightweight wrapper for general errors that keeps the message local.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    /// Create a new AppError with a specific status and message.
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
        }
    }

    /// Shortcut for a 500 Internal Server Error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    /// Shortcut for 404 Not Found
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, msg)
    }

    /// Shortcut for 400 Bad Request
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.message,
            "status": self.status.as_u16()
        }));

        (self.status, body).into_response()
    }
}

impl From<RedirectError> for AppError {
    fn from(err: RedirectError) -> Self {
        match err {
            RedirectError::MissingBucket | RedirectError::InvalidPattern { .. } => {
                AppError::bad_request(err.to_string())
            }
            RedirectError::EmptyListing | RedirectError::NoMatch(_) => {
                AppError::not_found(err.to_string())
            }
            RedirectError::Storage(_) => {
                tracing::error!(error = %err, "object listing failed");
                AppError::internal(err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::listing::StorageError;
    use axum::body::to_bytes;

    #[test]
    fn redirect_errors_map_to_status_codes() {
        let cases = [
            (RedirectError::MissingBucket, StatusCode::BAD_REQUEST),
            (RedirectError::EmptyListing, StatusCode::NOT_FOUND),
            (RedirectError::NoMatch("x".into()), StatusCode::NOT_FOUND),
            (
                RedirectError::Storage(StorageError::Listing {
                    bucket: "b".into(),
                    message: "timeout".into(),
                }),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(AppError::from(err).status, status);
        }
    }

    #[tokio::test]
    async fn error_body_is_json() {
        let response = AppError::not_found("No files found in specified location").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "No files found in specified location");
        assert_eq!(body["status"], 404);
    }
}
