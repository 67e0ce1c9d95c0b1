// ABOUTME: HTTP error responses for the redeploy endpoint.
// ABOUTME: Failures are returned as plain text so callers see the error message as-is.

use crate::error::Error;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

#[derive(Debug)]
pub enum ApiError {
    /// 401, missing or wrong Authorization header.
    Unauthorized,
    /// 500 with the failure message as the body.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized").into_response(),
            ApiError::Internal(message) => {
                (StatusCode::INTERNAL_SERVER_ERROR, message).into_response()
            }
        }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        tracing::error!(error = %err, "redeploy failed");
        ApiError::Internal(err.to_string())
    }
}
