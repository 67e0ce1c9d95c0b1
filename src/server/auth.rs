// ABOUTME: Static token check for the redeploy endpoint.
// ABOUTME: RequireToken extractor compares the raw Authorization header to the configured token.

use super::error::ApiError;
use super::ServerState;
use axum::extract::FromRequestParts;
use axum::http::header::{AUTHORIZATION, HeaderMap};
use axum::http::request::Parts;
use std::sync::Arc;

/// Present in a handler's arguments when the request carried the token.
#[derive(Debug, Clone)]
pub struct RequireToken;

impl FromRequestParts<Arc<ServerState>> for RequireToken {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<ServerState>,
    ) -> Result<Self, Self::Rejection> {
        verify_token(&parts.headers, &state.token)
    }
}

/// The header value must equal the token exactly, with no scheme prefix.
pub fn verify_token(headers: &HeaderMap, expected: &str) -> Result<RequireToken, ApiError> {
    match headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        Some(provided) if provided == expected => Ok(RequireToken),
        Some(_) => {
            tracing::warn!("invalid token provided");
            Err(ApiError::Unauthorized)
        }
        None => {
            tracing::warn!("missing Authorization header");
            Err(ApiError::Unauthorized)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn matching_token_passes() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("s3cret"));
        assert!(verify_token(&headers, "s3cret").is_ok());
    }

    #[test]
    fn bearer_prefix_is_not_stripped() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer s3cret"));
        assert!(verify_token(&headers, "s3cret").is_err());
    }

    #[test]
    fn missing_header_is_rejected() {
        assert!(verify_token(&HeaderMap::new(), "s3cret").is_err());
    }
}
