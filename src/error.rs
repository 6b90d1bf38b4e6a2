use axum::Json;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use crate::proxy_path::PathViolation;

// Proxy-originated failures. Upstream HTTP error statuses are not errors
// here - the handler relays those untouched, body and all.
#[derive(Debug, Error)]
pub enum EdgeError {
    #[error("invalid proxy path")]
    InvalidPath(Vec<PathViolation>),

    #[error("rate limit exceeded, retry in {retry_after}s")]
    RateLimited { limit: u32, retry_after: u64 },

    #[error("upstream request failed: {0}")]
    Upstream(#[from] reqwest::Error),
}

impl IntoResponse for EdgeError {
    fn into_response(self) -> Response {
        match self {
            EdgeError::InvalidPath(violations) => (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "error": "invalid proxy path",
                    "details": violations,
                })),
            )
                .into_response(),

            EdgeError::RateLimited { limit, retry_after } => {
                let mut response = (
                    StatusCode::TOO_MANY_REQUESTS,
                    Json(json!({ "error": "rate limit exceeded" })),
                )
                    .into_response();
                let headers = response.headers_mut();
                headers.insert("retry-after", HeaderValue::from(retry_after));
                headers.insert("x-ratelimit-limit", HeaderValue::from(limit));
                headers.insert("x-ratelimit-remaining", HeaderValue::from_static("0"));
                response
            }

            EdgeError::Upstream(err) => {
                tracing::error!(error = %err, "upstream call failed");
                (
                    StatusCode::BAD_GATEWAY,
                    Json(json!({ "error": "upstream unavailable" })),
                )
                    .into_response()
            }
        }
    }
}
