use axum::response::{IntoResponse, Response};

use super::ApiError;

/// Router fallback: 404 with the standard envelope.
pub async fn not_found() -> Response {
    ApiError::null("the requested resource was not found").into_response()
}
