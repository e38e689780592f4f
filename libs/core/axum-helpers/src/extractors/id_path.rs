//! Numeric id path parameter.

use crate::errors::ApiError;
use axum::{
    extract::{FromRequestParts, Path},
    http::request::Parts,
};

/// A positive `i64` record id from the path, e.g. `/users/{id}`.
pub struct IdPath(pub i64);

impl<S> FromRequestParts<S> for IdPath
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state).await?;

        match raw.parse::<i64>() {
            Ok(id) if id > 0 => Ok(IdPath(id)),
            _ => Err(ApiError::params(format!("invalid id: {raw}"))),
        }
    }
}
