//! JSON body extractor that also runs `validator` rules.

use crate::errors::ApiError;
use axum::extract::{FromRequest, Json, Request};
use serde::de::DeserializeOwned;
use validator::Validate;

/// Deserializes the body and validates it.
///
/// Both malformed JSON and failed rules reject with `PARAMS_ERROR` (400);
/// rule failures carry per-field details in `data`.
///
/// ```ignore
/// async fn register(ValidatedJson(req): ValidatedJson<RegisterRequest>) -> ApiResult<ApiResponse<i64>> { .. }
/// ```
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(data) = Json::<T>::from_request(req, state).await?;
        data.validate()?;
        Ok(ValidatedJson(data))
    }
}
