//! The `{success, code, data, message, description}` envelope shared by every
//! `/api` response, and the error type that renders into it.

pub mod codes;
pub mod handlers;
pub mod responses;

pub use codes::ErrorCode;

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use utoipa::ToSchema;
use validator::ValidationErrors;

/// Successful response envelope.
///
/// ```json
/// { "success": true, "code": 20000, "data": 42, "message": "ok", "description": "" }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub code: i32,
    pub data: Option<T>,
    pub message: String,
    pub description: String,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            code: ErrorCode::Success.code(),
            data: Some(data),
            message: ErrorCode::Success.default_message().to_string(),
            description: String::new(),
        }
    }
}

impl ApiResponse<()> {
    /// Success without a payload; `data` serializes as `null`.
    pub fn empty() -> Self {
        Self {
            data: None,
            ..Self::ok(())
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

/// Failure envelope. Same shape as [`ApiResponse`]; `data` carries
/// per-field validation details when there are any.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub success: bool,
    pub code: i32,
    pub data: Option<Value>,
    pub message: String,
    pub description: String,
}

/// Error returned by handlers. Renders as an [`ErrorResponse`] with the
/// status of its [`ErrorCode`].
#[derive(Debug, Error)]
#[error("{code}: {description}")]
pub struct ApiError {
    pub code: ErrorCode,
    pub description: String,
    pub details: Option<Value>,
}

impl ApiError {
    pub fn new(code: ErrorCode, description: impl Into<String>) -> Self {
        Self {
            code,
            description: description.into(),
            details: None,
        }
    }

    pub fn params(description: impl Into<String>) -> Self {
        Self::new(ErrorCode::ParamsError, description)
    }

    pub fn null(description: impl Into<String>) -> Self {
        Self::new(ErrorCode::NullError, description)
    }

    pub fn no_login(description: impl Into<String>) -> Self {
        Self::new(ErrorCode::NoLogin, description)
    }

    pub fn no_permission(description: impl Into<String>) -> Self {
        Self::new(ErrorCode::NoPermission, description)
    }

    pub fn system(description: impl Into<String>) -> Self {
        Self::new(ErrorCode::SystemError, description)
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn to_body(&self) -> ErrorResponse {
        ErrorResponse {
            success: false,
            code: self.code.code(),
            data: self.details.clone(),
            message: self.code.default_message().to_string(),
            description: self.description.clone(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let error_code = self.code.code();
        match self.code {
            ErrorCode::SystemError | ErrorCode::OperationError => {
                tracing::error!(error_code, description = %self.description, "Request failed");
            }
            ErrorCode::NoLogin | ErrorCode::NoPermission => {
                tracing::info!(error_code, description = %self.description, "Request rejected");
            }
            _ => {
                tracing::debug!(error_code, description = %self.description, "Request rejected");
            }
        }

        (self.code.status(), Json(self.to_body())).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::params(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::params(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::params(rejection.body_text())
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        let details = errors
            .field_errors()
            .iter()
            .map(|(field, errors)| {
                let entries: Vec<Value> = errors
                    .iter()
                    .map(|err| {
                        serde_json::json!({
                            "code": err.code,
                            "message": err.message,
                            "params": err.params,
                        })
                    })
                    .collect();
                (field.to_string(), Value::Array(entries))
            })
            .collect::<serde_json::Map<_, _>>();

        // Struct-level validators report under `__all__`; surface their message directly
        let description = errors
            .field_errors()
            .values()
            .flat_map(|errs| errs.iter())
            .find_map(|err| err.message.as_ref().map(|m| m.to_string()))
            .unwrap_or_else(|| "request validation failed".to_string());

        ApiError::params(description).with_details(Value::Object(details))
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
