//! Business error codes carried in every API envelope.
//!
//! Each code has a stable integer (what clients branch on), a wire name, a
//! default message and the HTTP status it travels with.
//!
//! ```rust
//! use axum_helpers::errors::ErrorCode;
//!
//! let code = ErrorCode::ParamsError;
//! assert_eq!(code.as_str(), "PARAMS_ERROR");
//! assert_eq!(code.code(), 40000);
//! ```

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    Success,
    /// Malformed or rejected request parameters, and business-rule violations
    ParamsError,
    /// The requested record does not exist
    NullError,
    /// No valid session
    NoLogin,
    /// Session present but lacking the required role
    NoPermission,
    SystemError,
    /// A write that should have affected a row did not
    OperationError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::Success => "SUCCESS",
            ErrorCode::ParamsError => "PARAMS_ERROR",
            ErrorCode::NullError => "NULL_ERROR",
            ErrorCode::NoLogin => "NO_LOGIN",
            ErrorCode::NoPermission => "NO_PERMISSION",
            ErrorCode::SystemError => "SYSTEM_ERROR",
            ErrorCode::OperationError => "OPERATION_ERROR",
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            ErrorCode::Success => 20000,
            ErrorCode::ParamsError => 40000,
            ErrorCode::NullError => 40001,
            ErrorCode::NoLogin => 40100,
            ErrorCode::NoPermission => 40101,
            ErrorCode::SystemError => 50000,
            ErrorCode::OperationError => 50001,
        }
    }

    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorCode::Success => "ok",
            ErrorCode::ParamsError => "request parameter error",
            ErrorCode::NullError => "requested data is empty",
            ErrorCode::NoLogin => "not logged in",
            ErrorCode::NoPermission => "no permission",
            ErrorCode::SystemError => "internal system error",
            ErrorCode::OperationError => "operation failed",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ErrorCode::Success => StatusCode::OK,
            ErrorCode::ParamsError => StatusCode::BAD_REQUEST,
            ErrorCode::NullError => StatusCode::NOT_FOUND,
            ErrorCode::NoLogin => StatusCode::UNAUTHORIZED,
            ErrorCode::NoPermission => StatusCode::FORBIDDEN,
            ErrorCode::SystemError | ErrorCode::OperationError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
