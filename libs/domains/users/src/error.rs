use axum::response::{IntoResponse, Response};
use axum_helpers::{ApiError, ErrorCode};
use sea_orm::DbErr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UserError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("account already exists")]
    DuplicateAccount,

    #[error("phone number already registered")]
    DuplicatePhone,

    #[error("email already registered")]
    DuplicateEmail,

    #[error("codes are being sent too frequently, try again later")]
    RateLimited,

    #[error("verification code is wrong or expired")]
    InvalidCode,

    #[error("wrong account or password")]
    InvalidCredentials,

    #[error("account is disabled")]
    AccountDisabled,

    #[error("{0}")]
    Unauthorized(String),

    #[error("failed to send verification code, try again later")]
    SendFailed(String),

    #[error("Password hashing error: {0}")]
    PasswordHash(String),

    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type UserResult<T> = Result<T, UserError>;

impl From<UserError> for ApiError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::Validation(_)
            | UserError::DuplicateAccount
            | UserError::DuplicatePhone
            | UserError::DuplicateEmail
            | UserError::RateLimited
            | UserError::InvalidCode => ApiError::params(err.to_string()),
            UserError::NotFound(_) => ApiError::null(err.to_string()),
            UserError::InvalidCredentials | UserError::AccountDisabled => {
                ApiError::no_login(err.to_string())
            }
            UserError::Unauthorized(msg) => ApiError::no_login(msg),
            UserError::SendFailed(reason) => {
                tracing::error!("Code dispatch failed: {}", reason);
                ApiError::system("failed to send verification code, try again later")
            }
            UserError::PasswordHash(msg) => {
                tracing::error!("Password hash error: {}", msg);
                ApiError::system(ErrorCode::SystemError.default_message())
            }
            UserError::Database(e) => {
                tracing::error!("Database error: {}", e);
                ApiError::system(ErrorCode::SystemError.default_message())
            }
            UserError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                ApiError::system(ErrorCode::SystemError.default_message())
            }
        }
    }
}

impl IntoResponse for UserError {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}
