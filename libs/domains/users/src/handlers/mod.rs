//! HTTP surface: `/users` for account holders, `/admin` for administrators.

pub mod admin;
pub mod users;

use axum::Router;
use axum::http::HeaderValue;
use axum_helpers::{ACCESS_TOKEN_COOKIE, JwtRedisAuth};

use crate::error::{UserError, UserResult};
use crate::service::{AdminService, UserService};

/// Everything the handlers need, cloned per request.
#[derive(Clone)]
pub struct UsersState {
    pub users: UserService,
    pub admin: AdminService,
    pub auth: JwtRedisAuth,
    /// Adds `Secure` to the session cookie.
    pub secure_cookies: bool,
}

/// Both routers, to be nested under `/api`.
pub fn router(state: UsersState) -> Router {
    Router::new()
        .nest("/users", users::router(state.clone()))
        .nest("/admin", admin::router(state))
}

fn cookie_header(value: &str, max_age: i64, secure: bool) -> UserResult<HeaderValue> {
    let secure_flag = if secure { " Secure;" } else { "" };
    let cookie = format!(
        "{ACCESS_TOKEN_COOKIE}={value}; HttpOnly;{secure_flag} SameSite=Strict; Path=/; Max-Age={max_age}"
    );
    HeaderValue::from_str(&cookie)
        .map_err(|e| UserError::Internal(format!("Failed to create cookie: {e}")))
}

pub(crate) fn session_cookie(token: &str, max_age: i64, secure: bool) -> UserResult<HeaderValue> {
    cookie_header(token, max_age, secure)
}

pub(crate) fn cleared_cookie(secure: bool) -> UserResult<HeaderValue> {
    cookie_header("", 0, secure)
}
