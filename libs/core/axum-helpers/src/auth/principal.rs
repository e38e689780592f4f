//! The authenticated caller, as seen by handlers.

use super::jwt::JwtClaims;
use crate::errors::ApiError;
use axum::{extract::FromRequestParts, http::request::Parts};

pub const USER_ROLE: &str = "USER";
pub const ADMIN_ROLE: &str = "ADMIN";

/// Request-scoped principal built from the claims the auth middleware
/// verified. Missing claims reject with `NO_LOGIN`.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: i64,
    pub account: String,
    pub roles: Vec<String>,
    pub claims: JwtClaims,
}

impl CurrentUser {
    pub fn is_admin(&self) -> bool {
        self.roles.iter().any(|role| role == ADMIN_ROLE)
    }

    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(ApiError::no_permission("administrator role required"))
        }
    }
}

impl TryFrom<JwtClaims> for CurrentUser {
    type Error = ApiError;

    fn try_from(claims: JwtClaims) -> Result<Self, Self::Error> {
        let id = claims
            .sub
            .parse::<i64>()
            .map_err(|_| ApiError::no_login("malformed session subject"))?;

        Ok(Self {
            id,
            account: claims.account.clone(),
            roles: claims.roles.clone(),
            claims,
        })
    }
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<JwtClaims>()
            .cloned()
            .ok_or_else(|| ApiError::no_login("not logged in"))
            .and_then(CurrentUser::try_from)
    }
}

/// A [`CurrentUser`] holding the ADMIN role; anyone else gets `NO_PERMISSION`.
#[derive(Debug, Clone)]
pub struct AdminUser(pub CurrentUser);

impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = CurrentUser::from_request_parts(parts, state).await?;
        user.require_admin()?;
        Ok(AdminUser(user))
    }
}
