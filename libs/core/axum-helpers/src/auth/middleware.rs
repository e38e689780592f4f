use super::jwt::JwtRedisAuth;
use crate::errors::ApiError;
use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

/// Cookie that carries the access token for browser clients.
pub const ACCESS_TOKEN_COOKIE: &str = "access_token";

/// Token from `Authorization: Bearer ..`, else the `access_token` cookie.
pub fn extract_token_from_request(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|auth| auth.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
        .or_else(|| {
            headers
                .get_all("cookie")
                .iter()
                .filter_map(|v| v.to_str().ok())
                .flat_map(|cookies| cookies.split(';'))
                .find_map(|cookie| {
                    let (name, value) = cookie.trim().split_once('=')?;
                    (name == ACCESS_TOKEN_COOKIE && !value.is_empty()).then(|| value.to_string())
                })
        })
}

/// Rejects requests without a live session with `NO_LOGIN`; otherwise puts
/// the [`JwtClaims`](super::JwtClaims) into request extensions.
pub async fn jwt_auth_middleware(
    State(auth): State<JwtRedisAuth>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(token) = extract_token_from_request(&headers) else {
        tracing::debug!("no token in Authorization header or cookie");
        return Err(ApiError::no_login("no token provided"));
    };

    let claims = auth.verify_token(&token).map_err(|e| {
        tracing::debug!("JWT verification failed: {e}");
        ApiError::no_login("invalid or expired token")
    })?;

    match auth.is_token_blacklisted(&claims.jti).await {
        Ok(false) => {}
        Ok(true) => {
            tracing::debug!(jti = %claims.jti, "token is blacklisted");
            return Err(ApiError::no_login("token has been revoked"));
        }
        Err(e) => {
            tracing::error!("session store error checking blacklist: {e}");
            return Err(ApiError::system("session store unavailable"));
        }
    }

    match auth.is_token_whitelisted(&claims.jti).await {
        Ok(true) => {}
        Ok(false) => {
            tracing::debug!(jti = %claims.jti, "token is not whitelisted");
            return Err(ApiError::no_login("session not found"));
        }
        Err(e) => {
            tracing::error!("session store error checking whitelist: {e}");
            return Err(ApiError::system("session store unavailable"));
        }
    }

    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{InMemorySessionStore, JwtConfig};
    use axum::{Router, body::Body, http::StatusCode, routing::get};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn header_map(name: &'static str, value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(name, value.parse().unwrap());
        headers
    }

    #[test]
    fn test_extract_token_prefers_bearer() {
        let mut headers = header_map("authorization", "Bearer abc");
        headers.insert("cookie", "access_token=def".parse().unwrap());
        assert_eq!(extract_token_from_request(&headers).as_deref(), Some("abc"));
    }

    #[test]
    fn test_extract_token_from_cookie() {
        let headers = header_map("cookie", "theme=dark; access_token=def");
        assert_eq!(extract_token_from_request(&headers).as_deref(), Some("def"));
        assert_eq!(extract_token_from_request(&HeaderMap::new()), None);
    }

    async fn call(auth: &JwtRedisAuth, token: Option<&str>) -> StatusCode {
        let app = Router::new()
            .route("/me", get(|| async { "ok" }))
            .layer(axum::middleware::from_fn_with_state(auth.clone(), jwt_auth_middleware));

        let mut builder = axum::http::Request::builder().uri("/me");
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        app.oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn test_middleware_session_lifecycle() {
        let config = JwtConfig::new("middleware-test-secret-long-enough-000").unwrap();
        let auth = JwtRedisAuth::with_store(Arc::new(InMemorySessionStore::new()), &config);

        assert_eq!(call(&auth, None).await, StatusCode::UNAUTHORIZED);

        let issued = auth.open_session(5, "zixi_05", &[]).await.unwrap();
        assert_eq!(call(&auth, Some(&issued.token)).await, StatusCode::OK);

        auth.revoke(&issued.claims).await.unwrap();
        assert_eq!(call(&auth, Some(&issued.token)).await, StatusCode::UNAUTHORIZED);

        let (unregistered, _) = auth.create_access_token(5, "zixi_05", &[]).unwrap();
        assert_eq!(call(&auth, Some(&unregistered)).await, StatusCode::UNAUTHORIZED);
    }
}
