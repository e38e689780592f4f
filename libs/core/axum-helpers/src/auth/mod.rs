//! Session authentication: JWT access tokens whose `jti` is tracked in a
//! whitelist/blacklist store (Redis in production).
//!
//! ```ignore
//! let auth = JwtRedisAuth::new(redis_manager, &JwtConfig::from_env()?);
//!
//! let protected = Router::new()
//!     .route("/current", get(current))
//!     .layer(axum::middleware::from_fn_with_state(auth, jwt_auth_middleware));
//!
//! async fn current(user: CurrentUser) -> ApiResult<ApiResponse<i64>> { Ok(ApiResponse::ok(user.id)) }
//! ```

pub mod config;
pub mod jwt;
pub mod middleware;
pub mod principal;
pub mod store;

pub use config::JwtConfig;
pub use jwt::{ACCESS_TOKEN_TTL, IssuedToken, JwtClaims, JwtRedisAuth};
pub use middleware::{ACCESS_TOKEN_COOKIE, extract_token_from_request, jwt_auth_middleware};
pub use principal::{ADMIN_ROLE, AdminUser, CurrentUser, USER_ROLE};
pub use store::{InMemorySessionStore, RedisSessionStore, SessionStore};
