//! # Axum Helpers
//!
//! Shared HTTP plumbing for the usercenter services.
//!
//! - **[`errors`]**: the `{success, code, data, message, description}` envelope and error codes
//! - **[`auth`]**: JWT sessions tracked in Redis, auth middleware, `CurrentUser`/`AdminUser`
//! - **[`extractors`]**: `ValidatedJson`, `IdPath`, `ClientContext`
//! - **[`server`]**: router assembly with OpenAPI UIs, health probes, graceful shutdown
//! - **[`http`]**: CORS and security headers
//! - **[`audit`]**: audit events on the `audit` tracing target
//!
//! ```ignore
//! let router = create_router::<ApiDoc>(api_routes, &config.server)?
//!     .merge(health_router(app_info!()));
//! create_production_app(router, &config.server, config.server.shutdown_timeout, cleanup).await?;
//! ```

pub mod audit;
pub mod auth;
pub mod errors;
pub mod extractors;
pub mod http;
pub mod server;

pub use auth::{
    ACCESS_TOKEN_COOKIE, ACCESS_TOKEN_TTL, ADMIN_ROLE, AdminUser, CurrentUser,
    InMemorySessionStore, IssuedToken, JwtClaims, JwtConfig, JwtRedisAuth, RedisSessionStore,
    SessionStore, USER_ROLE, jwt_auth_middleware,
};

pub use server::{
    HealthCheckFuture, HealthResponse, ShutdownCoordinator, create_production_app,
    create_router, health_router, run_health_checks, shutdown_signal,
};

pub use http::{cors_layer_from_env, create_cors_layer, security_headers};

pub use errors::{ApiError, ApiResponse, ApiResult, ErrorCode, ErrorResponse};

pub use extractors::{ClientContext, IdPath, ValidatedJson};

pub use audit::{AuditEvent, AuditOutcome, extract_ip_from_headers, extract_user_agent};
