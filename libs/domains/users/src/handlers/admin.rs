use axum::{
    Router,
    extract::State,
    middleware,
    routing::{get, post, put},
};
use axum_helpers::{
    AdminUser, ApiResponse, ApiResult, AuditEvent, AuditOutcome, ClientContext, IdPath,
    ValidatedJson,
    errors::responses::{
        BadRequestResponse, ForbiddenResponse, InternalServerErrorResponse, NotFoundResponse,
        UnauthorizedResponse,
    },
    jwt_auth_middleware,
};
use serde_json::json;
use utoipa::OpenApi;

use super::UsersState;
use crate::error::UserResult;
use crate::models::{
    LoginHistory, LoginHistoryQuery, PageResult, Role, UpdateRoleRequest, UpdateStatusRequest,
    UserQuery, UserResponse,
};

pub const TAG: &str = "admin";

#[derive(OpenApi)]
#[openapi(
    paths(
        query_users,
        list_users,
        get_user,
        delete_user,
        update_status,
        update_role,
        query_login_history,
    ),
    components(
        schemas(
            UserQuery,
            LoginHistoryQuery,
            UpdateStatusRequest,
            UpdateRoleRequest,
            UserResponse,
            LoginHistory,
            Role,
        ),
        responses(
            BadRequestResponse,
            UnauthorizedResponse,
            ForbiddenResponse,
            NotFoundResponse,
            InternalServerErrorResponse
        )
    ),
    tags(
        (name = "admin", description = "Administrator user management")
    )
)]
pub struct ApiDoc;

#[allow(deprecated)]
pub fn router(state: UsersState) -> Router {
    Router::new()
        .route("/users/query", post(query_users))
        .route("/users", get(list_users))
        .route("/users/{id}", get(get_user).delete(delete_user))
        .route("/users/{id}/status", put(update_status))
        .route("/users/{id}/role", put(update_role))
        .route("/login-history/query", post(query_login_history))
        .route_layer(middleware::from_fn_with_state(
            state.auth.clone(),
            jwt_auth_middleware,
        ))
        .with_state(state)
}

/// Logs an admin mutation with its outcome and passes the result through.
fn audit<T>(
    admin: &AdminUser,
    client: &ClientContext,
    action: &str,
    id: i64,
    details: serde_json::Value,
    result: UserResult<T>,
) -> UserResult<T> {
    let outcome = if result.is_ok() {
        AuditOutcome::Success
    } else {
        AuditOutcome::Failure
    };
    AuditEvent::new(
        Some(admin.0.id.to_string()),
        action,
        Some(format!("user:{id}")),
        outcome,
    )
    .with_client(client)
    .with_details(details)
    .log();
    result
}

/// Search accounts
#[utoipa::path(
    post,
    path = "/users/query",
    tag = TAG,
    request_body = UserQuery,
    responses(
        (status = 200, description = "One page of accounts", body = ApiResponse<PageResult<UserResponse>>),
        (status = 400, response = BadRequestResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 403, response = ForbiddenResponse),
        (status = 500, response = InternalServerErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn query_users(
    State(state): State<UsersState>,
    _admin: AdminUser,
    ValidatedJson(query): ValidatedJson<UserQuery>,
) -> ApiResult<ApiResponse<PageResult<UserResponse>>> {
    Ok(ApiResponse::ok(state.admin.query_users(query).await?))
}

/// All accounts, unpaged
#[utoipa::path(
    get,
    path = "/users",
    tag = TAG,
    responses(
        (status = 200, description = "Every live account", body = ApiResponse<Vec<UserResponse>>),
        (status = 401, response = UnauthorizedResponse),
        (status = 403, response = ForbiddenResponse),
        (status = 500, response = InternalServerErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[deprecated(note = "use POST /admin/users/query")]
async fn list_users(
    State(state): State<UsersState>,
    _admin: AdminUser,
) -> ApiResult<ApiResponse<Vec<UserResponse>>> {
    Ok(ApiResponse::ok(state.admin.list_users().await?))
}

/// One account by id
#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = TAG,
    params(("id" = i64, Path, description = "User id")),
    responses(
        (status = 200, description = "Account", body = ApiResponse<UserResponse>),
        (status = 400, response = BadRequestResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 403, response = ForbiddenResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn get_user(
    State(state): State<UsersState>,
    _admin: AdminUser,
    IdPath(id): IdPath,
) -> ApiResult<ApiResponse<UserResponse>> {
    Ok(ApiResponse::ok(state.admin.get_user(id).await?))
}

/// Soft-delete an account
///
/// `data` is false when nothing was deleted.
#[utoipa::path(
    delete,
    path = "/users/{id}",
    tag = TAG,
    params(("id" = i64, Path, description = "User id")),
    responses(
        (status = 200, description = "Whether an account was deleted", body = ApiResponse<bool>),
        (status = 400, response = BadRequestResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 403, response = ForbiddenResponse),
        (status = 500, response = InternalServerErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn delete_user(
    State(state): State<UsersState>,
    admin: AdminUser,
    client: ClientContext,
    IdPath(id): IdPath,
) -> ApiResult<ApiResponse<bool>> {
    let result = state.admin.delete_user(admin.0.id, id).await;
    let deleted = audit(&admin, &client, "user.delete", id, json!({}), result)?;
    Ok(ApiResponse::ok(deleted))
}

/// Enable (0) or disable (1) an account
#[utoipa::path(
    put,
    path = "/users/{id}/status",
    tag = TAG,
    params(("id" = i64, Path, description = "User id")),
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = ApiResponse<bool>),
        (status = 400, response = BadRequestResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 403, response = ForbiddenResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn update_status(
    State(state): State<UsersState>,
    admin: AdminUser,
    client: ClientContext,
    IdPath(id): IdPath,
    ValidatedJson(req): ValidatedJson<UpdateStatusRequest>,
) -> ApiResult<ApiResponse<bool>> {
    let result = state.admin.update_status(id, req.status).await;
    let details = json!({ "status": req.status });
    let updated = audit(&admin, &client, "user.status.update", id, details, result)?;
    Ok(ApiResponse::ok(updated))
}

/// Change an account's role
#[utoipa::path(
    put,
    path = "/users/{id}/role",
    tag = TAG,
    params(("id" = i64, Path, description = "User id")),
    request_body = UpdateRoleRequest,
    responses(
        (status = 200, description = "Role updated", body = ApiResponse<bool>),
        (status = 400, response = BadRequestResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 403, response = ForbiddenResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn update_role(
    State(state): State<UsersState>,
    admin: AdminUser,
    client: ClientContext,
    IdPath(id): IdPath,
    ValidatedJson(req): ValidatedJson<UpdateRoleRequest>,
) -> ApiResult<ApiResponse<bool>> {
    let result = state.admin.update_role(id, req.role).await;
    let details = json!({ "role": req.role.to_string() });
    let updated = audit(&admin, &client, "user.role.update", id, details, result)?;
    Ok(ApiResponse::ok(updated))
}

/// Search login attempts across all accounts
#[utoipa::path(
    post,
    path = "/login-history/query",
    tag = TAG,
    request_body = LoginHistoryQuery,
    responses(
        (status = 200, description = "One page of login attempts", body = ApiResponse<PageResult<LoginHistory>>),
        (status = 400, response = BadRequestResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 403, response = ForbiddenResponse),
        (status = 500, response = InternalServerErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn query_login_history(
    State(state): State<UsersState>,
    _admin: AdminUser,
    ValidatedJson(query): ValidatedJson<LoginHistoryQuery>,
) -> ApiResult<ApiResponse<PageResult<LoginHistory>>> {
    Ok(ApiResponse::ok(state.admin.query_login_history(query).await?))
}
