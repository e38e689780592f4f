use axum::{
    Router,
    extract::{Query, State, rejection::QueryRejection},
    http::header,
    middleware,
    response::{AppendHeaders, IntoResponse, Response},
    routing::{get, post, put},
};
use axum_helpers::{
    ApiError, ApiResponse, ApiResult, ClientContext, CurrentUser, ValidatedJson,
    errors::responses::{
        BadRequestResponse, InternalServerErrorResponse, NotFoundResponse, UnauthorizedResponse,
    },
    jwt_auth_middleware,
};
use utoipa::OpenApi;

use super::{UsersState, cleared_cookie, session_cookie};
use crate::error::UserError;
use crate::models::{
    ChangePasswordRequest, CodePurpose, LoginHistory, LoginRequest, LoginResponse, PageParams,
    PageResult, RegisterRequest, SendCodeRequest, UpdateProfileRequest, UserResponse,
};

pub const TAG: &str = "users";

#[derive(OpenApi)]
#[openapi(
    paths(
        register,
        send_code,
        login,
        logout,
        current,
        profile,
        update_profile,
        change_password,
        login_history,
    ),
    components(
        schemas(
            RegisterRequest,
            SendCodeRequest,
            LoginRequest,
            LoginResponse,
            UpdateProfileRequest,
            ChangePasswordRequest,
            UserResponse,
            LoginHistory,
        ),
        responses(
            BadRequestResponse,
            UnauthorizedResponse,
            NotFoundResponse,
            InternalServerErrorResponse
        )
    ),
    tags(
        (name = "users", description = "Registration, login and self-service account management")
    )
)]
pub struct ApiDoc;

pub fn router(state: UsersState) -> Router {
    let protected = Router::new()
        .route("/logout", post(logout))
        .route("/current", get(current))
        .route("/profile", get(profile).put(update_profile))
        .route("/password", put(change_password))
        .route("/login-history", get(login_history))
        .route_layer(middleware::from_fn_with_state(
            state.auth.clone(),
            jwt_auth_middleware,
        ));

    Router::new()
        .route("/register", post(register))
        .route("/send-code", post(send_code))
        .route("/login", post(login))
        .merge(protected)
        .with_state(state)
}

/// Register a new account
#[utoipa::path(
    post,
    path = "/register",
    tag = TAG,
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "Id of the new account", body = ApiResponse<i64>),
        (status = 400, response = BadRequestResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn register(
    State(state): State<UsersState>,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> ApiResult<ApiResponse<i64>> {
    let id = state.users.register(req).await?;
    Ok(ApiResponse::ok(id))
}

/// Send a verification code by SMS or email
///
/// Only `REGISTER` codes can be requested here. At most one code per target and
/// purpose every 60 seconds; codes expire after 5 minutes.
#[utoipa::path(
    post,
    path = "/send-code",
    tag = TAG,
    request_body = SendCodeRequest,
    responses(
        (status = 200, description = "Code sent, `data` is null"),
        (status = 400, response = BadRequestResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn send_code(
    State(state): State<UsersState>,
    ValidatedJson(req): ValidatedJson<SendCodeRequest>,
) -> ApiResult<ApiResponse<()>> {
    let purpose = req.purpose.unwrap_or_default();
    if purpose != CodePurpose::Register {
        return Err(ApiError::params("only REGISTER codes can be requested"));
    }

    state.users.verification().send_code(&req.target, purpose).await?;
    Ok(ApiResponse::empty())
}

/// Log in with account and password
///
/// The access token is returned in the body and as an `access_token` cookie.
#[utoipa::path(
    post,
    path = "/login",
    tag = TAG,
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = ApiResponse<LoginResponse>),
        (status = 400, response = BadRequestResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn login(
    State(state): State<UsersState>,
    client: ClientContext,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> ApiResult<Response> {
    let user = state.users.login(&req, &client).await?;

    let roles = vec![user.role.to_string()];
    let session = state
        .auth
        .open_session(user.id, &user.account, &roles)
        .await
        .map_err(|e| UserError::Internal(format!("Failed to open session: {e}")))?;

    let cookie = session_cookie(&session.token, session.expires_in, state.secure_cookies)?;
    let body = LoginResponse {
        access_token: session.token,
        expires_in: session.expires_in,
        user: user.into(),
    };

    Ok((
        AppendHeaders([(header::SET_COOKIE, cookie)]),
        ApiResponse::ok(body),
    )
        .into_response())
}

/// Log out, revoking the presented token
#[utoipa::path(
    post,
    path = "/logout",
    tag = TAG,
    responses(
        (status = 200, description = "Logged out, `data` is null"),
        (status = 401, response = UnauthorizedResponse),
        (status = 500, response = InternalServerErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn logout(State(state): State<UsersState>, user: CurrentUser) -> ApiResult<Response> {
    state
        .auth
        .revoke(&user.claims)
        .await
        .map_err(|e| UserError::Internal(format!("Failed to revoke session: {e}")))?;

    tracing::info!(user_id = user.id, "User logged out");
    let cookie = cleared_cookie(state.secure_cookies)?;
    Ok((
        AppendHeaders([(header::SET_COOKIE, cookie)]),
        ApiResponse::empty(),
    )
        .into_response())
}

/// The signed-in user
#[utoipa::path(
    get,
    path = "/current",
    tag = TAG,
    responses(
        (status = 200, description = "Current user", body = ApiResponse<UserResponse>),
        (status = 401, response = UnauthorizedResponse),
        (status = 500, response = InternalServerErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn current(
    State(state): State<UsersState>,
    user: CurrentUser,
) -> ApiResult<ApiResponse<UserResponse>> {
    Ok(ApiResponse::ok(state.users.current(user.id).await?))
}

/// The signed-in user's profile
#[utoipa::path(
    get,
    path = "/profile",
    tag = TAG,
    responses(
        (status = 200, description = "Profile", body = ApiResponse<UserResponse>),
        (status = 401, response = UnauthorizedResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn profile(
    State(state): State<UsersState>,
    user: CurrentUser,
) -> ApiResult<ApiResponse<UserResponse>> {
    Ok(ApiResponse::ok(state.users.profile(user.id).await?))
}

/// Update the signed-in user's profile; absent fields are left alone
#[utoipa::path(
    put,
    path = "/profile",
    tag = TAG,
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Updated profile", body = ApiResponse<UserResponse>),
        (status = 400, response = BadRequestResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn update_profile(
    State(state): State<UsersState>,
    user: CurrentUser,
    ValidatedJson(req): ValidatedJson<UpdateProfileRequest>,
) -> ApiResult<ApiResponse<UserResponse>> {
    let updated = state.users.update_profile(user.id, req.into()).await?;
    Ok(ApiResponse::ok(updated))
}

/// Change the signed-in user's password
#[utoipa::path(
    put,
    path = "/password",
    tag = TAG,
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = ApiResponse<bool>),
        (status = 400, response = BadRequestResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn change_password(
    State(state): State<UsersState>,
    user: CurrentUser,
    ValidatedJson(req): ValidatedJson<ChangePasswordRequest>,
) -> ApiResult<ApiResponse<bool>> {
    Ok(ApiResponse::ok(state.users.change_password(user.id, req).await?))
}

/// The signed-in user's login attempts, newest first
#[utoipa::path(
    get,
    path = "/login-history",
    tag = TAG,
    params(PageParams),
    responses(
        (status = 200, description = "One page of login history", body = ApiResponse<PageResult<LoginHistory>>),
        (status = 400, response = BadRequestResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 500, response = InternalServerErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn login_history(
    State(state): State<UsersState>,
    user: CurrentUser,
    page: Result<Query<PageParams>, QueryRejection>,
) -> ApiResult<ApiResponse<PageResult<LoginHistory>>> {
    let Query(page) = page.map_err(ApiError::from)?;
    Ok(ApiResponse::ok(state.users.login_history(user.id, page).await?))
}
