use std::sync::Arc;

use axum::Router;
use axum_helpers::JwtRedisAuth;
use domain_users::clock::SystemClock;
use domain_users::handlers::{self, UsersState};
use domain_users::notify::CodeSenders;
use domain_users::repository::{
    PgLoginHistoryRepository, PgUserRepository, PgVerificationCodeRepository,
};
use domain_users::{AdminService, UserService, VerificationService};

use crate::state::AppState;

pub mod health;

/// Wires the Postgres-backed services into the domain router.
///
/// Routes are returned without the `/api` prefix; `create_router` adds it.
pub fn routes(state: &AppState, auth: JwtRedisAuth) -> eyre::Result<Router> {
    let users = Arc::new(PgUserRepository::new(state.db.clone()));
    let history = Arc::new(PgLoginHistoryRepository::new(state.db.clone()));
    let codes = Arc::new(PgVerificationCodeRepository::new(state.db.clone()));
    let clock = Arc::new(SystemClock);

    let senders = CodeSenders::from_config(&state.config.notify)
        .map_err(|e| eyre::eyre!("Failed to initialize code senders: {}", e))?;
    let verification = VerificationService::new(codes, senders, clock.clone());

    let users_state = UsersState {
        users: UserService::new(users.clone(), history.clone(), verification, clock),
        admin: AdminService::new(users, history),
        auth,
        secure_cookies: state.config.environment.use_https(),
    };

    Ok(handlers::router(users_state))
}

/// `/ready`, with state applied so it merges into the stateless app router.
pub fn ready_router(state: AppState) -> Router {
    use axum::routing::get;

    Router::new()
        .route("/ready", get(health::ready_handler))
        .with_state(state)
}
