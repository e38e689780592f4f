use axum_helpers::server::{create_production_app, health_router};
use axum_helpers::{JwtRedisAuth, create_router};
use core_config::tracing::{init_tracing, install_color_eyre};
use tracing::info;

mod api;
mod config;
mod openapi;
mod state;

use config::Config;
use state::AppState;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    // Before any fallible operation, so startup errors are rendered too
    install_color_eyre();

    let config = Config::from_env()?;
    init_tracing(&config.environment);

    let postgres_future = async {
        database::postgres::connect_from_config_with_retry(config.database.clone(), None)
            .await
            .map_err(|e| eyre::eyre!("PostgreSQL connection failed: {}", e))
    };

    let redis_future = async {
        database::redis::connect_from_config_with_retry(config.redis.clone(), None)
            .await
            .map_err(|e| eyre::eyre!("Redis connection failed: {}", e))
    };

    let (db, redis) = tokio::try_join!(postgres_future, redis_future)?;

    database::postgres::run_migrations::<migration::Migrator>(&db, config.app.name)
        .await
        .map_err(|e| eyre::eyre!("Migrations failed: {}", e))?;

    let jwt_auth = JwtRedisAuth::new(redis.clone(), &config.jwt);

    let state = AppState { config, db, redis };

    let api_routes = api::routes(&state, jwt_auth)?;
    let router = create_router::<openapi::ApiDoc>(api_routes, &state.config.server)?;

    // /health: liveness with name and version
    // /ready: database and redis checks
    let app = router
        .merge(health_router(state.config.app))
        .merge(api::ready_router(state.clone()));

    info!(
        environment = ?state.config.environment,
        "Starting usercenter API"
    );

    let server = state.config.server.clone();
    create_production_app(app, &server, server.shutdown_timeout, async move {
        info!("Shutting down: closing database connections");

        tokio::join!(
            async {
                match state.db.close().await {
                    Ok(_) => info!("PostgreSQL connection closed successfully"),
                    Err(e) => tracing::error!("Error closing PostgreSQL: {}", e),
                }
            },
            async {
                // ConnectionManager closes on drop
                drop(state.redis);
                info!("Redis connection closed successfully");
            }
        );
    })
    .await
    .map_err(|e| eyre::eyre!("Server error: {}", e))?;

    info!("Usercenter API shutdown complete");
    Ok(())
}
