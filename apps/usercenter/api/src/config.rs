use axum_helpers::JwtConfig;
use core_config::{AppInfo, FromEnv, app_info, server::ServerConfig};
use database::postgres::PostgresConfig;
use database::redis::RedisConfig;
use domain_users::notify::NotifyConfig;

pub use core_config::Environment;

/// Everything the binary reads from the environment, loaded once at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub app: AppInfo,
    pub database: PostgresConfig,
    pub redis: RedisConfig,
    pub server: ServerConfig,
    pub jwt: JwtConfig,
    pub notify: NotifyConfig,
    pub environment: Environment,
}

impl Config {
    pub fn from_env() -> eyre::Result<Self> {
        let environment = Environment::from_env();
        let database = PostgresConfig::from_env()?; // DATABASE_URL is required
        let redis = RedisConfig::from_env()?;
        let server = ServerConfig::from_env()?; // HOST=0.0.0.0, PORT=8080 by default
        let jwt = JwtConfig::from_env()?;
        let notify = NotifyConfig::from_env()?;

        Ok(Self {
            app: app_info!(),
            database,
            redis,
            server,
            jwt,
            notify,
            environment,
        })
    }
}
