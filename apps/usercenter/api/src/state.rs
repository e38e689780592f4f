//! Shared application state.

/// Connections and configuration, cloned per handler (Arc clones only).
#[derive(Clone)]
pub struct AppState {
    pub config: crate::config::Config,
    /// PostgreSQL connection pool
    pub db: database::postgres::DatabaseConnection,
    /// Redis connection manager, shared with the session store
    pub redis: database::redis::ConnectionManager,
}
