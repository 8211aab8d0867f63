//! Application state shared by handlers, services and the sweeper

use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tokio::sync::Notify;

use crate::booking::BookingRules;
use crate::config::Config;
use crate::error::BoxError;

#[derive(Clone)]
pub struct AppState {
    /// PostgreSQL connection pool
    pub pool: PgPool,
    /// Booking limits and the table hold lookahead
    pub rules: BookingRules,
    /// Wakes the table sweeper ahead of its next tick
    pub sweep_notify: Arc<Notify>,
}

impl AppState {
    /// Connect, run pending migrations and build the state
    pub async fn new(config: &Config) -> Result<Self, BoxError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect(&config.database_url)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("Database connected and migrated");

        Ok(Self::with_pool(pool, config.rules.clone()))
    }

    /// State over a pool that connects on first use
    ///
    /// Nothing touches the database until a query runs.
    pub fn lazy(config: &Config) -> Result<Self, BoxError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .acquire_timeout(Duration::from_secs(1))
            .connect_lazy(&config.database_url)?;
        Ok(Self::with_pool(pool, config.rules.clone()))
    }

    pub fn with_pool(pool: PgPool, rules: BookingRules) -> Self {
        Self {
            pool,
            rules,
            sweep_notify: Arc::new(Notify::new()),
        }
    }

    /// Ask the sweeper for an early pass
    pub fn nudge_sweeper(&self) {
        self.sweep_notify.notify_one();
    }
}
