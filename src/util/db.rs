use anyhow::Result;
use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions, PgSslMode},
    PgPool,
};
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, instrument};

/// Process-wide connection pool, owned by whoever runs the scrape.
#[derive(Clone)]
pub struct Db {
    pub pool: PgPool,
}

/// Pool size bounds; the legacy scrapers ran with 1..100.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolBounds {
    pub min_connections: u32,
    pub max_connections: u32,
}

impl Default for PoolBounds {
    fn default() -> Self {
        Self {
            min_connections: 1,
            max_connections: 100,
        }
    }
}

impl Db {
    fn connect_options(database_url: &str) -> Result<PgConnectOptions> {
        let use_prepared = std::env::var("USE_PREPARED")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true") || v.eq_ignore_ascii_case("on"))
            .unwrap_or(false);
        let mut connect_options = PgConnectOptions::from_str(database_url)?;

        if database_url.contains("sslmode=require") && !database_url.contains("sslmode=disable") {
            connect_options = connect_options.ssl_mode(PgSslMode::Require);
        }

        if !use_prepared {
            // PgBouncer txn mode safe
            connect_options = connect_options.statement_cache_capacity(0);
        }
        Ok(connect_options)
    }

    fn pool_options(bounds: PoolBounds) -> PgPoolOptions {
        PgPoolOptions::new()
            .min_connections(bounds.min_connections)
            .max_connections(bounds.max_connections.max(bounds.min_connections).max(1))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(600))
    }

    /// Build the pool without touching the network; the first checkout connects.
    ///
    /// An unreachable store therefore surfaces at write time, after the scrape.
    // SECURITY: never include raw DSNs in tracing spans (they may contain credentials).
    #[instrument(skip(database_url))]
    pub fn connect_lazy(database_url: &str, bounds: PoolBounds) -> Result<Self> {
        let pool = Self::pool_options(bounds).connect_lazy_with(Self::connect_options(database_url)?);
        info!(
            min = bounds.min_connections,
            max = bounds.max_connections,
            "db pool configured (lazy)"
        );
        Ok(Self { pool })
    }

    // SECURITY: never include raw DSNs in tracing spans (they may contain credentials).
    #[instrument(skip(database_url))]
    pub async fn connect(database_url: &str, bounds: PoolBounds) -> Result<Self> {
        let pool = Self::pool_options(bounds)
            .connect_with(Self::connect_options(database_url)?)
            .await?;
        info!("connected to db");
        Ok(Self { pool })
    }

    /// Close every pooled connection; waits for checked-out ones to come back.
    pub async fn close(&self) {
        self.pool.close().await;
        info!("db pool closed");
    }
}
