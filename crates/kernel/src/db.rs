//! PostgreSQL connection for executing filters.

use anyhow::{Context, Result};
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;

use crate::config::Config;

/// Open a pool sized by `config` and verify it answers a trivial query.
///
/// Fails when `DATABASE_URL` is unset, the server is unreachable or the
/// round trip errors, so a bad connection surfaces before any filter runs.
pub async fn connect(config: &Config) -> Result<PgPool> {
    let url = config.require_database_url()?;
    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(url)
        .await
        .context("failed to connect to PostgreSQL")?;

    sqlx::query("SELECT 1")
        .execute(&pool)
        .await
        .context("database health check failed")?;

    info!(
        max_connections = config.database_max_connections,
        "Database connection established"
    );
    Ok(pool)
}
