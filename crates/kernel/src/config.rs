//! Configuration loaded from environment variables.

use std::env;

use anyhow::{Context, Result, bail};

use crate::filter::predicate::DEFAULT_AVERAGE_TOLERANCE;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection URL. Only needed to execute queries.
    pub database_url: Option<String>,

    /// Maximum database connections in pool (default: 10).
    pub database_max_connections: u32,

    /// Relative tolerance for "within average" filters (default: 0.05).
    pub average_tolerance: f64,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let database_url = var("DATABASE_URL").filter(|url| !url.is_empty());

        let database_max_connections = var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|| "10".to_string())
            .parse()
            .context("DATABASE_MAX_CONNECTIONS must be a valid u32")?;

        let average_tolerance: f64 = match var("AVERAGE_TOLERANCE") {
            Some(raw) => raw
                .parse()
                .context("AVERAGE_TOLERANCE must be a number")?,
            None => DEFAULT_AVERAGE_TOLERANCE,
        };
        if !average_tolerance.is_finite() || average_tolerance < 0.0 {
            bail!("AVERAGE_TOLERANCE must be a non-negative number, got {average_tolerance}");
        }

        Ok(Self {
            database_url,
            database_max_connections,
            average_tolerance,
        })
    }

    /// The database URL, or an error naming the missing variable.
    pub fn require_database_url(&self) -> Result<&str> {
        self.database_url
            .as_deref()
            .context("DATABASE_URL environment variable is required")
    }
}
