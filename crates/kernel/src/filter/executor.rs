//! Query executors.
//!
//! A [`QueryExecutor`] turns a [`FilterQuery`] into the ids of matching rows.
//! [`PgExecutor`] renders the query with [`FilterQueryBuilder`] and runs it on
//! PostgreSQL; [`MemoryStore`] evaluates it in process.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use super::memory::MemoryStore;
use super::predicate::FilterQuery;
use super::query_builder::FilterQueryBuilder;
use crate::error::FilterResult;

/// Runs filter queries against a data source.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Ids of the rows matching `query`, one entry per result row.
    async fn fetch_ids(&self, query: &FilterQuery) -> FilterResult<Vec<Uuid>>;

    /// Number of result rows for `query`.
    async fn count(&self, query: &FilterQuery) -> FilterResult<u64> {
        Ok(self.fetch_ids(query).await?.len() as u64)
    }
}

/// Executes filter queries on a PostgreSQL pool.
#[derive(Debug, Clone)]
pub struct PgExecutor {
    pool: PgPool,
}

impl PgExecutor {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QueryExecutor for PgExecutor {
    async fn fetch_ids(&self, query: &FilterQuery) -> FilterResult<Vec<Uuid>> {
        let sql = FilterQueryBuilder::new(query).build()?;
        debug!(entity = query.entity.name(), %sql, "executing filter query");

        let ids = sqlx::query_scalar::<_, Uuid>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(ids)
    }

    async fn count(&self, query: &FilterQuery) -> FilterResult<u64> {
        let sql = FilterQueryBuilder::new(query).build_count()?;
        debug!(entity = query.entity.name(), %sql, "executing filter count");

        let count: i64 = sqlx::query_scalar(&sql).fetch_one(&self.pool).await?;
        Ok(u64::try_from(count).unwrap_or(0))
    }
}

#[async_trait]
impl QueryExecutor for MemoryStore {
    async fn fetch_ids(&self, query: &FilterQuery) -> FilterResult<Vec<Uuid>> {
        self.select(query)
    }
}
