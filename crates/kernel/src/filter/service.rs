//! Filter service: builds a query for a filter and runs it.
//!
//! Provides per-entity lookups that combine a [`PredicateBuilder`] with any
//! [`QueryExecutor`], so handlers never assemble predicates themselves.

use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use super::age::{Clock, SystemClock};
use super::builder::PredicateBuilder;
use super::executor::QueryExecutor;
use super::predicate::FilterQuery;
use super::query_builder::to_sql;
use super::types::{
    FilterSpec, GameSessionFilter, OutingEventFilter, OutingParticipantFilter, ResidentFilter,
    StaffUserFilter,
};
use crate::error::FilterResult;

/// Service for executing entity filters.
pub struct FilterService<C = SystemClock> {
    builder: PredicateBuilder<C>,
    executor: Arc<dyn QueryExecutor>,
}

impl<C: Clock> FilterService<C> {
    pub fn new(builder: PredicateBuilder<C>, executor: Arc<dyn QueryExecutor>) -> Self {
        Self { builder, executor }
    }

    /// Render the SQL for `spec` without running it.
    pub fn sql(&self, spec: &FilterSpec) -> FilterResult<String> {
        to_sql(&self.builder.build(spec))
    }

    /// Ids of the entities matching `spec`.
    pub async fn find(&self, spec: &FilterSpec) -> FilterResult<Vec<Uuid>> {
        self.run(self.builder.build(spec)).await
    }

    /// Number of result rows for `spec`.
    pub async fn count(&self, spec: &FilterSpec) -> FilterResult<u64> {
        let query = self.builder.build(spec);
        let count = self.executor.count(&query).await?;
        debug!(entity = query.entity.name(), count, "filter counted");
        Ok(count)
    }

    pub async fn residents(&self, filter: &ResidentFilter) -> FilterResult<Vec<Uuid>> {
        self.run(self.builder.residents(filter)).await
    }

    pub async fn active_residents(&self, filter: &ResidentFilter) -> FilterResult<Vec<Uuid>> {
        self.run(self.builder.active_residents(filter)).await
    }

    pub async fn discharged_residents(&self, filter: &ResidentFilter) -> FilterResult<Vec<Uuid>> {
        self.run(self.builder.discharged_residents(filter)).await
    }

    pub async fn game_sessions(&self, filter: &GameSessionFilter) -> FilterResult<Vec<Uuid>> {
        self.run(self.builder.game_sessions(filter)).await
    }

    pub async fn outing_events(&self, filter: &OutingEventFilter) -> FilterResult<Vec<Uuid>> {
        self.run(self.builder.outing_events(filter)).await
    }

    pub async fn outing_participants(
        &self,
        filter: &OutingParticipantFilter,
    ) -> FilterResult<Vec<Uuid>> {
        self.run(self.builder.outing_participants(filter)).await
    }

    pub async fn staff_users(&self, filter: &StaffUserFilter) -> FilterResult<Vec<Uuid>> {
        self.run(self.builder.staff_users(filter)).await
    }

    pub async fn active_staff_users(&self, filter: &StaffUserFilter) -> FilterResult<Vec<Uuid>> {
        self.run(self.builder.active_staff_users(filter)).await
    }

    pub async fn discharged_staff_users(
        &self,
        filter: &StaffUserFilter,
    ) -> FilterResult<Vec<Uuid>> {
        self.run(self.builder.discharged_staff_users(filter)).await
    }

    async fn run(&self, query: FilterQuery) -> FilterResult<Vec<Uuid>> {
        let ids = self.executor.fetch_ids(&query).await?;
        info!(
            entity = query.entity.name(),
            distinct = query.distinct,
            matches = ids.len(),
            "filter executed"
        );
        Ok(ids)
    }
}
