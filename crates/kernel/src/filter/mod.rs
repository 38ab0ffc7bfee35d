//! Dynamic entity filtering.
//!
//! This module provides:
//! - PredicateBuilder: turns a filter into a composable predicate
//! - FilterQueryBuilder: SeaQuery-based SQL generation
//! - MemoryStore: in-process evaluation of the same predicates
//! - FilterService: builds and executes filters through a QueryExecutor

pub mod age;
pub mod builder;
pub mod executor;
pub mod memory;
pub mod predicate;
pub mod query_builder;
pub mod schema;
pub mod service;
pub mod types;

pub use age::{Clock, DateInterval, FixedClock, SystemClock, age_on};
pub use builder::PredicateBuilder;
pub use executor::{PgExecutor, QueryExecutor};
pub use memory::{MemoryStore, Row};
pub use predicate::{AverageRelation, FilterQuery, Predicate, Value};
pub use query_builder::{FilterQueryBuilder, compile, to_sql};
pub use schema::{Relation, Table};
pub use service::FilterService;
pub use types::{
    Difficulty, FilterSpec, GameSessionFilter, OutingEventFilter, OutingParticipantFilter,
    OutingStatus, Partition, ResidentFilter, SessionMetric, StaffUserFilter,
};
