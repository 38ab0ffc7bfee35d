//! Care-home filtering kernel.
//!
//! Builds composable predicates from entity filters, lowers them to
//! PostgreSQL and runs them through a pluggable executor. The `carehome`
//! binary wraps the same API for command-line use.

pub mod config;
pub mod db;
pub mod error;
pub mod filter;

pub use error::{FilterError, FilterResult};
