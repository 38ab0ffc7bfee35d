//! Filtering engine error types.

use thiserror::Error;

/// Errors raised while lowering or executing a filter query.
///
/// Catalog errors indicate a defect in how a predicate was assembled; they
/// abort construction of the whole query rather than dropping the offending
/// clause.
#[derive(Debug, Error)]
pub enum FilterError {
    #[error("unknown column {table}.{column}")]
    UnknownColumn { table: &'static str, column: String },

    #[error("relation {relation} cannot be used from {scope}")]
    MalformedRelation {
        relation: &'static str,
        scope: &'static str,
    },

    #[error("database error")]
    Database(#[from] sqlx::Error),
}

/// Result type alias using FilterError.
pub type FilterResult<T> = Result<T, FilterError>;
