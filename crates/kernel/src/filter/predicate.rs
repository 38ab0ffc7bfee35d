//! Predicate model: clause descriptors folded into one conjunction.
//!
//! A [`Predicate`] is a plain owned tree. It can be lowered to SQL
//! ([`super::query_builder`]) or evaluated directly against rows
//! ([`super::memory`]); both read the same descriptors.

use std::cmp::Ordering;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::schema::{Relation, Table};
use crate::error::FilterError;

/// Default relative tolerance for "within average" comparisons.
pub const DEFAULT_AVERAGE_TOLERANCE: f64 = 0.05;

/// Characters stripped before deciding whether text is blank: the ASCII
/// whitespace set. Other Unicode spaces count as content.
pub const BLANK_CHARS: &str = " \t\n\r\x0B\x0C";

/// Empty once surrounding [`BLANK_CHARS`] are removed.
pub fn is_blank(text: &str) -> bool {
    text.trim_matches(|c| BLANK_CHARS.contains(c)).is_empty()
}

/// A literal compared against a column.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Date(NaiveDate),
    Uuid(Uuid),
}

impl Value {
    /// Order two values of compatible kinds. Mixed or null operands are
    /// incomparable, matching SQL's treatment of `NULL`.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
            (Value::Int(a), Value::Float(b)) => (*a as f64).partial_cmp(b),
            (Value::Float(a), Value::Int(b)) => a.partial_cmp(&(*b as f64)),
            (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
            (Value::Date(a), Value::Date(b)) => Some(a.cmp(b)),
            (Value::Uuid(a), Value::Uuid(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Numeric view used by aggregates.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self {
        Value::Uuid(v)
    }
}

/// How a row's value relates to the population average.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AverageRelation {
    #[default]
    None,
    WithinAverage,
    AboveAverage,
    BelowAverage,
}

/// Comparison performed by an [`AverageClause`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AverageMode {
    /// `|value - avg| <= |avg| * tolerance`, both bounds inclusive.
    Within,
    /// `value > avg`.
    Above,
    /// `value < avg`.
    Below,
}

impl AverageRelation {
    pub fn mode(self) -> Option<AverageMode> {
        match self {
            AverageRelation::None => None,
            AverageRelation::WithinAverage => Some(AverageMode::Within),
            AverageRelation::AboveAverage => Some(AverageMode::Above),
            AverageRelation::BelowAverage => Some(AverageMode::Below),
        }
    }
}

/// At least one row reachable through `relation` satisfies `condition`.
#[derive(Debug, Clone, PartialEq)]
pub struct ExistsClause {
    pub relation: Relation,
    pub condition: Box<Predicate>,
}

/// The number of rows reachable through `relation` that satisfy
/// `condition` lies within `[min, max]`. Counted per candidate row.
#[derive(Debug, Clone, PartialEq)]
pub struct CountClause {
    pub relation: Relation,
    pub condition: Box<Predicate>,
    pub min: Option<u64>,
    pub max: Option<u64>,
}

/// Compares `column` of the candidate row against `AVG(column)` over the
/// population of rows in the same table that share every `correlate`
/// column with the candidate and satisfy `population`.
#[derive(Debug, Clone, PartialEq)]
pub struct AverageClause {
    pub column: &'static str,
    pub correlate: Vec<&'static str>,
    pub population: Box<Predicate>,
    pub mode: AverageMode,
    pub tolerance: f64,
}

/// A composable boolean condition over the rows of one table.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Conjunction. Empty means "always true".
    All(Vec<Predicate>),
    /// Matches no rows.
    Nothing,
    Eq {
        column: &'static str,
        value: Value,
    },
    /// Inclusive range; an absent bound is open.
    Between {
        column: &'static str,
        from: Option<Value>,
        to: Option<Value>,
    },
    /// `blank = true`: null or empty after trimming.
    /// `blank = false`: non-null and non-empty after trimming.
    Blank {
        column: &'static str,
        blank: bool,
    },
    Related(ExistsClause),
    CountBetween(CountClause),
    RelativeToAverage(AverageClause),
}

impl Default for Predicate {
    fn default() -> Self {
        Predicate::always()
    }
}

impl Predicate {
    /// The neutral element of conjunction.
    pub fn always() -> Self {
        Predicate::All(Vec::new())
    }

    /// AND another clause onto this one, flattening nested conjunctions.
    pub fn and(self, other: Predicate) -> Self {
        let mut clauses = match self {
            Predicate::All(clauses) => clauses,
            single => vec![single],
        };
        match other {
            Predicate::All(more) => clauses.extend(more),
            single => clauses.push(single),
        }
        Predicate::All(clauses)
    }

    /// AND an optional clause; `None` leaves the predicate untouched.
    pub fn and_opt(self, other: Option<Predicate>) -> Self {
        match other {
            Some(p) => self.and(p),
            None => self,
        }
    }

    pub fn eq(column: &'static str, value: impl Into<Value>) -> Self {
        Predicate::Eq {
            column,
            value: value.into(),
        }
    }

    /// Inclusive range. Returns `None` when both bounds are absent.
    pub fn between(
        column: &'static str,
        from: Option<impl Into<Value>>,
        to: Option<impl Into<Value>>,
    ) -> Option<Self> {
        if from.is_none() && to.is_none() {
            return None;
        }
        Some(Predicate::Between {
            column,
            from: from.map(Into::into),
            to: to.map(Into::into),
        })
    }

    /// Tri-state "has text" clause. `None` adds nothing.
    pub fn has_text(column: &'static str, has: Option<bool>) -> Option<Self> {
        has.map(|has| Predicate::Blank {
            column,
            blank: !has,
        })
    }

    /// "At least one related row satisfies `condition`".
    ///
    /// Lowered as an inner join when it sits at the top level of a query, so
    /// the owning [`FilterQuery`] is marked distinct.
    pub fn exists_via_join(relation: Relation, condition: Predicate) -> Self {
        Predicate::Related(ExistsClause {
            relation,
            condition: Box::new(condition),
        })
    }

    /// Correlated count threshold. Returns `None` when both bounds are absent
    /// so no subquery is emitted.
    pub fn count_between(
        relation: Relation,
        condition: Predicate,
        min: Option<u64>,
        max: Option<u64>,
    ) -> Option<Self> {
        if min.is_none() && max.is_none() {
            return None;
        }
        Some(Predicate::CountBetween(CountClause {
            relation,
            condition: Box::new(condition),
            min,
            max,
        }))
    }

    /// Correlated average comparison. Returns `None` for
    /// [`AverageRelation::None`].
    pub fn relative_to_average(
        column: &'static str,
        correlate: Vec<&'static str>,
        population: Predicate,
        relation: AverageRelation,
        tolerance: f64,
    ) -> Option<Self> {
        let mode = relation.mode()?;
        Some(Predicate::RelativeToAverage(AverageClause {
            column,
            correlate,
            population: Box::new(population),
            mode,
            tolerance,
        }))
    }

    /// Top-level conjuncts of this predicate.
    pub fn conjuncts(&self) -> Vec<&Predicate> {
        match self {
            Predicate::All(clauses) => clauses.iter().flat_map(|c| c.conjuncts()).collect(),
            single => vec![single],
        }
    }

    /// Check every column and relation against the catalog, scoped to
    /// `table`.
    pub fn validate(&self, table: Table) -> Result<(), FilterError> {
        match self {
            Predicate::All(clauses) => clauses.iter().try_for_each(|c| c.validate(table)),
            Predicate::Nothing => Ok(()),
            Predicate::Eq { column, .. }
            | Predicate::Between { column, .. }
            | Predicate::Blank { column, .. } => check_column(table, column),
            Predicate::Related(clause) => {
                check_relation(table, &clause.relation)?;
                clause.condition.validate(clause.relation.target)
            }
            Predicate::CountBetween(clause) => {
                check_relation(table, &clause.relation)?;
                clause.condition.validate(clause.relation.target)
            }
            Predicate::RelativeToAverage(clause) => {
                check_column(table, clause.column)?;
                for column in &clause.correlate {
                    check_column(table, column)?;
                }
                clause.population.validate(table)
            }
        }
    }
}

fn check_column(table: Table, column: &str) -> Result<(), FilterError> {
    if table.has_column(column) {
        Ok(())
    } else {
        Err(FilterError::UnknownColumn {
            table: table.name(),
            column: column.to_string(),
        })
    }
}

fn check_relation(table: Table, relation: &Relation) -> Result<(), FilterError> {
    if relation.source != table
        || !relation.source.has_column(relation.local)
        || !relation.target.has_column(relation.foreign)
    {
        return Err(FilterError::MalformedRelation {
            relation: relation.name,
            scope: table.name(),
        });
    }
    Ok(())
}

/// Output of a predicate builder: the root table, the composed predicate,
/// and whether the result must be de-duplicated.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterQuery {
    pub entity: Table,
    pub predicate: Predicate,
    pub distinct: bool,
}

impl FilterQuery {
    /// Wrap a predicate, requesting de-duplication when any top-level
    /// conjunct joins through a relation.
    pub fn new(entity: Table, predicate: Predicate) -> Self {
        let distinct = predicate
            .conjuncts()
            .iter()
            .any(|c| matches!(c, Predicate::Related(_)));
        Self {
            entity,
            predicate,
            distinct,
        }
    }

    pub fn validate(&self) -> Result<(), FilterError> {
        self.predicate.validate(self.entity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::schema::{EVENT_PARTICIPANTS, RESIDENT_SESSIONS, SESSION_RESIDENT};

    #[test]
    fn blank_means_only_ascii_whitespace() {
        assert!(is_blank(""));
        assert!(is_blank(" \t\r\n"));
        assert!(is_blank("\x0B\x0C "));
        assert!(!is_blank(" x "));
        assert!(!is_blank("\u{00A0}"));
    }

    #[test]
    fn and_flattens_conjunctions() {
        let p = Predicate::always()
            .and(Predicate::eq("name", "a"))
            .and(Predicate::always().and(Predicate::eq("name", "b")));
        assert_eq!(p.conjuncts().len(), 2);
    }

    #[test]
    fn between_without_bounds_is_omitted() {
        assert!(Predicate::between("played_on", None::<NaiveDate>, None::<NaiveDate>).is_none());
    }

    #[test]
    fn count_without_bounds_is_omitted() {
        let p = Predicate::count_between(EVENT_PARTICIPANTS, Predicate::always(), None, None);
        assert!(p.is_none());
    }

    #[test]
    fn average_none_is_omitted() {
        let p = Predicate::relative_to_average(
            "duration",
            vec!["game_id"],
            Predicate::always(),
            AverageRelation::None,
            DEFAULT_AVERAGE_TOLERANCE,
        );
        assert!(p.is_none());
    }

    #[test]
    fn top_level_join_marks_distinct() {
        let p = Predicate::always().and(Predicate::exists_via_join(
            RESIDENT_SESSIONS,
            Predicate::eq("game_id", Uuid::nil()),
        ));
        assert!(FilterQuery::new(Table::Residents, p).distinct);

        let plain = Predicate::eq("discharged", false);
        assert!(!FilterQuery::new(Table::Residents, plain).distinct);
    }

    #[test]
    fn validate_rejects_unknown_column() {
        let q = FilterQuery::new(Table::Residents, Predicate::eq("shoe_size", 42));
        assert!(matches!(
            q.validate(),
            Err(FilterError::UnknownColumn { column, .. }) if column == "shoe_size"
        ));
    }

    #[test]
    fn validate_rejects_relation_from_wrong_table() {
        let q = FilterQuery::new(
            Table::Residents,
            Predicate::exists_via_join(SESSION_RESIDENT, Predicate::always()),
        );
        assert!(matches!(
            q.validate(),
            Err(FilterError::MalformedRelation { relation: "session_resident", .. })
        ));
    }

    #[test]
    fn validate_checks_nested_scope() {
        // `birth_date` lives on residents, not on game_sessions.
        let q = FilterQuery::new(
            Table::Residents,
            Predicate::exists_via_join(RESIDENT_SESSIONS, Predicate::eq("birth_date", 1)),
        );
        assert!(q.validate().is_err());
    }

    #[test]
    fn value_compare_mixed_numeric() {
        assert_eq!(
            Value::Int(20).compare(&Value::Float(20.0)),
            Some(Ordering::Equal)
        );
        assert_eq!(Value::Null.compare(&Value::Int(1)), None);
    }
}
