//! In-memory store evaluating predicates without a database.
//!
//! Implements the same primitives the SQL lowering relies on (comparison,
//! inner join across a relation, correlated `AVG`, correlated `COUNT`) with
//! SQL's null semantics, so results line up with what PostgreSQL returns for
//! the generated statement.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};

use uuid::Uuid;

use super::predicate::{
    AverageClause, AverageMode, CountClause, ExistsClause, FilterQuery, Predicate, Value, is_blank,
};
use super::schema::{Relation, Table};
use crate::error::{FilterError, FilterResult};

/// A single row keyed by column name. Missing columns read as `NULL`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    values: BTreeMap<&'static str, Value>,
}

static NULL: Value = Value::Null;

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a column, builder style.
    pub fn with(mut self, column: &'static str, value: impl Into<Value>) -> Self {
        self.values.insert(column, value.into());
        self
    }

    pub fn set(&mut self, column: &'static str, value: impl Into<Value>) {
        self.values.insert(column, value.into());
    }

    pub fn get(&self, column: &str) -> &Value {
        self.values.get(column).unwrap_or(&NULL)
    }

    pub fn id(&self) -> Option<Uuid> {
        match self.get("id") {
            Value::Uuid(id) => Some(*id),
            _ => None,
        }
    }

    pub fn columns(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.values.keys().copied()
    }
}

/// Rows grouped by table.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: HashMap<Table, Vec<Row>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a row, rejecting columns the table does not have.
    pub fn insert(&mut self, table: Table, row: Row) -> FilterResult<()> {
        if let Some(column) = row.columns().find(|c| !table.has_column(c)) {
            return Err(FilterError::UnknownColumn {
                table: table.name(),
                column: column.to_string(),
            });
        }
        self.tables.entry(table).or_default().push(row);
        Ok(())
    }

    pub fn rows(&self, table: Table) -> &[Row] {
        self.tables.get(&table).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Ids of rows matching `query`, in insertion order.
    ///
    /// Top-level join-existence clauses behave like an inner join: a root row
    /// appears once per combination of matching related rows unless the query
    /// asks for distinct results.
    pub fn select(&self, query: &FilterQuery) -> FilterResult<Vec<Uuid>> {
        query.validate()?;

        let conjuncts = query.predicate.conjuncts();
        let mut ids = Vec::new();
        let mut seen = HashSet::new();

        for row in self.rows(query.entity) {
            let mut fan_out = 1usize;
            let mut matched = true;
            for clause in &conjuncts {
                match clause {
                    Predicate::Related(exists) => {
                        fan_out = fan_out.saturating_mul(self.related_matches(exists, row));
                    }
                    other => matched &= self.matches(other, query.entity, row),
                }
                if !matched || fan_out == 0 {
                    break;
                }
            }
            if !matched || fan_out == 0 {
                continue;
            }

            let Some(id) = row.id() else { continue };
            if query.distinct {
                if seen.insert(id) {
                    ids.push(id);
                }
            } else {
                ids.extend(std::iter::repeat_n(id, fan_out));
            }
        }

        Ok(ids)
    }

    fn related_matches(&self, exists: &ExistsClause, row: &Row) -> usize {
        self.related(&exists.relation, row)
            .filter(|r| self.matches(&exists.condition, exists.relation.target, r))
            .count()
    }

    /// Rows of `relation.target` linked to `row`.
    fn related<'a>(
        &'a self,
        relation: &'a Relation,
        row: &'a Row,
    ) -> impl Iterator<Item = &'a Row> {
        let key = row.get(relation.local);
        self.rows(relation.target)
            .iter()
            .filter(move |r| r.get(relation.foreign).compare(key) == Some(Ordering::Equal))
    }

    /// Evaluate `predicate` against `row` of `table`.
    pub fn matches(&self, predicate: &Predicate, table: Table, row: &Row) -> bool {
        match predicate {
            Predicate::All(clauses) => clauses.iter().all(|c| self.matches(c, table, row)),
            Predicate::Nothing => false,
            Predicate::Eq { column, value } => {
                if value.is_null() {
                    row.get(column).is_null()
                } else {
                    row.get(column).compare(value) == Some(Ordering::Equal)
                }
            }
            Predicate::Between { column, from, to } => {
                let current = row.get(column);
                let above = from
                    .as_ref()
                    .is_none_or(|from| current.compare(from).is_some_and(Ordering::is_ge));
                let below = to
                    .as_ref()
                    .is_none_or(|to| current.compare(to).is_some_and(Ordering::is_le));
                above && below
            }
            Predicate::Blank { column, blank } => match row.get(column) {
                Value::Null => *blank,
                Value::Text(text) => is_blank(text) == *blank,
                _ => !*blank,
            },
            Predicate::Related(exists) => self
                .related(&exists.relation, row)
                .any(|r| self.matches(&exists.condition, exists.relation.target, r)),
            Predicate::CountBetween(clause) => self.count_between(clause, row),
            Predicate::RelativeToAverage(clause) => self.relative_to_average(clause, table, row),
        }
    }

    fn count_between(&self, clause: &CountClause, row: &Row) -> bool {
        let count = self
            .related(&clause.relation, row)
            .filter(|r| self.matches(&clause.condition, clause.relation.target, r))
            .count() as u64;
        clause.min.is_none_or(|min| count >= min) && clause.max.is_none_or(|max| count <= max)
    }

    fn relative_to_average(&self, clause: &AverageClause, table: Table, row: &Row) -> bool {
        let Some(value) = row.get(clause.column).as_f64() else {
            return false;
        };

        let samples: Vec<f64> = self
            .rows(table)
            .iter()
            .filter(|other| {
                clause
                    .correlate
                    .iter()
                    .all(|c| other.get(c).compare(row.get(c)) == Some(Ordering::Equal))
            })
            .filter(|other| self.matches(&clause.population, table, other))
            .filter_map(|other| other.get(clause.column).as_f64())
            .collect();

        // Average of nothing is undefined: match no rows.
        if samples.is_empty() {
            return false;
        }
        let average = samples.iter().sum::<f64>() / samples.len() as f64;

        match clause.mode {
            AverageMode::Above => value > average,
            AverageMode::Below => value < average,
            AverageMode::Within => (value - average).abs() <= average.abs() * clause.tolerance,
        }
    }
}
