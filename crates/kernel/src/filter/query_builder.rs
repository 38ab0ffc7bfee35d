//! Filter query lowering using SeaQuery.
//!
//! Generates SQL for a [`FilterQuery`]:
//! - top-level join-existence clauses as `INNER JOIN` with `SELECT DISTINCT`
//! - nested join-existence clauses as `EXISTS (...)`
//! - count thresholds as correlated `(SELECT COUNT(*) ...)` subqueries
//! - average comparisons as correlated `(SELECT AVG(..) ...)` subqueries

use sea_query::{
    Alias, Asterisk, Cond, Expr, ExprTrait, Func, JoinType, Keyword, PostgresQueryBuilder, Query,
    SelectStatement, SimpleExpr, SubQueryStatement, Value as SqlValue,
};

use super::predicate::{
    AverageClause, AverageMode, BLANK_CHARS, CountClause, FilterQuery, Predicate, Value,
};
use super::schema::{Relation, Table};
use crate::error::FilterResult;

/// Query builder for filter queries.
pub struct FilterQueryBuilder<'a> {
    query: &'a FilterQuery,
}

impl<'a> FilterQueryBuilder<'a> {
    pub fn new(query: &'a FilterQuery) -> Self {
        Self { query }
    }

    /// Build the statement selecting the ids of matching rows.
    ///
    /// Fails if the predicate names a column or relation the catalog does not
    /// know; no partial statement is returned.
    pub fn select(&self) -> FilterResult<SelectStatement> {
        self.query.validate()?;

        let table = self.query.entity.name();
        let mut lowering = Lowering::default();
        let mut select = Query::select();

        select
            .column((Alias::new(table), Alias::new("id")))
            .from(Alias::new(table));

        if self.query.distinct {
            select.distinct();
        }

        for clause in self.query.predicate.conjuncts() {
            match clause {
                Predicate::Related(exists) => {
                    let alias = lowering.alias("j");
                    let on = Cond::all()
                        .add(correlation(&exists.relation, &alias, table))
                        .add(lowering.condition(
                            &exists.condition,
                            &alias,
                            exists.relation.target,
                        ));
                    select.join_as(
                        JoinType::InnerJoin,
                        Alias::new(exists.relation.target.name()),
                        Alias::new(&alias),
                        on,
                    );
                }
                other => {
                    select.and_where(lowering.condition(other, table, self.query.entity));
                }
            }
        }

        Ok(select)
    }

    /// Build the main SELECT as PostgreSQL text.
    pub fn build(&self) -> FilterResult<String> {
        Ok(self.select()?.to_string(PostgresQueryBuilder))
    }

    /// Build a COUNT query over the distinct matching ids.
    pub fn build_count(&self) -> FilterResult<String> {
        let inner = self.select()?;
        let count = Query::select()
            .expr(Expr::col(Asterisk).count())
            .from_subquery(inner, Alias::new("matches"))
            .to_owned();
        Ok(count.to_string(PostgresQueryBuilder))
    }
}

/// Lower `query` to a SeaQuery statement.
pub fn compile(query: &FilterQuery) -> FilterResult<SelectStatement> {
    FilterQueryBuilder::new(query).select()
}

/// Render `query` as PostgreSQL.
pub fn to_sql(query: &FilterQuery) -> FilterResult<String> {
    FilterQueryBuilder::new(query).build()
}

/// `related.foreign = scope.local`
fn correlation(relation: &Relation, related: &str, scope: &str) -> SimpleExpr {
    Expr::col((Alias::new(related), Alias::new(relation.foreign)))
        .equals((Alias::new(scope), Alias::new(relation.local)))
}

fn column(scope: &str, name: &str) -> SimpleExpr {
    Expr::col((Alias::new(scope), Alias::new(name))).into()
}

fn literal(value: &Value) -> SimpleExpr {
    match value {
        Value::Null => SimpleExpr::Keyword(Keyword::Null),
        Value::Bool(b) => SimpleExpr::Value(SqlValue::from(*b)),
        Value::Int(i) => SimpleExpr::Value(SqlValue::from(*i)),
        Value::Float(f) => SimpleExpr::Value(SqlValue::from(*f)),
        Value::Text(s) => SimpleExpr::Value(SqlValue::from(s.clone())),
        Value::Date(d) => SimpleExpr::Value(SqlValue::from(*d)),
        Value::Uuid(u) => SimpleExpr::Value(SqlValue::from(*u)),
    }
}

fn call(name: &str, arg: SimpleExpr) -> SimpleExpr {
    Func::cust(Alias::new(name)).arg(arg).into()
}

/// `BTRIM(expr, <blank chars>)`, matching [`super::predicate::is_blank`].
fn trimmed(expr: SimpleExpr) -> SimpleExpr {
    Func::cust(Alias::new("BTRIM"))
        .arg(expr)
        .arg(SimpleExpr::Value(SqlValue::from(BLANK_CHARS)))
        .into()
}

fn scalar(select: SelectStatement) -> SimpleExpr {
    SimpleExpr::SubQuery(None, Box::new(SubQueryStatement::SelectStatement(select)))
}

/// Per-query lowering state. Subquery aliases are numbered across the whole
/// statement so nested scopes never shadow each other.
#[derive(Default)]
struct Lowering {
    next_alias: usize,
}

impl Lowering {
    fn alias(&mut self, prefix: &str) -> String {
        self.next_alias += 1;
        format!("{prefix}{}", self.next_alias)
    }

    /// Lower `predicate`, evaluated against rows of `table` named `scope`.
    fn condition(&mut self, predicate: &Predicate, scope: &str, table: Table) -> SimpleExpr {
        match predicate {
            Predicate::All(clauses) => match clauses.as_slice() {
                [] => Expr::cust("TRUE"),
                [single] => self.condition(single, scope, table),
                many => {
                    let mut cond = Cond::all();
                    for clause in many {
                        cond = cond.add(self.condition(clause, scope, table));
                    }
                    cond.into()
                }
            },
            Predicate::Nothing => Expr::cust("FALSE"),
            Predicate::Eq { column: name, value } => {
                if value.is_null() {
                    column(scope, name).is_null()
                } else {
                    column(scope, name).eq(literal(value))
                }
            }
            Predicate::Between {
                column: name,
                from,
                to,
            } => match (from, to) {
                (Some(from), Some(to)) => Cond::all()
                    .add(column(scope, name).gte(literal(from)))
                    .add(column(scope, name).lte(literal(to)))
                    .into(),
                (Some(from), None) => column(scope, name).gte(literal(from)),
                (None, Some(to)) => column(scope, name).lte(literal(to)),
                (None, None) => Expr::cust("TRUE"),
            },
            Predicate::Blank {
                column: name,
                blank: true,
            } => Cond::any()
                .add(column(scope, name).is_null())
                .add(trimmed(column(scope, name)).eq(""))
                .into(),
            Predicate::Blank {
                column: name,
                blank: false,
            } => Cond::all()
                .add(column(scope, name).is_not_null())
                .add(trimmed(column(scope, name)).ne(""))
                .into(),
            Predicate::Related(exists) => {
                let alias = self.alias("e");
                let condition =
                    self.condition(&exists.condition, &alias, exists.relation.target);
                let sub = Query::select()
                    .expr(Expr::val(1))
                    .from_as(Alias::new(exists.relation.target.name()), Alias::new(&alias))
                    .and_where(correlation(&exists.relation, &alias, scope))
                    .and_where(condition)
                    .to_owned();
                Expr::exists(sub)
            }
            Predicate::CountBetween(count) => self.count_between(count, scope),
            Predicate::RelativeToAverage(average) => {
                self.relative_to_average(average, scope, table)
            }
        }
    }

    fn count_between(&mut self, clause: &CountClause, scope: &str) -> SimpleExpr {
        let alias = self.alias("c");
        let condition = self.condition(&clause.condition, &alias, clause.relation.target);
        let sub = Query::select()
            .expr(Expr::col(Asterisk).count())
            .from_as(Alias::new(clause.relation.target.name()), Alias::new(&alias))
            .and_where(correlation(&clause.relation, &alias, scope))
            .and_where(condition)
            .to_owned();
        let count = scalar(sub);

        let mut cond = Cond::all();
        if let Some(min) = clause.min {
            cond = cond.add(count.clone().gte(saturating_i64(min)));
        }
        if let Some(max) = clause.max {
            cond = cond.add(count.lte(saturating_i64(max)));
        }
        cond.into()
    }

    fn relative_to_average(
        &mut self,
        clause: &AverageClause,
        scope: &str,
        table: Table,
    ) -> SimpleExpr {
        let alias = self.alias("a");
        let population = self.condition(&clause.population, &alias, table);

        let mut sub = Query::select();
        sub.expr(Func::avg(Expr::col((Alias::new(&alias), Alias::new(clause.column)))))
            .from_as(Alias::new(table.name()), Alias::new(&alias));
        for shared in &clause.correlate {
            sub.and_where(
                Expr::col((Alias::new(&alias), Alias::new(*shared)))
                    .equals((Alias::new(scope), Alias::new(*shared))),
            );
        }
        sub.and_where(population);

        // AVG over an empty population is NULL, and every comparison below
        // is then unknown, so the row is not matched.
        let average = scalar(sub);
        let value = column(scope, clause.column);
        match clause.mode {
            AverageMode::Above => value.gt(average),
            AverageMode::Below => value.lt(average),
            AverageMode::Within => call("ABS", value.sub(average.clone()))
                .lte(call("ABS", average).mul(clause.tolerance)),
        }
    }
}

fn saturating_i64(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::error::FilterError;
    use crate::filter::age::FixedClock;
    use crate::filter::builder::PredicateBuilder;
    use crate::filter::predicate::AverageRelation;
    use crate::filter::schema::{EVENT_PARTICIPANTS, RESIDENT_SESSIONS};
    use crate::filter::types::{
        GameSessionFilter, OutingEventFilter, OutingParticipantFilter, ResidentFilter,
        StaffUserFilter,
    };
    use chrono::NaiveDate;
    use uuid::Uuid;

    fn builder() -> PredicateBuilder<FixedClock> {
        PredicateBuilder::with_clock(FixedClock(
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
        ))
    }

    #[test]
    fn resident_partition_only() {
        let sql = to_sql(&builder().residents(&ResidentFilter::default())).unwrap();

        assert!(sql.contains("FROM \"residents\""), "{sql}");
        assert!(sql.contains("\"residents\".\"discharged\" = FALSE"), "{sql}");
        assert!(!sql.contains("DISTINCT"), "{sql}");
        assert!(!sql.contains("JOIN"), "{sql}");
    }

    #[test]
    fn discharged_residents_partition() {
        let sql = to_sql(&builder().discharged_residents(&ResidentFilter::default())).unwrap();
        assert!(sql.contains("\"residents\".\"discharged\" = TRUE"), "{sql}");
    }

    #[test]
    fn resident_game_filter_uses_inner_join() {
        let filter = ResidentFilter {
            game_id: Some(Uuid::from_u128(7)),
            ..Default::default()
        };
        let sql = to_sql(&builder().residents(&filter)).unwrap();

        assert!(sql.starts_with("SELECT DISTINCT"), "{sql}");
        assert!(sql.contains("INNER JOIN \"game_sessions\" AS \"j1\""), "{sql}");
        assert!(
            sql.contains("\"j1\".\"resident_id\" = \"residents\".\"id\""),
            "{sql}"
        );
        assert!(sql.contains("\"j1\".\"game_id\""), "{sql}");
    }

    #[test]
    fn age_range_renders_birth_date_bounds() {
        let filter = ResidentFilter {
            min_age: Some(70),
            max_age: Some(80),
            ..Default::default()
        };
        let sql = to_sql(&builder().residents(&filter)).unwrap();

        assert!(sql.contains("\"birth_date\" >= '1943-03-02'"), "{sql}");
        assert!(sql.contains("\"birth_date\" <= '1954-03-01'"), "{sql}");
    }

    #[test]
    fn session_age_goes_through_resident_join() {
        let filter = GameSessionFilter {
            exact_age: Some(24),
            ..Default::default()
        };
        let sql = to_sql(&builder().game_sessions(&filter)).unwrap();

        assert!(sql.contains("INNER JOIN \"residents\" AS \"j1\""), "{sql}");
        assert!(sql.contains("\"j1\".\"birth_date\" >= '1999-03-02'"), "{sql}");
        assert!(sql.contains("\"j1\".\"birth_date\" <= '2000-03-01'"), "{sql}");
    }

    #[test]
    fn comment_tri_state() {
        let with = GameSessionFilter {
            has_comment: Some(true),
            ..Default::default()
        };
        let sql = to_sql(&builder().game_sessions(&with)).unwrap();
        assert!(sql.contains("IS NOT NULL"), "{sql}");
        assert!(sql.contains("BTRIM(\"game_sessions\".\"observation\""), "{sql}");
        assert!(sql.contains("<> ''"), "{sql}");

        let without = GameSessionFilter {
            has_comment: Some(false),
            ..Default::default()
        };
        let sql = to_sql(&builder().game_sessions(&without)).unwrap();
        assert!(sql.contains("IS NULL OR"), "{sql}");
        assert!(sql.contains("BTRIM(\"game_sessions\".\"observation\""), "{sql}");
        assert!(sql.contains(") = ''"), "{sql}");

        let sql = to_sql(&builder().game_sessions(&GameSessionFilter::default())).unwrap();
        assert!(!sql.contains("observation"), "{sql}");
    }

    #[test]
    fn average_is_a_correlated_subquery() {
        let filter = GameSessionFilter {
            relative_to_average: AverageRelation::AboveAverage,
            ..Default::default()
        };
        let sql = to_sql(&builder().game_sessions(&filter)).unwrap();

        assert!(sql.contains("AVG(\"a1\".\"duration\")"), "{sql}");
        assert!(
            sql.contains("\"a1\".\"game_id\" = \"game_sessions\".\"game_id\""),
            "{sql}"
        );
        assert!(sql.contains("\"game_sessions\".\"duration\" >"), "{sql}");
    }

    #[test]
    fn within_average_uses_tolerance() {
        let filter = GameSessionFilter {
            relative_to_average: AverageRelation::WithinAverage,
            ..Default::default()
        };
        let sql = to_sql(&builder().game_sessions(&filter)).unwrap();

        assert!(sql.contains("ABS("), "{sql}");
        assert!(sql.contains("0.05"), "{sql}");
    }

    #[test]
    fn human_resource_count_is_correlated() {
        let filter = OutingEventFilter {
            min_human_resource_count: Some(2),
            max_human_resource_count: Some(5),
            ..Default::default()
        };
        let sql = to_sql(&builder().outing_events(&filter)).unwrap();

        assert!(sql.contains("COUNT(*)"), "{sql}");
        assert!(
            sql.contains("\"c1\".\"event_id\" = \"outing_events\".\"id\""),
            "{sql}"
        );
        assert!(sql.contains("\"c1\".\"needs_human_help\" = TRUE"), "{sql}");
        assert!(sql.contains(">= 2"), "{sql}");
        assert!(sql.contains("<= 5"), "{sql}");
        assert!(!sql.contains("DISTINCT"), "{sql}");
    }

    #[test]
    fn nested_exists_in_count_condition() {
        let query = FilterQuery::new(
            Table::Residents,
            Predicate::count_between(
                RESIDENT_SESSIONS,
                Predicate::exists_via_join(
                    crate::filter::schema::SESSION_RESIDENT,
                    Predicate::eq("discharged", false),
                ),
                Some(1),
                None,
            )
            .unwrap(),
        );
        let sql = to_sql(&query).unwrap();

        assert!(sql.contains("EXISTS"), "{sql}");
        assert!(sql.contains("AS \"e2\""), "{sql}");
        assert!(!sql.contains("JOIN"), "{sql}");
    }

    #[test]
    fn participant_filters() {
        let filter = OutingParticipantFilter {
            needs_material_help: Some(false),
            has_post_opinion: Some(true),
            residence_id: Some(Uuid::from_u128(4)),
            ..Default::default()
        };
        let sql = to_sql(&builder().outing_participants(&filter)).unwrap();

        assert!(sql.contains("INNER JOIN \"outing_events\" AS \"j1\""), "{sql}");
        assert!(sql.contains("\"needs_material_help\" = FALSE"), "{sql}");
        assert!(sql.contains("\"post_opinion\""), "{sql}");
    }

    #[test]
    fn staff_game_filter() {
        let filter = StaffUserFilter {
            enabled: Some(true),
            game_id: Some(Uuid::from_u128(2)),
            ..Default::default()
        };
        let sql = to_sql(&builder().staff_users(&filter)).unwrap();

        assert!(sql.starts_with("SELECT DISTINCT"), "{sql}");
        assert!(
            sql.contains("\"j1\".\"staff_user_id\" = \"staff_users\".\"id\""),
            "{sql}"
        );
        assert!(sql.contains("\"staff_users\".\"enabled\" = TRUE"), "{sql}");
    }

    #[test]
    fn count_query_wraps_select() {
        let query = builder().outing_events(&OutingEventFilter::default());
        let sql = FilterQueryBuilder::new(&query).build_count().unwrap();

        assert!(sql.starts_with("SELECT COUNT(*) FROM (SELECT"), "{sql}");
        assert!(sql.contains("AS \"matches\""), "{sql}");
    }

    #[test]
    fn unknown_column_aborts_lowering() {
        let query = FilterQuery::new(
            Table::OutingEvents,
            Predicate::always()
                .and(Predicate::eq("status", "OPEN"))
                .and(
                    Predicate::count_between(
                        EVENT_PARTICIPANTS,
                        Predicate::eq("wheelchair", true),
                        Some(1),
                        None,
                    )
                    .unwrap(),
                ),
        );
        assert!(matches!(
            to_sql(&query),
            Err(FilterError::UnknownColumn { table: "outing_participants", .. })
        ));
    }
}
