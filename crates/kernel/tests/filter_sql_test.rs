#![allow(clippy::unwrap_used, clippy::expect_used)]
//! SQL lowering integration tests.
//!
//! Filters arrive as camelCase JSON, are built through the service and
//! rendered for PostgreSQL.

use carehome_kernel::FilterError;
use carehome_kernel::filter::predicate::DEFAULT_AVERAGE_TOLERANCE;
use carehome_kernel::filter::{
    FilterQuery, FilterQueryBuilder, FilterSpec, MemoryStore, Predicate, Table, compile, to_sql,
};
use carehome_test_utils::assert;
use sea_query::PostgresQueryBuilder;

mod common;
use common::service;

fn spec(json: &str) -> FilterSpec {
    serde_json::from_str(json).unwrap()
}

#[test]
fn json_filter_to_sql() {
    let svc = service(MemoryStore::new());
    let sql = svc
        .sql(&spec(
            r#"{
                "entity": "game_session",
                "gameId": "00000000-0000-0000-0000-000000000007",
                "difficulty": "HARD",
                "hasComment": true,
                "relativeToAverage": "WITHIN_AVERAGE"
            }"#,
        ))
        .unwrap();

    assert::contains(&sql, "FROM \"game_sessions\"");
    assert::contains(&sql, "\"game_sessions\".\"difficulty\" = 'HARD'");
    assert::contains(&sql, "AVG(\"a1\".\"duration\")");
    assert::contains(&sql, "\"a1\".\"difficulty\" = 'HARD'");
    assert::contains(&sql, "ABS(");
    assert::contains(&sql, &DEFAULT_AVERAGE_TOLERANCE.to_string());
    assert::not_contains(&sql, "DISTINCT");
}

#[test]
fn tolerance_reaches_the_sql() {
    let builder = common::builder().with_tolerance(0.25);
    let query = builder.build(&spec(
        r#"{"entity": "game_session", "relativeToAverage": "WITHIN_AVERAGE"}"#,
    ));
    let sql = to_sql(&query).unwrap();
    assert::contains(&sql, "0.25");
}

#[test]
fn resident_join_is_distinct() {
    let svc = service(MemoryStore::new());
    let sql = svc
        .sql(&spec(
            r#"{
                "entity": "resident",
                "partition": "discharged",
                "eventId": "00000000-0000-0000-0000-000000000009"
            }"#,
        ))
        .unwrap();

    assert!(sql.starts_with("SELECT DISTINCT"), "{sql}");
    assert::contains(&sql, "INNER JOIN \"outing_participants\" AS \"j1\"");
    assert::contains(&sql, "\"residents\".\"discharged\" = TRUE");
}

#[test]
fn participant_residence_goes_through_event() {
    let svc = service(MemoryStore::new());
    let sql = svc
        .sql(&spec(
            r#"{
                "entity": "outing_participant",
                "residenceId": "00000000-0000-0000-0000-000000000001",
                "hasPostOpinion": false
            }"#,
        ))
        .unwrap();

    assert::contains(&sql, "INNER JOIN \"outing_events\" AS \"j1\"");
    assert::contains(&sql, "\"j1\".\"id\" = \"outing_participants\".\"event_id\"");
    assert::contains(&sql, "\"outing_participants\".\"post_opinion\" IS NULL");
}

#[test]
fn count_thresholds_render_as_subqueries() {
    let svc = service(MemoryStore::new());
    let sql = svc
        .sql(&spec(
            r#"{
                "entity": "outing_event",
                "minHumanResourceCount": 2,
                "maxMaterialResourceCount": 5
            }"#,
        ))
        .unwrap();

    assert::contains(&sql, "COUNT(*)");
    assert::contains(&sql, "\"c1\".\"needs_human_help\" = TRUE");
    assert::contains(&sql, "\"c2\".\"needs_material_help\" = TRUE");
    assert::contains(&sql, ">= 2");
    assert::contains(&sql, "<= 5");
    assert::not_contains(&sql, "JOIN");
}

#[test]
fn compile_and_count_agree_on_the_inner_select() {
    let query = common::builder().build(&spec(r#"{"entity": "staff_user", "enabled": true}"#));

    let inner = compile(&query).unwrap().to_string(PostgresQueryBuilder);
    assert_eq!(inner, to_sql(&query).unwrap());

    let count = FilterQueryBuilder::new(&query).build_count().unwrap();
    assert::contains(&count, "COUNT(*)");
    assert::contains(&count, &inner);
    assert::contains(&count, "AS \"matches\"");
}

#[test]
fn unknown_column_is_an_error() {
    let query = FilterQuery::new(Table::StaffUsers, Predicate::eq("shift", "night"));
    let err = to_sql(&query).unwrap_err();
    assert!(
        matches!(
            &err,
            FilterError::UnknownColumn { table: "staff_users", column } if column == "shift"
        ),
        "{err}"
    );

    // The in-memory evaluator applies the same catalog.
    let store = MemoryStore::new();
    assert!(matches!(
        store.select(&query),
        Err(FilterError::UnknownColumn { .. })
    ));
}
