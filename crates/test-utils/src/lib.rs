//! Care-home test utilities.
//!
//! Helpers for integration testing: fixture builders for residents, staff,
//! game sessions and outings, an in-memory store assembled from them, and
//! assertion utilities for filter results.
#![allow(clippy::expect_used)]

use carehome_kernel::filter::{Difficulty, MemoryStore, OutingStatus, Row, Table};
use chrono::NaiveDate;
use uuid::Uuid;

/// Build a date, panicking on an impossible one.
pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid calendar date")
}

/// A value that can be inserted into a [`MemoryStore`].
pub trait Fixture {
    fn table(&self) -> Table;
    fn row(&self) -> Row;
}

/// Create a test resident living in no particular residence.
pub fn test_resident(name: &str) -> TestResident {
    TestResident {
        id: Uuid::now_v7(),
        residence_id: Uuid::nil(),
        name: name.to_string(),
        birth_date: date(1940, 1, 1),
        discharge_date: None,
    }
}

/// A resident fixture.
#[derive(Debug, Clone)]
pub struct TestResident {
    pub id: Uuid,
    pub residence_id: Uuid,
    pub name: String,
    pub birth_date: NaiveDate,
    pub discharge_date: Option<NaiveDate>,
}

impl TestResident {
    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }

    pub fn in_residence(mut self, residence_id: Uuid) -> Self {
        self.residence_id = residence_id;
        self
    }

    pub fn born(mut self, birth_date: NaiveDate) -> Self {
        self.birth_date = birth_date;
        self
    }

    /// Mark as discharged on `day`.
    pub fn discharged_on(mut self, day: NaiveDate) -> Self {
        self.discharge_date = Some(day);
        self
    }
}

impl Fixture for TestResident {
    fn table(&self) -> Table {
        Table::Residents
    }

    fn row(&self) -> Row {
        let row = Row::new()
            .with("id", self.id)
            .with("residence_id", self.residence_id)
            .with("name", self.name.as_str())
            .with("birth_date", self.birth_date)
            .with("discharged", self.discharge_date.is_some());
        match self.discharge_date {
            Some(day) => row.with("discharge_date", day),
            None => row,
        }
    }
}

/// Create an enabled, active staff user.
pub fn test_staff(name: &str) -> TestStaff {
    TestStaff {
        id: Uuid::now_v7(),
        residence_id: Uuid::nil(),
        name: name.to_string(),
        enabled: true,
        discharged: false,
    }
}

/// A staff user fixture.
#[derive(Debug, Clone)]
pub struct TestStaff {
    pub id: Uuid,
    pub residence_id: Uuid,
    pub name: String,
    pub enabled: bool,
    pub discharged: bool,
}

impl TestStaff {
    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }

    pub fn in_residence(mut self, residence_id: Uuid) -> Self {
        self.residence_id = residence_id;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn discharged(mut self) -> Self {
        self.discharged = true;
        self
    }
}

impl Fixture for TestStaff {
    fn table(&self) -> Table {
        Table::StaffUsers
    }

    fn row(&self) -> Row {
        Row::new()
            .with("id", self.id)
            .with("residence_id", self.residence_id)
            .with("name", self.name.as_str())
            .with("enabled", self.enabled)
            .with("discharged", self.discharged)
    }
}

/// Create a medium-difficulty session of `game_id` played by `resident_id`.
pub fn test_session(game_id: Uuid, resident_id: Uuid) -> TestSession {
    TestSession {
        id: Uuid::now_v7(),
        game_id,
        resident_id,
        staff_user_id: Uuid::nil(),
        played_on: date(2024, 1, 15),
        duration: 0,
        score: 0,
        difficulty: Difficulty::Medium,
        observation: None,
    }
}

/// A game session fixture.
#[derive(Debug, Clone)]
pub struct TestSession {
    pub id: Uuid,
    pub game_id: Uuid,
    pub resident_id: Uuid,
    pub staff_user_id: Uuid,
    pub played_on: NaiveDate,
    pub duration: i64,
    pub score: i64,
    pub difficulty: Difficulty,
    pub observation: Option<String>,
}

impl TestSession {
    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }

    pub fn logged_by(mut self, staff_user_id: Uuid) -> Self {
        self.staff_user_id = staff_user_id;
        self
    }

    pub fn played_on(mut self, day: NaiveDate) -> Self {
        self.played_on = day;
        self
    }

    pub fn with_duration(mut self, duration: i64) -> Self {
        self.duration = duration;
        self
    }

    pub fn with_score(mut self, score: i64) -> Self {
        self.score = score;
        self
    }

    pub fn with_difficulty(mut self, difficulty: Difficulty) -> Self {
        self.difficulty = difficulty;
        self
    }

    /// Set the free-text observation, stored verbatim.
    pub fn with_observation(mut self, text: &str) -> Self {
        self.observation = Some(text.to_string());
        self
    }
}

impl Fixture for TestSession {
    fn table(&self) -> Table {
        Table::GameSessions
    }

    fn row(&self) -> Row {
        let row = Row::new()
            .with("id", self.id)
            .with("game_id", self.game_id)
            .with("resident_id", self.resident_id)
            .with("staff_user_id", self.staff_user_id)
            .with("played_on", self.played_on)
            .with("duration", self.duration)
            .with("score", self.score)
            .with("difficulty", self.difficulty.as_str());
        match &self.observation {
            Some(text) => row.with("observation", text.as_str()),
            None => row,
        }
    }
}

/// Create an open outing.
pub fn test_outing(name: &str) -> TestOuting {
    TestOuting {
        id: Uuid::now_v7(),
        residence_id: Uuid::nil(),
        name: name.to_string(),
        event_date: date(2024, 6, 1),
        status: OutingStatus::Open,
    }
}

/// An outing event fixture.
#[derive(Debug, Clone)]
pub struct TestOuting {
    pub id: Uuid,
    pub residence_id: Uuid,
    pub name: String,
    pub event_date: NaiveDate,
    pub status: OutingStatus,
}

impl TestOuting {
    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }

    pub fn in_residence(mut self, residence_id: Uuid) -> Self {
        self.residence_id = residence_id;
        self
    }

    pub fn on(mut self, day: NaiveDate) -> Self {
        self.event_date = day;
        self
    }

    pub fn with_status(mut self, status: OutingStatus) -> Self {
        self.status = status;
        self
    }
}

impl Fixture for TestOuting {
    fn table(&self) -> Table {
        Table::OutingEvents
    }

    fn row(&self) -> Row {
        Row::new()
            .with("id", self.id)
            .with("residence_id", self.residence_id)
            .with("name", self.name.as_str())
            .with("event_date", self.event_date)
            .with("status", self.status.as_str())
    }
}

/// Create a participant needing no help, allowed to attend.
pub fn test_participant(event_id: Uuid, resident_id: Uuid) -> TestParticipant {
    TestParticipant {
        id: Uuid::now_v7(),
        event_id,
        resident_id,
        needs_human_help: false,
        needs_material_help: false,
        pre_opinion: None,
        post_opinion: None,
        attendance_allowed: true,
    }
}

/// An outing participant fixture.
#[derive(Debug, Clone)]
pub struct TestParticipant {
    pub id: Uuid,
    pub event_id: Uuid,
    pub resident_id: Uuid,
    pub needs_human_help: bool,
    pub needs_material_help: bool,
    pub pre_opinion: Option<String>,
    pub post_opinion: Option<String>,
    pub attendance_allowed: bool,
}

impl TestParticipant {
    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }

    pub fn needs_human_help(mut self) -> Self {
        self.needs_human_help = true;
        self
    }

    pub fn needs_material_help(mut self) -> Self {
        self.needs_material_help = true;
        self
    }

    pub fn with_pre_opinion(mut self, text: &str) -> Self {
        self.pre_opinion = Some(text.to_string());
        self
    }

    pub fn with_post_opinion(mut self, text: &str) -> Self {
        self.post_opinion = Some(text.to_string());
        self
    }

    pub fn not_allowed(mut self) -> Self {
        self.attendance_allowed = false;
        self
    }
}

impl Fixture for TestParticipant {
    fn table(&self) -> Table {
        Table::OutingParticipants
    }

    fn row(&self) -> Row {
        let mut row = Row::new()
            .with("id", self.id)
            .with("event_id", self.event_id)
            .with("resident_id", self.resident_id)
            .with("needs_human_help", self.needs_human_help)
            .with("needs_material_help", self.needs_material_help)
            .with("attendance_allowed", self.attendance_allowed);
        if let Some(text) = &self.pre_opinion {
            row.set("pre_opinion", text.as_str());
        }
        if let Some(text) = &self.post_opinion {
            row.set("post_opinion", text.as_str());
        }
        row
    }
}

/// Builder for a [`MemoryStore`] seeded with fixtures.
#[derive(Debug, Clone, Default)]
pub struct TestStore {
    store: MemoryStore,
}

impl TestStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fixture.
    pub fn with(mut self, fixture: &impl Fixture) -> Self {
        self.add(fixture);
        self
    }

    pub fn add(&mut self, fixture: &impl Fixture) -> &mut Self {
        self.store
            .insert(fixture.table(), fixture.row())
            .expect("fixture columns exist in the catalog");
        self
    }

    pub fn build(self) -> MemoryStore {
        self.store
    }
}

/// Assertion helpers for filter results.
pub mod assert {
    use std::collections::BTreeSet;

    use uuid::Uuid;

    /// Assert that `actual` holds exactly the ids in `expected`, ignoring order
    /// and duplicates.
    pub fn same_ids(actual: &[Uuid], expected: &[Uuid]) {
        let actual: BTreeSet<_> = actual.iter().collect();
        let expected: BTreeSet<_> = expected.iter().collect();
        assert_eq!(actual, expected, "id sets differ");
    }

    /// Assert that a string contains a substring.
    pub fn contains(haystack: &str, needle: &str) {
        assert!(
            haystack.contains(needle),
            "Expected string to contain '{needle}'\nActual: {haystack}"
        );
    }

    /// Assert that a string does not contain a substring.
    pub fn not_contains(haystack: &str, needle: &str) {
        assert!(
            !haystack.contains(needle),
            "Expected string to NOT contain '{needle}'\nActual: {haystack}"
        );
    }
}
