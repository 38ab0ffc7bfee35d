//! Filter specifications, one per entity kind.
//!
//! Every field is optional; an absent field places no constraint on its
//! dimension. Field names deserialize from camelCase so request parameters
//! map onto them directly.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::predicate::AverageRelation;

/// Active/discharged split applied under every resident and staff query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Partition {
    #[default]
    Active,
    Discharged,
}

impl Partition {
    pub fn is_discharged(self) -> bool {
        matches!(self, Partition::Discharged)
    }
}

/// Game difficulty as stored in `game_sessions.difficulty`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "EASY",
            Difficulty::Medium => "MEDIUM",
            Difficulty::Hard => "HARD",
        }
    }
}

/// Outing lifecycle state as stored in `outing_events.status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutingStatus {
    Open,
    Closed,
    Finished,
}

impl OutingStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OutingStatus::Open => "OPEN",
            OutingStatus::Closed => "CLOSED",
            OutingStatus::Finished => "FINISHED",
        }
    }
}

/// Numeric game-session column compared by the average-relative filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionMetric {
    #[default]
    Duration,
    Score,
}

impl SessionMetric {
    pub fn column(self) -> &'static str {
        match self {
            SessionMetric::Duration => "duration",
            SessionMetric::Score => "score",
        }
    }
}

/// Resident filters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResidentFilter {
    pub partition: Partition,
    pub residence_id: Option<Uuid>,
    pub exact_birth_date: Option<NaiveDate>,
    pub min_birth_date: Option<NaiveDate>,
    pub max_birth_date: Option<NaiveDate>,
    pub min_age: Option<u32>,
    pub max_age: Option<u32>,
    /// Has played this game at least once.
    pub game_id: Option<Uuid>,
    /// Has taken part in this outing.
    pub event_id: Option<Uuid>,
}

/// Game session filters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GameSessionFilter {
    /// Residence of the resident who played.
    pub residence_id: Option<Uuid>,
    pub game_id: Option<Uuid>,
    pub resident_id: Option<Uuid>,
    pub exact_age: Option<u32>,
    pub min_age: Option<u32>,
    pub max_age: Option<u32>,
    pub exact_date: Option<NaiveDate>,
    pub min_date: Option<NaiveDate>,
    pub max_date: Option<NaiveDate>,
    pub difficulty: Option<Difficulty>,
    pub has_comment: Option<bool>,
    pub relative_to_average: AverageRelation,
    pub average_metric: SessionMetric,
}

/// Outing event filters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OutingEventFilter {
    pub residence_id: Option<Uuid>,
    pub exact_date: Option<NaiveDate>,
    pub min_date: Option<NaiveDate>,
    pub max_date: Option<NaiveDate>,
    pub status: Option<OutingStatus>,
    /// A resident taking part in the outing.
    pub resident_id: Option<Uuid>,
    /// A participant record belonging to the outing.
    pub participant_id: Option<Uuid>,
    /// Participants needing staff assistance.
    pub min_human_resource_count: Option<u64>,
    pub max_human_resource_count: Option<u64>,
    /// Participants needing equipment.
    pub min_material_resource_count: Option<u64>,
    pub max_material_resource_count: Option<u64>,
}

/// Outing participant filters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OutingParticipantFilter {
    /// Residence organising the outing.
    pub residence_id: Option<Uuid>,
    pub event_id: Option<Uuid>,
    pub resident_id: Option<Uuid>,
    pub needs_human_help: Option<bool>,
    pub needs_material_help: Option<bool>,
    pub min_age: Option<u32>,
    pub max_age: Option<u32>,
    pub has_pre_opinion: Option<bool>,
    pub has_post_opinion: Option<bool>,
    pub attendance_allowed: Option<bool>,
}

/// Staff user filters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StaffUserFilter {
    pub partition: Partition,
    pub enabled: Option<bool>,
    pub residence_id: Option<Uuid>,
    /// Has logged at least one session of this game.
    pub game_id: Option<Uuid>,
}

/// A filter for any entity kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "entity", rename_all = "snake_case")]
pub enum FilterSpec {
    Resident(ResidentFilter),
    GameSession(GameSessionFilter),
    OutingEvent(OutingEventFilter),
    OutingParticipant(OutingParticipantFilter),
    StaffUser(StaffUserFilter),
}
