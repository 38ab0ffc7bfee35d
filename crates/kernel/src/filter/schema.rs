//! Static table and relation catalog.
//!
//! Predicates only ever reach another table through one of the relations
//! declared here, so the set of join paths is closed and can be validated
//! before any SQL is generated.

use serde::{Deserialize, Serialize};

/// Tables the filtering engine can read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Residents,
    StaffUsers,
    GameSessions,
    OutingEvents,
    OutingParticipants,
}

impl Table {
    /// SQL table name.
    pub fn name(self) -> &'static str {
        match self {
            Table::Residents => "residents",
            Table::StaffUsers => "staff_users",
            Table::GameSessions => "game_sessions",
            Table::OutingEvents => "outing_events",
            Table::OutingParticipants => "outing_participants",
        }
    }

    /// Columns present on the table.
    pub fn columns(self) -> &'static [&'static str] {
        match self {
            Table::Residents => &[
                "id",
                "residence_id",
                "name",
                "birth_date",
                "discharged",
                "discharge_date",
            ],
            Table::StaffUsers => &["id", "residence_id", "name", "enabled", "discharged"],
            Table::GameSessions => &[
                "id",
                "game_id",
                "resident_id",
                "staff_user_id",
                "played_on",
                "duration",
                "score",
                "difficulty",
                "observation",
            ],
            Table::OutingEvents => &["id", "residence_id", "name", "event_date", "status"],
            Table::OutingParticipants => &[
                "id",
                "event_id",
                "resident_id",
                "needs_human_help",
                "needs_material_help",
                "pre_opinion",
                "post_opinion",
                "attendance_allowed",
            ],
        }
    }

    /// Whether `column` exists on this table.
    pub fn has_column(self, column: &str) -> bool {
        self.columns().contains(&column)
    }
}

/// A join path from one table to another.
///
/// Rows of `target` are related to a row of `source` when
/// `target.foreign == source.local`. The same shape covers one-to-many
/// (resident to sessions) and many-to-one (session to resident) paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relation {
    pub name: &'static str,
    pub source: Table,
    pub local: &'static str,
    pub target: Table,
    pub foreign: &'static str,
}

pub const RESIDENT_SESSIONS: Relation = Relation {
    name: "resident_sessions",
    source: Table::Residents,
    local: "id",
    target: Table::GameSessions,
    foreign: "resident_id",
};

pub const RESIDENT_PARTICIPATIONS: Relation = Relation {
    name: "resident_participations",
    source: Table::Residents,
    local: "id",
    target: Table::OutingParticipants,
    foreign: "resident_id",
};

pub const STAFF_SESSIONS: Relation = Relation {
    name: "staff_sessions",
    source: Table::StaffUsers,
    local: "id",
    target: Table::GameSessions,
    foreign: "staff_user_id",
};

pub const SESSION_RESIDENT: Relation = Relation {
    name: "session_resident",
    source: Table::GameSessions,
    local: "resident_id",
    target: Table::Residents,
    foreign: "id",
};

pub const EVENT_PARTICIPANTS: Relation = Relation {
    name: "event_participants",
    source: Table::OutingEvents,
    local: "id",
    target: Table::OutingParticipants,
    foreign: "event_id",
};

pub const PARTICIPANT_RESIDENT: Relation = Relation {
    name: "participant_resident",
    source: Table::OutingParticipants,
    local: "resident_id",
    target: Table::Residents,
    foreign: "id",
};

pub const PARTICIPANT_EVENT: Relation = Relation {
    name: "participant_event",
    source: Table::OutingParticipants,
    local: "event_id",
    target: Table::OutingEvents,
    foreign: "id",
};

/// Every relation known to the engine.
pub const RELATIONS: &[Relation] = &[
    RESIDENT_SESSIONS,
    RESIDENT_PARTICIPATIONS,
    STAFF_SESSIONS,
    SESSION_RESIDENT,
    EVENT_PARTICIPANTS,
    PARTICIPANT_RESIDENT,
    PARTICIPANT_EVENT,
];
