//! Per-entity predicate builders.
//!
//! Each entry point turns a filter into a [`FilterQuery`] by AND-ing one
//! clause per present field onto an always-true predicate. Builders never
//! execute anything and hold no mutable state, so one instance can be shared
//! across request handlers.

use tracing::debug;

use super::age::{Clock, DateInterval, SystemClock};
use super::predicate::{DEFAULT_AVERAGE_TOLERANCE, FilterQuery, Predicate};
use super::schema::{
    EVENT_PARTICIPANTS, PARTICIPANT_EVENT, PARTICIPANT_RESIDENT, RESIDENT_PARTICIPATIONS,
    RESIDENT_SESSIONS, SESSION_RESIDENT, STAFF_SESSIONS, Table,
};
use super::types::{
    FilterSpec, GameSessionFilter, OutingEventFilter, OutingParticipantFilter, Partition,
    ResidentFilter, StaffUserFilter,
};

/// Builds filter queries relative to the date reported by `C`.
#[derive(Debug, Clone)]
pub struct PredicateBuilder<C = SystemClock> {
    clock: C,
    tolerance: f64,
}

impl PredicateBuilder<SystemClock> {
    /// Builder using the local date and the default average tolerance.
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for PredicateBuilder<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> PredicateBuilder<C> {
    pub fn with_clock(clock: C) -> Self {
        Self {
            clock,
            tolerance: DEFAULT_AVERAGE_TOLERANCE,
        }
    }

    /// Set the relative tolerance used by "within average" filters.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Dispatch on the entity kind of `spec`.
    pub fn build(&self, spec: &FilterSpec) -> FilterQuery {
        match spec {
            FilterSpec::Resident(filter) => self.residents(filter),
            FilterSpec::GameSession(filter) => self.game_sessions(filter),
            FilterSpec::OutingEvent(filter) => self.outing_events(filter),
            FilterSpec::OutingParticipant(filter) => self.outing_participants(filter),
            FilterSpec::StaffUser(filter) => self.staff_users(filter),
        }
    }

    /// Residents in the partition named by `filter.partition`.
    pub fn residents(&self, filter: &ResidentFilter) -> FilterQuery {
        self.resident_query(filter, filter.partition)
    }

    /// Residents still living in a residence, whatever `filter.partition` says.
    pub fn active_residents(&self, filter: &ResidentFilter) -> FilterQuery {
        self.resident_query(filter, Partition::Active)
    }

    /// Discharged residents, whatever `filter.partition` says.
    pub fn discharged_residents(&self, filter: &ResidentFilter) -> FilterQuery {
        self.resident_query(filter, Partition::Discharged)
    }

    fn resident_query(&self, filter: &ResidentFilter, partition: Partition) -> FilterQuery {
        let today = self.clock.today();

        let predicate = Predicate::always()
            .and(Predicate::eq("discharged", partition.is_discharged()))
            .and_opt(filter.residence_id.map(|id| Predicate::eq("residence_id", id)))
            .and_opt(
                DateInterval::from_dates(
                    filter.exact_birth_date,
                    filter.min_birth_date,
                    filter.max_birth_date,
                )
                .to_predicate("birth_date"),
            )
            .and_opt(
                DateInterval::from_ages(today, None, filter.min_age, filter.max_age)
                    .to_predicate("birth_date"),
            )
            .and_opt(filter.game_id.map(|game_id| {
                Predicate::exists_via_join(RESIDENT_SESSIONS, Predicate::eq("game_id", game_id))
            }))
            .and_opt(filter.event_id.map(|event_id| {
                Predicate::exists_via_join(
                    RESIDENT_PARTICIPATIONS,
                    Predicate::eq("event_id", event_id),
                )
            }));

        finish(Table::Residents, predicate)
    }

    pub fn game_sessions(&self, filter: &GameSessionFilter) -> FilterQuery {
        let today = self.clock.today();

        let residence = filter
            .residence_id
            .map(|id| Predicate::eq("residence_id", id));
        let resident_conditions = Predicate::always().and_opt(residence.clone()).and_opt(
            DateInterval::from_ages(today, filter.exact_age, filter.min_age, filter.max_age)
                .to_predicate("birth_date"),
        );
        let difficulty = filter
            .difficulty
            .map(|d| Predicate::eq("difficulty", d.as_str()));

        // Rows contributing to the average: same game as the candidate, narrowed
        // by the filters that define the population. Resident, date and comment
        // filters select which rows are returned, not what they are compared to.
        let population = Predicate::always().and_opt(difficulty.clone()).and_opt(
            residence.map(|p| Predicate::exists_via_join(SESSION_RESIDENT, p)),
        );

        let predicate = Predicate::always()
            .and_opt(filter.game_id.map(|id| Predicate::eq("game_id", id)))
            .and_opt(filter.resident_id.map(|id| Predicate::eq("resident_id", id)))
            .and_opt(non_empty(resident_conditions).map(|conditions| {
                Predicate::exists_via_join(SESSION_RESIDENT, conditions)
            }))
            .and_opt(
                DateInterval::from_dates(filter.exact_date, filter.min_date, filter.max_date)
                    .to_predicate("played_on"),
            )
            .and_opt(difficulty)
            .and_opt(Predicate::has_text("observation", filter.has_comment))
            .and_opt(Predicate::relative_to_average(
                filter.average_metric.column(),
                vec!["game_id"],
                population,
                filter.relative_to_average,
                self.tolerance,
            ));

        finish(Table::GameSessions, predicate)
    }

    pub fn outing_events(&self, filter: &OutingEventFilter) -> FilterQuery {
        let predicate = Predicate::always()
            .and_opt(filter.residence_id.map(|id| Predicate::eq("residence_id", id)))
            .and_opt(
                DateInterval::from_dates(filter.exact_date, filter.min_date, filter.max_date)
                    .to_predicate("event_date"),
            )
            .and_opt(filter.status.map(|s| Predicate::eq("status", s.as_str())))
            .and_opt(filter.resident_id.map(|id| {
                Predicate::exists_via_join(EVENT_PARTICIPANTS, Predicate::eq("resident_id", id))
            }))
            .and_opt(filter.participant_id.map(|id| {
                Predicate::exists_via_join(EVENT_PARTICIPANTS, Predicate::eq("id", id))
            }))
            .and_opt(Predicate::count_between(
                EVENT_PARTICIPANTS,
                Predicate::eq("needs_human_help", true),
                filter.min_human_resource_count,
                filter.max_human_resource_count,
            ))
            .and_opt(Predicate::count_between(
                EVENT_PARTICIPANTS,
                Predicate::eq("needs_material_help", true),
                filter.min_material_resource_count,
                filter.max_material_resource_count,
            ));

        finish(Table::OutingEvents, predicate)
    }

    pub fn outing_participants(&self, filter: &OutingParticipantFilter) -> FilterQuery {
        let today = self.clock.today();

        let predicate = Predicate::always()
            .and_opt(filter.residence_id.map(|id| {
                Predicate::exists_via_join(PARTICIPANT_EVENT, Predicate::eq("residence_id", id))
            }))
            .and_opt(filter.event_id.map(|id| Predicate::eq("event_id", id)))
            .and_opt(filter.resident_id.map(|id| Predicate::eq("resident_id", id)))
            .and_opt(
                filter
                    .needs_human_help
                    .map(|b| Predicate::eq("needs_human_help", b)),
            )
            .and_opt(
                filter
                    .needs_material_help
                    .map(|b| Predicate::eq("needs_material_help", b)),
            )
            .and_opt(
                DateInterval::from_ages(today, None, filter.min_age, filter.max_age)
                    .to_predicate("birth_date")
                    .map(|p| Predicate::exists_via_join(PARTICIPANT_RESIDENT, p)),
            )
            .and_opt(Predicate::has_text("pre_opinion", filter.has_pre_opinion))
            .and_opt(Predicate::has_text("post_opinion", filter.has_post_opinion))
            .and_opt(
                filter
                    .attendance_allowed
                    .map(|b| Predicate::eq("attendance_allowed", b)),
            );

        finish(Table::OutingParticipants, predicate)
    }

    /// Staff users in the partition named by `filter.partition`.
    pub fn staff_users(&self, filter: &StaffUserFilter) -> FilterQuery {
        self.staff_query(filter, filter.partition)
    }

    pub fn active_staff_users(&self, filter: &StaffUserFilter) -> FilterQuery {
        self.staff_query(filter, Partition::Active)
    }

    pub fn discharged_staff_users(&self, filter: &StaffUserFilter) -> FilterQuery {
        self.staff_query(filter, Partition::Discharged)
    }

    fn staff_query(&self, filter: &StaffUserFilter, partition: Partition) -> FilterQuery {
        let predicate = Predicate::always()
            .and(Predicate::eq("discharged", partition.is_discharged()))
            .and_opt(filter.enabled.map(|b| Predicate::eq("enabled", b)))
            .and_opt(filter.residence_id.map(|id| Predicate::eq("residence_id", id)))
            .and_opt(filter.game_id.map(|id| {
                Predicate::exists_via_join(STAFF_SESSIONS, Predicate::eq("game_id", id))
            }));

        finish(Table::StaffUsers, predicate)
    }
}

fn non_empty(predicate: Predicate) -> Option<Predicate> {
    match &predicate {
        Predicate::All(clauses) if clauses.is_empty() => None,
        _ => Some(predicate),
    }
}

fn finish(entity: Table, predicate: Predicate) -> FilterQuery {
    let query = FilterQuery::new(entity, predicate);
    debug_assert!(
        query.validate().is_ok(),
        "built an invalid {} filter predicate",
        entity.name()
    );
    debug!(
        entity = entity.name(),
        clauses = query.predicate.conjuncts().len(),
        distinct = query.distinct,
        "built filter predicate"
    );
    query
}
