//! Age to birth-date interval conversion.
//!
//! Ages are turned into inclusive birth-date windows relative to "today" using
//! calendar-year subtraction, so a Feb 29 birthday lands on Feb 28 in
//! non-leap years instead of drifting by a fixed 365-day offset.

use chrono::{Datelike, Local, Months, NaiveDate};

use super::predicate::Predicate;

/// Source of the current date.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Local wall-clock date.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// A clock pinned to one date.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

/// Inclusive date interval; either bound may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateInterval {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateInterval {
    /// Interval from raw date filters. An exact date wins over min/max.
    pub fn from_dates(
        exact: Option<NaiveDate>,
        min: Option<NaiveDate>,
        max: Option<NaiveDate>,
    ) -> Self {
        match exact {
            Some(day) => Self {
                from: Some(day),
                to: Some(day),
            },
            None => Self { from: min, to: max },
        }
    }

    /// Birth-date interval for an age filter, relative to `today`.
    ///
    /// - exact `n`: `[today - (n+1)y + 1d, today - n y]`; min/max ignored.
    /// - `min_age`: upper bound `today - min_age y`.
    /// - `max_age`: lower bound `today - (max_age+1)y + 1d`.
    pub fn from_ages(
        today: NaiveDate,
        exact: Option<u32>,
        min_age: Option<u32>,
        max_age: Option<u32>,
    ) -> Self {
        match exact {
            Some(age) => Self {
                from: Some(earliest_birth_date(today, age)),
                to: Some(years_before(today, age)),
            },
            None => Self {
                from: max_age.map(|age| earliest_birth_date(today, age)),
                to: min_age.map(|age| years_before(today, age)),
            },
        }
    }

    pub fn is_open(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        self.from.is_none_or(|from| day >= from) && self.to.is_none_or(|to| day <= to)
    }

    /// Range clause on `column`, or `None` for an open interval.
    pub fn to_predicate(self, column: &'static str) -> Option<Predicate> {
        Predicate::between(column, self.from, self.to)
    }
}

/// Age in whole years on `today` for someone born on `birth`.
pub fn age_on(birth: NaiveDate, today: NaiveDate) -> i32 {
    let years = today.year() - birth.year();
    if (today.month(), today.day()) < (birth.month(), birth.day()) {
        years - 1
    } else {
        years
    }
}

fn years_before(today: NaiveDate, years: u32) -> NaiveDate {
    today
        .checked_sub_months(Months::new(years.saturating_mul(12)))
        .unwrap_or(NaiveDate::MIN)
}

/// Earliest birth date for which the age today is still `age`.
fn earliest_birth_date(today: NaiveDate, age: u32) -> NaiveDate {
    let before = years_before(today, age.saturating_add(1));
    before.succ_opt().unwrap_or(before)
}
