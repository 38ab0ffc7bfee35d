#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Common test utilities for integration tests.
//!
//! Filters run through the real [`FilterService`] against a [`MemoryStore`]
//! seeded from `carehome-test-utils` fixtures. Ages are evaluated relative
//! to a pinned date so results do not depend on when the suite runs.

#![allow(dead_code)]

use std::sync::Arc;

use carehome_kernel::filter::{FilterService, FixedClock, MemoryStore, PredicateBuilder};
use carehome_test_utils::date;
use chrono::NaiveDate;

/// The date every test treats as "today".
pub fn today() -> NaiveDate {
    date(2024, 3, 1)
}

pub fn builder() -> PredicateBuilder<FixedClock> {
    PredicateBuilder::with_clock(FixedClock(today()))
}

/// A service over `store` using the default tolerance.
pub fn service(store: MemoryStore) -> FilterService<FixedClock> {
    FilterService::new(builder(), Arc::new(store))
}
