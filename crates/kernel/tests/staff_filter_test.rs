#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Staff user filter integration tests.

use carehome_kernel::filter::{Partition, StaffUserFilter};
use carehome_test_utils::{TestStore, assert, test_resident, test_session, test_staff};
use uuid::Uuid;

mod common;
use common::service;

#[tokio::test]
async fn partitions_and_enabled_flag() {
    let active = test_staff("Active");
    let disabled = test_staff("Disabled").disabled();
    let gone = test_staff("Gone").discharged();
    let store = TestStore::new()
        .with(&active)
        .with(&disabled)
        .with(&gone)
        .build();
    let svc = service(store);
    let any = StaffUserFilter::default();

    assert::same_ids(
        &svc.staff_users(&any).await.unwrap(),
        &[active.id, disabled.id],
    );
    assert::same_ids(
        &svc.active_staff_users(&any).await.unwrap(),
        &[active.id, disabled.id],
    );
    assert_eq!(
        svc.discharged_staff_users(&any).await.unwrap(),
        vec![gone.id]
    );

    let enabled = StaffUserFilter {
        enabled: Some(true),
        ..Default::default()
    };
    assert_eq!(svc.staff_users(&enabled).await.unwrap(), vec![active.id]);

    let discharged = StaffUserFilter {
        partition: Partition::Discharged,
        enabled: Some(true),
        ..Default::default()
    };
    assert_eq!(svc.staff_users(&discharged).await.unwrap(), vec![gone.id]);
}

#[tokio::test]
async fn staff_who_logged_a_game() {
    let game = Uuid::now_v7();
    let home = Uuid::now_v7();
    let carer = test_staff("Carer").in_residence(home);
    let other = test_staff("Other").in_residence(home);
    let resident = test_resident("Nuria");

    let mut store = TestStore::new();
    store.add(&carer).add(&other).add(&resident);
    for _ in 0..2 {
        store.add(&test_session(game, resident.id).logged_by(carer.id));
    }
    store.add(&test_session(Uuid::now_v7(), resident.id).logged_by(other.id));
    let svc = service(store.build());

    let filter = StaffUserFilter {
        residence_id: Some(home),
        game_id: Some(game),
        ..Default::default()
    };
    assert_eq!(svc.staff_users(&filter).await.unwrap(), vec![carer.id]);
}
