//! Lifecycle engine integration tests over an in-memory database

mod common;

use common::*;
use labtrack_server::{
    error::AppError,
    models::checkout::{CheckoutRequest, ReturnCondition, ReturnRequest},
    models::equipment::{EquipmentStatus, UpdateEquipment},
};

fn checkout_request(user: &str, duration_days: i64, notes: &str) -> CheckoutRequest {
    CheckoutRequest {
        user: Some(user.to_string()),
        duration_days: Some(duration_days),
        notes: if notes.is_empty() {
            None
        } else {
            Some(notes.to_string())
        },
    }
}

fn return_request(condition: ReturnCondition, notes: &str) -> ReturnRequest {
    ReturnRequest {
        condition,
        notes: if notes.is_empty() {
            None
        } else {
            Some(notes.to_string())
        },
    }
}

#[tokio::test]
async fn checkout_sets_field_group_and_opens_one_record() {
    let (services, _pool) = test_services().await;
    let sku = seed_user_and_equipment(&services, "bob", "Oscilloscope").await;
    assert_eq!(sku, "LAB-00001");

    let today = date(2025, 3, 1);
    let ctx = admin_ctx(today);

    let outcome = services
        .lifecycle
        .checkout(&ctx, &sku, &checkout_request("bob", 7, ""))
        .await
        .expect("checkout should succeed");

    let equipment = &outcome.equipment;
    assert_eq!(equipment.status, EquipmentStatus::CheckedOut);
    assert_eq!(equipment.checked_out_by.as_deref(), Some("bob"));
    assert_eq!(equipment.checkout_date, Some(today));
    assert_eq!(equipment.due_date, Some(date(2025, 3, 8)));

    let records = services.reports.history(Some(&sku), None, None).await.unwrap();
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert!(record.is_open());
    assert_eq!(record.user, "bob");
    assert_eq!(record.equipment_name, "Oscilloscope");
    assert_eq!(record.checkout_date, today);
    assert_eq!(record.due_date, date(2025, 3, 8));
}

#[tokio::test]
async fn double_checkout_fails_and_leaves_both_stores_unchanged() {
    let (services, _pool) = test_services().await;
    let sku = seed_user_and_equipment(&services, "bob", "Oscilloscope").await;
    services.users.create(&new_user("carol")).await.unwrap();

    let ctx = admin_ctx(date(2025, 3, 1));
    services
        .lifecycle
        .checkout(&ctx, &sku, &checkout_request("bob", 7, ""))
        .await
        .unwrap();

    let err = services
        .lifecycle
        .checkout(&ctx, &sku, &checkout_request("carol", 3, ""))
        .await
        .expect_err("second checkout must fail");
    assert!(matches!(err, AppError::InvalidState(_)));

    // Equipment still held by bob with the original dates
    let equipment = services.lifecycle.get_equipment(&sku).await.unwrap();
    assert_eq!(equipment.status, EquipmentStatus::CheckedOut);
    assert_eq!(equipment.checked_out_by.as_deref(), Some("bob"));
    assert_eq!(equipment.due_date, Some(date(2025, 3, 8)));

    // No second open record appeared
    let records = services.reports.history(Some(&sku), None, None).await.unwrap();
    assert_eq!(records.len(), 1);
    assert!(records[0].is_open());
}

#[tokio::test]
async fn same_day_round_trip_restores_stock_and_closes_the_record() {
    let (services, _pool) = test_services().await;
    let sku = seed_user_and_equipment(&services, "alice", "Centrifuge").await;

    let today = date(2025, 3, 1);
    let ctx = admin_ctx(today);

    services
        .lifecycle
        .checkout(&ctx, &sku, &checkout_request("alice", 14, ""))
        .await
        .unwrap();

    let outcome = services
        .lifecycle
        .return_equipment(&ctx, &sku, &return_request(ReturnCondition::Good, ""))
        .await
        .expect("return should succeed");

    assert!(outcome.integrity_warnings.is_empty());
    let equipment = &outcome.equipment;
    assert_eq!(equipment.status, EquipmentStatus::InStock);
    assert_eq!(equipment.checked_out_by, None);
    assert_eq!(equipment.checkout_date, None);
    assert_eq!(equipment.due_date, None);

    let records = services.reports.history(Some(&sku), None, None).await.unwrap();
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.return_date, Some(today));
    assert_eq!(record.return_date, Some(record.checkout_date));
}

#[tokio::test]
async fn maintenance_return_parks_equipment_and_keeps_the_notes() {
    let (services, _pool) = test_services().await;
    let sku = seed_user_and_equipment(&services, "bob", "Oscilloscope").await;

    let today = date(2025, 3, 1);
    let ctx = admin_ctx(today);

    services
        .lifecycle
        .checkout(&ctx, &sku, &checkout_request("bob", 7, "field trip"))
        .await
        .unwrap();

    let outcome = services
        .lifecycle
        .return_equipment(
            &ctx,
            &sku,
            &return_request(ReturnCondition::NeedsMaintenance, "worn"),
        )
        .await
        .unwrap();

    assert_eq!(outcome.equipment.status, EquipmentStatus::Maintenance);
    assert_eq!(outcome.equipment.checked_out_by, None);

    let record = outcome.record.expect("the open record must be closed");
    assert_eq!(record.return_date, Some(today));
    let notes = record.notes.unwrap();
    assert!(notes.contains("worn"));
    assert!(notes.contains("Return Condition: Needs Maintenance"));
    // Prior checkout notes survive verbatim
    assert!(notes.starts_with("field trip\n"));
}

#[tokio::test]
async fn damaged_return_comes_back_as_in_stock() {
    let (services, _pool) = test_services().await;
    let sku = seed_user_and_equipment(&services, "bob", "Oscilloscope").await;
    let ctx = admin_ctx(date(2025, 3, 1));

    services
        .lifecycle
        .checkout(&ctx, &sku, &checkout_request("bob", 7, ""))
        .await
        .unwrap();

    let outcome = services
        .lifecycle
        .return_equipment(
            &ctx,
            &sku,
            &return_request(ReturnCondition::Damaged, "cracked casing"),
        )
        .await
        .unwrap();

    // Damage is a ledger note, not a status
    assert_eq!(outcome.equipment.status, EquipmentStatus::InStock);
    let notes = outcome.record.unwrap().notes.unwrap();
    assert!(notes.contains("Return Condition: Damaged"));
    assert!(notes.contains("cracked casing"));
}

#[tokio::test]
async fn returning_one_sku_never_touches_another_skus_records() {
    let (services, _pool) = test_services().await;
    let sku1 = seed_user_and_equipment(&services, "bob", "Oscilloscope").await;
    let sku2 = services
        .lifecycle
        .create_equipment(&new_equipment("Centrifuge"))
        .await
        .unwrap()
        .sku;
    let ctx = admin_ctx(date(2025, 3, 1));

    services
        .lifecycle
        .checkout(&ctx, &sku1, &checkout_request("bob", 7, ""))
        .await
        .unwrap();
    services
        .lifecycle
        .checkout(&ctx, &sku2, &checkout_request("bob", 7, ""))
        .await
        .unwrap();

    services
        .lifecycle
        .return_equipment(&ctx, &sku1, &return_request(ReturnCondition::Good, ""))
        .await
        .unwrap();

    // The other SKU's record is still open and its equipment still held
    let records = services.reports.history(Some(&sku2), None, None).await.unwrap();
    assert_eq!(records.len(), 1);
    assert!(records[0].is_open());
    let equipment = services.lifecycle.get_equipment(&sku2).await.unwrap();
    assert_eq!(equipment.status, EquipmentStatus::CheckedOut);
}

#[tokio::test]
async fn checkout_duration_is_bounded() {
    let (services, _pool) = test_services().await;
    let sku = seed_user_and_equipment(&services, "bob", "Oscilloscope").await;
    let ctx = admin_ctx(date(2025, 3, 1));

    for duration in [0, -3, 181] {
        let err = services
            .lifecycle
            .checkout(&ctx, &sku, &checkout_request("bob", duration, ""))
            .await
            .expect_err("out-of-range duration must fail");
        assert!(matches!(err, AppError::Validation(_)));
    }

    let equipment = services.lifecycle.get_equipment(&sku).await.unwrap();
    assert_eq!(equipment.status, EquipmentStatus::InStock);
    assert!(services
        .reports
        .history(Some(&sku), None, None)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn checkout_of_unknown_sku_or_user_is_not_found() {
    let (services, _pool) = test_services().await;
    let sku = seed_user_and_equipment(&services, "bob", "Oscilloscope").await;
    let ctx = admin_ctx(date(2025, 3, 1));

    let err = services
        .lifecycle
        .checkout(&ctx, "LAB-99999", &checkout_request("bob", 7, ""))
        .await
        .expect_err("unknown sku");
    assert!(matches!(err, AppError::NotFound(_)));

    let err = services
        .lifecycle
        .checkout(&ctx, &sku, &checkout_request("mallory", 7, ""))
        .await
        .expect_err("unknown user");
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn returning_in_stock_equipment_is_invalid_state() {
    let (services, _pool) = test_services().await;
    let sku = seed_user_and_equipment(&services, "bob", "Oscilloscope").await;
    let ctx = admin_ctx(date(2025, 3, 1));

    let err = services
        .lifecycle
        .return_equipment(&ctx, &sku, &return_request(ReturnCondition::Good, ""))
        .await
        .expect_err("nothing to return");
    assert!(matches!(err, AppError::InvalidState(_)));
}

#[tokio::test]
async fn return_without_open_record_proceeds_with_integrity_warning() {
    let (services, pool) = test_services().await;
    let sku = seed_user_and_equipment(&services, "bob", "Oscilloscope").await;
    let ctx = admin_ctx(date(2025, 3, 1));

    services
        .lifecycle
        .checkout(&ctx, &sku, &checkout_request("bob", 7, ""))
        .await
        .unwrap();

    // Corrupt the ledger: drop the open record behind the engine's back
    sqlx::query("DELETE FROM checkout_history WHERE sku = ? AND return_date IS NULL")
        .bind(&sku)
        .execute(&pool)
        .await
        .unwrap();

    let outcome = services
        .lifecycle
        .return_equipment(&ctx, &sku, &return_request(ReturnCondition::Good, ""))
        .await
        .expect("equipment transition must still proceed");

    assert_eq!(outcome.equipment.status, EquipmentStatus::InStock);
    assert!(outcome.record.is_none());
    assert_eq!(outcome.integrity_warnings.len(), 1);
}

#[tokio::test]
async fn return_with_duplicate_open_records_closes_the_most_recent() {
    let (services, pool) = test_services().await;
    let sku = seed_user_and_equipment(&services, "bob", "Oscilloscope").await;
    let ctx = admin_ctx(date(2025, 3, 1));

    // Corrupt the ledger first: a stale open record that a real checkout
    // will then shadow with a higher id
    sqlx::query(
        r#"
        INSERT INTO checkout_history (sku, equipment_name, user, checkout_date, due_date, return_date, notes)
        VALUES (?, 'Oscilloscope', 'bob', '2025-02-01', '2025-02-08', NULL, NULL)
        "#,
    )
    .bind(&sku)
    .execute(&pool)
    .await
    .unwrap();

    services
        .lifecycle
        .checkout(&ctx, &sku, &checkout_request("bob", 7, ""))
        .await
        .unwrap();

    let outcome = services
        .lifecycle
        .return_equipment(&ctx, &sku, &return_request(ReturnCondition::Good, ""))
        .await
        .unwrap();

    assert_eq!(outcome.integrity_warnings.len(), 1);
    // The later (higher id) record is the one closed
    let closed = outcome.record.unwrap();
    assert_eq!(closed.checkout_date, date(2025, 3, 1));

    let records = services.reports.history(Some(&sku), None, None).await.unwrap();
    let still_open: Vec<_> = records.iter().filter(|r| r.is_open()).collect();
    assert_eq!(still_open.len(), 1);
    assert_eq!(still_open[0].checkout_date, date(2025, 2, 1));
}

#[tokio::test]
async fn status_is_locked_while_checked_out() {
    let (services, _pool) = test_services().await;
    let sku = seed_user_and_equipment(&services, "bob", "Oscilloscope").await;
    let ctx = admin_ctx(date(2025, 3, 1));

    services
        .lifecycle
        .checkout(&ctx, &sku, &checkout_request("bob", 7, ""))
        .await
        .unwrap();

    let update = UpdateEquipment {
        name: Some("Oscilloscope Mk II".to_string()),
        status: Some(EquipmentStatus::Lost),
        ..Default::default()
    };
    let equipment = services.lifecycle.edit(&ctx, &sku, &update).await.unwrap();

    // The rename lands, the status change is silently dropped
    assert_eq!(equipment.name, "Oscilloscope Mk II");
    assert_eq!(equipment.status, EquipmentStatus::CheckedOut);
    assert_eq!(equipment.checked_out_by.as_deref(), Some("bob"));
}

#[tokio::test]
async fn status_can_change_when_not_checked_out() {
    let (services, _pool) = test_services().await;
    let sku = seed_user_and_equipment(&services, "bob", "Oscilloscope").await;
    let ctx = admin_ctx(date(2025, 3, 1));

    let update = UpdateEquipment {
        status: Some(EquipmentStatus::Lost),
        ..Default::default()
    };
    let equipment = services.lifecycle.edit(&ctx, &sku, &update).await.unwrap();
    assert_eq!(equipment.status, EquipmentStatus::Lost);

    // Lost is terminal for the checkout engine
    let err = services
        .lifecycle
        .checkout(&ctx, &sku, &checkout_request("bob", 7, ""))
        .await
        .expect_err("lost equipment cannot be checked out");
    assert!(matches!(err, AppError::InvalidState(_)));

    // But an edit can bring it back into circulation
    let update = UpdateEquipment {
        status: Some(EquipmentStatus::InStock),
        ..Default::default()
    };
    services.lifecycle.edit(&ctx, &sku, &update).await.unwrap();
    services
        .lifecycle
        .checkout(&ctx, &sku, &checkout_request("bob", 7, ""))
        .await
        .expect("back in stock, checkout works again");
}

#[tokio::test]
async fn edit_cannot_set_checked_out_directly() {
    let (services, _pool) = test_services().await;
    let sku = seed_user_and_equipment(&services, "bob", "Oscilloscope").await;
    let ctx = admin_ctx(date(2025, 3, 1));

    let update = UpdateEquipment {
        status: Some(EquipmentStatus::CheckedOut),
        ..Default::default()
    };
    let err = services
        .lifecycle
        .edit(&ctx, &sku, &update)
        .await
        .expect_err("CheckedOut is only reachable through checkout");
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn deleting_a_user_releases_holdings_and_closes_their_records() {
    let (services, _pool) = test_services().await;
    let sku1 = seed_user_and_equipment(&services, "bob", "Oscilloscope").await;
    let equipment2 = services
        .lifecycle
        .create_equipment(&new_equipment("Signal Generator"))
        .await
        .unwrap();
    let ctx = admin_ctx(date(2025, 3, 1));

    services
        .lifecycle
        .checkout(&ctx, &sku1, &checkout_request("bob", 7, ""))
        .await
        .unwrap();
    services
        .lifecycle
        .checkout(&ctx, &equipment2.sku, &checkout_request("bob", 14, ""))
        .await
        .unwrap();

    let outcome = services
        .lifecycle
        .delete_user_cascade(&ctx, "bob")
        .await
        .expect("cascade should succeed");

    assert_eq!(outcome.released.len(), 2);
    assert!(outcome.integrity_warnings.is_empty());

    // The user is gone
    let err = services.users.get("bob").await.expect_err("user removed");
    assert!(matches!(err, AppError::NotFound(_)));

    // Holdings are back in stock with the field group cleared
    for sku in [&sku1, &equipment2.sku] {
        let equipment = services.lifecycle.get_equipment(sku).await.unwrap();
        assert_eq!(equipment.status, EquipmentStatus::InStock);
        assert_eq!(equipment.checked_out_by, None);
        assert_eq!(equipment.checkout_date, None);
        assert_eq!(equipment.due_date, None);

        // Unlike the historical behavior, the ledger records are closed,
        // with a system-generated reason
        let records = services.reports.history(Some(sku), None, None).await.unwrap();
        assert_eq!(records.len(), 1);
        assert!(!records[0].is_open());
        let notes = records[0].notes.as_deref().unwrap();
        assert!(notes.contains("Return Condition: Force Released"));
    }
}

#[tokio::test]
async fn deleting_checked_out_equipment_requires_force_and_closes_the_record() {
    let (services, _pool) = test_services().await;
    let sku = seed_user_and_equipment(&services, "bob", "Oscilloscope").await;
    let ctx = admin_ctx(date(2025, 3, 1));

    services
        .lifecycle
        .checkout(&ctx, &sku, &checkout_request("bob", 7, ""))
        .await
        .unwrap();

    let err = services
        .lifecycle
        .delete_equipment(&ctx, &sku, false)
        .await
        .expect_err("checked-out equipment must not delete silently");
    assert!(matches!(err, AppError::InvalidState(_)));

    services
        .lifecycle
        .delete_equipment(&ctx, &sku, true)
        .await
        .expect("forced deletion succeeds");

    let err = services.lifecycle.get_equipment(&sku).await.expect_err("gone");
    assert!(matches!(err, AppError::NotFound(_)));

    // The audit trail survives the deletion, closed
    let records = services.reports.history(Some(&sku), None, None).await.unwrap();
    assert_eq!(records.len(), 1);
    assert!(!records[0].is_open());
}

#[tokio::test]
async fn sku_suffixes_are_never_reused_after_deletion() {
    let (services, _pool) = test_services().await;
    let ctx = admin_ctx(date(2025, 3, 1));

    let first = services
        .lifecycle
        .create_equipment(&new_equipment("Oscilloscope"))
        .await
        .unwrap();
    let second = services
        .lifecycle
        .create_equipment(&new_equipment("Centrifuge"))
        .await
        .unwrap();
    assert_eq!(first.sku, "LAB-00001");
    assert_eq!(second.sku, "LAB-00002");

    services
        .lifecycle
        .delete_equipment(&ctx, &second.sku, false)
        .await
        .unwrap();

    let third = services
        .lifecycle
        .create_equipment(&new_equipment("Spectrometer"))
        .await
        .unwrap();
    assert_eq!(third.sku, "LAB-00003");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_checkouts_of_one_sku_yield_exactly_one_success() {
    let (services, _pool) = test_services().await;
    let sku = seed_user_and_equipment(&services, "bob", "Oscilloscope").await;
    services.users.create(&new_user("carol")).await.unwrap();

    let ctx = admin_ctx(date(2025, 3, 1));

    let a = {
        let services = services.clone();
        let ctx = ctx.clone();
        let sku = sku.clone();
        tokio::spawn(async move {
            services
                .lifecycle
                .checkout(&ctx, &sku, &checkout_request("bob", 7, ""))
                .await
        })
    };
    let b = {
        let services = services.clone();
        let ctx = ctx.clone();
        let sku = sku.clone();
        tokio::spawn(async move {
            services
                .lifecycle
                .checkout(&ctx, &sku, &checkout_request("carol", 3, ""))
                .await
        })
    };

    let results = [a.await.unwrap(), b.await.unwrap()];
    let successes = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1, "exactly one checkout may win");

    let failure = results
        .iter()
        .find_map(|r| r.as_ref().err())
        .expect("one checkout must lose");
    assert!(matches!(failure, AppError::InvalidState(_)));

    // The ledger holds exactly one open record for the winner
    let records = services.reports.history(Some(&sku), None, None).await.unwrap();
    assert_eq!(records.len(), 1);
    assert!(records[0].is_open());
}
