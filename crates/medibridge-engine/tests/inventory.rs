//! Product batches, FIFO listing and expiry classification.

mod common;

use chrono::Duration;
use common::{batch, batch_cmd, dealer, engine, today};
use medibridge_engine::{
    AdjustStock, CreateBatch, EngineError, ErrorCode, ExpiryClass, ListBatches, Money,
    NearExpiryQuery, UpdateBatch,
};
use serde_json::json;

#[tokio::test]
async fn test_create_requires_dealer_and_valid_dates() {
    let (engine, _) = engine().await;

    let missing = engine.create_batch(batch_cmd(42, "B-1", 100)).await.unwrap_err();
    assert_eq!(missing, EngineError::not_found("Dealer", 42));

    let d = dealer(&engine, "INV").await;
    let mut cmd = batch_cmd(d.id, "B-1", 100);
    cmd.manufacturing_date = cmd.expiry_date.clone();
    let err = engine.create_batch(cmd).await.unwrap_err();
    assert_eq!(err.field(), Some("expiryDate"));

    let mut cmd = batch_cmd(d.id, "B-1", 100);
    cmd.expiry_date = "next year".to_string();
    assert_eq!(engine.create_batch(cmd).await.unwrap_err().field(), Some("expiryDate"));

    let mut cmd = batch_cmd(d.id, "B-1", 100);
    cmd.dealer_price = Money::zero();
    assert_eq!(engine.create_batch(cmd).await.unwrap_err().field(), Some("dealerPrice"));

    let mut cmd = batch_cmd(d.id, "B-1", 100);
    cmd.manufacturer = "  ".to_string();
    assert_eq!(engine.create_batch(cmd).await.unwrap_err().field(), Some("manufacturer"));
}

#[tokio::test]
async fn test_create_from_json() {
    let (engine, _) = engine().await;
    let d = dealer(&engine, "JSN").await;

    let cmd: CreateBatch = serde_json::from_value(json!({
        "dealerId": d.id,
        "name": "Paracetamol 500mg",
        "batchNumber": "PCM-2401",
        "manufacturer": "Cipla",
        "quantity": 0,
        "mrp": "35.00",
        "dealerPrice": 24.5,
        "manufacturingDate": "2024-01-10",
        "expiryDate": "2026-01-09T00:00:00Z"
    }))
    .unwrap();
    let created = engine.create_batch(cmd).await.unwrap();

    assert_eq!(created.quantity, 0);
    assert_eq!(created.mrp, Money::from_paise(3500));
    assert_eq!(created.dealer_price, Money::from_paise(2450));
    assert_eq!(created.expiry_date.to_string(), "2026-01-09");

    let wire = serde_json::to_value(&created).unwrap();
    assert_eq!(wire["dealerPrice"], "24.50");
    assert_eq!(wire["expiryDate"], "2026-01-09");
}

#[tokio::test]
async fn test_update_checks_effective_dates() {
    let (engine, _) = engine().await;
    let d = dealer(&engine, "UPD").await;
    let b = batch(&engine, d.id, "B-1", 100).await;

    // Expiry moved before the stored manufacturing date.
    let err = engine
        .update_batch(UpdateBatch {
            id: b.id,
            expiry_date: Some((b.manufacturing_date - Duration::days(1)).to_string()),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert_eq!(err.field(), Some("expiryDate"));

    let updated = engine
        .update_batch(UpdateBatch {
            id: b.id,
            quantity: Some(7),
            mrp: Some(Money::from_paise(9900)),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(updated.quantity, 7);
    assert_eq!(updated.mrp, Money::from_paise(9900));
    assert_eq!(updated.expiry_date, b.expiry_date);

    let negative = engine
        .update_batch(UpdateBatch {
            id: b.id,
            quantity: Some(-1),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert_eq!(negative.field(), Some("quantity"));
}

#[tokio::test]
async fn test_fifo_listing_with_classes() {
    let (engine, _) = engine().await;
    let d = dealer(&engine, "FIF").await;
    batch(&engine, d.id, "LATE", 365).await;
    batch(&engine, d.id, "GONE", -5).await;
    batch(&engine, d.id, "EDGE", 30).await;
    batch(&engine, d.id, "MID", 60).await;

    let listed = engine
        .list_batches(ListBatches {
            dealer_id: Some(d.id),
            ..Default::default()
        })
        .await
        .unwrap();

    let numbers: Vec<_> = listed.iter().map(|c| c.batch.batch_number.as_str()).collect();
    assert_eq!(numbers, ["GONE", "EDGE", "MID", "LATE"]);

    let classes: Vec<_> = listed.iter().map(|c| c.expiry_class).collect();
    assert_eq!(
        classes,
        [
            ExpiryClass::Expired,
            ExpiryClass::ExpiringSoon,
            ExpiryClass::Good,
            ExpiryClass::Excellent
        ]
    );
    assert_eq!(listed[0].days_until_expiry, -5);
}

#[tokio::test]
async fn test_expiry_filters() {
    let (engine, _) = engine().await;
    let d = dealer(&engine, "FLT").await;
    batch(&engine, d.id, "D0", 0).await;
    batch(&engine, d.id, "D10", 10).await;
    batch(&engine, d.id, "D45", 45).await;
    batch(&engine, d.id, "PAST", -1).await;

    let near = engine
        .list_batches(ListBatches {
            near_expiry: Some(10),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(near.len(), 2);

    let window = engine
        .list_batches(ListBatches {
            expiring_after: Some(today().to_string()),
            expiring_before: Some((today() + Duration::days(45)).to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(window.len(), 3);

    let by_number = engine
        .list_batches(ListBatches {
            batch_number: Some("D45".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(by_number.len(), 1);

    let err = engine
        .list_batches(ListBatches {
            near_expiry: Some(-3),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert_eq!(err.field(), Some("nearExpiry"));
}

#[tokio::test]
async fn test_adjust_stock() {
    let (engine, _) = engine().await;
    let d = dealer(&engine, "ADJ").await;
    let b = batch(&engine, d.id, "B-1", 100).await;

    let after = engine
        .adjust_stock(AdjustStock { id: b.id, delta: -40 })
        .await
        .unwrap();
    assert_eq!(after.quantity, 60);

    let err = engine
        .adjust_stock(AdjustStock { id: b.id, delta: -61 })
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::ValidationError);
    assert_eq!(engine.get_batch(b.id).await.unwrap().quantity, 60);

    let missing = engine
        .adjust_stock(AdjustStock { id: 999, delta: 5 })
        .await
        .unwrap_err();
    assert_eq!(missing, EngineError::not_found("ProductBatch", 999));
}

#[tokio::test]
async fn test_summary_and_alerts_follow_the_clock() {
    let (engine, clock) = engine().await;
    let d = dealer(&engine, "SUM").await;
    batch(&engine, d.id, "SOON", 20).await;
    batch(&engine, d.id, "LATER", 40).await;
    batch(&engine, d.id, "OLD", -2).await;

    let summary = engine.inventory_summary(Some(d.id)).await.unwrap();
    assert_eq!(summary.total_batches, 3);
    assert_eq!(summary.total_units, 300);
    assert_eq!(summary.expiring_soon, 1);
    assert_eq!(summary.expired, 1);
    // 3 × 100 units × ₹85.00
    assert_eq!(summary.total_value, Money::from_paise(2_550_000));

    let alerts = engine
        .near_expiry_alerts(NearExpiryQuery::default())
        .await
        .unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].batch.batch_number, "SOON");
    assert_eq!(alerts[0].days_until_expiry, 20);

    clock.advance(Duration::days(15));
    let later = engine
        .near_expiry_alerts(NearExpiryQuery {
            dealer_id: Some(d.id),
            days: Some(30),
        })
        .await
        .unwrap();
    let numbers: Vec<_> = later.iter().map(|c| c.batch.batch_number.as_str()).collect();
    assert_eq!(numbers, ["SOON", "LATER"]);

    assert_eq!(
        engine.inventory_summary(Some(404)).await.unwrap_err(),
        EngineError::not_found("Dealer", 404)
    );
}

#[tokio::test]
async fn test_huge_expiry_windows_reach_every_future_batch() {
    let (engine, _) = engine().await;
    let d = dealer(&engine, "WIN").await;
    batch(&engine, d.id, "SOON", 5).await;
    batch(&engine, d.id, "FAR", 3000).await;
    batch(&engine, d.id, "PAST", -1).await;

    let listed = engine
        .list_batches(ListBatches {
            near_expiry: Some(1_000_000_000_000),
            ..Default::default()
        })
        .await
        .unwrap();
    let numbers: Vec<_> = listed.iter().map(|c| c.batch.batch_number.as_str()).collect();
    assert_eq!(numbers, ["SOON", "FAR"]);

    let alerts = engine
        .near_expiry_alerts(NearExpiryQuery {
            dealer_id: Some(d.id),
            days: Some(i64::MAX),
        })
        .await
        .unwrap();
    assert_eq!(alerts.len(), 2);
}

#[tokio::test]
async fn test_adjust_stock_at_the_integer_limits() {
    let (engine, _) = engine().await;
    let d = dealer(&engine, "LIM").await;
    let b = batch(&engine, d.id, "B-1", 100).await;

    let err = engine
        .adjust_stock(AdjustStock { id: b.id, delta: i64::MIN })
        .await
        .unwrap_err();
    assert_eq!(err.field(), Some("delta"));

    let err = engine
        .adjust_stock(AdjustStock { id: b.id, delta: i64::MAX })
        .await
        .unwrap_err();
    assert_eq!(err.field(), Some("delta"));
    assert_eq!(engine.get_batch(b.id).await.unwrap().quantity, 100);

    // Filling to the top still works, and the summary saturates.
    let full = engine
        .adjust_stock(AdjustStock { id: b.id, delta: i64::MAX - 100 })
        .await
        .unwrap();
    assert_eq!(full.quantity, i64::MAX);
    batch(&engine, d.id, "B-2", 50).await;

    let summary = engine.inventory_summary(Some(d.id)).await.unwrap();
    assert_eq!(summary.total_batches, 2);
    assert_eq!(summary.total_units, i64::MAX);
    assert_eq!(summary.total_value, Money::from_paise(i64::MAX));
}
