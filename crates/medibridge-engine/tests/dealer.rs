//! Dealer registry through the engine.

mod common;

use common::{batch, dealer, dealer_cmd, engine, pending_request};
use medibridge_engine::{CreateRequest, EngineError, ErrorCode, ListDealers, UpdateDealer};

#[tokio::test]
async fn test_create_trims_and_requires_fields() {
    let (engine, _) = engine().await;

    let mut cmd = dealer_cmd("TRM");
    cmd.business_name = "  Sai Medico  ".to_string();
    let created = engine.create_dealer(cmd).await.unwrap();
    assert_eq!(created.business_name, "Sai Medico");
    assert_eq!(created.created_at, engine.now());

    let mut blank = dealer_cmd("BLK");
    blank.phone = "   ".to_string();
    let err = engine.create_dealer(blank).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::ValidationError);
    assert_eq!(err.field(), Some("phone"));
}

#[tokio::test]
async fn test_duplicate_gst_and_license() {
    let (engine, _) = engine().await;
    let first = dealer(&engine, "DUP").await;

    let mut same_gst = dealer_cmd("OTHER");
    same_gst.gst_number = first.gst_number.clone();
    assert_eq!(
        engine.create_dealer(same_gst).await.unwrap_err(),
        EngineError::duplicate("gstNumber", first.gst_number.clone())
    );

    let mut same_license = dealer_cmd("OTHER");
    same_license.license_number = first.license_number.clone();
    assert_eq!(
        engine.create_dealer(same_license).await.unwrap_err(),
        EngineError::duplicate("licenseNumber", first.license_number.clone())
    );
}

#[tokio::test]
async fn test_concurrent_registration_has_one_winner() {
    let (engine, _) = engine().await;

    let mut second = dealer_cmd("RACE2");
    second.gst_number = dealer_cmd("RACE1").gst_number;

    let (a, b) = tokio::join!(
        engine.create_dealer(dealer_cmd("RACE1")),
        engine.create_dealer(second),
    );

    let results = [a, b];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    let loser = results.iter().find_map(|r| r.as_ref().err()).unwrap();
    assert_eq!(loser.code(), ErrorCode::Duplicate);
    assert_eq!(loser.field(), Some("gstNumber"));

    let listed = engine.list_dealers(ListDealers::default()).await.unwrap();
    assert_eq!(listed.len(), 1);
}

#[tokio::test]
async fn test_lookup_update_and_search() {
    let (engine, clock) = engine().await;
    let a = dealer(&engine, "AAA").await;
    dealer(&engine, "BBB").await;

    assert_eq!(engine.get_dealer_by_user("user-AAA").await.unwrap(), a);
    assert_eq!(
        engine.get_dealer_by_user("nobody").await.unwrap_err(),
        EngineError::not_found("Dealer", "nobody")
    );

    clock.advance(chrono::Duration::minutes(10));
    let updated = engine
        .update_dealer(UpdateDealer {
            id: a.id,
            phone: Some("02222001100".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(updated.phone, "02222001100");
    assert_eq!(updated.gst_number, a.gst_number);
    assert_eq!(updated.updated_at, engine.now());

    let found = engine
        .list_dealers(ListDealers {
            search: Some("BBB Pharma".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(found.len(), 1);

    let by_phone = engine
        .list_dealers(ListDealers {
            search: Some("022220".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(by_phone, vec![updated]);

    let paged = engine
        .list_dealers(ListDealers {
            limit: Some(1),
            offset: Some(1),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(paged.len(), 1);
}

#[tokio::test]
async fn test_delete_refused_while_referenced() {
    let (engine, _) = engine().await;
    let (buyer, _, request) = pending_request(&engine, 5).await;

    let err = engine.delete_dealer(buyer.id).await.unwrap_err();
    assert_eq!(err.field(), Some("dealerId"));

    engine.delete_request(request.id).await.unwrap();
    engine.delete_dealer(buyer.id).await.unwrap();
    assert_eq!(
        engine.get_dealer(buyer.id).await.unwrap_err(),
        EngineError::not_found("Dealer", buyer.id)
    );
}

#[tokio::test]
async fn test_delete_racing_a_new_request() {
    let (engine, _) = engine().await;
    let buyer = dealer(&engine, "RCB").await;
    let seller = dealer(&engine, "RCS").await;
    let stock = batch(&engine, seller.id, "AZ-RACE", 120).await;

    let (deleted, requested) = tokio::join!(
        engine.delete_dealer(seller.id),
        engine.create_request(CreateRequest {
            requesting_dealer_id: buyer.id,
            responding_dealer_id: seller.id,
            product_id: stock.id,
            quantity: 3,
        }),
    );

    // Exactly one side wins, and the loser leaves no trace.
    assert_ne!(deleted.is_ok(), requested.is_ok());
    match requested {
        Ok(request) => {
            assert_eq!(deleted.unwrap_err().field(), Some("dealerId"));
            assert_eq!(engine.get_request(request.id).await.unwrap(), request);
            assert_eq!(engine.get_dealer(seller.id).await.unwrap(), seller);
        }
        Err(_) => {
            assert_eq!(
                engine.get_dealer(seller.id).await.unwrap_err(),
                EngineError::not_found("Dealer", seller.id)
            );
        }
    }
}
