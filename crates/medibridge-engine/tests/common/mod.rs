//! Shared fixtures: an in-memory engine on a pinned clock, plus helpers
//! that register dealers and list batches.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use medibridge_engine::{
    CreateBatch, CreateDealer, CreateRequest, Dealer, Engine, EngineConfig, FixedClock, Money,
    ProductBatch, TransferRequest, TransitionRequest,
};

/// 2025-06-01, the pinned "today" of every test.
pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
}

pub async fn engine() -> (Engine, Arc<FixedClock>) {
    let clock = Arc::new(FixedClock::new(
        Utc.with_ymd_and_hms(2025, 6, 1, 9, 30, 0).unwrap(),
    ));
    let engine = Engine::open_with_clock(EngineConfig::in_memory(), clock.clone())
        .await
        .unwrap();
    (engine, clock)
}

pub fn dealer_cmd(tag: &str) -> CreateDealer {
    CreateDealer {
        user_id: format!("user-{tag}"),
        business_name: format!("{tag} Pharma Distributors"),
        gst_number: format!("27AAAC{tag}1Z5"),
        address: "Bhiwandi, Maharashtra".to_string(),
        phone: "9820012345".to_string(),
        license_number: format!("MH-TZ2-{tag}"),
    }
}

pub async fn dealer(engine: &Engine, tag: &str) -> Dealer {
    engine.create_dealer(dealer_cmd(tag)).await.unwrap()
}

/// A batch of 100 units at ₹85.00 expiring `days` from today.
pub fn batch_cmd(dealer_id: i64, number: &str, days: i64) -> CreateBatch {
    let expiry = today() + Duration::days(days);
    CreateBatch {
        dealer_id,
        name: "Azithromycin 500mg".to_string(),
        batch_number: number.to_string(),
        manufacturer: "Alembic".to_string(),
        quantity: 100,
        mrp: Money::from_paise(12000),
        dealer_price: Money::from_paise(8500),
        manufacturing_date: (expiry - Duration::days(730)).to_string(),
        expiry_date: expiry.to_string(),
    }
}

pub async fn batch(engine: &Engine, dealer_id: i64, number: &str, days: i64) -> ProductBatch {
    engine
        .create_batch(batch_cmd(dealer_id, number, days))
        .await
        .unwrap()
}

/// Buyer, seller, a seller batch and a PENDING request for `quantity`.
pub async fn pending_request(engine: &Engine, quantity: i64) -> (Dealer, Dealer, TransferRequest) {
    let buyer = dealer(engine, "BUY").await;
    let seller = dealer(engine, "SEL").await;
    let stock = batch(engine, seller.id, "AZ-001", 200).await;
    let request = engine
        .create_request(CreateRequest {
            requesting_dealer_id: buyer.id,
            responding_dealer_id: seller.id,
            product_id: stock.id,
            quantity,
        })
        .await
        .unwrap();
    (buyer, seller, request)
}

pub async fn move_to(engine: &Engine, id: i64, status: &str) -> TransferRequest {
    engine
        .transition_request(TransitionRequest {
            id,
            status: status.to_string(),
        })
        .await
        .unwrap()
        .request
}
