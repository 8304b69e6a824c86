//! # Seed Data Generator
//!
//! Populates the database with sample dealers, batches, requests, invoices
//! and payments for development.
//!
//! ## Usage
//! ```bash
//! # Seed ./medibridge_dev.db
//! cargo run -p medibridge-db --bin seed
//!
//! # Specify database path
//! cargo run -p medibridge-db --bin seed -- --db ./data/medibridge.db
//!
//! # Wipe all data (cascades from dealers)
//! cargo run -p medibridge-db --bin seed -- --clear
//! ```
//!
//! ## Generated Data
//! - 4 dealers across Maharashtra and Gujarat
//! - 3 batches per dealer, expiries spread over every freshness class
//! - requests in every lifecycle state
//! - invoices for confirmed/completed requests, with one PENDING and one
//!   COMPLETED payment each

use anyhow::{bail, Context};
use chrono::{Duration, Utc};
use medibridge_core::invoice::{compute_tax, default_subtotal};
use medibridge_core::lifecycle::apply_transition;
use medibridge_core::{Money, PaymentStatus, RequestStatus};
use medibridge_db::{
    generate_invoice_number, Database, DbConfig, NewBatch, NewDealer, NewInvoice, NewPayment,
    NewRequest,
};
use std::env;

/// (business name, GST number, license number, city)
const DEALERS: &[(&str, &str, &str, &str)] = &[
    ("Shree Ganesh Pharma", "27AABCS1429B1Z1", "MH-TZ2-510231", "Bhiwandi"),
    ("Lifeline Distributors", "27AACCL7788K1Z4", "MH-MZ1-447102", "Pune"),
    ("Sanjivani Medical Agencies", "24AAFCS5512M1Z9", "GJ-AHD-220918", "Ahmedabad"),
    ("Apex Healthcare Traders", "24AAGCA3307P1Z2", "GJ-SRT-118450", "Surat"),
];

/// (name, manufacturer, MRP paise, dealer price paise, days to expiry)
const PRODUCTS: &[(&str, &str, i64, i64, i64)] = &[
    ("Paracetamol 500mg (10x10)", "Cipla", 3500, 2450, 420),
    ("Amoxicillin 250mg Capsules", "Sun Pharma", 9800, 7150, 75),
    ("Azithromycin 500mg Tablets", "Alembic", 11900, 8600, 21),
    ("Cetirizine 10mg Strips", "Dr. Reddy's", 1850, 1200, -12),
    ("Pantoprazole 40mg Tablets", "Alkem", 14500, 10200, 190),
    ("ORS Sachets (Pack of 25)", "FDC", 5000, 3600, 5),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./medibridge_dev.db");
    let mut clear = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--clear" => clear = true,
            "--help" | "-h" => {
                println!("MediBridge Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./medibridge_dev.db)");
                println!("      --clear        Delete all data and exit");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            other => bail!("unknown argument: {other}"),
        }
        i += 1;
    }

    println!("🌱 MediBridge Seed Data Generator");
    println!("=================================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path))
        .await
        .context("opening database")?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    if clear {
        db.clear_all().await.context("clearing data")?;
        println!("✓ All data cleared");
        return Ok(());
    }

    let existing = db.dealers().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} dealers", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Run with --clear first to regenerate.");
        return Ok(());
    }

    let now = Utc::now();
    let today = now.date_naive();

    // Dealers
    let mut dealers = Vec::new();
    for (idx, (name, gst, license, city)) in DEALERS.iter().enumerate() {
        let dealer = db
            .dealers()
            .insert(
                &NewDealer {
                    user_id: format!("seed-user-{}", idx + 1),
                    business_name: name.to_string(),
                    gst_number: gst.to_string(),
                    address: format!("{city}, India"),
                    phone: format!("98{:08}", 20450000 + idx * 1111),
                    license_number: license.to_string(),
                },
                now,
            )
            .await
            .with_context(|| format!("inserting dealer {name}"))?;
        dealers.push(dealer);
    }
    println!("✓ Created {} dealers", dealers.len());

    // Batches: each dealer stocks three products, rotating through the list
    let mut batches = Vec::new();
    for (d_idx, dealer) in dealers.iter().enumerate() {
        for offset in 0..3 {
            let p_idx = (d_idx * 2 + offset) % PRODUCTS.len();
            let (name, manufacturer, mrp, price, days) = PRODUCTS[p_idx];
            let expiry = today + Duration::days(days);
            let batch = db
                .batches()
                .insert(
                    &NewBatch {
                        dealer_id: dealer.id,
                        name: name.to_string(),
                        batch_number: format!("B{}{:02}{:02}", today.format("%y"), d_idx + 1, p_idx + 1),
                        manufacturer: manufacturer.to_string(),
                        quantity: 100 + (p_idx as i64 * 35),
                        mrp: Money::from_paise(mrp),
                        dealer_price: Money::from_paise(price),
                        manufacturing_date: expiry - Duration::days(730),
                        expiry_date: expiry,
                    },
                    now,
                )
                .await
                .with_context(|| format!("inserting batch {name}"))?;
            batches.push(batch);
        }
    }
    println!("✓ Created {} product batches", batches.len());

    // Requests: dealer n+1 asks dealer n for its first batch, ending in
    // every lifecycle state.
    let targets = [
        RequestStatus::Pending,
        RequestStatus::Confirmed,
        RequestStatus::Completed,
        RequestStatus::Rejected,
    ];
    let mut invoices = 0;
    let mut payments = 0;
    for (idx, target) in targets.iter().enumerate() {
        let seller = &dealers[idx];
        let buyer = &dealers[(idx + 1) % dealers.len()];
        let batch = &batches[idx * 3];
        let quantity = 10 + idx as i64 * 5;

        let mut request = db
            .requests()
            .insert(
                &NewRequest {
                    requesting_dealer_id: buyer.id,
                    responding_dealer_id: seller.id,
                    product_id: batch.id,
                    quantity,
                },
                now,
            )
            .await?;

        let path: &[RequestStatus] = match target {
            RequestStatus::Pending => &[],
            RequestStatus::Confirmed => &[RequestStatus::Confirmed],
            RequestStatus::Completed => &[RequestStatus::Confirmed, RequestStatus::Completed],
            RequestStatus::Rejected => &[RequestStatus::Rejected],
        };
        for step in path {
            let from = request.status;
            apply_transition(&mut request, *step, Utc::now())?;
            request = db
                .requests()
                .update_status(&request, from)
                .await?
                .context("request changed while seeding")?;
        }

        if matches!(target, RequestStatus::Confirmed | RequestStatus::Completed) {
            let amounts = compute_tax(default_subtotal(batch.dealer_price, quantity)?)?;
            let invoice = db
                .invoices()
                .insert(
                    &NewInvoice {
                        request_id: request.id,
                        invoice_number: generate_invoice_number(now),
                        dealer_id: seller.id,
                        buyer_dealer_id: buyer.id,
                        amounts,
                    },
                    now,
                )
                .await?;
            invoices += 1;

            let half = Money::from_paise(invoice.total.paise() / 2);
            for (n, amount) in [half, invoice.total - half].into_iter().enumerate() {
                let mut payment = db
                    .payments()
                    .insert(
                        &NewPayment {
                            invoice_id: invoice.id,
                            amount,
                            payment_method: if n == 0 { "NEFT" } else { "UPI" }.to_string(),
                            transaction_id: format!("SEED-{}-{}", invoice.invoice_number, n + 1),
                        },
                        now,
                    )
                    .await?;
                if n == 0 {
                    let pending = payment.clone();
                    payment.status = PaymentStatus::Completed;
                    payment.updated_at = Utc::now();
                    db.payments()
                        .update(&payment, &pending)
                        .await?
                        .context("seeded payment changed underneath the seeder")?;
                }
                payments += 1;
            }
        }
    }
    println!("✓ Created {} requests", targets.len());
    println!("✓ Created {} invoices and {} payments", invoices, payments);

    let totals = db.invoices().totals(None).await?;
    println!();
    println!("Revenue: {}  (GST {})", totals.revenue, totals.gst_amount);
    println!();
    println!("✓ Seed complete!");

    Ok(())
}
