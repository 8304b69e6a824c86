//! # Inventory Commands
//!
//! Product batches: create, update, FIFO listing, explicit stock
//! adjustment, summaries and near-expiry alerts.
//!
//! ## Freshness Classes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  d = expiry_date − today                                               │
//! │                                                                         │
//! │      d < 0        0 ≤ d ≤ 30        30 < d ≤ 90        d > 90           │
//! │  ──────────────┼───────────────┼─────────────────┼──────────────►       │
//! │     EXPIRED      EXPIRING_SOON        GOOD           EXCELLENT          │
//! │                                                                         │
//! │  Classes are derived on read with the engine clock, never stored.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Transfer requests never move stock on their own. `adjust_stock` is the
//! only command that changes quantity outside a full batch update.

use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{debug, info};

use medibridge_core::expiry::{classify_all, inventory_summary, near_expiry_alerts, window_end};
use medibridge_core::validation::{
    parse_date, validate_date_range, validate_id, validate_price, validate_required,
    validate_search_query, validate_stock_quantity, validate_window_days,
};
use medibridge_core::{ClassifiedBatch, InventorySummary, Money, ProductBatch, ValidationError};
use medibridge_db::{BatchFilter, NewBatch};

use super::found;
use crate::engine::Engine;
use crate::error::EngineResult;

/// Lists a new batch for a dealer.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBatch {
    pub dealer_id: i64,
    pub name: String,
    pub batch_number: String,
    pub manufacturer: String,
    pub quantity: i64,
    pub mrp: Money,
    pub dealer_price: Money,
    /// `YYYY-MM-DD` or RFC 3339.
    pub manufacturing_date: String,
    /// `YYYY-MM-DD` or RFC 3339.
    pub expiry_date: String,
}

/// Partial batch update. Unset fields keep their stored value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBatch {
    pub id: i64,
    pub name: Option<String>,
    pub batch_number: Option<String>,
    pub manufacturer: Option<String>,
    pub quantity: Option<i64>,
    pub mrp: Option<Money>,
    pub dealer_price: Option<Money>,
    pub manufacturing_date: Option<String>,
    pub expiry_date: Option<String>,
}

/// Batch listing filters. Results are FIFO-ordered.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListBatches {
    pub dealer_id: Option<i64>,
    pub batch_number: Option<String>,
    /// Expiry on or before this date.
    pub expiring_before: Option<String>,
    /// Expiry on or after this date.
    pub expiring_after: Option<String>,
    /// Expiry within this many days from today (today included).
    pub near_expiry: Option<i64>,
    /// Matched against name, batch number and manufacturer.
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Adds `delta` units (negative to remove) to a batch.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjustStock {
    pub id: i64,
    pub delta: i64,
}

/// Near-expiry alert query.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NearExpiryQuery {
    pub dealer_id: Option<i64>,
    /// Defaults to `inventory.near_expiry_days` from the config.
    pub days: Option<i64>,
}

fn parse_optional_date(field: &str, value: Option<&str>) -> Result<Option<NaiveDate>, ValidationError> {
    value.map(|v| parse_date(field, v)).transpose()
}

impl Engine {
    pub async fn create_batch(&self, cmd: CreateBatch) -> EngineResult<ProductBatch> {
        validate_id("dealerId", cmd.dealer_id)?;
        let name = validate_required("name", &cmd.name)?;
        let batch_number = validate_required("batchNumber", &cmd.batch_number)?;
        let manufacturer = validate_required("manufacturer", &cmd.manufacturer)?;
        validate_stock_quantity(cmd.quantity)?;
        validate_price("mrp", cmd.mrp)?;
        validate_price("dealerPrice", cmd.dealer_price)?;
        let manufacturing_date = parse_date("manufacturingDate", &cmd.manufacturing_date)?;
        let expiry_date = parse_date("expiryDate", &cmd.expiry_date)?;
        validate_date_range(manufacturing_date, expiry_date)?;

        found(
            self.db().dealers().get(cmd.dealer_id).await?,
            "Dealer",
            cmd.dealer_id,
        )?;

        let new = NewBatch {
            dealer_id: cmd.dealer_id,
            name,
            batch_number,
            manufacturer,
            quantity: cmd.quantity,
            mrp: cmd.mrp,
            dealer_price: cmd.dealer_price,
            manufacturing_date,
            expiry_date,
        };
        let batch = self.db().batches().insert(&new, self.now()).await?;
        info!(
            batch_id = batch.id,
            dealer_id = batch.dealer_id,
            batch_number = %batch.batch_number,
            "Batch created"
        );
        Ok(batch)
    }

    pub async fn get_batch(&self, id: i64) -> EngineResult<ProductBatch> {
        validate_id("id", id)?;
        found(self.db().batches().get(id).await?, "ProductBatch", id)
    }

    /// Applies a partial update. The date rule is checked against the
    /// values the batch will have after the update.
    pub async fn update_batch(&self, cmd: UpdateBatch) -> EngineResult<ProductBatch> {
        let mut batch = self.get_batch(cmd.id).await?;

        if let Some(name) = &cmd.name {
            batch.name = validate_required("name", name)?;
        }
        if let Some(number) = &cmd.batch_number {
            batch.batch_number = validate_required("batchNumber", number)?;
        }
        if let Some(manufacturer) = &cmd.manufacturer {
            batch.manufacturer = validate_required("manufacturer", manufacturer)?;
        }
        if let Some(quantity) = cmd.quantity {
            validate_stock_quantity(quantity)?;
            batch.quantity = quantity;
        }
        if let Some(mrp) = cmd.mrp {
            validate_price("mrp", mrp)?;
            batch.mrp = mrp;
        }
        if let Some(price) = cmd.dealer_price {
            validate_price("dealerPrice", price)?;
            batch.dealer_price = price;
        }
        if let Some(date) = parse_optional_date("manufacturingDate", cmd.manufacturing_date.as_deref())? {
            batch.manufacturing_date = date;
        }
        if let Some(date) = parse_optional_date("expiryDate", cmd.expiry_date.as_deref())? {
            batch.expiry_date = date;
        }
        validate_date_range(batch.manufacturing_date, batch.expiry_date)?;
        batch.updated_at = self.now();

        Ok(self.db().batches().update(&batch).await?)
    }

    /// FIFO listing with each batch's freshness class as of today.
    pub async fn list_batches(&self, cmd: ListBatches) -> EngineResult<Vec<ClassifiedBatch>> {
        let today = self.today();

        let expiry_window = match cmd.near_expiry {
            Some(days) => {
                validate_window_days("nearExpiry", days)?;
                Some((today, window_end(today, days)))
            }
            None => None,
        };

        let filter = BatchFilter {
            dealer_id: cmd.dealer_id,
            batch_number: cmd
                .batch_number
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            expiring_before: parse_optional_date("expiringBefore", cmd.expiring_before.as_deref())?,
            expiring_after: parse_optional_date("expiringAfter", cmd.expiring_after.as_deref())?,
            expiry_window,
            search: validate_search_query(cmd.search.as_deref())?,
            page: Some(self.page(cmd.limit, cmd.offset)),
        };

        let batches = self.db().batches().list(&filter).await?;
        Ok(classify_all(batches, today))
    }

    /// Adds `delta` to a batch's stock.
    ///
    /// The non-negative guard is part of the UPDATE, so concurrent
    /// adjustments cannot overdraw a batch.
    pub async fn adjust_stock(&self, cmd: AdjustStock) -> EngineResult<ProductBatch> {
        validate_id("id", cmd.id)?;

        if let Some(batch) = self
            .db()
            .batches()
            .adjust_stock(cmd.id, cmd.delta, self.now())
            .await?
        {
            info!(batch_id = batch.id, delta = cmd.delta, quantity = batch.quantity, "Stock adjusted");
            return Ok(batch);
        }

        // Either the batch is gone or the guard refused the change.
        let batch = self.get_batch(cmd.id).await?;
        debug!(batch_id = batch.id, on_hand = batch.quantity, delta = cmd.delta, "Stock adjustment refused");
        let message = if cmd.delta < 0 {
            format!(
                "removing {} units would leave negative stock ({} on hand)",
                cmd.delta.unsigned_abs(),
                batch.quantity
            )
        } else {
            format!(
                "adding {} units would exceed the largest representable stock ({} on hand)",
                cmd.delta, batch.quantity
            )
        };
        Err(ValidationError::invalid("delta", message).into())
    }

    /// Totals for all stock, or one dealer's stock.
    pub async fn inventory_summary(&self, dealer_id: Option<i64>) -> EngineResult<InventorySummary> {
        if let Some(id) = dealer_id {
            self.get_dealer(id).await?;
        }

        let batches = self
            .db()
            .batches()
            .list(&BatchFilter {
                dealer_id,
                ..Default::default()
            })
            .await?;
        Ok(inventory_summary(&batches, self.today()))
    }

    /// Batches expiring within the window, soonest first.
    pub async fn near_expiry_alerts(&self, query: NearExpiryQuery) -> EngineResult<Vec<ClassifiedBatch>> {
        let days = query
            .days
            .unwrap_or(self.config().inventory.near_expiry_days);
        validate_window_days("days", days)?;

        let today = self.today();
        let batches = self
            .db()
            .batches()
            .list(&BatchFilter {
                dealer_id: query.dealer_id,
                expiry_window: Some((today, window_end(today, days))),
                ..Default::default()
            })
            .await?;

        let alerts = near_expiry_alerts(batches, today, days);
        debug!(days, count = alerts.len(), "Near-expiry alerts computed");
        Ok(alerts)
    }

    /// Deletes a batch. Requests over it go with it.
    pub async fn delete_batch(&self, id: i64) -> EngineResult<()> {
        validate_id("id", id)?;
        self.db().batches().delete(id).await?;
        info!(batch_id = id, "Batch deleted");
        Ok(())
    }
}
