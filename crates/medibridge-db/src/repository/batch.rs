//! # Batch Repository
//!
//! Database operations for product batches.
//!
//! ## FIFO Listing
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  list(filter)                                                          │
//! │                                                                         │
//! │  WHERE dealer_id = ?              (optional)                           │
//! │    AND batch_number = ?           (optional)                           │
//! │    AND expiry_date <= ?           expiringBefore                       │
//! │    AND expiry_date >= ?           expiringAfter                        │
//! │    AND expiry_date BETWEEN ? AND ? nearExpiry window                   │
//! │    AND (name|batch_number|manufacturer LIKE ?)                         │
//! │  ORDER BY expiry_date ASC, id ASC ← first-expiry-first-out             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Dates are stored as `YYYY-MM-DD` text, so string comparison is date
//! comparison.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::{push_page, push_search};
use medibridge_core::{Money, Page, ProductBatch};

const SEARCH_COLUMNS: &[&str] = &["name", "batch_number", "manufacturer"];

/// A validated product batch.
#[derive(Debug, Clone)]
pub struct NewBatch {
    pub dealer_id: i64,
    pub name: String,
    pub batch_number: String,
    pub manufacturer: String,
    pub quantity: i64,
    pub mrp: Money,
    pub dealer_price: Money,
    pub manufacturing_date: NaiveDate,
    pub expiry_date: NaiveDate,
}

/// Batch list filter. Every set field narrows the result.
#[derive(Debug, Clone, Default)]
pub struct BatchFilter {
    pub dealer_id: Option<i64>,
    pub batch_number: Option<String>,
    /// Expiry on or before this date.
    pub expiring_before: Option<NaiveDate>,
    /// Expiry on or after this date.
    pub expiring_after: Option<NaiveDate>,
    /// Inclusive `(from, to)` expiry window.
    pub expiry_window: Option<(NaiveDate, NaiveDate)>,
    pub search: Option<String>,
    /// `None` returns every match.
    pub page: Option<Page>,
}

/// Repository for product batch database operations.
#[derive(Debug, Clone)]
pub struct BatchRepository {
    pool: SqlitePool,
}

impl BatchRepository {
    /// Creates a new BatchRepository.
    pub fn new(pool: SqlitePool) -> Self {
        BatchRepository { pool }
    }

    /// Inserts a batch and returns the stored row.
    pub async fn insert(&self, new: &NewBatch, now: DateTime<Utc>) -> DbResult<ProductBatch> {
        debug!(
            dealer_id = new.dealer_id,
            batch_number = %new.batch_number,
            "Inserting product batch"
        );

        let batch = sqlx::query_as::<_, ProductBatch>(
            r#"
            INSERT INTO product_batches (
                dealer_id, name, batch_number, manufacturer, quantity,
                mrp, dealer_price, manufacturing_date, expiry_date,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)
            RETURNING *
            "#,
        )
        .bind(new.dealer_id)
        .bind(&new.name)
        .bind(&new.batch_number)
        .bind(&new.manufacturer)
        .bind(new.quantity)
        .bind(new.mrp)
        .bind(new.dealer_price)
        .bind(new.manufacturing_date)
        .bind(new.expiry_date)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(batch)
    }

    /// Gets a batch by ID.
    pub async fn get(&self, id: i64) -> DbResult<Option<ProductBatch>> {
        let batch =
            sqlx::query_as::<_, ProductBatch>("SELECT * FROM product_batches WHERE id = ?1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(batch)
    }

    /// Lists batches first-expiry-first-out.
    pub async fn list(&self, filter: &BatchFilter) -> DbResult<Vec<ProductBatch>> {
        debug!(?filter, "Listing product batches");

        let mut qb = QueryBuilder::<Sqlite>::new("SELECT * FROM product_batches WHERE 1 = 1");
        if let Some(dealer_id) = filter.dealer_id {
            qb.push(" AND dealer_id = ").push_bind(dealer_id);
        }
        if let Some(batch_number) = &filter.batch_number {
            qb.push(" AND batch_number = ").push_bind(batch_number.clone());
        }
        if let Some(before) = filter.expiring_before {
            qb.push(" AND expiry_date <= ").push_bind(before);
        }
        if let Some(after) = filter.expiring_after {
            qb.push(" AND expiry_date >= ").push_bind(after);
        }
        if let Some((from, to)) = filter.expiry_window {
            qb.push(" AND expiry_date BETWEEN ")
                .push_bind(from)
                .push(" AND ")
                .push_bind(to);
        }
        if let Some(term) = &filter.search {
            push_search(&mut qb, SEARCH_COLUMNS, term);
        }
        qb.push(" ORDER BY expiry_date ASC, id ASC");
        push_page(&mut qb, filter.page);

        let batches = qb
            .build_query_as::<ProductBatch>()
            .fetch_all(&self.pool)
            .await?;
        debug!(count = batches.len(), "Batch list returned");
        Ok(batches)
    }

    /// Writes every mutable column of `batch`.
    pub async fn update(&self, batch: &ProductBatch) -> DbResult<ProductBatch> {
        debug!(id = batch.id, "Updating product batch");

        sqlx::query_as::<_, ProductBatch>(
            r#"
            UPDATE product_batches
            SET name = ?1, batch_number = ?2, manufacturer = ?3, quantity = ?4,
                mrp = ?5, dealer_price = ?6, manufacturing_date = ?7,
                expiry_date = ?8, updated_at = ?9
            WHERE id = ?10
            RETURNING *
            "#,
        )
        .bind(&batch.name)
        .bind(&batch.batch_number)
        .bind(&batch.manufacturer)
        .bind(batch.quantity)
        .bind(batch.mrp)
        .bind(batch.dealer_price)
        .bind(batch.manufacturing_date)
        .bind(batch.expiry_date)
        .bind(batch.updated_at)
        .bind(batch.id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("ProductBatch", batch.id))
    }

    /// Adds `delta` (possibly negative) to the stock on hand.
    ///
    /// The guard lives in the UPDATE itself, so concurrent adjustments can
    /// never drive stock below zero. Returns `None` when the batch is
    /// missing or the adjustment would go negative.
    pub async fn adjust_stock(
        &self,
        id: i64,
        delta: i64,
        now: DateTime<Utc>,
    ) -> DbResult<Option<ProductBatch>> {
        debug!(id, delta, "Adjusting stock");

        let batch = sqlx::query_as::<_, ProductBatch>(
            r#"
            UPDATE product_batches
            SET quantity = quantity + ?1, updated_at = ?2
            WHERE id = ?3
              AND (?1 <= 0 OR quantity <= 9223372036854775807 - ?1)
              AND quantity + ?1 >= 0
            RETURNING *
            "#,
        )
        .bind(delta)
        .bind(now)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(batch)
    }

    /// Deletes a batch. Requests over it cascade.
    pub async fn delete(&self, id: i64) -> DbResult<()> {
        debug!(id, "Deleting product batch");

        let result = sqlx::query("DELETE FROM product_batches WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("ProductBatch", id));
        }
        Ok(())
    }

    /// Number of batches, optionally for one dealer.
    pub async fn count(&self, dealer_id: Option<i64>) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM product_batches WHERE ?1 IS NULL OR dealer_id = ?1",
        )
        .bind(dealer_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::{batch, date, db, dealer, now};

    #[tokio::test]
    async fn test_insert_round_trips_money_and_dates() {
        let db = db().await;
        let d = dealer(&db, "A").await;
        let b = batch(&db, d.id, "PCM-1", date(2026, 1, 31)).await;

        let fetched = db.batches().get(b.id).await.unwrap().unwrap();
        assert_eq!(fetched.dealer_price, Money::from_paise(4550));
        assert_eq!(fetched.expiry_date, date(2026, 1, 31));
        assert_eq!(fetched, b);
    }

    #[tokio::test]
    async fn test_list_is_fifo_and_filters() {
        let db = db().await;
        let a = dealer(&db, "A").await;
        let b = dealer(&db, "B").await;
        let late = batch(&db, a.id, "LATE", date(2026, 12, 1)).await;
        let early = batch(&db, a.id, "EARLY", date(2025, 7, 1)).await;
        let other = batch(&db, b.id, "OTHER", date(2025, 6, 15)).await;

        let all = db.batches().list(&BatchFilter::default()).await.unwrap();
        let ids: Vec<i64> = all.iter().map(|x| x.id).collect();
        assert_eq!(ids, vec![other.id, early.id, late.id]);

        let mine = db
            .batches()
            .list(&BatchFilter {
                dealer_id: Some(a.id),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(mine.len(), 2);

        let window = db
            .batches()
            .list(&BatchFilter {
                expiry_window: Some((date(2025, 6, 1), date(2025, 7, 1))),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(window.len(), 2);

        let before = db
            .batches()
            .list(&BatchFilter {
                expiring_before: Some(date(2025, 7, 1)),
                expiring_after: Some(date(2025, 6, 20)),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(before.len(), 1);
        assert_eq!(before[0].id, early.id);

        let by_number = db
            .batches()
            .list(&BatchFilter {
                batch_number: Some("LATE".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_number[0].id, late.id);
    }

    #[tokio::test]
    async fn test_adjust_stock_never_negative() {
        let db = db().await;
        let d = dealer(&db, "A").await;
        let b = batch(&db, d.id, "PCM-1", date(2026, 1, 31)).await;

        let after = db.batches().adjust_stock(b.id, -40, now()).await.unwrap().unwrap();
        assert_eq!(after.quantity, 60);

        assert!(db.batches().adjust_stock(b.id, -61, now()).await.unwrap().is_none());
        assert_eq!(db.batches().get(b.id).await.unwrap().unwrap().quantity, 60);

        assert!(db.batches().adjust_stock(999, 1, now()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_adjust_stock_refuses_integer_overflow() {
        let db = db().await;
        let d = dealer(&db, "A").await;
        let b = batch(&db, d.id, "PCM-1", date(2026, 1, 31)).await;

        assert!(db.batches().adjust_stock(b.id, i64::MAX, now()).await.unwrap().is_none());
        assert!(db.batches().adjust_stock(b.id, i64::MIN, now()).await.unwrap().is_none());
        assert_eq!(db.batches().get(b.id).await.unwrap().unwrap().quantity, 100);

        let topped = db
            .batches()
            .adjust_stock(b.id, i64::MAX - 100, now())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(topped.quantity, i64::MAX);
        assert!(db.batches().adjust_stock(b.id, 1, now()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let db = db().await;
        let d = dealer(&db, "A").await;
        let mut b = batch(&db, d.id, "PCM-1", date(2026, 1, 31)).await;
        b.quantity = 5;
        b.manufacturer = "Lupin".to_string();

        let updated = db.batches().update(&b).await.unwrap();
        assert_eq!(updated.quantity, 5);
        assert_eq!(updated.manufacturer, "Lupin");

        assert_eq!(db.batches().count(Some(d.id)).await.unwrap(), 1);
        db.batches().delete(b.id).await.unwrap();
        assert_eq!(db.batches().count(None).await.unwrap(), 0);
    }
}
