//! # Dealer Repository
//!
//! Database operations for the dealer registry.
//!
//! GST and license numbers are UNIQUE columns, so two concurrent
//! registrations with the same number cannot both commit: the loser gets
//! [`DbError::UniqueViolation`] with the column and value filled in.

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::{push_page, push_search, unique_error};
use medibridge_core::{Dealer, Page};

/// Columns matched by free-text dealer search.
const SEARCH_COLUMNS: &[&str] = &["business_name", "gst_number", "phone"];

/// A validated dealer registration.
#[derive(Debug, Clone)]
pub struct NewDealer {
    pub user_id: String,
    pub business_name: String,
    pub gst_number: String,
    pub address: String,
    pub phone: String,
    pub license_number: String,
}

/// Dealer list filter.
#[derive(Debug, Clone, Default)]
pub struct DealerFilter {
    pub search: Option<String>,
    pub page: Option<Page>,
}

/// Repository for dealer database operations.
#[derive(Debug, Clone)]
pub struct DealerRepository {
    pool: SqlitePool,
}

impl DealerRepository {
    /// Creates a new DealerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        DealerRepository { pool }
    }

    /// Inserts a dealer and returns the stored row.
    pub async fn insert(&self, new: &NewDealer, now: DateTime<Utc>) -> DbResult<Dealer> {
        debug!(gst_number = %new.gst_number, "Inserting dealer");

        sqlx::query_as::<_, Dealer>(
            r#"
            INSERT INTO dealers (
                user_id, business_name, gst_number, address, phone,
                license_number, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
            RETURNING *
            "#,
        )
        .bind(&new.user_id)
        .bind(&new.business_name)
        .bind(&new.gst_number)
        .bind(&new.address)
        .bind(&new.phone)
        .bind(&new.license_number)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            unique_error(
                e,
                &[
                    ("gst_number", new.gst_number.as_str()),
                    ("license_number", new.license_number.as_str()),
                ],
            )
        })
    }

    /// Gets a dealer by ID.
    pub async fn get(&self, id: i64) -> DbResult<Option<Dealer>> {
        let dealer = sqlx::query_as::<_, Dealer>("SELECT * FROM dealers WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(dealer)
    }

    /// Gets the dealer owned by a user account.
    pub async fn get_by_user(&self, user_id: &str) -> DbResult<Option<Dealer>> {
        let dealer = sqlx::query_as::<_, Dealer>(
            "SELECT * FROM dealers WHERE user_id = ?1 ORDER BY id LIMIT 1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(dealer)
    }

    /// Gets a dealer by GST number.
    pub async fn get_by_gst(&self, gst_number: &str) -> DbResult<Option<Dealer>> {
        let dealer = sqlx::query_as::<_, Dealer>("SELECT * FROM dealers WHERE gst_number = ?1")
            .bind(gst_number)
            .fetch_optional(&self.pool)
            .await?;
        Ok(dealer)
    }

    /// Gets a dealer by license number.
    pub async fn get_by_license(&self, license_number: &str) -> DbResult<Option<Dealer>> {
        let dealer =
            sqlx::query_as::<_, Dealer>("SELECT * FROM dealers WHERE license_number = ?1")
                .bind(license_number)
                .fetch_optional(&self.pool)
                .await?;
        Ok(dealer)
    }

    /// Whether a dealer with this id exists.
    pub async fn exists(&self, id: i64) -> DbResult<bool> {
        let found: Option<i64> = sqlx::query_scalar("SELECT id FROM dealers WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(found.is_some())
    }

    /// Lists dealers, newest first.
    pub async fn list(&self, filter: &DealerFilter) -> DbResult<Vec<Dealer>> {
        debug!(search = ?filter.search, "Listing dealers");

        let mut qb = QueryBuilder::<Sqlite>::new("SELECT * FROM dealers WHERE 1 = 1");
        if let Some(term) = &filter.search {
            push_search(&mut qb, SEARCH_COLUMNS, term);
        }
        qb.push(" ORDER BY created_at DESC, id DESC");
        push_page(&mut qb, filter.page);

        let dealers = qb.build_query_as::<Dealer>().fetch_all(&self.pool).await?;
        debug!(count = dealers.len(), "Dealer list returned");
        Ok(dealers)
    }

    /// Writes the contact fields of `dealer`. Identity columns are never
    /// touched.
    pub async fn update_contact(&self, dealer: &Dealer) -> DbResult<Dealer> {
        debug!(id = dealer.id, "Updating dealer contact fields");

        sqlx::query_as::<_, Dealer>(
            r#"
            UPDATE dealers
            SET business_name = ?1, address = ?2, phone = ?3, updated_at = ?4
            WHERE id = ?5
            RETURNING *
            "#,
        )
        .bind(&dealer.business_name)
        .bind(&dealer.address)
        .bind(&dealer.phone)
        .bind(dealer.updated_at)
        .bind(dealer.id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("Dealer", dealer.id))
    }

    /// Counts the transfer requests and invoices that reference a dealer
    /// on either side.
    pub async fn reference_counts(&self, id: i64) -> DbResult<(i64, i64)> {
        let (requests, invoices): (i64, i64) = sqlx::query_as(
            r#"
            SELECT
                (SELECT COUNT(*) FROM transfer_requests
                  WHERE requesting_dealer_id = ?1 OR responding_dealer_id = ?1),
                (SELECT COUNT(*) FROM invoices
                  WHERE dealer_id = ?1 OR buyer_dealer_id = ?1)
            "#,
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok((requests, invoices))
    }

    /// Deletes a dealer unless a transfer request or invoice names it.
    ///
    /// The reference check and the delete are one statement, so a request
    /// inserted concurrently either lands first and blocks the delete, or
    /// fails its foreign key. Returns `false` when nothing was deleted,
    /// either because the dealer is referenced or because it does not exist.
    /// Storage cascades to the batches it owns.
    pub async fn delete_unreferenced(&self, id: i64) -> DbResult<bool> {
        debug!(id, "Deleting dealer");

        let result = sqlx::query(
            r#"
            DELETE FROM dealers
            WHERE id = ?1
              AND NOT EXISTS (SELECT 1 FROM transfer_requests
                               WHERE requesting_dealer_id = ?1 OR responding_dealer_id = ?1)
              AND NOT EXISTS (SELECT 1 FROM invoices
                               WHERE dealer_id = ?1 OR buyer_dealer_id = ?1)
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Total number of dealers.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM dealers")
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
    use crate::repository::test_support::{dealer, db, now};

    fn registration(gst: &str, license: &str) -> NewDealer {
        NewDealer {
            user_id: "user-x".to_string(),
            business_name: "Shree Medicos".to_string(),
            gst_number: gst.to_string(),
            address: "Pune".to_string(),
            phone: "9000000000".to_string(),
            license_number: license.to_string(),
        }
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let db = db().await;
        let created = dealer(&db, "A").await;

        let fetched = db.dealers().get(created.id).await.unwrap().unwrap();
        assert_eq!(fetched, created);
        assert_eq!(fetched.created_at, now());

        let by_user = db.dealers().get_by_user("user-A").await.unwrap().unwrap();
        assert_eq!(by_user.id, created.id);
        assert!(db.dealers().get(999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_gst_reports_column_and_value() {
        let db = db().await;
        let repo = db.dealers();
        repo.insert(&registration("GST-1", "LIC-1"), now()).await.unwrap();

        let err = repo
            .insert(&registration("GST-1", "LIC-2"), now())
            .await
            .unwrap_err();
        match err {
            DbError::UniqueViolation { field, value } => {
                assert_eq!(field, "gst_number");
                assert_eq!(value, "GST-1");
            }
            other => panic!("unexpected: {other:?}"),
        }

        let err = repo
            .insert(&registration("GST-2", "LIC-1"), now())
            .await
            .unwrap_err();
        assert_eq!(err.unique_field(), Some("license_number"));
    }

    #[tokio::test]
    async fn test_list_search_and_paging() {
        let db = db().await;
        dealer(&db, "Alpha").await;
        dealer(&db, "Beta").await;
        dealer(&db, "Gamma").await;

        let found = db
            .dealers()
            .list(&DealerFilter {
                search: Some("beta".to_string()),
                page: None,
            })
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].gst_number, "27GSTBeta");

        let page = db
            .dealers()
            .list(&DealerFilter {
                search: None,
                page: Some(Page { limit: 2, offset: 2 }),
            })
            .await
            .unwrap();
        assert_eq!(page.len(), 1);
    }

    #[tokio::test]
    async fn test_update_contact_and_delete() {
        let db = db().await;
        let mut d = dealer(&db, "A").await;
        d.phone = "9111111111".to_string();
        d.gst_number = "IGNORED".to_string();

        let updated = db.dealers().update_contact(&d).await.unwrap();
        assert_eq!(updated.phone, "9111111111");
        assert_eq!(updated.gst_number, "27GSTA");

        assert_eq!(db.dealers().reference_counts(d.id).await.unwrap(), (0, 0));
        assert!(db.dealers().delete_unreferenced(d.id).await.unwrap());
        assert!(!db.dealers().delete_unreferenced(d.id).await.unwrap());
        assert_eq!(db.dealers().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_skips_referenced_dealers() {
        use crate::repository::request::NewRequest;
        use crate::repository::test_support::{batch, date};

        let db = db().await;
        let buyer = dealer(&db, "A").await;
        let seller = dealer(&db, "B").await;
        let stock = batch(&db, seller.id, "PCM-1", date(2026, 1, 31)).await;
        db.requests()
            .insert(
                &NewRequest {
                    requesting_dealer_id: buyer.id,
                    responding_dealer_id: seller.id,
                    product_id: stock.id,
                    quantity: 5,
                },
                now(),
            )
            .await
            .unwrap();

        assert!(!db.dealers().delete_unreferenced(buyer.id).await.unwrap());
        assert!(!db.dealers().delete_unreferenced(seller.id).await.unwrap());
        assert_eq!(db.dealers().reference_counts(seller.id).await.unwrap(), (1, 0));
        assert_eq!(db.dealers().count().await.unwrap(), 2);
    }
}
