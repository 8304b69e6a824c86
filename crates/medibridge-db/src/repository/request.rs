//! # Request Repository
//!
//! Database operations for transfer requests.
//!
//! ## Compare-and-Set Status Writes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  caller A                          caller B                            │
//! │  read #7 (PENDING)                 read #7 (PENDING)                   │
//! │  validate → CONFIRMED              validate → REJECTED                 │
//! │  UPDATE … WHERE id=7               UPDATE … WHERE id=7                 │
//! │         AND status='PENDING'              AND status='PENDING'         │
//! │  → 1 row, Some(request)            → 0 rows, None                      │
//! │                                    re-read #7 (CONFIRMED) and          │
//! │                                    re-validate against the new state   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::{push_page, push_search};
use medibridge_core::{Page, RequestStatus, StatusCounts, TransferRequest};

/// A validated new request.
#[derive(Debug, Clone)]
pub struct NewRequest {
    pub requesting_dealer_id: i64,
    pub responding_dealer_id: i64,
    pub product_id: i64,
    pub quantity: i64,
}

/// Request list filter.
#[derive(Debug, Clone, Default)]
pub struct RequestFilter {
    pub requesting_dealer_id: Option<i64>,
    pub responding_dealer_id: Option<i64>,
    /// Matches either side of the request.
    pub dealer_id: Option<i64>,
    pub product_id: Option<i64>,
    pub status: Option<RequestStatus>,
    /// Matched against the status token.
    pub search: Option<String>,
    pub page: Option<Page>,
}

/// Repository for transfer request database operations.
#[derive(Debug, Clone)]
pub struct RequestRepository {
    pool: SqlitePool,
}

impl RequestRepository {
    /// Creates a new RequestRepository.
    pub fn new(pool: SqlitePool) -> Self {
        RequestRepository { pool }
    }

    /// Inserts a PENDING request stamped at `now`.
    pub async fn insert(&self, new: &NewRequest, now: DateTime<Utc>) -> DbResult<TransferRequest> {
        debug!(
            requesting = new.requesting_dealer_id,
            responding = new.responding_dealer_id,
            product_id = new.product_id,
            "Inserting transfer request"
        );

        let request = sqlx::query_as::<_, TransferRequest>(
            r#"
            INSERT INTO transfer_requests (
                requesting_dealer_id, responding_dealer_id, product_id, quantity,
                status, request_date, response_date, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, NULL, ?6, ?6)
            RETURNING *
            "#,
        )
        .bind(new.requesting_dealer_id)
        .bind(new.responding_dealer_id)
        .bind(new.product_id)
        .bind(new.quantity)
        .bind(RequestStatus::Pending)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(request)
    }

    /// Gets a request by ID.
    pub async fn get(&self, id: i64) -> DbResult<Option<TransferRequest>> {
        let request =
            sqlx::query_as::<_, TransferRequest>("SELECT * FROM transfer_requests WHERE id = ?1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(request)
    }

    /// Lists requests, newest first.
    pub async fn list(&self, filter: &RequestFilter) -> DbResult<Vec<TransferRequest>> {
        debug!(?filter, "Listing transfer requests");

        let mut qb = QueryBuilder::<Sqlite>::new("SELECT * FROM transfer_requests WHERE 1 = 1");
        if let Some(id) = filter.requesting_dealer_id {
            qb.push(" AND requesting_dealer_id = ").push_bind(id);
        }
        if let Some(id) = filter.responding_dealer_id {
            qb.push(" AND responding_dealer_id = ").push_bind(id);
        }
        if let Some(id) = filter.dealer_id {
            qb.push(" AND (requesting_dealer_id = ")
                .push_bind(id)
                .push(" OR responding_dealer_id = ")
                .push_bind(id)
                .push(")");
        }
        if let Some(id) = filter.product_id {
            qb.push(" AND product_id = ").push_bind(id);
        }
        if let Some(status) = filter.status {
            qb.push(" AND status = ").push_bind(status);
        }
        if let Some(term) = &filter.search {
            push_search(&mut qb, &["status"], term);
        }
        qb.push(" ORDER BY request_date DESC, id DESC");
        push_page(&mut qb, filter.page);

        let requests = qb
            .build_query_as::<TransferRequest>()
            .fetch_all(&self.pool)
            .await?;
        debug!(count = requests.len(), "Request list returned");
        Ok(requests)
    }

    /// Persists a status change only if the row is still in `expected`.
    ///
    /// Returns `None` when the row moved (or vanished) since it was read.
    pub async fn update_status(
        &self,
        request: &TransferRequest,
        expected: RequestStatus,
    ) -> DbResult<Option<TransferRequest>> {
        debug!(
            id = request.id,
            from = %expected,
            to = %request.status,
            "Updating request status"
        );

        let updated = sqlx::query_as::<_, TransferRequest>(
            r#"
            UPDATE transfer_requests
            SET status = ?1, response_date = ?2, updated_at = ?3
            WHERE id = ?4 AND status = ?5
            RETURNING *
            "#,
        )
        .bind(request.status)
        .bind(request.response_date)
        .bind(request.updated_at)
        .bind(request.id)
        .bind(expected)
        .fetch_optional(&self.pool)
        .await?;
        Ok(updated)
    }

    /// Persists a quantity change only if the row is still in `expected`.
    pub async fn update_quantity(
        &self,
        request: &TransferRequest,
        expected: RequestStatus,
    ) -> DbResult<Option<TransferRequest>> {
        debug!(id = request.id, quantity = request.quantity, "Updating request quantity");

        let updated = sqlx::query_as::<_, TransferRequest>(
            r#"
            UPDATE transfer_requests
            SET quantity = ?1, updated_at = ?2
            WHERE id = ?3 AND status = ?4
            RETURNING *
            "#,
        )
        .bind(request.quantity)
        .bind(request.updated_at)
        .bind(request.id)
        .bind(expected)
        .fetch_optional(&self.pool)
        .await?;
        Ok(updated)
    }

    /// Deletes a request. Its invoice and payments cascade.
    pub async fn delete(&self, id: i64) -> DbResult<()> {
        debug!(id, "Deleting transfer request");

        let result = sqlx::query("DELETE FROM transfer_requests WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("TransferRequest", id));
        }
        Ok(())
    }

    /// Requests per status, optionally for one dealer (either side).
    pub async fn status_counts(&self, dealer_id: Option<i64>) -> DbResult<StatusCounts> {
        let rows: Vec<(RequestStatus, i64)> = sqlx::query_as(
            r#"
            SELECT status, COUNT(*)
            FROM transfer_requests
            WHERE ?1 IS NULL OR requesting_dealer_id = ?1 OR responding_dealer_id = ?1
            GROUP BY status
            "#,
        )
        .bind(dealer_id)
        .fetch_all(&self.pool)
        .await?;

        let mut counts = StatusCounts::default();
        for (status, n) in rows {
            counts.add(status, n);
        }
        Ok(counts)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
