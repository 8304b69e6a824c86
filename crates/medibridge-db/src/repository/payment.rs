//! # Payment Repository
//!
//! Database operations for payments.
//!
//! Payments are recorded against an invoice and start PENDING. Nothing here
//! completes a payment or settles an invoice automatically; `amount_paid`
//! is a read-only sum over COMPLETED payments.

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::{push_page, push_search, unique_error};
use medibridge_core::{Money, Page, Payment, PaymentStatus};

const SEARCH_COLUMNS: &[&str] = &["transaction_id", "payment_method"];

/// A validated new payment.
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub invoice_id: i64,
    pub amount: Money,
    pub payment_method: String,
    pub transaction_id: String,
}

/// Payment list filter.
#[derive(Debug, Clone, Default)]
pub struct PaymentFilter {
    pub invoice_id: Option<i64>,
    pub status: Option<PaymentStatus>,
    pub search: Option<String>,
    pub page: Option<Page>,
}

/// Repository for payment database operations.
#[derive(Debug, Clone)]
pub struct PaymentRepository {
    pool: SqlitePool,
}

impl PaymentRepository {
    /// Creates a new PaymentRepository.
    pub fn new(pool: SqlitePool) -> Self {
        PaymentRepository { pool }
    }

    /// Inserts a PENDING payment dated `now`.
    pub async fn insert(&self, new: &NewPayment, now: DateTime<Utc>) -> DbResult<Payment> {
        debug!(
            invoice_id = new.invoice_id,
            transaction_id = %new.transaction_id,
            amount = %new.amount,
            "Inserting payment"
        );

        sqlx::query_as::<_, Payment>(
            r#"
            INSERT INTO payments (
                invoice_id, amount, payment_method, transaction_id, status,
                payment_date, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6, ?6)
            RETURNING *
            "#,
        )
        .bind(new.invoice_id)
        .bind(new.amount)
        .bind(&new.payment_method)
        .bind(&new.transaction_id)
        .bind(PaymentStatus::Pending)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| unique_error(e, &[("transaction_id", new.transaction_id.as_str())]))
    }

    /// Gets a payment by ID.
    pub async fn get(&self, id: i64) -> DbResult<Option<Payment>> {
        let payment = sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(payment)
    }

    /// Gets a payment by its transaction id.
    pub async fn get_by_transaction(&self, transaction_id: &str) -> DbResult<Option<Payment>> {
        let payment =
            sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE transaction_id = ?1")
                .bind(transaction_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(payment)
    }

    /// Lists payments, newest first.
    pub async fn list(&self, filter: &PaymentFilter) -> DbResult<Vec<Payment>> {
        debug!(?filter, "Listing payments");

        let mut qb = QueryBuilder::<Sqlite>::new("SELECT * FROM payments WHERE 1 = 1");
        if let Some(id) = filter.invoice_id {
            qb.push(" AND invoice_id = ").push_bind(id);
        }
        if let Some(status) = filter.status {
            qb.push(" AND status = ").push_bind(status);
        }
        if let Some(term) = &filter.search {
            push_search(&mut qb, SEARCH_COLUMNS, term);
        }
        qb.push(" ORDER BY payment_date DESC, id DESC");
        push_page(&mut qb, filter.page);

        let payments = qb.build_query_as::<Payment>().fetch_all(&self.pool).await?;
        debug!(count = payments.len(), "Payment list returned");
        Ok(payments)
    }

    /// Writes amount, method and status of `payment` if the stored row
    /// still matches `current` on those columns. `None` otherwise.
    pub async fn update(&self, payment: &Payment, current: &Payment) -> DbResult<Option<Payment>> {
        debug!(id = payment.id, status = %payment.status, "Updating payment");

        let updated = sqlx::query_as::<_, Payment>(
            r#"
            UPDATE payments
            SET amount = ?1, payment_method = ?2, status = ?3, updated_at = ?4
            WHERE id = ?5 AND amount = ?6 AND payment_method = ?7 AND status = ?8
            RETURNING *
            "#,
        )
        .bind(payment.amount)
        .bind(&payment.payment_method)
        .bind(payment.status)
        .bind(payment.updated_at)
        .bind(payment.id)
        .bind(current.amount)
        .bind(&current.payment_method)
        .bind(current.status)
        .fetch_optional(&self.pool)
        .await?;
        Ok(updated)
    }

    /// Deletes a payment.
    pub async fn delete(&self, id: i64) -> DbResult<()> {
        debug!(id, "Deleting payment");

        let result = sqlx::query("DELETE FROM payments WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Payment", id));
        }
        Ok(())
    }

    /// Sum of COMPLETED payments against an invoice, saturating at the
    /// largest representable amount.
    pub async fn amount_paid(&self, invoice_id: i64) -> DbResult<Money> {
        let amounts: Vec<Money> = sqlx::query_scalar(
            "SELECT amount FROM payments WHERE invoice_id = ?1 AND status = ?2",
        )
        .bind(invoice_id)
        .bind(PaymentStatus::Completed)
        .fetch_all(&self.pool)
        .await?;

        Ok(amounts.into_iter().fold(Money::zero(), |paid, amount| paid + amount))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
