//! # Invoice Repository
//!
//! Database operations for invoices.
//!
//! Two UNIQUE columns back the invoice rules: `invoice_number` (globally
//! unique numbers) and `request_id` (one invoice per request).

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::{push_page, push_search, unique_error};
use medibridge_core::invoice::invoice_totals;
use medibridge_core::{Invoice, InvoiceTotals, Page, TaxBreakdown};

/// A validated new invoice.
#[derive(Debug, Clone)]
pub struct NewInvoice {
    pub request_id: i64,
    pub invoice_number: String,
    /// Seller.
    pub dealer_id: i64,
    /// Buyer.
    pub buyer_dealer_id: i64,
    pub amounts: TaxBreakdown,
}

/// Invoice list filter.
#[derive(Debug, Clone, Default)]
pub struct InvoiceFilter {
    /// Seller.
    pub dealer_id: Option<i64>,
    pub buyer_dealer_id: Option<i64>,
    pub request_id: Option<i64>,
    /// Matched against the invoice number.
    pub search: Option<String>,
    pub page: Option<Page>,
}

/// Repository for invoice database operations.
#[derive(Debug, Clone)]
pub struct InvoiceRepository {
    pool: SqlitePool,
}

impl InvoiceRepository {
    /// Creates a new InvoiceRepository.
    pub fn new(pool: SqlitePool) -> Self {
        InvoiceRepository { pool }
    }

    /// Inserts an invoice dated `now`.
    pub async fn insert(&self, new: &NewInvoice, now: DateTime<Utc>) -> DbResult<Invoice> {
        debug!(
            request_id = new.request_id,
            invoice_number = %new.invoice_number,
            total = %new.amounts.total,
            "Inserting invoice"
        );

        let request_id = new.request_id.to_string();
        sqlx::query_as::<_, Invoice>(
            r#"
            INSERT INTO invoices (
                request_id, invoice_number, dealer_id, buyer_dealer_id,
                subtotal, gst_amount, total, invoice_date, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8, ?8)
            RETURNING *
            "#,
        )
        .bind(new.request_id)
        .bind(&new.invoice_number)
        .bind(new.dealer_id)
        .bind(new.buyer_dealer_id)
        .bind(new.amounts.subtotal)
        .bind(new.amounts.gst_amount)
        .bind(new.amounts.total)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            unique_error(
                e,
                &[
                    ("invoice_number", new.invoice_number.as_str()),
                    ("request_id", request_id.as_str()),
                ],
            )
        })
    }

    /// Gets an invoice by ID.
    pub async fn get(&self, id: i64) -> DbResult<Option<Invoice>> {
        let invoice = sqlx::query_as::<_, Invoice>("SELECT * FROM invoices WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(invoice)
    }

    /// Gets an invoice by its number.
    pub async fn get_by_number(&self, invoice_number: &str) -> DbResult<Option<Invoice>> {
        let invoice =
            sqlx::query_as::<_, Invoice>("SELECT * FROM invoices WHERE invoice_number = ?1")
                .bind(invoice_number)
                .fetch_optional(&self.pool)
                .await?;
        Ok(invoice)
    }

    /// Gets the invoice issued for a request.
    pub async fn get_by_request(&self, request_id: i64) -> DbResult<Option<Invoice>> {
        let invoice = sqlx::query_as::<_, Invoice>("SELECT * FROM invoices WHERE request_id = ?1")
            .bind(request_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(invoice)
    }

    /// Lists invoices, newest first.
    pub async fn list(&self, filter: &InvoiceFilter) -> DbResult<Vec<Invoice>> {
        debug!(?filter, "Listing invoices");

        let mut qb = QueryBuilder::<Sqlite>::new("SELECT * FROM invoices WHERE 1 = 1");
        if let Some(id) = filter.dealer_id {
            qb.push(" AND dealer_id = ").push_bind(id);
        }
        if let Some(id) = filter.buyer_dealer_id {
            qb.push(" AND buyer_dealer_id = ").push_bind(id);
        }
        if let Some(id) = filter.request_id {
            qb.push(" AND request_id = ").push_bind(id);
        }
        if let Some(term) = &filter.search {
            push_search(&mut qb, &["invoice_number"], term);
        }
        qb.push(" ORDER BY invoice_date DESC, id DESC");
        push_page(&mut qb, filter.page);

        let invoices = qb.build_query_as::<Invoice>().fetch_all(&self.pool).await?;
        debug!(count = invoices.len(), "Invoice list returned");
        Ok(invoices)
    }

    /// Writes the number and amounts of `invoice`, provided the stored row
    /// still carries the number and amounts of `current`.
    ///
    /// `None` means another writer got there first, or the row is gone.
    pub async fn update(&self, invoice: &Invoice, current: &Invoice) -> DbResult<Option<Invoice>> {
        debug!(id = invoice.id, "Updating invoice");

        let updated = sqlx::query_as::<_, Invoice>(
            r#"
            UPDATE invoices
            SET invoice_number = ?1, subtotal = ?2, gst_amount = ?3, total = ?4,
                updated_at = ?5
            WHERE id = ?6
              AND invoice_number = ?7 AND subtotal = ?8 AND gst_amount = ?9 AND total = ?10
            RETURNING *
            "#,
        )
        .bind(&invoice.invoice_number)
        .bind(invoice.subtotal)
        .bind(invoice.gst_amount)
        .bind(invoice.total)
        .bind(invoice.updated_at)
        .bind(invoice.id)
        .bind(&current.invoice_number)
        .bind(current.subtotal)
        .bind(current.gst_amount)
        .bind(current.total)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| unique_error(e, &[("invoice_number", invoice.invoice_number.as_str())]))?;
        Ok(updated)
    }

    /// Deletes an invoice. Its payments cascade.
    pub async fn delete(&self, id: i64) -> DbResult<()> {
        debug!(id, "Deleting invoice");

        let result = sqlx::query("DELETE FROM invoices WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Invoice", id));
        }
        Ok(())
    }

    /// Revenue and GST, optionally for one seller.
    pub async fn totals(&self, dealer_id: Option<i64>) -> DbResult<InvoiceTotals> {
        // Summed in Rust: SQLite's SUM errors out instead of saturating.
        let invoices = sqlx::query_as::<_, Invoice>(
            "SELECT * FROM invoices WHERE ?1 IS NULL OR dealer_id = ?1",
        )
        .bind(dealer_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(invoice_totals(&invoices))
    }
}

/// Generates an invoice number: `INV-YYYYMMDD-XXXXXXXX`.
///
/// The suffix is the first 8 hex digits of a v4 UUID; the UNIQUE column
/// catches the rare collision.
pub fn generate_invoice_number(now: DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().simple().to_string()[..8].to_uppercase();
    format!("INV-{}-{}", now.format("%Y%m%d"), suffix)
}

// =============================================================================
// Unit Tests
// =============================================================================
