//! # Repository Module
//!
//! Database repository implementations for MediBridge.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  Engine command                                                        │
//! │       │                                                                 │
//! │       │  db.requests().update_status(&request, expected)               │
//! │       ▼                                                                 │
//! │  RequestRepository                                                     │
//! │  ├── insert(&self, new, now)                                           │
//! │  ├── get(&self, id)                                                    │
//! │  ├── list(&self, filter)                                               │
//! │  └── update_status(&self, request, expected)   ← compare-and-set       │
//! │       │                                                                 │
//! │       │  SQL (runtime-checked, sqlx::query_as / QueryBuilder)          │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  Repositories persist already-validated values. Business rules live   │
//! │  in medibridge-core; orchestration lives in medibridge-engine.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`DealerRepository`](dealer::DealerRepository) - Dealer registry
//! - [`BatchRepository`](batch::BatchRepository) - Product batches, FIFO listing, stock adjustment
//! - [`RequestRepository`](request::RequestRepository) - Transfer requests, status CAS
//! - [`InvoiceRepository`](invoice::InvoiceRepository) - Invoices and totals
//! - [`PaymentRepository`](payment::PaymentRepository) - Payments and amount paid

pub mod batch;
pub mod dealer;
pub mod invoice;
pub mod payment;
pub mod request;

use medibridge_core::Page;
use sqlx::{QueryBuilder, Sqlite};

use crate::error::DbError;

/// Appends `AND (col LIKE %term% OR ...)` over `columns`.
pub(crate) fn push_search(qb: &mut QueryBuilder<'_, Sqlite>, columns: &[&str], term: &str) {
    let pattern = format!("%{}%", escape_like(term));
    qb.push(" AND (");
    for (i, column) in columns.iter().enumerate() {
        if i > 0 {
            qb.push(" OR ");
        }
        qb.push(*column)
            .push(" LIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\'");
    }
    qb.push(")");
}

/// Appends `LIMIT ? OFFSET ?`.
pub(crate) fn push_page(qb: &mut QueryBuilder<'_, Sqlite>, page: Option<Page>) {
    if let Some(page) = page {
        qb.push(" LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset);
    }
}

fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Converts an insert/update error, filling in the offending value of a
/// UNIQUE violation from `values` (`(column, value)` pairs).
pub(crate) fn unique_error(err: sqlx::Error, values: &[(&str, &str)]) -> DbError {
    match DbError::from(err) {
        DbError::UniqueViolation { field, value } => {
            let value = values
                .iter()
                .find(|(column, _)| *column == field)
                .map_or(value, |(_, v)| v.to_string());
            DbError::UniqueViolation { field, value }
        }
        other => other,
    }
}
