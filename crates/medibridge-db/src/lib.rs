//! # medibridge-db: Database Layer for MediBridge
//!
//! This crate provides SQLite data access for the MediBridge engine via
//! sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        MediBridge Data Flow                             │
//! │                                                                         │
//! │  Engine command (transition_request)                                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  medibridge-db (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ DealerRepo    │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ BatchRepo     │    │ 001_initial_ │  │   │
//! │  │   │ WAL + FKs     │    │ RequestRepo   │    │   schema.sql │  │   │
//! │  │   │               │    │ InvoiceRepo   │    │              │  │   │
//! │  │   │               │    │ PaymentRepo   │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite database file (or :memory: in tests)                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use medibridge_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("medibridge.db")).await?;
//! let soon = db.batches().list(&BatchFilter::default()).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::batch::{BatchFilter, BatchRepository, NewBatch};
pub use repository::dealer::{DealerFilter, DealerRepository, NewDealer};
pub use repository::invoice::{generate_invoice_number, InvoiceFilter, InvoiceRepository, NewInvoice};
pub use repository::payment::{NewPayment, PaymentFilter, PaymentRepository};
pub use repository::request::{NewRequest, RequestFilter, RequestRepository};
