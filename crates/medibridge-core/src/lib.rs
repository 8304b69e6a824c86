//! # medibridge-core: Pure Business Logic for MediBridge
//!
//! This crate holds the business rules of dealer-to-dealer trading as pure
//! functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      MediBridge Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 Caller (API / CLI / tests)                      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ typed commands                         │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    medibridge-engine                            │   │
//! │  │    create_request, transition_request, create_invoice, ...     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │            ★ medibridge-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │ lifecycle │  │  invoice  │  │  expiry   │  │ validation│  │   │
//! │  │   │  table +  │  │  GST 18%  │  │  classes  │  │   field   │  │   │
//! │  │   │  events   │  │  totals   │  │   FIFO    │  │   rules   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │          types · money · clock · error                          │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • NO WALL CLOCK             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 medibridge-db (Database Layer)                  │   │
//! │  │              SQLite queries, migrations, repositories           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Dealer, ProductBatch, TransferRequest, ...)
//! - [`money`] - Money type with integer paise arithmetic
//! - [`lifecycle`] - Request state machine
//! - [`invoice`] - GST computation and invoice totals
//! - [`expiry`] - Freshness classes and FIFO ordering
//! - [`validation`] - Field-level input rules
//! - [`clock`] - Injected time source
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use medibridge_core::invoice::compute_tax;
//! use medibridge_core::Money;
//!
//! let breakdown = compute_tax(Money::from_paise(850000)).unwrap();
//! assert_eq!(breakdown.gst_amount.paise(), 153000);
//! assert_eq!(breakdown.total.paise(), 1003000);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod clock;
pub mod error;
pub mod expiry;
pub mod invoice;
pub mod lifecycle;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{CoreError, CoreResult, ValidationError};
pub use expiry::{ClassifiedBatch, ExpiryClass, InventorySummary};
pub use invoice::{InvoiceTotals, TaxBreakdown};
pub use lifecycle::{LifecycleEvent, StatusCounts};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// GST applied to every invoice: 18% in basis points.
pub const GST_RATE_BPS: u32 = 1800;

/// Page size when the caller does not ask for one.
pub const DEFAULT_PAGE_LIMIT: i64 = 10;

/// Largest page a list query will return.
pub const MAX_PAGE_LIMIT: i64 = 100;

/// Upper bound (inclusive, in days) of the EXPIRING_SOON class.
pub const EXPIRING_SOON_DAYS: i64 = 30;

/// Upper bound (inclusive, in days) of the GOOD class.
pub const GOOD_DAYS: i64 = 90;
