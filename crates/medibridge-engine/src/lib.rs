//! # medibridge-engine: Command Layer for MediBridge
//!
//! Typed commands for the dealer-to-dealer trading engine: dealers register,
//! list product batches, request stock from each other, invoice confirmed
//! requests and record payments against those invoices.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         MediBridge Layers                               │
//! │                                                                         │
//! │  Caller (HTTP handler, CLI, test)                                       │
//! │       │  CreateRequest { requestingDealerId, respondingDealerId, .. }   │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 medibridge-engine (THIS CRATE)                  │   │
//! │  │                                                                 │   │
//! │  │   Engine { db, clock, config }                                  │   │
//! │  │     commands::dealer     commands::inventory                    │   │
//! │  │     commands::request    commands::invoice   commands::payment  │   │
//! │  │                                                                 │   │
//! │  │   EngineError ──► ErrorResponse { code, message, field }        │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                   │                             │
//! │       ▼                                   ▼                             │
//! │  medibridge-core                     medibridge-db                      │
//! │  lifecycle, GST, expiry,             SQLite repositories,               │
//! │  validation, clock                   UNIQUE + compare-and-set           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`engine`] - The `Engine` handle
//! - [`commands`] - Command structs and their handlers
//! - [`error`] - Error kinds and wire codes
//! - [`config`] - TOML + environment configuration
//! - [`telemetry`] - Tracing subscriber setup

// =============================================================================
// Module Declarations
// =============================================================================

pub mod commands;
pub mod config;
pub mod engine;
pub mod error;
pub mod telemetry;

// =============================================================================
// Re-exports
// =============================================================================

pub use commands::dealer::{CreateDealer, ListDealers, UpdateDealer};
pub use commands::inventory::{AdjustStock, CreateBatch, ListBatches, NearExpiryQuery, UpdateBatch};
pub use commands::invoice::{CreateInvoice, ListInvoices, UpdateInvoice};
pub use commands::payment::{ListPayments, RecordPayment, UpdatePayment};
pub use commands::request::{
    CreateRequest, ListRequests, TransitionOutcome, TransitionRequest, UpdateRequestQuantity,
};
pub use config::{ConfigError, EngineConfig};
pub use engine::Engine;
pub use error::{EngineError, EngineResult, ErrorCode, ErrorResponse};
pub use telemetry::init_tracing;

// Domain types callers need alongside the commands.
pub use medibridge_core::{
    Clock, ClassifiedBatch, Dealer, ExpiryClass, FixedClock, InventorySummary, Invoice,
    InvoiceTotals, LifecycleEvent, Money, Payment, PaymentStatus, ProductBatch, RequestStatus,
    StatusCounts, SystemClock, TransferRequest,
};
