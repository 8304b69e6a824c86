//! # Domain Types
//!
//! Core domain types used throughout MediBridge.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │     Dealer      │   │  ProductBatch   │   │ TransferRequest │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id             │◄──│  dealer_id (FK) │◄──│  product_id     │       │
//! │  │  gst_number  ★  │   │  batch_number   │   │  requesting  ──►│ Dealer│
//! │  │  license_no  ★  │   │  expiry_date    │   │  responding  ──►│ Dealer│
//! │  └─────────────────┘   └─────────────────┘   │  status         │       │
//! │                                              └────────┬────────┘       │
//! │                                                       │ 0..1           │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌────────▼────────┐       │
//! │  │    Payment      │──►│     Invoice     │   │  RequestStatus  │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  invoice_id     │   │  request_id  ★  │   │  PENDING        │       │
//! │  │  transaction ★  │   │  invoice_no  ★  │   │  CONFIRMED      │       │
//! │  │  status         │   │  subtotal/gst   │   │  COMPLETED      │       │
//! │  └─────────────────┘   └─────────────────┘   │  REJECTED       │       │
//! │                                              └─────────────────┘       │
//! │  ★ = UNIQUE at the storage boundary                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## External Representation
//! All entities serialize with camelCase field names. Money is a two-decimal
//! string (see [`Money`]), calendar dates are `YYYY-MM-DD`, timestamps are
//! RFC 3339 and status values are uppercase tokens.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;
use crate::money::Money;
use crate::{DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000
/// 1800 bps = 18% (GST slab applied to every dealer invoice)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxRate(u32);

impl TaxRate {
    /// The fixed GST rate applied to invoice subtotals.
    pub const GST: TaxRate = TaxRate(crate::GST_RATE_BPS);

    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }
}

// =============================================================================
// Dealer
// =============================================================================

/// A registered wholesale trading entity.
///
/// `user_id`, `gst_number` and `license_number` are fixed at registration.
/// Only the contact fields (`business_name`, `address`, `phone`) change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct Dealer {
    pub id: i64,
    /// Identity of the owning user account.
    pub user_id: String,
    pub business_name: String,
    /// GST registration number (globally unique).
    pub gst_number: String,
    pub address: String,
    pub phone: String,
    /// Drug trade license number (globally unique).
    pub license_number: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Product Batch
// =============================================================================

/// A quantity of one manufactured lot, owned by exactly one dealer.
///
/// Freshness is never stored; see [`crate::expiry::classify_expiry`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct ProductBatch {
    pub id: i64,
    pub dealer_id: i64,
    pub name: String,
    pub batch_number: String,
    pub manufacturer: String,
    /// Units on hand (never negative).
    pub quantity: i64,
    /// Maximum retail price per unit.
    pub mrp: Money,
    /// Price per unit between dealers.
    pub dealer_price: Money,
    pub manufacturing_date: NaiveDate,
    pub expiry_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProductBatch {
    /// Stock value at dealer price, saturating at the largest amount.
    #[inline]
    pub fn stock_value(&self) -> Money {
        self.dealer_price.saturating_mul_quantity(self.quantity)
    }
}

// =============================================================================
// Request Status
// =============================================================================

/// Lifecycle state of a transfer request.
///
/// ```text
///   PENDING ──► CONFIRMED ──► COMPLETED
///      │
///      └──────► REJECTED
/// ```
///
/// The allowed moves live in [`crate::lifecycle::allowed_transitions`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[serde(rename_all = "UPPERCASE")]
pub enum RequestStatus {
    /// Awaiting a response from the responding dealer.
    Pending,
    /// Accepted by the responding dealer.
    Confirmed,
    /// Goods delivered (terminal).
    Completed,
    /// Declined by the responding dealer (terminal).
    Rejected,
}

impl RequestStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [RequestStatus; 4] = [
        RequestStatus::Pending,
        RequestStatus::Confirmed,
        RequestStatus::Completed,
        RequestStatus::Rejected,
    ];

    /// The uppercase wire token.
    pub const fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "PENDING",
            RequestStatus::Confirmed => "CONFIRMED",
            RequestStatus::Completed => "COMPLETED",
            RequestStatus::Rejected => "REJECTED",
        }
    }
}

impl Default for RequestStatus {
    fn default() -> Self {
        RequestStatus::Pending
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses a status token case-insensitively (`"confirmed"`, `" Rejected "`).
impl FromStr for RequestStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim();
        RequestStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(token))
            .ok_or_else(|| ValidationError::NotAllowed {
                field: "status".to_string(),
                allowed: RequestStatus::ALL
                    .iter()
                    .map(|s| s.as_str().to_string())
                    .collect(),
            })
    }
}

// =============================================================================
// Transfer Request
// =============================================================================

/// An offer by the requesting dealer to acquire `quantity` units of a batch
/// held by the responding dealer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    pub id: i64,
    pub requesting_dealer_id: i64,
    pub responding_dealer_id: i64,
    pub product_id: i64,
    pub quantity: i64,
    pub status: RequestStatus,
    pub request_date: DateTime<Utc>,
    /// Set on the first move out of PENDING, never changed afterwards.
    pub response_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Invoice
// =============================================================================

/// Tax invoice issued for a confirmed or completed request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub id: i64,
    pub request_id: i64,
    pub invoice_number: String,
    /// Seller (the request's responding dealer).
    pub dealer_id: i64,
    /// Buyer (the request's requesting dealer).
    pub buyer_dealer_id: i64,
    pub subtotal: Money,
    pub gst_amount: Money,
    pub total: Money,
    pub invoice_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Payment
// =============================================================================

/// Settlement state of a payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentStatus {
    Pending,
    Completed,
}

impl PaymentStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Completed => "COMPLETED",
        }
    }
}

impl Default for PaymentStatus {
    fn default() -> Self {
        PaymentStatus::Pending
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(PaymentStatus::Pending),
            "COMPLETED" => Ok(PaymentStatus::Completed),
            _ => Err(ValidationError::NotAllowed {
                field: "status".to_string(),
                allowed: vec!["PENDING".to_string(), "COMPLETED".to_string()],
            }),
        }
    }
}

/// A settlement event recorded against an invoice.
///
/// An invoice may carry any number of payments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: i64,
    pub invoice_id: i64,
    pub amount: Money,
    pub payment_method: String,
    pub transaction_id: String,
    pub status: PaymentStatus,
    pub payment_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Pagination
// =============================================================================

/// Resolved `limit`/`offset` pair for list queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Page {
    /// Resolves caller-supplied paging against `default_limit`.
    ///
    /// A missing or non-positive limit falls back to the default, any limit
    /// is capped at [`MAX_PAGE_LIMIT`], and a negative offset becomes 0.
    pub fn resolve(limit: Option<i64>, offset: Option<i64>, default_limit: i64) -> Self {
        let limit = match limit {
            Some(l) if l > 0 => l,
            _ => default_limit,
        };
        Page {
            limit: limit.clamp(1, MAX_PAGE_LIMIT),
            offset: offset.unwrap_or(0).max(0),
        }
    }
}

impl Default for Page {
    fn default() -> Self {
        Page {
            limit: DEFAULT_PAGE_LIMIT,
            offset: 0,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
