//! # Expiry Classification
//!
//! Freshness of a batch is derived, never stored: it depends on the as-of
//! date the caller passes in.
//!
//! ## Classes
//! ```text
//!   d = expiry_date − as_of   (whole days)
//!
//!   ───────────┼──────────────────┼─────────────────┼──────────────►  d
//!     EXPIRED  0   EXPIRING_SOON  30      GOOD      90   EXCELLENT
//!    (d < 0)      (0 ≤ d ≤ 30)       (30 < d ≤ 90)      (d > 90)
//! ```
//!
//! ## Ordering
//! Stock moves first-expiry-first-out: ascending expiry date, ties broken
//! by batch id so the order is total.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::types::ProductBatch;
use crate::{EXPIRING_SOON_DAYS, GOOD_DAYS};

// =============================================================================
// Expiry Class
// =============================================================================

/// Freshness bucket of a batch relative to an as-of date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExpiryClass {
    Expired,
    ExpiringSoon,
    Good,
    Excellent,
}

impl ExpiryClass {
    pub const fn as_str(&self) -> &'static str {
        match self {
            ExpiryClass::Expired => "EXPIRED",
            ExpiryClass::ExpiringSoon => "EXPIRING_SOON",
            ExpiryClass::Good => "GOOD",
            ExpiryClass::Excellent => "EXCELLENT",
        }
    }

    /// Buckets a day count. Boundaries: 0 and 30 are EXPIRING_SOON, 90 is GOOD.
    pub const fn from_days(days: i64) -> Self {
        if days < 0 {
            ExpiryClass::Expired
        } else if days <= EXPIRING_SOON_DAYS {
            ExpiryClass::ExpiringSoon
        } else if days <= GOOD_DAYS {
            ExpiryClass::Good
        } else {
            ExpiryClass::Excellent
        }
    }
}

/// Whole days from `as_of` to `expiry` (negative once expired).
#[inline]
pub fn days_until_expiry(expiry: NaiveDate, as_of: NaiveDate) -> i64 {
    (expiry - as_of).num_days()
}

/// Classifies a bare expiry date as of `as_of`.
///
/// ## Example
/// ```rust
/// use chrono::{Duration, NaiveDate};
/// use medibridge_core::expiry::{classify_date, ExpiryClass};
///
/// let today = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
/// let expiry = NaiveDate::from_ymd_opt(2025, 7, 1).unwrap(); // 30 days
/// assert_eq!(classify_date(expiry, today), ExpiryClass::ExpiringSoon);
/// ```
pub fn classify_date(expiry: NaiveDate, as_of: NaiveDate) -> ExpiryClass {
    ExpiryClass::from_days(days_until_expiry(expiry, as_of))
}

/// Classifies a batch as of the given date.
pub fn classify_expiry(batch: &ProductBatch, as_of: NaiveDate) -> ExpiryClass {
    classify_date(batch.expiry_date, as_of)
}

// =============================================================================
// Ordering
// =============================================================================

/// Returns the batches first-expiry-first-out, ties by id.
pub fn order_by_expiry(mut batches: Vec<ProductBatch>) -> Vec<ProductBatch> {
    batches.sort_by(|a, b| {
        a.expiry_date
            .cmp(&b.expiry_date)
            .then_with(|| a.id.cmp(&b.id))
    });
    batches
}

// =============================================================================
// Windows
// =============================================================================

/// Latest date a window may reach. Dates are stored as `YYYY-MM-DD` text,
/// so anything past year 9999 would no longer compare correctly.
pub fn last_calendar_day() -> NaiveDate {
    NaiveDate::from_ymd_opt(9999, 12, 31).unwrap_or(NaiveDate::MAX)
}

/// Last day of a `window_days` window starting at `as_of`.
///
/// Windows too long to represent end on [`last_calendar_day`].
pub fn window_end(as_of: NaiveDate, window_days: i64) -> NaiveDate {
    let last = last_calendar_day();
    Duration::try_days(window_days)
        .and_then(|span| as_of.checked_add_signed(span))
        .map_or(last, |end| end.min(last))
}

// =============================================================================
// Classified Views
// =============================================================================

/// A batch annotated with its freshness as of a date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifiedBatch {
    #[serde(flatten)]
    pub batch: ProductBatch,
    pub expiry_class: ExpiryClass,
    pub days_until_expiry: i64,
}

impl ClassifiedBatch {
    pub fn new(batch: ProductBatch, as_of: NaiveDate) -> Self {
        let days = days_until_expiry(batch.expiry_date, as_of);
        ClassifiedBatch {
            batch,
            expiry_class: ExpiryClass::from_days(days),
            days_until_expiry: days,
        }
    }
}

/// Annotates and FIFO-orders a set of batches.
pub fn classify_all(batches: Vec<ProductBatch>, as_of: NaiveDate) -> Vec<ClassifiedBatch> {
    order_by_expiry(batches)
        .into_iter()
        .map(|b| ClassifiedBatch::new(b, as_of))
        .collect()
}

/// Batches expiring within `window_days` (today included), FIFO-ordered.
///
/// Already-expired stock is not an alert; it shows up in
/// [`InventorySummary::expired`] instead.
pub fn near_expiry_alerts(
    batches: Vec<ProductBatch>,
    as_of: NaiveDate,
    window_days: i64,
) -> Vec<ClassifiedBatch> {
    classify_all(batches, as_of)
        .into_iter()
        .filter(|c| (0..=window_days).contains(&c.days_until_expiry))
        .collect()
}

// =============================================================================
// Inventory Summary
// =============================================================================

/// Stock overview for a set of batches.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventorySummary {
    pub total_batches: i64,
    pub total_units: i64,
    /// Batches with 0 ≤ d ≤ 30.
    pub expiring_soon: i64,
    /// Batches with d < 0.
    pub expired: i64,
    /// Σ dealer price × quantity.
    pub total_value: Money,
}

/// Summarizes `batches` as of `as_of`.
pub fn inventory_summary(batches: &[ProductBatch], as_of: NaiveDate) -> InventorySummary {
    batches
        .iter()
        .fold(InventorySummary::default(), |mut acc, batch| {
            acc.total_batches += 1;
            acc.total_units = acc.total_units.saturating_add(batch.quantity);
            acc.total_value += batch.stock_value();
            match classify_expiry(batch, as_of) {
                ExpiryClass::Expired => acc.expired += 1,
                ExpiryClass::ExpiringSoon => acc.expiring_soon += 1,
                ExpiryClass::Good | ExpiryClass::Excellent => {}
            }
            acc
        })
}

// =============================================================================
// Unit Tests
// =============================================================================
