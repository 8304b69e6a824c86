//! # Invoice Calculator
//!
//! Derives GST and totals from a request's economic terms.
//!
//! ## Calculation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  subtotal   = round2(input)            (Money parse/deserialize)       │
//! │  gst_amount = round2(subtotal × 18%)   (half-up on the paisa)          │
//! │  total      = subtotal + gst_amount    (exact in paise)                │
//! │                                                                         │
//! │  ₹8500.00 ──► gst ₹1530.00 ──► total ₹10030.00                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Because every amount is an integer number of paise, `total − gst_amount`
//! is exactly the rounded subtotal.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{Invoice, TaxRate};
use crate::validation::validate_price;

/// Amounts stored on an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxBreakdown {
    pub subtotal: Money,
    pub gst_amount: Money,
    pub total: Money,
}

/// Computes GST at the fixed rate.
///
/// ## Example
/// ```rust
/// use medibridge_core::invoice::compute_tax;
/// use medibridge_core::money::Money;
///
/// let tax = compute_tax(Money::from_paise(850000)).unwrap();
/// assert_eq!(tax.gst_amount.to_decimal_string(), "1530.00");
/// assert_eq!(tax.total.to_decimal_string(), "10030.00");
/// ```
pub fn compute_tax(subtotal: Money) -> Result<TaxBreakdown, ValidationError> {
    compute_tax_at(subtotal, TaxRate::GST)
}

/// Computes tax at an arbitrary rate.
pub fn compute_tax_at(subtotal: Money, rate: TaxRate) -> Result<TaxBreakdown, ValidationError> {
    validate_price("subtotal", subtotal)?;

    let gst_amount = subtotal.calculate_tax(rate);
    let total = subtotal
        .checked_add(gst_amount)
        .ok_or_else(|| ValidationError::invalid("subtotal", "amount is too large to invoice"))?;
    Ok(TaxBreakdown {
        subtotal,
        gst_amount,
        total,
    })
}

/// Subtotal used when the caller does not supply one: dealer price ×
/// requested quantity.
pub fn default_subtotal(dealer_price: Money, quantity: i64) -> Result<Money, ValidationError> {
    dealer_price.checked_mul_quantity(quantity).ok_or_else(|| {
        ValidationError::invalid("quantity", "quantity × dealer price is too large to invoice")
    })
}

/// Revenue and GST collected across a set of invoices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceTotals {
    pub invoice_count: i64,
    pub subtotal: Money,
    pub gst_amount: Money,
    /// Σ total (subtotal + GST).
    pub revenue: Money,
}

impl InvoiceTotals {
    pub fn add(&mut self, invoice: &Invoice) {
        self.invoice_count += 1;
        self.subtotal += invoice.subtotal;
        self.gst_amount += invoice.gst_amount;
        self.revenue += invoice.total;
    }
}

/// Sums a set of invoices.
pub fn invoice_totals<'a, I>(invoices: I) -> InvoiceTotals
where
    I: IntoIterator<Item = &'a Invoice>,
{
    invoices
        .into_iter()
        .fold(InvoiceTotals::default(), |mut acc, inv| {
            acc.add(inv);
            acc
        })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use proptest::prelude::*;

    #[test]
    fn test_reference_scenario() {
        let subtotal: Money = "8500.00".parse().unwrap();
        let tax = compute_tax(subtotal).unwrap();
        assert_eq!(tax.subtotal.to_decimal_string(), "8500.00");
        assert_eq!(tax.gst_amount.to_decimal_string(), "1530.00");
        assert_eq!(tax.total.to_decimal_string(), "10030.00");
    }

    #[test]
    fn test_rejects_non_positive_subtotal() {
        assert_eq!(compute_tax(Money::zero()).unwrap_err().field(), "subtotal");
        assert!(compute_tax(Money::from_paise(-100)).is_err());
    }

    #[test]
    fn test_half_up_rounding() {
        // ₹0.25 × 18% = ₹0.045 → ₹0.05
        let tax = compute_tax(Money::from_paise(25)).unwrap();
        assert_eq!(tax.gst_amount.paise(), 5);
        assert_eq!(tax.total.paise(), 30);
    }

    #[test]
    fn test_default_subtotal() {
        assert_eq!(
            default_subtotal(Money::from_paise(4550), 200),
            Ok(Money::from_paise(910000))
        );
    }

    #[test]
    fn test_amounts_that_cannot_be_represented() {
        let err = default_subtotal(Money::from_paise(8500), i64::MAX / 1000).unwrap_err();
        assert_eq!(err.field(), "quantity");

        // ₹900 trillion: the tax fits, subtotal + tax does not.
        let huge: Money = "90000000000000000".parse().unwrap();
        assert_eq!(compute_tax(huge).unwrap_err().field(), "subtotal");
    }

    #[test]
    fn test_invoice_totals() {
        let now = Utc::now();
        let make = |id: i64, subtotal: i64| {
            let t = compute_tax(Money::from_paise(subtotal)).unwrap();
            Invoice {
                id,
                request_id: id,
                invoice_number: format!("INV-{id}"),
                dealer_id: 1,
                buyer_dealer_id: 2,
                subtotal: t.subtotal,
                gst_amount: t.gst_amount,
                total: t.total,
                invoice_date: now,
                created_at: now,
                updated_at: now,
            }
        };
        let invoices = vec![make(1, 850000), make(2, 100000)];
        let totals = invoice_totals(&invoices);
        assert_eq!(totals.invoice_count, 2);
        assert_eq!(totals.gst_amount.paise(), 153000 + 18000);
        assert_eq!(totals.revenue.paise(), 1003000 + 118000);
    }

    proptest! {
        /// total == round2(s + round2(s·0.18)) and total − gst == s
        #[test]
        fn prop_total_is_subtotal_plus_rounded_tax(paise in 1i64..10_000_000_000) {
            let tax = compute_tax(Money::from_paise(paise)).unwrap();

            // Reference: exact rational s·18/100 paise, rounded half-up.
            let expected_gst = (paise * 18 + 50) / 100;
            prop_assert_eq!(tax.gst_amount.paise(), expected_gst);
            prop_assert_eq!(tax.total.paise(), paise + expected_gst);
            prop_assert_eq!((tax.total - tax.gst_amount).paise(), paise);
        }
    }
}
