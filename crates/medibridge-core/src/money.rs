//! # Money Module
//!
//! Provides the `Money` type for handling rupee amounts safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In floating point:                                                     │
//! │    8500.10 * 0.18 = 1530.0179999999998  ❌                              │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Paise                                            │
//! │    850010 paise * 1800 bps → (850010*1800 + 5000) / 10000 = 153002     │
//! │    Every rounding step is explicit and happens on the paisa boundary   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## External Representation
//! Amounts cross the boundary as decimal strings with exactly two fractional
//! digits (`"10030.00"`). Deserialization also accepts JSON numbers, which
//! are parsed from their decimal text and rounded half-up to the paisa.
//!
//! ## Usage
//! ```rust
//! use medibridge_core::money::Money;
//!
//! let price = Money::from_paise(850000); // ₹8500.00
//! let parsed: Money = "8500".parse().unwrap();
//! assert_eq!(price, parsed);
//! assert_eq!(price.to_decimal_string(), "8500.00");
//! ```

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use std::str::FromStr;

use crate::types::TaxRate;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in paise (1/100 rupee).
///
/// ## Design Decisions
/// - **i64 (signed)**: differences and adjustments can go negative
/// - **Single field tuple struct**: zero-cost abstraction over i64
/// - **Stored as INTEGER** in SQLite via `sqlx(transparent)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from paise (the smallest currency unit).
    #[inline]
    pub const fn from_paise(paise: i64) -> Self {
        Money(paise)
    }

    /// Creates a Money value from rupees and paise.
    ///
    /// ## Example
    /// ```rust
    /// use medibridge_core::money::Money;
    ///
    /// let price = Money::from_rupees_paise(10, 99);
    /// assert_eq!(price.paise(), 1099);
    ///
    /// let negative = Money::from_rupees_paise(-5, 50);
    /// assert_eq!(negative.paise(), -550);
    /// ```
    #[inline]
    pub const fn from_rupees_paise(rupees: i64, paise: i64) -> Self {
        if rupees < 0 {
            Money(rupees * 100 - paise)
        } else {
            Money(rupees * 100 + paise)
        }
    }

    /// Returns the value in paise.
    #[inline]
    pub const fn paise(&self) -> i64 {
        self.0
    }

    /// Returns the whole-rupee portion.
    #[inline]
    pub const fn rupees(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the paise portion (always 0-99).
    #[inline]
    pub const fn paise_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Calculates tax at `rate`, rounding half-up on the paisa boundary.
    ///
    /// ## Implementation
    /// Integer math: `(amount * bps + 5000) / 10000`. The +5000 is half of
    /// the 10000 divisor, so a remainder of exactly one half rounds up.
    /// Negative amounts are rounded symmetrically (half away from zero).
    ///
    /// ## Example
    /// ```rust
    /// use medibridge_core::money::Money;
    /// use medibridge_core::types::TaxRate;
    ///
    /// let subtotal = Money::from_paise(850000); // ₹8500.00
    /// let tax = subtotal.calculate_tax(TaxRate::GST);
    /// assert_eq!(tax.paise(), 153000);          // ₹1530.00
    /// ```
    pub fn calculate_tax(&self, rate: TaxRate) -> Money {
        // i128 prevents overflow on large amounts
        let scaled = self.0 as i128 * rate.bps() as i128;
        let tax = if scaled >= 0 {
            (scaled + 5000) / 10000
        } else {
            (scaled - 5000) / 10000
        };
        Money(clamp_i128(tax))
    }

    /// Price × quantity, or `None` if the product does not fit in paise.
    ///
    /// ## Example
    /// ```rust
    /// use medibridge_core::money::Money;
    ///
    /// let dealer_price = Money::from_paise(4550); // ₹45.50
    /// assert_eq!(dealer_price.checked_mul_quantity(200), Some(Money::from_paise(910000)));
    /// assert_eq!(dealer_price.checked_mul_quantity(i64::MAX), None);
    /// ```
    #[inline]
    pub const fn checked_mul_quantity(&self, qty: i64) -> Option<Self> {
        match self.0.checked_mul(qty) {
            Some(v) => Some(Money(v)),
            None => None,
        }
    }

    /// Price × quantity, pinned to the `i64` bounds on overflow.
    #[inline]
    pub const fn saturating_mul_quantity(&self, qty: i64) -> Self {
        Money(self.0.saturating_mul(qty))
    }

    #[inline]
    pub const fn checked_add(&self, other: Money) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(v) => Some(Money(v)),
            None => None,
        }
    }

    /// Formats as a plain decimal with exactly two fractional digits.
    ///
    /// This is the wire format: no currency symbol, no grouping.
    pub fn to_decimal_string(&self) -> String {
        let sign = if self.0 < 0 { "-" } else { "" };
        format!("{}{}.{:02}", sign, self.rupees().abs(), self.paise_part())
    }
}

fn clamp_i128(v: i128) -> i64 {
    i64::try_from(v).unwrap_or(if v < 0 { i64::MIN } else { i64::MAX })
}

// =============================================================================
// Parsing
// =============================================================================

/// Error returned when a decimal amount cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid amount '{0}'")]
pub struct ParseMoneyError(String);

/// Parses decimal text such as `"8500"`, `"8500.5"`, `"-12.345"`.
///
/// More than two fractional digits are rounded half-up (away from zero) to
/// the paisa, which is the `round2` used for stored subtotals.
impl FromStr for Money {
    type Err = ParseMoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseMoneyError(s.to_string());
        let text = s.trim();
        let (negative, digits) = match text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text.strip_prefix('+').unwrap_or(text)),
        };

        let (whole, frac) = match digits.split_once('.') {
            Some((w, f)) => (w, f),
            None => (digits, ""),
        };
        if whole.is_empty() && frac.is_empty() {
            return Err(err());
        }
        if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit())
        {
            return Err(err());
        }

        let whole_value: i64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| err())?
        };

        let frac_bytes = frac.as_bytes();
        let digit = |i: usize| -> i64 { frac_bytes.get(i).map_or(0, |b| (b - b'0') as i64) };
        let mut paise = digit(0) * 10 + digit(1);
        if digit(2) >= 5 {
            paise += 1;
        }

        let total = whole_value
            .checked_mul(100)
            .and_then(|v| v.checked_add(paise))
            .ok_or_else(err)?;

        Ok(Money(if negative { -total } else { total }))
    }
}

// =============================================================================
// Serde
// =============================================================================

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_decimal_string())
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(MoneyVisitor)
    }
}

struct MoneyVisitor;

impl<'de> Visitor<'de> for MoneyVisitor {
    type Value = Money;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a decimal amount as a string or number")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Money, E> {
        v.parse().map_err(E::custom)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Money, E> {
        v.checked_mul(100)
            .map(Money)
            .ok_or_else(|| E::custom("amount out of range"))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Money, E> {
        i64::try_from(v)
            .ok()
            .and_then(|v| v.checked_mul(100))
            .map(Money)
            .ok_or_else(|| E::custom("amount out of range"))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Money, E> {
        if !v.is_finite() {
            return Err(E::custom("amount must be finite"));
        }
        // The shortest round-trip text of an f64 is its decimal literal,
        // so 10.005 parses as "10.005" rather than 10.00499999...
        v.to_string().parse().map_err(E::custom)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

// Operators saturate. Paths that must refuse an unrepresentable amount use
// the `checked_*` methods instead.

/// Human-readable format with the rupee sign, for logs and debugging.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(
            f,
            "{}₹{}.{:02}",
            sign,
            self.rupees().abs(),
            self.paise_part()
        )
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0.saturating_add(other.0))
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_add(other.0);
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0.saturating_sub(other.0))
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_sub(other.0);
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        self.saturating_mul_quantity(qty)
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
