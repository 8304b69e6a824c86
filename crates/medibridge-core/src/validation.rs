//! # Validation Module
//!
//! Field-level input validation for MediBridge commands.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Command deserialization (serde)                              │
//! │  ├── Shape and type checks                                             │
//! │  └── Unknown status tokens, malformed amounts                          │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── Required text, positive prices, quantity bounds                   │
//! │  └── Date parsing and expiry-after-manufacture                         │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── UNIQUE constraints (GST, license, invoice no, txn id)             │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Field names in errors use the external camelCase spelling so callers can
//! map them straight back onto the offending input.
//!
//! ## Usage
//! ```rust
//! use medibridge_core::validation::{parse_date, validate_date_range};
//!
//! let mfg = parse_date("manufacturingDate", "2024-01-10").unwrap();
//! let exp = parse_date("expiryDate", "2026-01-10T00:00:00Z").unwrap();
//! assert!(validate_date_range(mfg, exp).is_ok());
//! assert!(validate_date_range(exp, mfg).is_err());
//! ```

use chrono::{DateTime, Datelike, NaiveDate};

use crate::error::ValidationError;
use crate::money::Money;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Upper bound on free-text fields.
pub const MAX_TEXT_LEN: usize = 255;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a required text field and returns it trimmed.
///
/// ## Example
/// ```rust
/// use medibridge_core::validation::validate_required;
///
/// assert_eq!(validate_required("gstNumber", " 27AAACR5055K1Z5 ").unwrap(), "27AAACR5055K1Z5");
/// assert!(validate_required("gstNumber", "   ").is_err());
/// ```
pub fn validate_required(field: &str, value: &str) -> ValidationResult<String> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > MAX_TEXT_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_TEXT_LEN,
        });
    }

    Ok(value.to_string())
}

/// Validates an optional replacement for a required text field.
///
/// `None` means "leave unchanged"; `Some` must pass [`validate_required`].
pub fn validate_optional_required(
    field: &str,
    value: Option<&str>,
) -> ValidationResult<Option<String>> {
    value.map(|v| validate_required(field, v)).transpose()
}

/// Validates a search query.
///
/// Empty input means "no search" and yields `None`.
pub fn validate_search_query(query: Option<&str>) -> ValidationResult<Option<String>> {
    let Some(query) = query.map(str::trim) else {
        return Ok(None);
    };

    if query.is_empty() {
        return Ok(None);
    }

    if query.chars().count() > 100 {
        return Err(ValidationError::TooLong {
            field: "search".to_string(),
            max: 100,
        });
    }

    Ok(Some(query.to_string()))
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a referenced record id.
pub fn validate_id(field: &str, id: i64) -> ValidationResult<()> {
    if id <= 0 {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }

    Ok(())
}

/// Validates stock on hand (zero allowed).
pub fn validate_stock_quantity(qty: i64) -> ValidationResult<()> {
    if qty < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: "quantity".to_string(),
        });
    }

    Ok(())
}

/// Validates a requested transfer quantity (must be positive).
///
/// ## User Workflow
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Dealer A requests 50 strips of PCM-2401 from Dealer B                 │
/// │       │                                                                 │
/// │       ▼                                                                 │
/// │  validate_request_quantity(50) ← THIS FUNCTION                         │
/// │       │                                                                 │
/// │       ├── qty <= 0? → Error: "quantity must be positive"               │
/// │       │                                                                 │
/// │       └── OK → request is stored as PENDING                            │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub fn validate_request_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    Ok(())
}

/// Validates a unit price (MRP or dealer price). Zero is not a price.
///
/// ## Example
/// ```rust
/// use medibridge_core::money::Money;
/// use medibridge_core::validation::validate_price;
///
/// assert!(validate_price("mrp", Money::from_paise(6000)).is_ok());
/// assert!(validate_price("dealerPrice", Money::zero()).is_err());
/// ```
pub fn validate_price(field: &str, price: Money) -> ValidationResult<()> {
    if !price.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }

    Ok(())
}

/// Validates a payment amount (must be positive).
pub fn validate_payment_amount(amount: Money) -> ValidationResult<()> {
    validate_price("amount", amount)
}

/// Validates a near-expiry window in days.
pub fn validate_window_days(field: &str, days: i64) -> ValidationResult<()> {
    if days < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Date Validators
// =============================================================================

/// Parses a calendar date.
///
/// Accepts `YYYY-MM-DD` or an RFC 3339 timestamp, whose date part is used.
pub fn parse_date(field: &str, value: &str) -> ValidationResult<NaiveDate> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .or_else(|_| DateTime::parse_from_rfc3339(value).map(|ts| ts.date_naive()))
        .map_err(|_| ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "expected YYYY-MM-DD or an RFC 3339 timestamp".to_string(),
        })?;

    // Stored as text; only four-digit years sort correctly.
    if !(1..=9999).contains(&date.year()) {
        return Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "year must be between 0001 and 9999".to_string(),
        });
    }

    Ok(date)
}

/// Checks that expiry falls strictly after manufacture.
///
/// Callers pass the *effective* dates: on a partial update, the unchanged
/// side comes from the stored record.
pub fn validate_date_range(manufacturing: NaiveDate, expiry: NaiveDate) -> ValidationResult<()> {
    if expiry <= manufacturing {
        return Err(ValidationError::invalid(
            "expiryDate",
            "must be after manufacturingDate",
        ));
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
