//! # Engine Error Type
//!
//! Unified error type for engine commands.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in MediBridge                             │
//! │                                                                         │
//! │  Caller                      Engine                                     │
//! │  ──────                      ──────                                     │
//! │                                                                         │
//! │  engine.create_invoice(cmd)                                             │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  Command method                                                  │  │
//! │  │  EngineResult<T>                                                 │  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  ValidationError ──────────────── Validation ───────────┐       │  │
//! │  │  CoreError::InvalidTransition ─── InvalidTransition ────┤       │  │
//! │  │  DbError::UniqueViolation ─────── Duplicate ────────────┤       │  │
//! │  │  DbError::NotFound ────────────── NotFound ─────────────┤       │  │
//! │  │  anything else ── error!() ────── Internal ─────────────┤       │  │
//! │  │                                                         ▼       │  │
//! │  │                                   ErrorResponse { code, message }│  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! │  {                                                                      │
//! │    "code": "DUPLICATE",                                                 │
//! │    "message": "invoiceNumber 'INV-20250601-1A2B3C4D' already exists",   │
//! │    "field": "invoiceNumber"                                             │
//! │  }                                                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Internal failures are logged with their detail and reported to the
//! caller with a generic message.

use serde::Serialize;
use thiserror::Error;

use medibridge_core::{CoreError, RequestStatus, ValidationError};
use medibridge_db::DbError;

/// Result alias for engine commands.
pub type EngineResult<T> = Result<T, EngineError>;

/// Failure kinds surfaced by engine commands.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// Input failed a business or format rule. Always names the field.
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// A value that must be unique is already taken.
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },

    /// A referenced record does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// The request's state does not allow the operation.
    ///
    /// `requested` is `None` when the operation was an edit rather than a
    /// status change (editing a closed request).
    #[error("{}", describe_transition(.current, .requested, .allowed))]
    InvalidTransition {
        current: RequestStatus,
        requested: Option<RequestStatus>,
        allowed: Vec<RequestStatus>,
    },

    /// Data-access failure. The message carries no internal detail.
    #[error("{0}")]
    Internal(String),
}

fn describe_transition(
    current: &RequestStatus,
    requested: &Option<RequestStatus>,
    allowed: &[RequestStatus],
) -> String {
    let allowed = if allowed.is_empty() {
        "None (terminal state)".to_string()
    } else {
        allowed
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    };
    match requested {
        Some(to) => format!(
            "Invalid status transition from {} to {}. Valid transitions: {}",
            current, to, allowed
        ),
        None => format!(
            "Request is {} and can no longer be modified. Valid transitions: {}",
            current, allowed
        ),
    }
}

impl EngineError {
    /// Creates a not found error.
    pub fn not_found(entity: &str, id: impl ToString) -> Self {
        EngineError::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }

    /// Creates a duplicate error.
    pub fn duplicate(field: &str, value: impl Into<String>) -> Self {
        EngineError::Duplicate {
            field: field.to_string(),
            value: value.into(),
        }
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        EngineError::Internal(message.into())
    }

    /// Machine-readable code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            EngineError::Validation(_) => ErrorCode::ValidationError,
            EngineError::Duplicate { .. } => ErrorCode::Duplicate,
            EngineError::NotFound { .. } => ErrorCode::NotFound,
            EngineError::InvalidTransition { .. } => ErrorCode::InvalidTransition,
            EngineError::Internal(_) => ErrorCode::Internal,
        }
    }

    /// The offending field, for validation and duplicate errors.
    pub fn field(&self) -> Option<&str> {
        match self {
            EngineError::Validation(e) => Some(e.field()),
            EngineError::Duplicate { field, .. } => Some(field),
            _ => None,
        }
    }

    /// Serializable form for the caller.
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            code: self.code(),
            message: self.to_string(),
            field: self.field().map(str::to_string),
        }
    }
}

// =============================================================================
// Wire Representation
// =============================================================================

/// Stable error codes.
///
/// | code | meaning |
/// |---|---|
/// | `VALIDATION_ERROR` | bad input, `field` names it |
/// | `DUPLICATE` | unique value already taken |
/// | `NOT_FOUND` | referenced record missing |
/// | `INVALID_TRANSITION` | lifecycle forbids the operation |
/// | `INTERNAL` | storage failure |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ValidationError,
    Duplicate,
    NotFound,
    InvalidTransition,
    Internal,
}

impl ErrorCode {
    pub const fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ValidationError => "VALIDATION_ERROR",
            ErrorCode::Duplicate => "DUPLICATE",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::InvalidTransition => "INVALID_TRANSITION",
            ErrorCode::Internal => "INTERNAL",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the caller receives when a command fails.
///
/// ```json
/// {
///   "code": "NOT_FOUND",
///   "message": "TransferRequest not found: 42"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl From<&EngineError> for ErrorResponse {
    fn from(err: &EngineError) -> Self {
        err.to_response()
    }
}

// =============================================================================
// Conversions
// =============================================================================

/// Converts core errors to engine errors.
impl From<CoreError> for EngineError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidTransition {
                current,
                requested,
                allowed,
            } => EngineError::InvalidTransition {
                current,
                requested: Some(requested),
                allowed,
            },
            CoreError::RequestClosed { current } => EngineError::InvalidTransition {
                current,
                requested: None,
                allowed: Vec::new(),
            },
            CoreError::Validation(e) => EngineError::Validation(e),
        }
    }
}

/// Converts database errors to engine errors.
impl From<DbError> for EngineError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => EngineError::NotFound { entity, id },
            DbError::UniqueViolation { field, value } => EngineError::Duplicate {
                field: camel_case(&field),
                value,
            },
            DbError::ForeignKeyViolation { message } => {
                // A referenced row vanished between the existence check and
                // the write.
                tracing::warn!("Foreign key violation: {}", message);
                EngineError::Validation(ValidationError::invalid(
                    "reference",
                    "referenced record no longer exists",
                ))
            }
            DbError::Conflict { entity, id } => {
                tracing::error!(%entity, %id, "Unresolved concurrent modification");
                EngineError::internal("Record was modified concurrently")
            }
            DbError::ConnectionFailed(e) => {
                tracing::error!("Database connection failed: {}", e);
                EngineError::internal("Database connection failed")
            }
            DbError::MigrationFailed(e) => {
                tracing::error!("Database migration failed: {}", e);
                EngineError::internal("Database migration failed")
            }
            DbError::QueryFailed(e) => {
                // Log the actual error but return a generic message
                tracing::error!("Database query failed: {}", e);
                EngineError::internal("Database operation failed")
            }
            DbError::PoolExhausted => {
                tracing::error!("Database pool exhausted");
                EngineError::internal("Database pool exhausted")
            }
            DbError::Internal(e) => {
                tracing::error!("Internal database error: {}", e);
                EngineError::internal("Database operation failed")
            }
        }
    }
}

/// `gst_number` → `gstNumber`, matching the command field names.
fn camel_case(column: &str) -> String {
    let mut out = String::with_capacity(column.len());
    let mut upper = false;
    for c in column.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.push(c.to_ascii_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camel_case() {
        assert_eq!(camel_case("gst_number"), "gstNumber");
        assert_eq!(camel_case("request_id"), "requestId");
        assert_eq!(camel_case("quantity"), "quantity");
    }

    #[test]
    fn test_unique_violation_becomes_duplicate() {
        let err = EngineError::from(DbError::duplicate("license_number", "MH-1"));
        assert_eq!(err, EngineError::duplicate("licenseNumber", "MH-1"));
        assert_eq!(err.code(), ErrorCode::Duplicate);
        assert_eq!(err.field(), Some("licenseNumber"));
    }

    #[test]
    fn test_internal_hides_detail() {
        let err = EngineError::from(DbError::QueryFailed("CHECK constraint failed: secret".into()));
        assert_eq!(err.code(), ErrorCode::Internal);
        assert!(!err.to_string().contains("secret"));
    }

    #[test]
    fn test_invalid_transition_message() {
        let err = EngineError::from(CoreError::InvalidTransition {
            current: RequestStatus::Pending,
            requested: RequestStatus::Completed,
            allowed: vec![RequestStatus::Confirmed, RequestStatus::Rejected],
        });
        assert_eq!(
            err.to_string(),
            "Invalid status transition from PENDING to COMPLETED. Valid transitions: CONFIRMED, REJECTED"
        );

        let closed = EngineError::from(CoreError::RequestClosed {
            current: RequestStatus::Rejected,
        });
        assert_eq!(closed.code(), ErrorCode::InvalidTransition);
        assert!(closed.to_string().ends_with("None (terminal state)"));
    }

    #[test]
    fn test_response_serialization() {
        let err = EngineError::Validation(ValidationError::MustBePositive {
            field: "quantity".into(),
        });
        let response = err.to_response();
        assert_eq!(response.code.as_str(), "VALIDATION_ERROR");
        assert_eq!(response.field.as_deref(), Some("quantity"));

        let not_found = EngineError::not_found("Invoice", 9).to_response();
        assert_eq!(not_found.message, "Invoice not found: 9");
        assert_eq!(not_found.field, None);
    }
}
