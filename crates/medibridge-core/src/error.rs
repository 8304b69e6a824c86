//! # Domain Errors
//!
//! Two kinds of failure come out of the pure domain layer:
//!
//! ```text
//!   ValidationError   bad input; always carries the camelCase field name
//!        │              ("gstNumber", "expiryDate", "quantity")
//!        ▼
//!   CoreError         a lifecycle rule refused the operation
//!                       (InvalidTransition, RequestClosed)
//! ```
//!
//! The engine folds both, together with storage errors, into its caller
//! facing error type.

use thiserror::Error;

use crate::types::RequestStatus;

// =============================================================================
// Core Error
// =============================================================================

/// A domain rule refused the operation.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A lifecycle move that the transition table does not allow.
    ///
    /// ## User Workflow
    /// ```text
    /// Request #7 is PENDING
    ///      │
    ///      ▼
    /// transition(COMPLETED)
    ///      │
    ///      ▼
    /// InvalidTransition { current: PENDING, requested: COMPLETED,
    ///                     allowed: [CONFIRMED, REJECTED] }
    /// ```
    #[error(
        "Invalid status transition from {current} to {requested}. Valid transitions: {}",
        format_allowed(.allowed)
    )]
    InvalidTransition {
        current: RequestStatus,
        requested: RequestStatus,
        allowed: Vec<RequestStatus>,
    },

    /// The request is in a terminal state and can no longer be edited.
    #[error("Request is {current} and can no longer be modified")]
    RequestClosed { current: RequestStatus },

    #[error("{0}")]
    Validation(#[from] ValidationError),
}

fn format_allowed(allowed: &[RequestStatus]) -> String {
    if allowed.is_empty() {
        return "None (terminal state)".to_string();
    }
    allowed
        .iter()
        .map(|s| s.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

// =============================================================================
// Validation Error
// =============================================================================

/// A rejected input value, tagged with the field it came from.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Blank after trimming.
    #[error("{field} is required")]
    Required { field: String },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Quantities, prices and payment amounts.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Unparseable date or amount.
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Unknown status token.
    #[error("{field} must be one of: {}", .allowed.join(", "))]
    NotAllowed { field: String, allowed: Vec<String> },

    /// Value conflicts with another field or with the record's state.
    #[error("{field} is invalid: {reason}")]
    Invalid { field: String, reason: String },
}

impl ValidationError {
    /// Returns the name of the offending field.
    pub fn field(&self) -> &str {
        match self {
            ValidationError::Required { field }
            | ValidationError::TooLong { field, .. }
            | ValidationError::MustBePositive { field }
            | ValidationError::MustNotBeNegative { field }
            | ValidationError::InvalidFormat { field, .. }
            | ValidationError::NotAllowed { field, .. }
            | ValidationError::Invalid { field, .. } => field,
        }
    }

    /// Shorthand for [`ValidationError::Invalid`].
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::Invalid {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_transition_message_lists_allowed() {
        let err = CoreError::InvalidTransition {
            current: RequestStatus::Pending,
            requested: RequestStatus::Completed,
            allowed: vec![RequestStatus::Confirmed, RequestStatus::Rejected],
        };
        assert_eq!(
            err.to_string(),
            "Invalid status transition from PENDING to COMPLETED. Valid transitions: CONFIRMED, REJECTED"
        );
    }

    #[test]
    fn test_invalid_transition_message_terminal() {
        let err = CoreError::InvalidTransition {
            current: RequestStatus::Rejected,
            requested: RequestStatus::Confirmed,
            allowed: vec![],
        };
        assert!(err.to_string().ends_with("None (terminal state)"));
    }

    #[test]
    fn test_field_names_survive_display() {
        let err = ValidationError::Required {
            field: "gstNumber".to_string(),
        };
        assert_eq!(err.to_string(), "gstNumber is required");
        assert_eq!(err.field(), "gstNumber");

        let err = ValidationError::NotAllowed {
            field: "status".to_string(),
            allowed: vec!["PENDING".to_string(), "COMPLETED".to_string()],
        };
        assert_eq!(err.to_string(), "status must be one of: PENDING, COMPLETED");
    }

    #[test]
    fn test_bad_quantity_lifts_into_core_error() {
        let lifted = CoreError::from(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
        match lifted {
            CoreError::Validation(inner) => assert_eq!(inner.field(), "quantity"),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
