//! # Request Lifecycle
//!
//! The state machine a transfer request moves through.
//!
//! ## Transition Table
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │   current      │ allowed next                                           │
//! │  ──────────────┼──────────────────────────────────────────────────────  │
//! │   PENDING      │ CONFIRMED, REJECTED     (sets response_date)           │
//! │   CONFIRMED    │ COMPLETED               (response_date unchanged)      │
//! │   COMPLETED    │ -  terminal                                            │
//! │   REJECTED     │ -  terminal                                            │
//! │                                                                         │
//! │   Any state → itself: accepted, no write, no event                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Adding a state means adding a variant and one row to [`TRANSITIONS`].
//!
//! ## Flow
//! ```text
//! load request ──► apply_transition(request, to, now)
//!                        │
//!                        ├── Err(InvalidTransition { current, allowed })
//!                        ├── Ok(None)          self-transition
//!                        └── Ok(Some(event))   persist with
//!                                              WHERE status = event.from
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::types::{RequestStatus, TransferRequest};
use crate::validation::{validate_id, validate_request_quantity};

// =============================================================================
// Transition Table
// =============================================================================

/// Allowed next states per state.
pub const TRANSITIONS: &[(RequestStatus, &[RequestStatus])] = &[
    (
        RequestStatus::Pending,
        &[RequestStatus::Confirmed, RequestStatus::Rejected],
    ),
    (RequestStatus::Confirmed, &[RequestStatus::Completed]),
    (RequestStatus::Completed, &[]),
    (RequestStatus::Rejected, &[]),
];

/// States reachable in one step from `status`.
pub fn allowed_transitions(status: RequestStatus) -> &'static [RequestStatus] {
    TRANSITIONS
        .iter()
        .find(|(from, _)| *from == status)
        .map(|(_, to)| *to)
        .unwrap_or(&[])
}

/// A state with no outgoing transitions.
pub fn is_terminal(status: RequestStatus) -> bool {
    allowed_transitions(status).is_empty()
}

/// Checks a move without applying it.
///
/// Returns `Ok(false)` for a self-transition (nothing to do), `Ok(true)` for
/// a legal move.
pub fn check_transition(current: RequestStatus, requested: RequestStatus) -> CoreResult<bool> {
    if current == requested {
        return Ok(false);
    }

    let allowed = allowed_transitions(current);
    if allowed.contains(&requested) {
        Ok(true)
    } else {
        Err(CoreError::InvalidTransition {
            current,
            requested,
            allowed: allowed.to_vec(),
        })
    }
}

// =============================================================================
// Lifecycle Event
// =============================================================================

/// Emitted for every successful, non-self status change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LifecycleEvent {
    pub request_id: i64,
    pub from: RequestStatus,
    pub to: RequestStatus,
    pub at: DateTime<Utc>,
}

/// Moves `request` to `to` in place.
///
/// Leaving PENDING stamps `response_date` (only if it was never set).
/// `updated_at` follows every real change.
pub fn apply_transition(
    request: &mut TransferRequest,
    to: RequestStatus,
    now: DateTime<Utc>,
) -> CoreResult<Option<LifecycleEvent>> {
    let from = request.status;
    if !check_transition(from, to)? {
        return Ok(None);
    }

    if from == RequestStatus::Pending && request.response_date.is_none() {
        request.response_date = Some(now);
    }
    request.status = to;
    request.updated_at = now;

    Ok(Some(LifecycleEvent {
        request_id: request.id,
        from,
        to,
        at: now,
    }))
}

// =============================================================================
// Request Rules
// =============================================================================

/// Validates the terms of a new request.
pub fn validate_new_request(
    requesting_dealer_id: i64,
    responding_dealer_id: i64,
    product_id: i64,
    quantity: i64,
) -> Result<(), ValidationError> {
    validate_id("requestingDealerId", requesting_dealer_id)?;
    validate_id("respondingDealerId", responding_dealer_id)?;
    validate_id("productId", product_id)?;
    validate_request_quantity(quantity)?;

    if requesting_dealer_id == responding_dealer_id {
        return Err(ValidationError::invalid(
            "respondingDealerId",
            "a dealer cannot request stock from itself",
        ));
    }

    Ok(())
}

/// Changes the requested quantity of an open request.
pub fn update_quantity(
    request: &mut TransferRequest,
    quantity: i64,
    now: DateTime<Utc>,
) -> CoreResult<()> {
    if is_terminal(request.status) {
        return Err(CoreError::RequestClosed {
            current: request.status,
        });
    }
    validate_request_quantity(quantity)?;

    request.quantity = quantity;
    request.updated_at = now;
    Ok(())
}

// =============================================================================
// Status Counts
// =============================================================================

/// Number of requests in each state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCounts {
    pub total: i64,
    pub pending: i64,
    pub confirmed: i64,
    pub completed: i64,
    pub rejected: i64,
}

impl StatusCounts {
    /// Adds `n` requests in `status`.
    pub fn add(&mut self, status: RequestStatus, n: i64) {
        self.total += n;
        match status {
            RequestStatus::Pending => self.pending += n,
            RequestStatus::Confirmed => self.confirmed += n,
            RequestStatus::Completed => self.completed += n,
            RequestStatus::Rejected => self.rejected += n,
        }
    }

    pub fn get(&self, status: RequestStatus) -> i64 {
        match status {
            RequestStatus::Pending => self.pending,
            RequestStatus::Confirmed => self.confirmed,
            RequestStatus::Completed => self.completed,
            RequestStatus::Rejected => self.rejected,
        }
    }
}

/// Tallies statuses.
pub fn status_counts<I>(statuses: I) -> StatusCounts
where
    I: IntoIterator<Item = RequestStatus>,
{
    statuses.into_iter().fold(StatusCounts::default(), |mut acc, s| {
        acc.add(s, 1);
        acc
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap()
    }

    fn request(status: RequestStatus) -> TransferRequest {
        TransferRequest {
            id: 7,
            requesting_dealer_id: 1,
            responding_dealer_id: 2,
            product_id: 3,
            quantity: 50,
            status,
            request_date: t0(),
            response_date: None,
            created_at: t0(),
            updated_at: t0(),
        }
    }

    fn any_status() -> impl Strategy<Value = RequestStatus> {
        prop::sample::select(RequestStatus::ALL.to_vec())
    }

    #[test]
    fn test_table_covers_every_state() {
        for status in RequestStatus::ALL {
            assert!(TRANSITIONS.iter().any(|(s, _)| *s == status));
        }
        assert!(is_terminal(RequestStatus::Completed));
        assert!(is_terminal(RequestStatus::Rejected));
        assert!(!is_terminal(RequestStatus::Pending));
    }

    #[test]
    fn test_pending_to_completed_lists_allowed() {
        let mut req = request(RequestStatus::Pending);
        let err = apply_transition(&mut req, RequestStatus::Completed, t0()).unwrap_err();
        match err {
            CoreError::InvalidTransition {
                current, allowed, ..
            } => {
                assert_eq!(current, RequestStatus::Pending);
                assert_eq!(allowed, vec![RequestStatus::Confirmed, RequestStatus::Rejected]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(req.status, RequestStatus::Pending);
    }

    #[test]
    fn test_confirm_sets_response_date_then_complete_keeps_it() {
        let mut req = request(RequestStatus::Pending);
        let confirm_at = t0() + Duration::hours(2);
        let event = apply_transition(&mut req, RequestStatus::Confirmed, confirm_at)
            .unwrap()
            .unwrap();
        assert_eq!(event.from, RequestStatus::Pending);
        assert_eq!(event.to, RequestStatus::Confirmed);
        assert_eq!(event.request_id, 7);
        assert_eq!(req.response_date, Some(confirm_at));

        let complete_at = confirm_at + Duration::days(3);
        apply_transition(&mut req, RequestStatus::Completed, complete_at).unwrap();
        assert_eq!(req.status, RequestStatus::Completed);
        assert_eq!(req.response_date, Some(confirm_at));
        assert_eq!(req.updated_at, complete_at);
    }

    #[test]
    fn test_reject_sets_response_date() {
        let mut req = request(RequestStatus::Pending);
        apply_transition(&mut req, RequestStatus::Rejected, t0()).unwrap();
        assert_eq!(req.response_date, Some(t0()));
    }

    #[test]
    fn test_self_transition_is_noop() {
        let mut req = request(RequestStatus::Pending);
        let later = t0() + Duration::hours(1);
        assert_eq!(
            apply_transition(&mut req, RequestStatus::Pending, later).unwrap(),
            None
        );
        assert_eq!(req.response_date, None);
        assert_eq!(req.updated_at, t0());
    }

    #[test]
    fn test_same_dealer_rejected() {
        let err = validate_new_request(1, 1, 3, 10).unwrap_err();
        assert_eq!(err.field(), "respondingDealerId");
    }

    #[test]
    fn test_new_request_quantity_must_be_positive() {
        assert_eq!(validate_new_request(1, 2, 3, 0).unwrap_err().field(), "quantity");
        assert!(validate_new_request(1, 2, 3, 1).is_ok());
    }

    #[test]
    fn test_update_quantity_open_and_closed() {
        let mut req = request(RequestStatus::Confirmed);
        update_quantity(&mut req, 80, t0()).unwrap();
        assert_eq!(req.quantity, 80);
        assert!(update_quantity(&mut req, 0, t0()).is_err());

        let mut done = request(RequestStatus::Completed);
        assert!(matches!(
            update_quantity(&mut done, 5, t0()),
            Err(CoreError::RequestClosed {
                current: RequestStatus::Completed
            })
        ));
        assert_eq!(done.quantity, 50);
    }

    #[test]
    fn test_status_counts() {
        let counts = status_counts([
            RequestStatus::Pending,
            RequestStatus::Pending,
            RequestStatus::Completed,
            RequestStatus::Rejected,
        ]);
        assert_eq!(counts.total, 4);
        assert_eq!(counts.get(RequestStatus::Pending), 2);
        assert_eq!(counts.confirmed, 0);
    }

    proptest! {
        #[test]
        fn prop_self_transition_always_ok(status in any_status()) {
            prop_assert_eq!(check_transition(status, status).ok(), Some(false));
        }

        #[test]
        fn prop_terminal_states_are_final(
            terminal in prop::sample::select(vec![RequestStatus::Completed, RequestStatus::Rejected]),
            to in any_status(),
        ) {
            prop_assume!(to != terminal);
            let mut req = request(terminal);
            let is_invalid = matches!(
                apply_transition(&mut req, to, t0()),
                Err(CoreError::InvalidTransition { ref allowed, .. }) if allowed.is_empty()
            );
            prop_assert!(is_invalid);
            prop_assert_eq!(req.status, terminal);
        }

        #[test]
        fn prop_walks_follow_table(steps in proptest::collection::vec(any_status(), 0..12)) {
            let mut req = request(RequestStatus::Pending);
            for to in steps {
                let before = req.status;
                match apply_transition(&mut req, to, t0()) {
                    Ok(Some(_)) => prop_assert!(allowed_transitions(before).contains(&to)),
                    Ok(None) => prop_assert_eq!(before, to),
                    Err(_) => prop_assert_eq!(req.status, before),
                }
            }
        }
    }
}
