//! # Transfer Request Commands
//!
//! Request lifecycle: create, transition, quantity edits, listing.
//!
//! ## Transition Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  transition_request({ id: 7, status: "confirmed" })                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  parse status (case-insensitive) ── ValidationError on "status"        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─► read request #7 ────────────── NotFound                           │
//! │  │    │                                                                 │
//! │  │    ▼                                                                 │
//! │  │  apply_transition (table lookup) ── InvalidTransition               │
//! │  │    │        │                                                        │
//! │  │    │        └── same status: return unchanged, no event             │
//! │  │    ▼                                                                 │
//! │  │  UPDATE … WHERE id = 7 AND status = <read status>                   │
//! │  │    │                                                                 │
//! │  └────┤ 0 rows: lost the race, re-read and re-validate                 │
//! │       │                                                                 │
//! │       ▼ 1 row                                                           │
//! │  TransitionOutcome { request, event: Some(LifecycleEvent) }            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use medibridge_core::lifecycle::{apply_transition, update_quantity, validate_new_request};
use medibridge_core::validation::{validate_id, validate_search_query};
use medibridge_core::{LifecycleEvent, RequestStatus, StatusCounts, TransferRequest, ValidationError};
use medibridge_db::{DbError, NewRequest, RequestFilter};

use super::found;
use crate::engine::Engine;
use crate::error::EngineResult;

/// Each lost compare-and-set means the row moved one step along a
/// lifecycle that has at most this many states.
const MAX_CAS_ATTEMPTS: usize = RequestStatus::ALL.len();

/// Asks the responding dealer for `quantity` units of one of its batches.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRequest {
    pub requesting_dealer_id: i64,
    pub responding_dealer_id: i64,
    pub product_id: i64,
    pub quantity: i64,
}

/// Moves a request to a new status.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionRequest {
    pub id: i64,
    /// `PENDING`, `CONFIRMED`, `COMPLETED` or `REJECTED`, any case.
    pub status: String,
}

/// Changes the quantity of an open request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRequestQuantity {
    pub id: i64,
    pub quantity: i64,
}

/// Request listing filters, newest first.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListRequests {
    pub requesting_dealer_id: Option<i64>,
    pub responding_dealer_id: Option<i64>,
    /// Either side of the request.
    pub dealer_id: Option<i64>,
    pub product_id: Option<i64>,
    pub status: Option<String>,
    /// Matched against the status, e.g. `conf`.
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Result of a transition. `event` is `None` for a self-transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionOutcome {
    pub request: TransferRequest,
    pub event: Option<LifecycleEvent>,
}

impl Engine {
    pub async fn create_request(&self, cmd: CreateRequest) -> EngineResult<TransferRequest> {
        validate_new_request(
            cmd.requesting_dealer_id,
            cmd.responding_dealer_id,
            cmd.product_id,
            cmd.quantity,
        )?;

        let dealers = self.db().dealers();
        found(
            dealers.get(cmd.requesting_dealer_id).await?,
            "Dealer",
            cmd.requesting_dealer_id,
        )?;
        found(
            dealers.get(cmd.responding_dealer_id).await?,
            "Dealer",
            cmd.responding_dealer_id,
        )?;
        let batch = found(
            self.db().batches().get(cmd.product_id).await?,
            "ProductBatch",
            cmd.product_id,
        )?;
        if batch.dealer_id != cmd.responding_dealer_id {
            return Err(ValidationError::invalid(
                "productId",
                "batch does not belong to the responding dealer",
            )
            .into());
        }

        let new = NewRequest {
            requesting_dealer_id: cmd.requesting_dealer_id,
            responding_dealer_id: cmd.responding_dealer_id,
            product_id: cmd.product_id,
            quantity: cmd.quantity,
        };
        let request = self.db().requests().insert(&new, self.now()).await?;
        info!(
            request_id = request.id,
            from_dealer = request.requesting_dealer_id,
            to_dealer = request.responding_dealer_id,
            quantity = request.quantity,
            "Transfer request created"
        );
        Ok(request)
    }

    pub async fn get_request(&self, id: i64) -> EngineResult<TransferRequest> {
        validate_id("id", id)?;
        found(self.db().requests().get(id).await?, "TransferRequest", id)
    }

    /// Moves a request along the lifecycle.
    ///
    /// Requesting the current status succeeds without a write or event.
    pub async fn transition_request(&self, cmd: TransitionRequest) -> EngineResult<TransitionOutcome> {
        let to: RequestStatus = cmd.status.parse()?;

        for attempt in 1..=MAX_CAS_ATTEMPTS {
            let mut request = self.get_request(cmd.id).await?;
            let from = request.status;

            let Some(event) = apply_transition(&mut request, to, self.now())? else {
                return Ok(TransitionOutcome {
                    request,
                    event: None,
                });
            };

            match self.db().requests().update_status(&request, from).await? {
                Some(saved) => {
                    info!(
                        request_id = event.request_id,
                        from = %event.from,
                        to = %event.to,
                        at = %event.at,
                        "Request status changed"
                    );
                    return Ok(TransitionOutcome {
                        request: saved,
                        event: Some(event),
                    });
                }
                None => {
                    warn!(request_id = cmd.id, attempt, expected = %from, "Request changed concurrently, retrying");
                    tokio::task::yield_now().await;
                }
            }
        }

        Err(DbError::conflict("TransferRequest", cmd.id).into())
    }

    /// Changes the quantity of a request that is not yet closed.
    pub async fn update_request_quantity(&self, cmd: UpdateRequestQuantity) -> EngineResult<TransferRequest> {
        for attempt in 1..=MAX_CAS_ATTEMPTS {
            let mut request = self.get_request(cmd.id).await?;
            let status = request.status;

            update_quantity(&mut request, cmd.quantity, self.now())?;

            match self.db().requests().update_quantity(&request, status).await? {
                Some(saved) => return Ok(saved),
                None => {
                    warn!(request_id = cmd.id, attempt, expected = %status, "Request changed concurrently, retrying");
                    tokio::task::yield_now().await;
                }
            }
        }

        Err(DbError::conflict("TransferRequest", cmd.id).into())
    }

    pub async fn list_requests(&self, cmd: ListRequests) -> EngineResult<Vec<TransferRequest>> {
        let status = cmd
            .status
            .as_deref()
            .map(str::parse::<RequestStatus>)
            .transpose()?;

        let filter = RequestFilter {
            requesting_dealer_id: cmd.requesting_dealer_id,
            responding_dealer_id: cmd.responding_dealer_id,
            dealer_id: cmd.dealer_id,
            product_id: cmd.product_id,
            status,
            search: validate_search_query(cmd.search.as_deref())?,
            page: Some(self.page(cmd.limit, cmd.offset)),
        };
        Ok(self.db().requests().list(&filter).await?)
    }

    /// Requests per status, overall or for one dealer (either side).
    pub async fn request_status_counts(&self, dealer_id: Option<i64>) -> EngineResult<StatusCounts> {
        Ok(self.db().requests().status_counts(dealer_id).await?)
    }

    /// Deletes a request together with its invoice and payments.
    pub async fn delete_request(&self, id: i64) -> EngineResult<()> {
        validate_id("id", id)?;
        self.db().requests().delete(id).await?;
        info!(request_id = id, "Transfer request deleted");
        Ok(())
    }
}
