//! # Engine Commands
//!
//! Each submodule adds command methods to [`Engine`](crate::Engine) for one
//! aggregate, plus the typed command structs those methods take.
//!
//! ## Command Categories
//! - **dealer**: registry (create, lookup, contact updates, guarded delete)
//! - **inventory**: product batches, FIFO listing, stock adjustment, expiry alerts
//! - **request**: transfer request lifecycle
//! - **invoice**: GST invoices for confirmed requests
//! - **payment**: payment ledger
//!
//! Command structs deserialize from camelCase JSON. Validation happens once,
//! at the top of each command method.

pub mod dealer;
pub mod inventory;
pub mod invoice;
pub mod payment;
pub mod request;

use crate::error::{EngineError, EngineResult};

/// Times an invoice or payment edit is re-applied after losing a
/// compare-and-set to another writer.
pub(crate) const MAX_WRITE_ATTEMPTS: usize = 8;

/// Turns an `Option` lookup into a `NotFound` error.
pub(crate) fn found<T>(value: Option<T>, entity: &str, id: impl ToString) -> EngineResult<T> {
    value.ok_or_else(|| EngineError::not_found(entity, id))
}
