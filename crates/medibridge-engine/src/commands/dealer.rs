//! # Dealer Commands
//!
//! Dealer registry: registration, lookup, contact updates and deletion.
//!
//! ## Registration Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  create_dealer(cmd)                                                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  every field required (trimmed) ── ValidationError { field }           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  GST / license lookup (advisory) ── Duplicate { field, value }         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  INSERT ── UNIQUE constraint ────── Duplicate (concurrent loser)       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Deserialize;
use tracing::{debug, info};

use medibridge_core::validation::{validate_id, validate_required, validate_search_query};
use medibridge_core::{Dealer, ValidationError};
use medibridge_db::{DealerFilter, NewDealer};

use super::found;
use crate::engine::Engine;
use crate::error::{EngineError, EngineResult};

/// Registers a dealer.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDealer {
    pub user_id: String,
    pub business_name: String,
    pub gst_number: String,
    pub address: String,
    pub phone: String,
    pub license_number: String,
}

/// Changes contact details. Identity fields cannot be changed.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDealer {
    pub id: i64,
    pub business_name: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
}

/// Lists dealers, newest first.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListDealers {
    /// Matched against business name, GST number and phone.
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl Engine {
    pub async fn create_dealer(&self, cmd: CreateDealer) -> EngineResult<Dealer> {
        let new = NewDealer {
            user_id: validate_required("userId", &cmd.user_id)?,
            business_name: validate_required("businessName", &cmd.business_name)?,
            gst_number: validate_required("gstNumber", &cmd.gst_number)?,
            address: validate_required("address", &cmd.address)?,
            phone: validate_required("phone", &cmd.phone)?,
            license_number: validate_required("licenseNumber", &cmd.license_number)?,
        };

        let repo = self.db().dealers();
        if repo.get_by_gst(&new.gst_number).await?.is_some() {
            return Err(EngineError::duplicate("gstNumber", new.gst_number));
        }
        if repo.get_by_license(&new.license_number).await?.is_some() {
            return Err(EngineError::duplicate("licenseNumber", new.license_number));
        }

        let dealer = repo.insert(&new, self.now()).await?;
        info!(dealer_id = dealer.id, gst_number = %dealer.gst_number, "Dealer registered");
        Ok(dealer)
    }

    pub async fn get_dealer(&self, id: i64) -> EngineResult<Dealer> {
        validate_id("id", id)?;
        found(self.db().dealers().get(id).await?, "Dealer", id)
    }

    /// Looks up the dealer owned by a user account.
    pub async fn get_dealer_by_user(&self, user_id: &str) -> EngineResult<Dealer> {
        let user_id = validate_required("userId", user_id)?;
        let dealer = self.db().dealers().get_by_user(&user_id).await?;
        found(dealer, "Dealer", user_id)
    }

    pub async fn list_dealers(&self, cmd: ListDealers) -> EngineResult<Vec<Dealer>> {
        let filter = DealerFilter {
            search: validate_search_query(cmd.search.as_deref())?,
            page: Some(self.page(cmd.limit, cmd.offset)),
        };
        Ok(self.db().dealers().list(&filter).await?)
    }

    pub async fn update_dealer(&self, cmd: UpdateDealer) -> EngineResult<Dealer> {
        let mut dealer = self.get_dealer(cmd.id).await?;

        if let Some(name) = &cmd.business_name {
            dealer.business_name = validate_required("businessName", name)?;
        }
        if let Some(address) = &cmd.address {
            dealer.address = validate_required("address", address)?;
        }
        if let Some(phone) = &cmd.phone {
            dealer.phone = validate_required("phone", phone)?;
        }
        dealer.updated_at = self.now();

        Ok(self.db().dealers().update_contact(&dealer).await?)
    }

    /// Deletes a dealer nobody trades with.
    ///
    /// Refused while any transfer request or invoice names the dealer. The
    /// check runs inside the DELETE itself; the counts are only read back to
    /// explain a refusal.
    pub async fn delete_dealer(&self, id: i64) -> EngineResult<()> {
        validate_id("id", id)?;

        if self.db().dealers().delete_unreferenced(id).await? {
            info!(dealer_id = id, "Dealer deleted");
            return Ok(());
        }

        let dealer = self.get_dealer(id).await?;
        let (requests, invoices) = self.db().dealers().reference_counts(dealer.id).await?;
        debug!(dealer_id = id, requests, invoices, "Dealer delete refused");
        Err(ValidationError::invalid(
            "dealerId",
            format!(
                "dealer is referenced by {} transfer request(s) and {} invoice(s)",
                requests, invoices
            ),
        )
        .into())
    }
}
