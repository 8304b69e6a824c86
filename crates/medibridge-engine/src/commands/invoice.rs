//! # Invoice Commands
//!
//! GST invoices for confirmed or completed transfer requests.
//!
//! ## Invoice Creation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  create_invoice({ requestId: 7, subtotal: "8500.00" })                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  request #7 exists? ─────────────────── NotFound                       │
//! │  status CONFIRMED or COMPLETED? ─────── ValidationError (requestId)    │
//! │  no invoice for #7 yet? ─────────────── Duplicate (requestId)          │
//! │  number free? (generated if absent) ─── Duplicate (invoiceNumber)      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  subtotal 8500.00   (default: dealer price × quantity)                 │
//! │  GST @ 18%  1530.00                                                    │
//! │  total     10030.00                                                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  seller = responding dealer, buyer = requesting dealer                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Deserialize;
use tracing::{info, warn};

use medibridge_core::invoice::{compute_tax, default_subtotal};
use medibridge_core::validation::{validate_id, validate_required, validate_search_query};
use medibridge_core::{Invoice, InvoiceTotals, Money, RequestStatus, ValidationError};
use medibridge_db::{generate_invoice_number, DbError, InvoiceFilter, NewInvoice};

use super::{found, MAX_WRITE_ATTEMPTS};
use crate::engine::Engine;
use crate::error::{EngineError, EngineResult};

/// Issues the invoice for a request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInvoice {
    pub request_id: i64,
    /// Generated as `INV-YYYYMMDD-XXXXXXXX` when absent.
    pub invoice_number: Option<String>,
    /// Defaults to the batch's dealer price × requested quantity.
    pub subtotal: Option<Money>,
}

/// Renumbers an invoice or changes its subtotal.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateInvoice {
    pub id: i64,
    pub invoice_number: Option<String>,
    /// GST and total are recomputed when this is set.
    pub subtotal: Option<Money>,
}

/// Invoice listing filters, newest first.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListInvoices {
    /// Seller.
    pub dealer_id: Option<i64>,
    pub buyer_dealer_id: Option<i64>,
    pub request_id: Option<i64>,
    /// Matched against the invoice number.
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl Engine {
    pub async fn create_invoice(&self, cmd: CreateInvoice) -> EngineResult<Invoice> {
        validate_id("requestId", cmd.request_id)?;
        let invoice_number = match cmd.invoice_number.as_deref() {
            Some(number) => validate_required("invoiceNumber", number)?,
            None => generate_invoice_number(self.now()),
        };

        let request = found(
            self.db().requests().get(cmd.request_id).await?,
            "TransferRequest",
            cmd.request_id,
        )?;
        if !matches!(request.status, RequestStatus::Confirmed | RequestStatus::Completed) {
            return Err(ValidationError::invalid(
                "requestId",
                format!(
                    "request is {}; only CONFIRMED or COMPLETED requests can be invoiced",
                    request.status
                ),
            )
            .into());
        }

        let invoices = self.db().invoices();
        if invoices.get_by_request(request.id).await?.is_some() {
            return Err(EngineError::duplicate("requestId", request.id.to_string()));
        }
        if invoices.get_by_number(&invoice_number).await?.is_some() {
            return Err(EngineError::duplicate("invoiceNumber", invoice_number));
        }

        let subtotal = match cmd.subtotal {
            Some(subtotal) => subtotal,
            None => {
                let batch = found(
                    self.db().batches().get(request.product_id).await?,
                    "ProductBatch",
                    request.product_id,
                )?;
                default_subtotal(batch.dealer_price, request.quantity)?
            }
        };
        let amounts = compute_tax(subtotal)?;

        let new = NewInvoice {
            request_id: request.id,
            invoice_number,
            dealer_id: request.responding_dealer_id,
            buyer_dealer_id: request.requesting_dealer_id,
            amounts,
        };
        let invoice = invoices.insert(&new, self.now()).await?;
        info!(
            invoice_id = invoice.id,
            invoice_number = %invoice.invoice_number,
            request_id = invoice.request_id,
            total = %invoice.total,
            "Invoice created"
        );
        Ok(invoice)
    }

    pub async fn get_invoice(&self, id: i64) -> EngineResult<Invoice> {
        validate_id("id", id)?;
        found(self.db().invoices().get(id).await?, "Invoice", id)
    }

    pub async fn get_invoice_by_number(&self, invoice_number: &str) -> EngineResult<Invoice> {
        let number = validate_required("invoiceNumber", invoice_number)?;
        let invoice = self.db().invoices().get_by_number(&number).await?;
        found(invoice, "Invoice", number)
    }

    /// The invoice issued for a request.
    pub async fn get_invoice_by_request(&self, request_id: i64) -> EngineResult<Invoice> {
        validate_id("requestId", request_id)?;
        let invoice = self.db().invoices().get_by_request(request_id).await?;
        found(invoice, "Invoice", format!("request {}", request_id))
    }

    /// Renumbers an invoice and/or recomputes its amounts.
    ///
    /// The edit is re-applied to a fresh read whenever a concurrent update
    /// lands between the read and the write.
    pub async fn update_invoice(&self, cmd: UpdateInvoice) -> EngineResult<Invoice> {
        validate_id("id", cmd.id)?;
        let number = cmd
            .invoice_number
            .as_deref()
            .map(|n| validate_required("invoiceNumber", n))
            .transpose()?;
        let amounts = cmd.subtotal.map(compute_tax).transpose()?;

        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let current = self.get_invoice(cmd.id).await?;
            let mut invoice = current.clone();

            if let Some(number) = &number {
                if *number != invoice.invoice_number {
                    let taken = self.db().invoices().get_by_number(number).await?;
                    if taken.is_some_and(|other| other.id != invoice.id) {
                        return Err(EngineError::duplicate("invoiceNumber", number.clone()));
                    }
                    invoice.invoice_number = number.clone();
                }
            }
            if let Some(amounts) = &amounts {
                invoice.subtotal = amounts.subtotal;
                invoice.gst_amount = amounts.gst_amount;
                invoice.total = amounts.total;
            }
            invoice.updated_at = self.now();

            match self.db().invoices().update(&invoice, &current).await? {
                Some(saved) => return Ok(saved),
                None => {
                    warn!(invoice_id = cmd.id, attempt, "Invoice changed concurrently, retrying");
                    tokio::task::yield_now().await;
                }
            }
        }

        Err(DbError::conflict("Invoice", cmd.id).into())
    }

    pub async fn list_invoices(&self, cmd: ListInvoices) -> EngineResult<Vec<Invoice>> {
        let filter = InvoiceFilter {
            dealer_id: cmd.dealer_id,
            buyer_dealer_id: cmd.buyer_dealer_id,
            request_id: cmd.request_id,
            search: validate_search_query(cmd.search.as_deref())?,
            page: Some(self.page(cmd.limit, cmd.offset)),
        };
        Ok(self.db().invoices().list(&filter).await?)
    }

    /// Revenue and GST, overall or for one seller.
    pub async fn invoice_totals(&self, dealer_id: Option<i64>) -> EngineResult<InvoiceTotals> {
        Ok(self.db().invoices().totals(dealer_id).await?)
    }

    /// Deletes an invoice and its payments.
    pub async fn delete_invoice(&self, id: i64) -> EngineResult<()> {
        validate_id("id", id)?;
        self.db().invoices().delete(id).await?;
        info!(invoice_id = id, "Invoice deleted");
        Ok(())
    }
}
