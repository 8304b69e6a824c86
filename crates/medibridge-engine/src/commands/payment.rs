//! # Payment Commands
//!
//! Payment ledger. A payment starts PENDING and only changes status when a
//! caller says so; nothing here settles an invoice automatically.

use serde::Deserialize;
use tracing::{info, warn};

use medibridge_core::validation::{
    validate_id, validate_payment_amount, validate_required, validate_search_query,
};
use medibridge_core::{Money, Payment, PaymentStatus};
use medibridge_db::{DbError, NewPayment, PaymentFilter};

use super::{found, MAX_WRITE_ATTEMPTS};
use crate::engine::Engine;
use crate::error::{EngineError, EngineResult};

/// Records a payment against an invoice.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordPayment {
    pub invoice_id: i64,
    pub amount: Money,
    pub payment_method: String,
    pub transaction_id: String,
}

/// Partial payment update.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePayment {
    pub id: i64,
    pub amount: Option<Money>,
    pub payment_method: Option<String>,
    /// `PENDING` or `COMPLETED`, any case.
    pub status: Option<String>,
}

/// Payment listing filters, newest first.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPayments {
    pub invoice_id: Option<i64>,
    pub status: Option<String>,
    /// Matched against transaction id and payment method.
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl Engine {
    pub async fn record_payment(&self, cmd: RecordPayment) -> EngineResult<Payment> {
        validate_id("invoiceId", cmd.invoice_id)?;
        validate_payment_amount(cmd.amount)?;
        let payment_method = validate_required("paymentMethod", &cmd.payment_method)?;
        let transaction_id = validate_required("transactionId", &cmd.transaction_id)?;

        found(
            self.db().invoices().get(cmd.invoice_id).await?,
            "Invoice",
            cmd.invoice_id,
        )?;

        let payments = self.db().payments();
        if payments.get_by_transaction(&transaction_id).await?.is_some() {
            return Err(EngineError::duplicate("transactionId", transaction_id));
        }

        let new = NewPayment {
            invoice_id: cmd.invoice_id,
            amount: cmd.amount,
            payment_method,
            transaction_id,
        };
        let payment = payments.insert(&new, self.now()).await?;
        info!(
            payment_id = payment.id,
            invoice_id = payment.invoice_id,
            amount = %payment.amount,
            "Payment recorded"
        );
        Ok(payment)
    }

    pub async fn get_payment(&self, id: i64) -> EngineResult<Payment> {
        validate_id("id", id)?;
        found(self.db().payments().get(id).await?, "Payment", id)
    }

    pub async fn get_payment_by_transaction(&self, transaction_id: &str) -> EngineResult<Payment> {
        let transaction_id = validate_required("transactionId", transaction_id)?;
        let payment = self.db().payments().get_by_transaction(&transaction_id).await?;
        found(payment, "Payment", transaction_id)
    }

    /// Applies a partial update, re-reading and re-applying it if another
    /// writer changes the payment first.
    pub async fn update_payment(&self, cmd: UpdatePayment) -> EngineResult<Payment> {
        validate_id("id", cmd.id)?;
        if let Some(amount) = cmd.amount {
            validate_payment_amount(amount)?;
        }
        let method = cmd
            .payment_method
            .as_deref()
            .map(|m| validate_required("paymentMethod", m))
            .transpose()?;
        let status = cmd
            .status
            .as_deref()
            .map(str::parse::<PaymentStatus>)
            .transpose()?;

        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let current = self.get_payment(cmd.id).await?;
            let mut payment = current.clone();

            if let Some(amount) = cmd.amount {
                payment.amount = amount;
            }
            if let Some(method) = &method {
                payment.payment_method = method.clone();
            }
            if let Some(status) = status {
                payment.status = status;
            }
            payment.updated_at = self.now();

            match self.db().payments().update(&payment, &current).await? {
                Some(saved) => {
                    if saved.status != current.status {
                        info!(payment_id = saved.id, from = %current.status, to = %saved.status, "Payment status changed");
                    }
                    return Ok(saved);
                }
                None => {
                    warn!(payment_id = cmd.id, attempt, "Payment changed concurrently, retrying");
                    tokio::task::yield_now().await;
                }
            }
        }

        Err(DbError::conflict("Payment", cmd.id).into())
    }

    pub async fn list_payments(&self, cmd: ListPayments) -> EngineResult<Vec<Payment>> {
        let status = cmd
            .status
            .as_deref()
            .map(str::parse::<PaymentStatus>)
            .transpose()?;

        let filter = PaymentFilter {
            invoice_id: cmd.invoice_id,
            status,
            search: validate_search_query(cmd.search.as_deref())?,
            page: Some(self.page(cmd.limit, cmd.offset)),
        };
        Ok(self.db().payments().list(&filter).await?)
    }

    /// Sum of COMPLETED payments against an invoice.
    pub async fn amount_paid(&self, invoice_id: i64) -> EngineResult<Money> {
        let invoice = self.get_invoice(invoice_id).await?;
        Ok(self.db().payments().amount_paid(invoice.id).await?)
    }

    pub async fn delete_payment(&self, id: i64) -> EngineResult<()> {
        validate_id("id", id)?;
        self.db().payments().delete(id).await?;
        info!(payment_id = id, "Payment deleted");
        Ok(())
    }
}
