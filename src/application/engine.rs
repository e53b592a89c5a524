use crate::domain::audit::{BillingReport, OutcomeTag};
use crate::domain::invoice::{Customer, Invoice, InvoiceStatus};
use crate::domain::ports::{LedgerBox, NotifierBox, PaymentProviderBox};
use crate::error::{BillingError, ChargeError, Result};
use chrono::{DateTime, Utc};
use futures_util::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

const EMAIL_SENT: &str = "Email sent";
const EMAIL_NOT_SENT: &str = "Email not send";
const CUSTOMER_FOUND: &str = "Customer found in database";
const CUSTOMER_NOT_FOUND: &str = "Customer not found in database";

/// What a single charge attempt amounted to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settlement {
    Paid,
    Declined,
    NetworkFailure,
    CustomerNotFound,
    CurrencyMismatch,
    Unclassified { kind: String, message: String },
}

impl Settlement {
    pub fn classify(result: std::result::Result<bool, ChargeError>) -> Self {
        match result {
            Ok(true) => Settlement::Paid,
            Ok(false) => Settlement::Declined,
            Err(ChargeError::Network) => Settlement::NetworkFailure,
            Err(ChargeError::CustomerNotFound { .. }) => Settlement::CustomerNotFound,
            Err(ChargeError::CurrencyMismatch { .. }) => Settlement::CurrencyMismatch,
            Err(ChargeError::Other { kind, message }) => Settlement::Unclassified { kind, message },
        }
    }

    pub fn tag(&self) -> OutcomeTag {
        match self {
            Settlement::Paid => OutcomeTag::PaymentSuccessful,
            Settlement::Declined => OutcomeTag::PaymentUnsuccessful,
            Settlement::NetworkFailure => OutcomeTag::NetworkFailure,
            Settlement::CustomerNotFound => OutcomeTag::CustomerNotFound,
            Settlement::CurrencyMismatch => OutcomeTag::CurrencyMismatch,
            Settlement::Unclassified { .. } => OutcomeTag::UnclassifiedError,
        }
    }

    /// The status the invoice moves to, or `None` when it stays retry-eligible.
    pub fn transition(&self) -> Option<InvoiceStatus> {
        match self {
            Settlement::Paid => Some(InvoiceStatus::Paid),
            Settlement::Declined | Settlement::NetworkFailure => None,
            Settlement::CustomerNotFound
            | Settlement::CurrencyMismatch
            | Settlement::Unclassified { .. } => Some(InvoiceStatus::Failed),
        }
    }
}

/// Runs billing passes over the ledger.
///
/// Both passes hold `pass_lock` for their whole duration, so a pass requested
/// while another one is in flight waits for it. This keeps a `Pending`
/// invoice from being charged by two passes at once.
pub struct BillingEngine {
    ledger: LedgerBox,
    payments: PaymentProviderBox,
    notifier: NotifierBox,
    pass_lock: Mutex<()>,
}

impl BillingEngine {
    /// Creates a new `BillingEngine` instance.
    ///
    /// # Arguments
    ///
    /// * `ledger` - Where invoices, customers and audit entries live.
    /// * `payments` - The capability used to settle invoices.
    /// * `notifier` - Delivers customer notices and billing reports.
    pub fn new(ledger: LedgerBox, payments: PaymentProviderBox, notifier: NotifierBox) -> Self {
        Self {
            ledger,
            payments,
            notifier,
            pass_lock: Mutex::new(()),
        }
    }

    pub fn ledger(&self) -> &LedgerBox {
        &self.ledger
    }

    /// Attempts to settle every `Pending` invoice, then reports on the pass.
    ///
    /// A provider panic is recorded as an `UnclassifiedError` outcome. When an
    /// outcome cannot be recorded, the invoice falls back to `Failed` with an
    /// `UnclassifiedError` entry; if even that write fails it is logged and the
    /// pass moves on. Only failing to fetch the candidates or to count the
    /// audit trail fails the call.
    pub async fn process_pending_invoices(&self) -> Result<BillingReport> {
        let _pass = self.acquire_pass("process").await;
        let start = Utc::now();

        let invoices = self
            .ledger
            .fetch_invoices_by_status(InvoiceStatus::Pending)
            .await?;
        info!(count = invoices.len(), "Settling pending invoices");

        let mut failed = 0usize;
        for invoice in &invoices {
            if let Err(e) = self.settle(invoice).await {
                failed += 1;
                error!(invoice_id = invoice.id, error = %e, "Error processing invoice");
            }
        }
        if failed > 0 {
            warn!(failed, "Settlement pass finished with unrecorded invoices");
        }

        self.send_billing_report(start, Utc::now()).await
    }

    /// Writes off every invoice still `Pending` as `Overdue` without charging it.
    pub async fn close_pending_invoices(&self) -> Result<BillingReport> {
        let _pass = self.acquire_pass("close").await;
        let start = Utc::now();

        let invoices = self
            .ledger
            .fetch_invoices_by_status(InvoiceStatus::Pending)
            .await?;
        info!(count = invoices.len(), "Closing pending invoices");

        for invoice in &invoices {
            if let Err(e) = self.close(invoice).await {
                error!(invoice_id = invoice.id, error = %e, "Error closing invoice");
            }
        }

        self.send_billing_report(start, Utc::now()).await
    }

    /// Counts the audit entries written in `[from, to]` per tag and hands the
    /// result to the notifier. A notifier failure is logged, never returned.
    pub async fn send_billing_report(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<BillingReport> {
        if from > to {
            return Err(BillingError::ValidationError(format!(
                "Report window starts after it ends ({from} > {to})"
            )));
        }

        let counts = self.ledger.count_audit_entries(from, to).await?;
        let report = BillingReport::new(from, to, counts);
        info!(total = report.total(), %from, %to, "Billing report computed");

        if let Err(e) = self.notifier.send_report(&report).await {
            error!(error = %e, "Error sending billing report");
        }
        Ok(report)
    }

    async fn acquire_pass(&self, name: &'static str) -> tokio::sync::MutexGuard<'_, ()> {
        match self.pass_lock.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                info!(pass = name, "Another pass is in flight, waiting for it");
                self.pass_lock.lock().await
            }
        }
    }

    async fn settle(&self, invoice: &Invoice) -> Result<()> {
        let result = AssertUnwindSafe(self.payments.charge(invoice))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| {
                Err(ChargeError::other("Panic", panic_message(panic.as_ref())))
            });
        let settlement = Settlement::classify(result);
        debug!(invoice_id = invoice.id, tag = %settlement.tag(), "Charge attempted");

        match self.record_settlement(invoice, &settlement).await {
            Ok(()) => Ok(()),
            Err(e) => self.record_unclassified(invoice, e).await,
        }
    }

    async fn record_settlement(&self, invoice: &Invoice, settlement: &Settlement) -> Result<()> {
        if let Some(status) = settlement.transition() {
            self.ledger.update_invoice_status(invoice.id, status).await?;
        }

        let comment = match settlement {
            Settlement::Paid | Settlement::NetworkFailure => None,
            Settlement::Declined => Some(self.notify_declined(invoice).await),
            Settlement::CustomerNotFound => {
                let comment = match self.lookup_customer(invoice).await {
                    Some(_) => CUSTOMER_FOUND,
                    None => CUSTOMER_NOT_FOUND,
                };
                Some(comment.to_string())
            }
            Settlement::CurrencyMismatch => Some(match self.lookup_customer(invoice).await {
                Some(customer) => {
                    format!("Customer currency in database is {}", customer.currency)
                }
                None => CUSTOMER_NOT_FOUND.to_string(),
            }),
            Settlement::Unclassified { kind, message } => Some(format!("{kind}: {message}")),
        };

        self.ledger
            .create_audit_entry(invoice.id, settlement.tag(), comment)
            .await?;
        Ok(())
    }

    async fn close(&self, invoice: &Invoice) -> Result<()> {
        let closed = async {
            self.ledger
                .update_invoice_status(invoice.id, InvoiceStatus::Failed)
                .await?;
            self.ledger
                .create_audit_entry(invoice.id, OutcomeTag::Overdue, None)
                .await?;
            Ok::<_, BillingError>(())
        };
        match closed.await {
            Ok(()) => Ok(()),
            Err(e) => self.record_unclassified(invoice, e).await,
        }
    }

    /// Falls back to `Failed` plus an `UnclassifiedError` entry after the
    /// regular outcome could not be recorded.
    ///
    /// An invoice that already reached a terminal status keeps it. The error is
    /// only returned when the fallback entry cannot be written either.
    async fn record_unclassified(&self, invoice: &Invoice, cause: BillingError) -> Result<()> {
        warn!(
            invoice_id = invoice.id,
            error = %cause,
            "Recording outcome failed, marking unclassified"
        );

        let terminal = matches!(
            self.ledger.fetch_invoice(invoice.id).await,
            Ok(Some(current)) if current.status.is_terminal()
        );
        if !terminal {
            if let Err(e) = self
                .ledger
                .update_invoice_status(invoice.id, InvoiceStatus::Failed)
                .await
            {
                error!(invoice_id = invoice.id, error = %e, "Error marking invoice failed");
            }
        }

        self.ledger
            .create_audit_entry(
                invoice.id,
                OutcomeTag::UnclassifiedError,
                Some(format!("{}: {}", cause.kind(), cause)),
            )
            .await?;
        Ok(())
    }

    async fn notify_declined(&self, invoice: &Invoice) -> String {
        match self
            .notifier
            .notify_customer_declined(invoice.customer_id)
            .await
        {
            Ok(()) => EMAIL_SENT.to_string(),
            Err(e) => {
                warn!(
                    invoice_id = invoice.id,
                    customer_id = invoice.customer_id,
                    error = %e,
                    "Error sending payment unsuccessful notice"
                );
                EMAIL_NOT_SENT.to_string()
            }
        }
    }

    /// Lookup errors are treated as an absent customer; the comment is informational.
    async fn lookup_customer(&self, invoice: &Invoice) -> Option<Customer> {
        match self.ledger.fetch_customer(invoice.customer_id).await {
            Ok(customer) => customer,
            Err(e) => {
                warn!(customer_id = invoice.customer_id, error = %e, "Customer lookup failed");
                None
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "payment provider panicked".to_string()
    }
}
