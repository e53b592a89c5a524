use super::audit::{AuditEntry, BillingReport, OutcomeTag};
use super::invoice::{Customer, Invoice, InvoiceStatus};
use crate::error::{ChargeError, NotifyError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Storage for invoices, customers and the audit trail.
#[async_trait]
pub trait LedgerRepository: Send + Sync {
    async fn fetch_invoice(&self, id: u32) -> Result<Option<Invoice>>;
    async fn fetch_invoices(&self) -> Result<Vec<Invoice>>;
    async fn fetch_invoices_by_status(&self, status: InvoiceStatus) -> Result<Vec<Invoice>>;
    /// Inserts or replaces the invoice with the same id.
    async fn create_invoice(&self, invoice: Invoice) -> Result<()>;
    async fn update_invoice_status(&self, id: u32, status: InvoiceStatus) -> Result<()>;

    async fn fetch_customer(&self, id: u32) -> Result<Option<Customer>>;
    async fn fetch_customers(&self) -> Result<Vec<Customer>>;
    /// Inserts or replaces the customer with the same id.
    async fn create_customer(&self, customer: Customer) -> Result<()>;

    /// Appends an entry, stamping it with the current time.
    async fn create_audit_entry(
        &self,
        invoice_id: u32,
        tag: OutcomeTag,
        comment: Option<String>,
    ) -> Result<AuditEntry>;
    async fn fetch_audit_entries(&self, invoice_id: u32) -> Result<Vec<AuditEntry>>;
    /// Counts entries per tag with `from <= timestamp <= to`.
    async fn count_audit_entries(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<(OutcomeTag, u64)>>;
}

/// The external capability that settles an invoice.
///
/// `Ok(true)` means the charge went through, `Ok(false)` means the customer's
/// balance did not allow it.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    async fn charge(&self, invoice: &Invoice) -> std::result::Result<bool, ChargeError>;
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify_customer_declined(&self, customer_id: u32)
    -> std::result::Result<(), NotifyError>;
    async fn send_report(&self, report: &BillingReport) -> std::result::Result<(), NotifyError>;
}

pub type LedgerBox = Box<dyn LedgerRepository>;
pub type PaymentProviderBox = Box<dyn PaymentProvider>;
pub type NotifierBox = Box<dyn Notifier>;
