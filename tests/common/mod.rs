#![allow(dead_code)]

use async_trait::async_trait;
use billrun::domain::audit::{AuditEntry, BillingReport, OutcomeTag};
use billrun::domain::invoice::{Customer, Invoice, InvoiceStatus};
use billrun::domain::money::{Currency, Money};
use billrun::domain::ports::{LedgerRepository, Notifier, PaymentProvider};
use billrun::error::{BillingError, ChargeError, NotifyError, Result};
use billrun::infrastructure::in_memory::InMemoryLedger;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

/// Payment provider whose verdict per invoice id is fixed up front.
#[derive(Clone, Default)]
pub struct ScriptedPaymentProvider {
    script: Arc<HashMap<u32, std::result::Result<bool, ChargeError>>>,
    charged: Arc<Mutex<Vec<u32>>>,
}

impl ScriptedPaymentProvider {
    pub fn new(script: HashMap<u32, std::result::Result<bool, ChargeError>>) -> Self {
        Self {
            script: Arc::new(script),
            charged: Arc::default(),
        }
    }

    pub fn charged(&self) -> Vec<u32> {
        self.charged.lock().unwrap().clone()
    }
}

#[async_trait]
impl PaymentProvider for ScriptedPaymentProvider {
    async fn charge(&self, invoice: &Invoice) -> std::result::Result<bool, ChargeError> {
        self.charged.lock().unwrap().push(invoice.id);
        self.script
            .get(&invoice.id)
            .cloned()
            .unwrap_or_else(|| Err(ChargeError::other("Unscripted", "no verdict for invoice")))
    }
}

/// Notifier that records what it was asked to send.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    unreachable_customers: Arc<HashSet<u32>>,
    fail_reports: bool,
    notices: Arc<Mutex<Vec<u32>>>,
    reports: Arc<Mutex<Vec<BillingReport>>>,
}

impl RecordingNotifier {
    pub fn new(unreachable_customers: impl IntoIterator<Item = u32>) -> Self {
        Self {
            unreachable_customers: Arc::new(unreachable_customers.into_iter().collect()),
            ..Self::default()
        }
    }

    pub fn failing_reports(mut self) -> Self {
        self.fail_reports = true;
        self
    }

    pub fn notices(&self) -> Vec<u32> {
        self.notices.lock().unwrap().clone()
    }

    pub fn reports(&self) -> Vec<BillingReport> {
        self.reports.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify_customer_declined(
        &self,
        customer_id: u32,
    ) -> std::result::Result<(), NotifyError> {
        self.notices.lock().unwrap().push(customer_id);
        if self.unreachable_customers.contains(&customer_id) {
            Err(NotifyError::CustomerDelivery {
                customer_id,
                reason: "bounced".to_string(),
            })
        } else {
            Ok(())
        }
    }

    async fn send_report(&self, report: &BillingReport) -> std::result::Result<(), NotifyError> {
        self.reports.lock().unwrap().push(report.clone());
        if self.fail_reports {
            Err(NotifyError::ReportDelivery("relay refused".to_string()))
        } else {
            Ok(())
        }
    }
}

/// Ledger that refuses writes for selected invoices.
#[derive(Clone)]
pub struct FlakyLedger {
    inner: InMemoryLedger,
    broken_audit: Arc<HashSet<u32>>,
    broken_status: Arc<HashSet<u32>>,
    audit_failures_left: Arc<Mutex<HashMap<u32, usize>>>,
}

fn locked(what: &str) -> BillingError {
    BillingError::InternalError(Box::new(std::io::Error::other(format!("{what} locked"))))
}

impl FlakyLedger {
    /// Audit writes for `broken_audit` invoices always fail.
    pub fn new(inner: InMemoryLedger, broken_audit: impl IntoIterator<Item = u32>) -> Self {
        Self {
            inner,
            broken_audit: Arc::new(broken_audit.into_iter().collect()),
            broken_status: Arc::default(),
            audit_failures_left: Arc::default(),
        }
    }

    /// Status updates for these invoices always fail.
    pub fn with_broken_status(mut self, ids: impl IntoIterator<Item = u32>) -> Self {
        self.broken_status = Arc::new(ids.into_iter().collect());
        self
    }

    /// The first audit write for each of these invoices fails.
    pub fn with_one_audit_failure(self, ids: impl IntoIterator<Item = u32>) -> Self {
        self.audit_failures_left
            .lock()
            .unwrap()
            .extend(ids.into_iter().map(|id| (id, 1)));
        self
    }
}

#[async_trait]
impl LedgerRepository for FlakyLedger {
    async fn fetch_invoice(&self, id: u32) -> Result<Option<Invoice>> {
        self.inner.fetch_invoice(id).await
    }

    async fn fetch_invoices(&self) -> Result<Vec<Invoice>> {
        self.inner.fetch_invoices().await
    }

    async fn fetch_invoices_by_status(&self, status: InvoiceStatus) -> Result<Vec<Invoice>> {
        self.inner.fetch_invoices_by_status(status).await
    }

    async fn create_invoice(&self, invoice: Invoice) -> Result<()> {
        self.inner.create_invoice(invoice).await
    }

    async fn update_invoice_status(&self, id: u32, status: InvoiceStatus) -> Result<()> {
        if self.broken_status.contains(&id) {
            return Err(locked("invoice table"));
        }
        self.inner.update_invoice_status(id, status).await
    }

    async fn fetch_customer(&self, id: u32) -> Result<Option<Customer>> {
        self.inner.fetch_customer(id).await
    }

    async fn fetch_customers(&self) -> Result<Vec<Customer>> {
        self.inner.fetch_customers().await
    }

    async fn create_customer(&self, customer: Customer) -> Result<()> {
        self.inner.create_customer(customer).await
    }

    async fn create_audit_entry(
        &self,
        invoice_id: u32,
        tag: OutcomeTag,
        comment: Option<String>,
    ) -> Result<AuditEntry> {
        if self.broken_audit.contains(&invoice_id) {
            return Err(locked("audit table"));
        }
        if let Some(left) = self.audit_failures_left.lock().unwrap().get_mut(&invoice_id) {
            if *left > 0 {
                *left -= 1;
                return Err(locked("audit table"));
            }
        }
        self.inner.create_audit_entry(invoice_id, tag, comment).await
    }

    async fn fetch_audit_entries(&self, invoice_id: u32) -> Result<Vec<AuditEntry>> {
        self.inner.fetch_audit_entries(invoice_id).await
    }

    async fn count_audit_entries(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<(OutcomeTag, u64)>> {
        self.inner.count_audit_entries(from, to).await
    }
}

/// Eleven pending invoices, one customer each (same id), all in EUR.
///
/// Customer 8 is missing from the ledger and customer 10 prefers USD.
pub async fn eleven_invoice_ledger() -> InMemoryLedger {
    let ledger = InMemoryLedger::new();
    for id in 1..=11u32 {
        if id != 8 {
            let currency = if id == 10 { Currency::Usd } else { Currency::Eur };
            ledger
                .create_customer(Customer::new(id, currency))
                .await
                .unwrap();
        }
        let amount = Money::new(Decimal::from(id), Currency::Eur).unwrap();
        ledger
            .create_invoice(Invoice::new(id, id, amount))
            .await
            .unwrap();
    }
    ledger
}

/// Verdicts for the eleven-invoice scenario.
pub fn eleven_invoice_script() -> HashMap<u32, std::result::Result<bool, ChargeError>> {
    (1..=11u32)
        .map(|id| {
            let verdict = match id {
                1 | 2 => Ok(true),
                3 | 4 => Ok(false),
                5 | 6 => Err(ChargeError::Network),
                7 | 8 => Err(ChargeError::CustomerNotFound { customer_id: id }),
                9 | 10 => Err(ChargeError::CurrencyMismatch {
                    invoice_id: id,
                    customer_id: id,
                }),
                _ => Err(ChargeError::other("IllegalState", "Unknown error")),
            };
            (id, verdict)
        })
        .collect()
}
