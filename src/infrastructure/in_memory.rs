use crate::domain::audit::{AuditEntry, OutcomeTag};
use crate::domain::invoice::{Customer, Invoice, InvoiceStatus};
use crate::domain::ports::LedgerRepository;
use crate::error::{BillingError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct LedgerState {
    invoices: BTreeMap<u32, Invoice>,
    customers: BTreeMap<u32, Customer>,
    audit: Vec<AuditEntry>,
}

/// A thread-safe in-memory ledger.
///
/// Uses `Arc<RwLock<..>>` so clones share the same state. Ideal for testing
/// or one-shot runs where persistence is not required.
#[derive(Default, Clone)]
pub struct InMemoryLedger {
    state: Arc<RwLock<LedgerState>>,
}

impl InMemoryLedger {
    /// Creates a new, empty in-memory ledger.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LedgerRepository for InMemoryLedger {
    async fn fetch_invoice(&self, id: u32) -> Result<Option<Invoice>> {
        let state = self.state.read().await;
        Ok(state.invoices.get(&id).cloned())
    }

    async fn fetch_invoices(&self) -> Result<Vec<Invoice>> {
        let state = self.state.read().await;
        Ok(state.invoices.values().cloned().collect())
    }

    async fn fetch_invoices_by_status(&self, status: InvoiceStatus) -> Result<Vec<Invoice>> {
        let state = self.state.read().await;
        Ok(state
            .invoices
            .values()
            .filter(|invoice| invoice.status == status)
            .cloned()
            .collect())
    }

    async fn create_invoice(&self, invoice: Invoice) -> Result<()> {
        let mut state = self.state.write().await;
        state.invoices.insert(invoice.id, invoice);
        Ok(())
    }

    async fn update_invoice_status(&self, id: u32, status: InvoiceStatus) -> Result<()> {
        let mut state = self.state.write().await;
        let invoice = state.invoices.get_mut(&id).ok_or(BillingError::NotFound {
            entity: "invoice",
            id,
        })?;
        invoice.status = status;
        Ok(())
    }

    async fn fetch_customer(&self, id: u32) -> Result<Option<Customer>> {
        let state = self.state.read().await;
        Ok(state.customers.get(&id).cloned())
    }

    async fn fetch_customers(&self) -> Result<Vec<Customer>> {
        let state = self.state.read().await;
        Ok(state.customers.values().cloned().collect())
    }

    async fn create_customer(&self, customer: Customer) -> Result<()> {
        let mut state = self.state.write().await;
        state.customers.insert(customer.id, customer);
        Ok(())
    }

    async fn create_audit_entry(
        &self,
        invoice_id: u32,
        tag: OutcomeTag,
        comment: Option<String>,
    ) -> Result<AuditEntry> {
        let mut state = self.state.write().await;
        let entry = AuditEntry {
            id: state.audit.len() as u64 + 1,
            invoice_id,
            tag,
            comment,
            timestamp: Utc::now(),
        };
        state.audit.push(entry.clone());
        Ok(entry)
    }

    async fn fetch_audit_entries(&self, invoice_id: u32) -> Result<Vec<AuditEntry>> {
        let state = self.state.read().await;
        Ok(state
            .audit
            .iter()
            .filter(|entry| entry.invoice_id == invoice_id)
            .cloned()
            .collect())
    }

    async fn count_audit_entries(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<(OutcomeTag, u64)>> {
        let state = self.state.read().await;
        let mut counts: HashMap<OutcomeTag, u64> = HashMap::new();
        for entry in state
            .audit
            .iter()
            .filter(|entry| entry.timestamp >= from && entry.timestamp <= to)
        {
            *counts.entry(entry.tag).or_insert(0) += 1;
        }
        Ok(counts.into_iter().collect())
    }
}
