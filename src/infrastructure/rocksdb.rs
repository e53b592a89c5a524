use crate::domain::audit::{AuditEntry, OutcomeTag};
use crate::domain::invoice::{Customer, Invoice, InvoiceStatus};
use crate::domain::ports::LedgerRepository;
use crate::error::{BillingError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, IteratorMode, Options};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Column Family for storing invoices, keyed by invoice id.
pub const CF_INVOICES: &str = "invoices";
/// Column Family for storing customers, keyed by customer id.
pub const CF_CUSTOMERS: &str = "customers";
/// Column Family for the append-only audit trail, keyed by entry id.
pub const CF_AUDIT: &str = "audit";

/// A persistent ledger implementation using RocksDB.
///
/// Invoices, customers and audit entries live in separate Column Families and
/// are stored as JSON. Audit entry ids come from a sequence recovered from the
/// last key on open, so the trail keeps growing across restarts.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBLedger {
    db: Arc<DB>,
    audit_seq: Arc<AtomicU64>,
}

impl RocksDBLedger {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// # Arguments
    ///
    /// * `path` - The filesystem path where the database will be stored.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let descriptors = [CF_INVOICES, CF_CUSTOMERS, CF_AUDIT]
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect::<Vec<_>>();
        let db = DB::open_cf_descriptors(&opts, path, descriptors)?;

        let last_id = {
            let cf = db.cf_handle(CF_AUDIT).ok_or_else(|| missing_cf(CF_AUDIT))?;
            match db.iterator_cf(cf, IteratorMode::End).next() {
                Some(item) => decode_key(&item?.0)?,
                None => 0,
            }
        };

        Ok(Self {
            db: Arc::new(db),
            audit_seq: Arc::new(AtomicU64::new(last_id)),
        })
    }

    fn cf(&self, name: &'static str) -> Result<&ColumnFamily> {
        self.db.cf_handle(name).ok_or_else(|| missing_cf(name))
    }

    fn put<T: Serialize>(&self, name: &'static str, key: &[u8], value: &T) -> Result<()> {
        let bytes = serde_json::to_vec(value)?;
        self.db.put_cf(self.cf(name)?, key, bytes)?;
        Ok(())
    }

    fn get<T: DeserializeOwned>(&self, name: &'static str, key: &[u8]) -> Result<Option<T>> {
        match self.db.get_pinned_cf(self.cf(name)?, key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn scan<T: DeserializeOwned>(&self, name: &'static str) -> Result<Vec<T>> {
        let mut values = Vec::new();
        for item in self.db.iterator_cf(self.cf(name)?, IteratorMode::Start) {
            let (_key, value) = item?;
            values.push(serde_json::from_slice(&value)?);
        }
        Ok(values)
    }
}

fn missing_cf(name: &str) -> BillingError {
    BillingError::InternalError(Box::new(std::io::Error::other(format!(
        "{name} column family not found"
    ))))
}

fn decode_key(key: &[u8]) -> Result<u64> {
    let bytes: [u8; 8] = key.try_into().map_err(|_| {
        BillingError::InternalError(Box::new(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("Malformed audit key of {} bytes", key.len()),
        )))
    })?;
    Ok(u64::from_be_bytes(bytes))
}

#[async_trait]
impl LedgerRepository for RocksDBLedger {
    async fn fetch_invoice(&self, id: u32) -> Result<Option<Invoice>> {
        self.get(CF_INVOICES, &id.to_be_bytes())
    }

    async fn fetch_invoices(&self) -> Result<Vec<Invoice>> {
        self.scan(CF_INVOICES)
    }

    async fn fetch_invoices_by_status(&self, status: InvoiceStatus) -> Result<Vec<Invoice>> {
        let mut invoices: Vec<Invoice> = self.scan(CF_INVOICES)?;
        invoices.retain(|invoice| invoice.status == status);
        Ok(invoices)
    }

    async fn create_invoice(&self, invoice: Invoice) -> Result<()> {
        self.put(CF_INVOICES, &invoice.id.to_be_bytes(), &invoice)
    }

    async fn update_invoice_status(&self, id: u32, status: InvoiceStatus) -> Result<()> {
        let mut invoice: Invoice = self
            .get(CF_INVOICES, &id.to_be_bytes())?
            .ok_or(BillingError::NotFound {
                entity: "invoice",
                id,
            })?;
        invoice.status = status;
        self.put(CF_INVOICES, &id.to_be_bytes(), &invoice)
    }

    async fn fetch_customer(&self, id: u32) -> Result<Option<Customer>> {
        self.get(CF_CUSTOMERS, &id.to_be_bytes())
    }

    async fn fetch_customers(&self) -> Result<Vec<Customer>> {
        self.scan(CF_CUSTOMERS)
    }

    async fn create_customer(&self, customer: Customer) -> Result<()> {
        self.put(CF_CUSTOMERS, &customer.id.to_be_bytes(), &customer)
    }

    async fn create_audit_entry(
        &self,
        invoice_id: u32,
        tag: OutcomeTag,
        comment: Option<String>,
    ) -> Result<AuditEntry> {
        let id = self.audit_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let entry = AuditEntry {
            id,
            invoice_id,
            tag,
            comment,
            timestamp: Utc::now(),
        };
        self.put(CF_AUDIT, &id.to_be_bytes(), &entry)?;
        Ok(entry)
    }

    async fn fetch_audit_entries(&self, invoice_id: u32) -> Result<Vec<AuditEntry>> {
        let mut entries: Vec<AuditEntry> = self.scan(CF_AUDIT)?;
        entries.retain(|entry| entry.invoice_id == invoice_id);
        Ok(entries)
    }

    async fn count_audit_entries(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<(OutcomeTag, u64)>> {
        let mut counts: HashMap<OutcomeTag, u64> = HashMap::new();
        for entry in self.scan::<AuditEntry>(CF_AUDIT)? {
            if entry.timestamp >= from && entry.timestamp <= to {
                *counts.entry(entry.tag).or_insert(0) += 1;
            }
        }
        Ok(counts.into_iter().collect())
    }
}
