use crate::domain::invoice::{Customer, Invoice, InvoiceStatus};
use crate::domain::money::{Currency, Money};
use crate::domain::ports::LedgerRepository;
use crate::error::{BillingError, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;
use tracing::{info, warn};

#[derive(Debug, Deserialize)]
struct CustomerRecord {
    id: u32,
    currency: Currency,
}

#[derive(Debug, Deserialize)]
struct InvoiceRecord {
    id: u32,
    customer: u32,
    amount: Decimal,
    currency: Currency,
    status: Option<InvoiceStatus>,
}

impl TryFrom<InvoiceRecord> for Invoice {
    type Error = BillingError;

    fn try_from(record: InvoiceRecord) -> Result<Self> {
        let amount = Money::new(record.amount, record.currency)?;
        Ok(Invoice::new(record.id, record.customer, amount)
            .with_status(record.status.unwrap_or(InvoiceStatus::Pending)))
    }
}

fn csv_reader<R: Read>(source: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(source)
}

/// Reads customers (`id,currency`) from a CSV source.
pub struct CustomerReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> CustomerReader<R> {
    pub fn new(source: R) -> Self {
        Self {
            reader: csv_reader(source),
        }
    }

    pub fn customers(self) -> impl Iterator<Item = Result<Customer>> {
        self.reader
            .into_deserialize()
            .map(|result: std::result::Result<CustomerRecord, csv::Error>| {
                let record = result?;
                Ok(Customer::new(record.id, record.currency))
            })
    }
}

/// Reads invoices (`id,customer,amount,currency,status`) from a CSV source.
///
/// An empty status column seeds the invoice as `pending`.
pub struct InvoiceReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> InvoiceReader<R> {
    pub fn new(source: R) -> Self {
        Self {
            reader: csv_reader(source),
        }
    }

    /// Lazily deserializes invoices; a bad row yields an error and the stream continues.
    pub fn invoices(self) -> impl Iterator<Item = Result<Invoice>> {
        self.reader
            .into_deserialize()
            .map(|result: std::result::Result<InvoiceRecord, csv::Error>| {
                Invoice::try_from(result?)
            })
    }
}

/// Inserts every readable customer and invoice into the ledger.
///
/// Malformed rows are logged and skipped. Returns the number of customers and
/// invoices stored.
pub async fn seed_ledger<C: Read, I: Read>(
    ledger: &dyn LedgerRepository,
    customers: Option<CustomerReader<C>>,
    invoices: Option<InvoiceReader<I>>,
) -> Result<(usize, usize)> {
    let mut stored_customers = 0;
    if let Some(reader) = customers {
        for (row, customer) in reader.customers().enumerate() {
            match customer {
                Ok(customer) => {
                    ledger.create_customer(customer).await?;
                    stored_customers += 1;
                }
                Err(e) => warn!(row = row + 1, error = %e, "Error reading customer"),
            }
        }
    }

    let mut stored_invoices = 0;
    if let Some(reader) = invoices {
        for (row, invoice) in reader.invoices().enumerate() {
            match invoice {
                Ok(invoice) => {
                    ledger.create_invoice(invoice).await?;
                    stored_invoices += 1;
                }
                Err(e) => warn!(row = row + 1, error = %e, "Error reading invoice"),
            }
        }
    }

    info!(
        customers = stored_customers,
        invoices = stored_invoices,
        "Ledger seeded"
    );
    Ok((stored_customers, stored_invoices))
}
