use super::money::{Currency, Money};
use crate::error::BillingError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle of an invoice.
///
/// `Paid` and `Failed` are terminal: nothing in the billing engine moves an
/// invoice out of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum InvoiceStatus {
    Pending,
    Paid,
    Failed,
}

impl InvoiceStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, InvoiceStatus::Pending)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Pending => "pending",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InvoiceStatus {
    type Err = BillingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(InvoiceStatus::Pending),
            "paid" => Ok(InvoiceStatus::Paid),
            "failed" => Ok(InvoiceStatus::Failed),
            other => Err(BillingError::ValidationError(format!(
                "Unknown invoice status: {other}"
            ))),
        }
    }
}

impl TryFrom<String> for InvoiceStatus {
    type Error = BillingError;

    fn try_from(status: String) -> Result<Self, Self::Error> {
        status.parse()
    }
}

/// An amount owed by a customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: u32,
    pub customer_id: u32,
    pub amount: Money,
    pub status: InvoiceStatus,
}

impl Invoice {
    pub fn new(id: u32, customer_id: u32, amount: Money) -> Self {
        Self {
            id,
            customer_id,
            amount,
            status: InvoiceStatus::Pending,
        }
    }

    pub fn with_status(mut self, status: InvoiceStatus) -> Self {
        self.status = status;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: u32,
    pub currency: Currency,
}

impl Customer {
    pub fn new(id: u32, currency: Currency) -> Self {
        Self { id, currency }
    }
}
