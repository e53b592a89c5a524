use thiserror::Error;

/// Crate-wide error for storage, seeding and front-door failures.
///
/// Settlement outcomes are never reported through this type: they are
/// classified per invoice and written to the audit trail instead.
#[derive(Error, Debug)]
pub enum BillingError {
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: u32 },
    #[cfg(feature = "storage-rocksdb")]
    #[error("Storage error: {0}")]
    StorageError(#[from] rocksdb::Error),
    #[error("Internal error: {0}")]
    InternalError(Box<dyn std::error::Error + Send + Sync>),
}

impl BillingError {
    /// Variant name, used as the failure kind in audit comments.
    pub fn kind(&self) -> &'static str {
        match self {
            BillingError::CsvError(_) => "CsvError",
            BillingError::IoError(_) => "IoError",
            BillingError::ValidationError(_) => "ValidationError",
            BillingError::SerializationError(_) => "SerializationError",
            BillingError::NotFound { .. } => "NotFound",
            #[cfg(feature = "storage-rocksdb")]
            BillingError::StorageError(_) => "StorageError",
            BillingError::InternalError(_) => "InternalError",
        }
    }
}

pub type Result<T> = std::result::Result<T, BillingError>;

/// Failure raised by a payment provider instead of a charge verdict.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChargeError {
    #[error("network failure while contacting the payment provider")]
    Network,
    #[error("customer {customer_id} is unknown to the payment provider")]
    CustomerNotFound { customer_id: u32 },
    #[error("currency of invoice {invoice_id} does not match customer {customer_id}")]
    CurrencyMismatch { invoice_id: u32, customer_id: u32 },
    /// Anything the provider could not classify. `kind` names the failure.
    #[error("{kind}: {message}")]
    Other { kind: String, message: String },
}

impl ChargeError {
    pub fn other(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Other {
            kind: kind.into(),
            message: message.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("delivery to customer {customer_id} failed: {reason}")]
    CustomerDelivery { customer_id: u32, reason: String },
    #[error("report delivery failed: {0}")]
    ReportDelivery(String),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ScheduleParseError {
    #[error("expected `monthly:<days>@HH:MM` or `every:<N>(s|m|h)`, got `{0}`")]
    UnknownFormat(String),
    #[error("invalid day of month `{0}`, expected 1-31")]
    InvalidDay(String),
    #[error("invalid time of day `{0}`, expected HH:MM")]
    InvalidTime(String),
    #[error("invalid interval `{0}`")]
    InvalidInterval(String),
}
