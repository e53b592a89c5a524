use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Classification of one invoice's outcome within a pass.
///
/// Every audit entry carries exactly one tag. `Overdue` is only produced by
/// the close pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum OutcomeTag {
    PaymentSuccessful,
    PaymentUnsuccessful,
    NetworkFailure,
    CustomerNotFound,
    CurrencyMismatch,
    UnclassifiedError,
    Overdue,
}

impl OutcomeTag {
    pub const ALL: [OutcomeTag; 7] = [
        OutcomeTag::PaymentSuccessful,
        OutcomeTag::PaymentUnsuccessful,
        OutcomeTag::NetworkFailure,
        OutcomeTag::CustomerNotFound,
        OutcomeTag::CurrencyMismatch,
        OutcomeTag::UnclassifiedError,
        OutcomeTag::Overdue,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeTag::PaymentSuccessful => "PaymentSuccessful",
            OutcomeTag::PaymentUnsuccessful => "PaymentUnsuccessful",
            OutcomeTag::NetworkFailure => "NetworkFailure",
            OutcomeTag::CustomerNotFound => "CustomerNotFound",
            OutcomeTag::CurrencyMismatch => "CurrencyMismatch",
            OutcomeTag::UnclassifiedError => "UnclassifiedError",
            OutcomeTag::Overdue => "Overdue",
        }
    }
}

impl fmt::Display for OutcomeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Append-only record of a single settlement or closure outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Assigned by the repository, increasing in write order.
    pub id: u64,
    pub invoice_id: u32,
    pub tag: OutcomeTag,
    pub comment: Option<String>,
    /// Assigned by the repository at write time.
    pub timestamp: DateTime<Utc>,
}

/// Per-tag counts of the audit entries written inside `[from, to]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BillingReport {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub counts: BTreeMap<OutcomeTag, u64>,
}

impl BillingReport {
    pub fn new(
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        counts: impl IntoIterator<Item = (OutcomeTag, u64)>,
    ) -> Self {
        let mut merged = BTreeMap::new();
        for (tag, count) in counts {
            if count > 0 {
                *merged.entry(tag).or_insert(0) += count;
            }
        }
        Self {
            from,
            to,
            counts: merged,
        }
    }

    pub fn count(&self, tag: OutcomeTag) -> u64 {
        self.counts.get(&tag).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}
