//! Application layer containing the billing orchestration.
//!
//! `BillingEngine` runs settlement and close-out passes over the ledger;
//! `RecurringTrigger` fires those passes on schedules or on demand.

pub mod engine;
pub mod scheduler;
