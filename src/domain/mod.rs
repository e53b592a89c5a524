//! Domain model: invoices, customers, the audit trail and the ports the
//! billing engine talks to.

pub mod audit;
pub mod invoice;
pub mod money;
pub mod ports;
