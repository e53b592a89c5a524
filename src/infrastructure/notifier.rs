use crate::domain::audit::{BillingReport, OutcomeTag};
use crate::domain::ports::Notifier;
use crate::error::NotifyError;
use async_trait::async_trait;
use tracing::info;

/// Delivers notices and reports as structured log events.
///
/// Used where no mail or chat integration is configured.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

impl LogNotifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify_customer_declined(&self, customer_id: u32) -> Result<(), NotifyError> {
        info!(customer_id, "Payment unsuccessful notice sent");
        Ok(())
    }

    async fn send_report(&self, report: &BillingReport) -> Result<(), NotifyError> {
        for tag in OutcomeTag::ALL {
            info!(%tag, count = report.count(tag), "Billing result");
        }
        info!(
            from = %report.from,
            to = %report.to,
            total = report.total(),
            "Billing report sent"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[tokio::test]
    async fn test_log_notifier_always_delivers() {
        let notifier = LogNotifier::new();
        let now = Utc::now();
        let report = BillingReport::new(now, now, vec![(OutcomeTag::Overdue, 2)]);

        assert!(notifier.notify_customer_declined(1).await.is_ok());
        assert!(notifier.send_report(&report).await.is_ok());
    }
}
