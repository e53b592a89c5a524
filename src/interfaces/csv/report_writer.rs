use crate::domain::audit::BillingReport;
use crate::domain::invoice::Invoice;
use crate::error::Result;
use std::io::Write;

/// Writes billing reports and invoice listings as CSV.
pub struct ReportWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> ReportWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    /// One `result,count` row per tag present in the report.
    pub fn write_report(&mut self, report: &BillingReport) -> Result<()> {
        self.writer.write_record(["result", "count"])?;
        for (tag, count) in &report.counts {
            self.writer
                .write_record([tag.as_str(), count.to_string().as_str()])?;
        }
        self.writer.flush()?;
        Ok(())
    }

    pub fn write_invoices(&mut self, invoices: &[Invoice]) -> Result<()> {
        self.writer
            .write_record(["id", "customer", "amount", "currency", "status"])?;
        for invoice in invoices {
            self.writer.write_record([
                invoice.id.to_string().as_str(),
                invoice.customer_id.to_string().as_str(),
                invoice.amount.value().to_string().as_str(),
                invoice.amount.currency().code(),
                invoice.status.as_str(),
            ])?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
