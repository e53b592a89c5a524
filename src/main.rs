use billrun::application::engine::BillingEngine;
use billrun::application::scheduler::{Job, RecurringTrigger};
use billrun::config::{Cli, Command, report_window};
use billrun::domain::ports::LedgerBox;
use billrun::infrastructure::in_memory::InMemoryLedger;
use billrun::infrastructure::notifier::LogNotifier;
use billrun::infrastructure::payment::SimulatedPaymentProvider;
use billrun::interfaces::csv::report_writer::ReportWriter;
use billrun::interfaces::csv::seed_reader::{CustomerReader, InvoiceReader, seed_ledger};
use billrun::telemetry;
use chrono::Utc;
use clap::Parser;
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    telemetry::init();

    let ledger = open_ledger(cli.db_path.clone())?;

    let customers = cli
        .customers
        .as_ref()
        .map(File::open)
        .transpose()
        .into_diagnostic()?
        .map(CustomerReader::new);
    let invoices = cli
        .invoices
        .as_ref()
        .map(File::open)
        .transpose()
        .into_diagnostic()?
        .map(InvoiceReader::new);
    if customers.is_some() || invoices.is_some() {
        seed_ledger(ledger.as_ref(), customers, invoices)
            .await
            .into_diagnostic()?;
    }

    let engine = Arc::new(BillingEngine::new(
        ledger,
        Box::new(SimulatedPaymentProvider::new(cli.charge_mode())),
        Box::new(LogNotifier::new()),
    ));

    let stdout = io::stdout();
    let mut writer = ReportWriter::new(stdout.lock());

    match cli.command {
        Command::Process => {
            let report = engine.process_pending_invoices().await.into_diagnostic()?;
            writer.write_report(&report).into_diagnostic()?;
        }
        Command::Close => {
            let report = engine.close_pending_invoices().await.into_diagnostic()?;
            writer.write_report(&report).into_diagnostic()?;
        }
        Command::Report { from, to } => {
            let (from, to) = report_window(from, to, Utc::now());
            let report = engine
                .send_billing_report(from, to)
                .await
                .into_diagnostic()?;
            writer.write_report(&report).into_diagnostic()?;
        }
        Command::Invoices => {
            let invoices = engine.ledger().fetch_invoices().await.into_diagnostic()?;
            writer.write_invoices(&invoices).into_diagnostic()?;
        }
        Command::Run {
            process_schedule,
            close_schedule,
        } => {
            let mut trigger = RecurringTrigger::new(engine);
            trigger.schedule(Job::ProcessPending, process_schedule);
            trigger.schedule(Job::ClosePending, close_schedule);

            wait_for_shutdown().await?;
            info!("Shutting down recurring trigger");
            trigger.shutdown().await;
        }
    }

    Ok(())
}

#[cfg(feature = "storage-rocksdb")]
fn open_ledger(db_path: Option<PathBuf>) -> Result<LedgerBox> {
    use billrun::infrastructure::rocksdb::RocksDBLedger;

    match db_path {
        Some(path) => Ok(Box::new(RocksDBLedger::open(path).into_diagnostic()?)),
        None => Ok(Box::new(InMemoryLedger::new())),
    }
}

#[cfg(not(feature = "storage-rocksdb"))]
fn open_ledger(db_path: Option<PathBuf>) -> Result<LedgerBox> {
    if db_path.is_some() {
        tracing::warn!(
            "Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
        );
    }
    Ok(Box::new(InMemoryLedger::new()))
}

async fn wait_for_shutdown() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigterm = signal(SignalKind::terminate()).into_diagnostic()?;
        tokio::select! {
            _ = sigterm.recv() => info!("Received SIGTERM"),
            result = tokio::signal::ctrl_c() => {
                result.into_diagnostic()?;
                info!("Received Ctrl+C");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await.into_diagnostic()?;
        info!("Received Ctrl+C");
    }

    Ok(())
}
