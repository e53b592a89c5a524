use crate::application::scheduler::Schedule;
use crate::infrastructure::payment::ChargeMode;
use chrono::{DateTime, TimeDelta, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long, global = true)]
    pub db_path: Option<PathBuf>,

    /// Customers CSV (`id,currency`) loaded into the ledger before the command runs
    #[arg(long, global = true)]
    pub customers: Option<PathBuf>,

    /// Invoices CSV (`id,customer,amount,currency,status`) loaded before the command runs
    #[arg(long, global = true)]
    pub invoices: Option<PathBuf>,

    /// Payment provider used to settle invoices
    #[arg(long, value_enum, default_value_t = ProviderKind::Random, global = true)]
    pub provider: ProviderKind,

    /// Share of charges the random provider declines
    #[arg(long, default_value_t = 0.2, value_parser = parse_rate, global = true)]
    pub decline_rate: f64,

    /// Share of charges the random provider fails with a network error
    #[arg(long, default_value_t = 0.05, value_parser = parse_rate, global = true)]
    pub network_failure_rate: f64,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProviderKind {
    Random,
    Accept,
    Decline,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Settle all pending invoices and print the pass report
    Process,
    /// Write off all pending invoices as overdue and print the pass report
    Close,
    /// Print the audit counts for a window (defaults to the last 24 hours)
    Report {
        #[arg(long)]
        from: Option<DateTime<Utc>>,
        #[arg(long)]
        to: Option<DateTime<Utc>>,
    },
    /// List all invoices with their current status
    Invoices,
    /// Run the recurring trigger until interrupted
    Run {
        /// When to settle pending invoices
        #[arg(long, default_value = "monthly:1,2,3@00:00")]
        process_schedule: Schedule,
        /// When to write off invoices still pending
        #[arg(long, default_value = "monthly:3@08:00")]
        close_schedule: Schedule,
    },
}

impl Cli {
    pub fn charge_mode(&self) -> ChargeMode {
        match self.provider {
            ProviderKind::Accept => ChargeMode::Accept,
            ProviderKind::Decline => ChargeMode::Decline,
            ProviderKind::Random => ChargeMode::Random {
                decline_rate: self.decline_rate,
                network_failure_rate: self.network_failure_rate,
            },
        }
    }
}

/// Parses a probability: a finite number in `0..=1`.
fn parse_rate(s: &str) -> Result<f64, String> {
    let rate: f64 = s.parse().map_err(|_| format!("`{s}` is not a number"))?;
    if rate.is_finite() && (0.0..=1.0).contains(&rate) {
        Ok(rate)
    } else {
        Err(format!("`{s}` is not a rate between 0 and 1"))
    }
}

/// Resolves the report window, defaulting to the 24 hours before `now`.
pub fn report_window(
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> (DateTime<Utc>, DateTime<Utc>) {
    let to = to.unwrap_or(now);
    let from = from.unwrap_or(to - TimeDelta::days(1));
    (from, to)
}
