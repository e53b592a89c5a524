use super::engine::BillingEngine;
use crate::domain::audit::BillingReport;
use crate::error::{Result, ScheduleParseError};
use chrono::{DateTime, Datelike, NaiveTime, TimeDelta, Utc};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Furthest a monthly schedule looks ahead before giving up.
const MAX_LOOKAHEAD_DAYS: u32 = 800;

/// When a recurring job fires. All times are UTC.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Schedule {
    /// On the listed days of every month at a fixed time of day.
    Monthly { days: Vec<u32>, at: NaiveTime },
    /// At a fixed interval, starting one interval from now.
    Every(Duration),
}

impl Schedule {
    /// Default settlement schedule: midnight on the 1st, 2nd and 3rd.
    pub fn default_process() -> Self {
        Schedule::Monthly {
            days: vec![1, 2, 3],
            at: NaiveTime::MIN,
        }
    }

    /// Default close-out schedule: 08:00 on the 3rd, after the last retry.
    pub fn default_close() -> Self {
        Schedule::Monthly {
            days: vec![3],
            at: NaiveTime::from_hms_opt(8, 0, 0).unwrap_or(NaiveTime::MIN),
        }
    }

    /// The first fire time strictly after `after`.
    pub fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Schedule::Every(interval) => Some(after + TimeDelta::from_std(*interval).ok()?),
            Schedule::Monthly { days, at } => {
                let mut date = after.date_naive();
                for _ in 0..MAX_LOOKAHEAD_DAYS {
                    if days.contains(&date.day()) {
                        let candidate = date.and_time(*at).and_utc();
                        if candidate > after {
                            return Some(candidate);
                        }
                    }
                    date = date.succ_opt()?;
                }
                None
            }
        }
    }
}

impl FromStr for Schedule {
    type Err = ScheduleParseError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(spec) = s.strip_prefix("monthly:") {
            let (days, time) = spec
                .split_once('@')
                .ok_or_else(|| ScheduleParseError::UnknownFormat(s.to_string()))?;
            let days = days
                .split(',')
                .map(|day| {
                    day.trim()
                        .parse::<u32>()
                        .ok()
                        .filter(|d| (1..=31).contains(d))
                        .ok_or_else(|| ScheduleParseError::InvalidDay(day.to_string()))
                })
                .collect::<std::result::Result<Vec<_>, _>>()?;
            let at = NaiveTime::parse_from_str(time.trim(), "%H:%M")
                .map_err(|_| ScheduleParseError::InvalidTime(time.to_string()))?;
            Ok(Schedule::Monthly { days, at })
        } else if let Some(spec) = s.strip_prefix("every:") {
            let spec = spec.trim();
            let invalid = || ScheduleParseError::InvalidInterval(spec.to_string());
            let (unit_at, _) = spec.char_indices().last().ok_or_else(invalid)?;
            let (amount, unit) = spec.split_at(unit_at);
            let amount: u64 = amount.parse().map_err(|_| invalid())?;
            let seconds = match unit {
                "s" => amount,
                "m" => amount.checked_mul(60).ok_or_else(invalid)?,
                "h" => amount.checked_mul(3600).ok_or_else(invalid)?,
                _ => return Err(invalid()),
            };
            if seconds == 0 {
                return Err(invalid());
            }
            Ok(Schedule::Every(Duration::from_secs(seconds)))
        } else {
            Err(ScheduleParseError::UnknownFormat(s.to_string()))
        }
    }
}

/// The engine entry points a trigger can fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Job {
    ProcessPending,
    ClosePending,
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Job::ProcessPending => f.write_str("billing"),
            Job::ClosePending => f.write_str("overdue"),
        }
    }
}

async fn run_job(engine: &BillingEngine, job: Job) -> Result<BillingReport> {
    match job {
        Job::ProcessPending => engine.process_pending_invoices().await,
        Job::ClosePending => engine.close_pending_invoices().await,
    }
}

/// Fires engine passes on their schedules until shut down.
///
/// Each registered job runs on its own tokio task. Passes themselves are
/// serialized by the engine, so overlapping fires queue rather than race.
/// Shutdown stops scheduling; a pass already running finishes first.
pub struct RecurringTrigger {
    engine: Arc<BillingEngine>,
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl RecurringTrigger {
    pub fn new(engine: Arc<BillingEngine>) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            engine,
            shutdown,
            tasks: Vec::new(),
        }
    }

    pub fn schedule(&mut self, job: Job, schedule: Schedule) {
        let engine = self.engine.clone();
        let mut stop = self.shutdown.subscribe();

        let task = tokio::spawn(async move {
            info!(%job, ?schedule, "Recurring job started");
            loop {
                let now = Utc::now();
                let Some(next) = schedule.next_after(now) else {
                    warn!(%job, "Schedule has no upcoming run");
                    break;
                };
                let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
                info!(%job, %next, "Next run scheduled");

                tokio::select! {
                    _ = tokio::time::sleep(wait) => {
                        match run_job(&engine, job).await {
                            Ok(report) => info!(%job, total = report.total(), "Recurring job finished"),
                            Err(e) => error!(%job, error = %e, "Recurring job failed"),
                        }
                    }
                    _ = stop.changed() => break,
                }
            }
            info!(%job, "Recurring job stopped");
        });
        self.tasks.push(task);
    }

    /// Runs a job immediately, outside its schedule.
    pub async fn run_now(&self, job: Job) -> Result<BillingReport> {
        info!(%job, "Running job on demand");
        run_job(&self.engine, job).await
    }

    /// Stops all recurring jobs and waits for their tasks to exit.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        for task in self.tasks {
            if let Err(e) = task.await {
                error!(error = %e, "Recurring job task panicked");
            }
        }
    }
}
