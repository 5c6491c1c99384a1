//! Background jobs that split rake, feed the jackpot and run the weekly draw.
//!
//! A single tokio task polls every `SCHEDULER_TICK_SECS`. Daily jobs run on the
//! first tick of each UTC day (every tick in demo mode); the draw runs once
//! `nextDraw` has passed.

use chrono::{DateTime, NaiveDate, Utc};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;

use super::ledger::{DrawOutcome, Ledger};
use crate::config::SchedulerConfig;
use crate::models::{JackpotWinner, RakeSplitRecord};

/// What one scheduler pass did
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TickReport {
    pub rake_split: Option<RakeSplitRecord>,
    pub jackpot_contribution: Option<f64>,
    pub winner: Option<JackpotWinner>,
}

/// Bookkeeping carried between passes
#[derive(Debug, Default)]
pub struct SchedulerRun {
    last_daily_run: Option<NaiveDate>,
}

impl SchedulerRun {
    fn daily_due(&self, today: NaiveDate, demo_mode: bool) -> bool {
        demo_mode || self.last_daily_run != Some(today)
    }
}

/// Run every due job once
pub async fn run_once(
    ledger: &Ledger,
    config: &SchedulerConfig,
    owner_wallet: &str,
    run: &mut SchedulerRun,
    now: DateTime<Utc>,
    rng: &mut impl Rng,
) -> TickReport {
    let mut report = TickReport::default();
    let today = now.date_naive();

    if run.daily_due(today, config.demo_mode) {
        report.rake_split = ledger
            .split_rake(owner_wallet, config.rake_split_percent, today)
            .await;
        report.jackpot_contribution = Some(
            ledger
                .contribute_to_jackpot(config.jackpot_contribution_percent)
                .await,
        );
        run.last_daily_run = Some(today);
    }

    if let DrawOutcome::Drawn(winner) = ledger
        .draw_jackpot(now, config.jackpot_eligible_top, rng)
        .await
    {
        report.winner = Some(winner);
    }

    report
}

pub struct JackpotScheduler {
    ledger: Arc<Ledger>,
    config: SchedulerConfig,
    owner_wallet: String,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl JackpotScheduler {
    pub fn new(ledger: Arc<Ledger>, config: SchedulerConfig, owner_wallet: String) -> Self {
        Self {
            ledger,
            config,
            owner_wallet,
            handle: Mutex::new(None),
        }
    }

    /// Spawn the polling task, replacing one that is already running
    pub fn start(&self) {
        let ledger = self.ledger.clone();
        let config = self.config.clone();
        let owner_wallet = self.owner_wallet.clone();

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(config.tick_interval());
            let mut run = SchedulerRun::default();
            let mut rng = StdRng::from_os_rng();

            loop {
                interval.tick().await;
                let report = run_once(
                    &ledger,
                    &config,
                    &owner_wallet,
                    &mut run,
                    Utc::now(),
                    &mut rng,
                )
                .await;
                if report != TickReport::default() {
                    tracing::debug!("Scheduler pass: {:?}", report);
                }
            }
        });

        let previous = match self.handle.lock() {
            Ok(mut handle) => handle.replace(task),
            Err(poisoned) => poisoned.into_inner().replace(task),
        };
        if let Some(previous) = previous {
            previous.abort();
        }

        tracing::info!(
            "Jackpot scheduler started (tick every {:?}, demo mode: {})",
            self.config.tick_interval(),
            self.config.demo_mode
        );
    }

    pub fn stop(&self) {
        let current = match self.handle.lock() {
            Ok(mut handle) => handle.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(task) = current {
            task.abort();
            tracing::info!("Jackpot scheduler stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        match self.handle.lock() {
            Ok(handle) => handle.as_ref().is_some_and(|task| !task.is_finished()),
            Err(poisoned) => poisoned
                .into_inner()
                .as_ref()
                .is_some_and(|task| !task.is_finished()),
        }
    }
}

impl Drop for JackpotScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    const OWNER: &str = "0xowner";

    fn monday() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 12, 8, 9, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_daily_jobs_run_once_per_day() {
        let ledger = Ledger::seeded(monday());
        let config = SchedulerConfig::default();
        let mut run = SchedulerRun::default();
        let mut rng = StdRng::seed_from_u64(3);

        let first = run_once(&ledger, &config, OWNER, &mut run, monday(), &mut rng).await;
        assert!(first.rake_split.is_some());
        assert!(first.jackpot_contribution.is_some());
        assert!(first.winner.is_none());

        let later_same_day = monday() + Duration::hours(5);
        let second = run_once(&ledger, &config, OWNER, &mut run, later_same_day, &mut rng).await;
        assert_eq!(second, TickReport::default());

        let next_day = monday() + Duration::days(1);
        let third = run_once(&ledger, &config, OWNER, &mut run, next_day, &mut rng).await;
        assert!(third.jackpot_contribution.is_some());
    }

    #[tokio::test]
    async fn test_demo_mode_runs_every_tick() {
        let ledger = Ledger::seeded(monday());
        let config = SchedulerConfig {
            demo_mode: true,
            ..SchedulerConfig::default()
        };
        let mut run = SchedulerRun::default();
        let mut rng = StdRng::seed_from_u64(3);

        run_once(&ledger, &config, OWNER, &mut run, monday(), &mut rng).await;
        let again = run_once(&ledger, &config, OWNER, &mut run, monday(), &mut rng).await;
        assert!(again.jackpot_contribution.is_some());
        // Rake was already split on the first pass
        assert!(again.rake_split.is_none());
    }

    #[tokio::test]
    async fn test_weekly_draw_when_due() {
        let ledger = Ledger::seeded(monday());
        let config = SchedulerConfig::default();
        let mut run = SchedulerRun::default();
        let mut rng = StdRng::seed_from_u64(4);

        let due = monday() + Duration::days(14);
        let report = run_once(&ledger, &config, OWNER, &mut run, due, &mut rng).await;
        let winner = report.winner.expect("draw should be due");
        assert!(winner.amount > 5_000.0);
        assert!(!winner.claimed);
        assert_eq!(ledger.dashboard().await.jackpot_status.accumulated_amount, 0.0);
    }

    #[tokio::test]
    async fn test_start_and_stop() {
        let ledger = Arc::new(Ledger::seeded(Utc::now()));
        let scheduler = JackpotScheduler::new(
            ledger.clone(),
            SchedulerConfig::default(),
            OWNER.to_string(),
        );

        scheduler.start();
        // Restarting replaces the running task
        scheduler.start();
        assert!(scheduler.is_running());

        // The first interval tick fires immediately
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert!(ledger.dashboard().await.jackpot_status.accumulated_amount > 5_000.0);

        scheduler.stop();
        assert!(!scheduler.is_running());
    }
}
