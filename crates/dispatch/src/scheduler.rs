//! Periodic job scheduler.
//!
//! A fixed set of named daily jobs, each a local wall-clock time plus a job
//! kind. No scheduling framework: one loop computes the earliest next fire
//! time, sleeps, runs the job, and repeats. Both jobs are idempotent within
//! their window — draining an empty queue and resetting an absent counter
//! are no-ops — so an occasional double fire is harmless.
//!
//! The period is long (hours) relative to expected drain duration, so no
//! mutual exclusion is provided against an overlapping drain.

use std::sync::Arc;

use chrono::{DateTime, Local, LocalResult, NaiveTime, TimeZone};
use redis::aio::ConnectionManager;
use sqlx::PgPool;

use courier_common::error::AppError;

use crate::coordinator::DispatchCoordinator;
use crate::limiter::SendLimiter;
use crate::properties::PropertyCache;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    DrainQueue,
    ResetSendCounter,
}

#[derive(Debug, Clone, Copy)]
pub struct ScheduledJob {
    pub name: &'static str,
    pub at: NaiveTime,
    pub kind: JobKind,
}

pub struct Scheduler {
    jobs: Vec<ScheduledJob>,
}

impl Scheduler {
    /// The standard job set: drain at 06:00 local, counter reset at midnight.
    pub fn standard() -> Self {
        Self {
            jobs: vec![
                ScheduledJob {
                    name: "drain notification queue",
                    at: NaiveTime::from_hms_opt(6, 0, 0).unwrap_or(NaiveTime::MIN),
                    kind: JobKind::DrainQueue,
                },
                ScheduledJob {
                    name: "reset send counter",
                    at: NaiveTime::MIN,
                    kind: JobKind::ResetSendCounter,
                },
            ],
        }
    }

    /// Next wall-clock fire time for a daily job: today at `at` if that is
    /// still ahead, otherwise tomorrow.
    pub fn next_fire<Tz: TimeZone>(now: DateTime<Tz>, at: NaiveTime) -> DateTime<Tz> {
        let date = if now.time() < at {
            now.date_naive()
        } else {
            now.date_naive().succ_opt().unwrap_or(now.date_naive())
        };

        match now.timezone().from_local_datetime(&date.and_time(at)) {
            LocalResult::Single(dt) => dt,
            LocalResult::Ambiguous(earliest, _) => earliest,
            // Target falls inside a DST gap; push a full day
            LocalResult::None => now + chrono::Duration::hours(24),
        }
    }

    /// Run the job loop until cancelled.
    pub async fn run(
        &self,
        pool: PgPool,
        mut redis: ConnectionManager,
        cache: Arc<PropertyCache>,
        coordinator: Arc<DispatchCoordinator>,
    ) -> anyhow::Result<()> {
        if self.jobs.is_empty() {
            anyhow::bail!("scheduler configured with no jobs");
        }

        for job in &self.jobs {
            tracing::info!(job = job.name, at = %job.at, "Scheduled daily job");
        }

        loop {
            let now = Local::now();
            let Some((job, fire_at)) = self
                .jobs
                .iter()
                .map(|job| (job, Self::next_fire(now, job.at)))
                .min_by_key(|(_, fire_at)| *fire_at)
            else {
                anyhow::bail!("scheduler job set became empty");
            };

            let wait = (fire_at - now).to_std().unwrap_or_default();
            tracing::debug!(job = job.name, wait_secs = wait.as_secs(), "Waiting for next job");
            tokio::time::sleep(wait).await;

            if let Err(e) = Self::run_job(job, &pool, &mut redis, &cache, &coordinator).await {
                tracing::error!(job = job.name, error = %e, "Scheduled job failed");
            }
        }
    }

    async fn run_job(
        job: &ScheduledJob,
        pool: &PgPool,
        redis: &mut ConnectionManager,
        cache: &PropertyCache,
        coordinator: &DispatchCoordinator,
    ) -> Result<(), AppError> {
        tracing::info!(job = job.name, "Running scheduled job");
        match job.kind {
            JobKind::DrainQueue => {
                let processed = coordinator.drain(pool, redis, cache).await?;
                tracing::info!(processed, "Drain job finished");
            }
            JobKind::ResetSendCounter => {
                SendLimiter::reset(redis).await?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_next_fire_later_today() {
        let now = Utc.with_ymd_and_hms(2026, 8, 30, 4, 30, 0).unwrap();
        let at = NaiveTime::from_hms_opt(6, 0, 0).unwrap();
        let fire = Scheduler::next_fire(now, at);
        assert_eq!(fire, Utc.with_ymd_and_hms(2026, 8, 30, 6, 0, 0).unwrap());
    }

    #[test]
    fn test_next_fire_rolls_to_tomorrow() {
        let now = Utc.with_ymd_and_hms(2026, 8, 30, 6, 0, 0).unwrap();
        let at = NaiveTime::from_hms_opt(6, 0, 0).unwrap();
        let fire = Scheduler::next_fire(now, at);
        assert_eq!(fire, Utc.with_ymd_and_hms(2026, 8, 31, 6, 0, 0).unwrap());
    }

    #[test]
    fn test_next_fire_midnight_job() {
        let now = Utc.with_ymd_and_hms(2026, 8, 30, 23, 59, 59).unwrap();
        let fire = Scheduler::next_fire(now, NaiveTime::MIN);
        assert_eq!(fire, Utc.with_ymd_and_hms(2026, 8, 31, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_standard_jobs() {
        let scheduler = Scheduler::standard();
        assert_eq!(scheduler.jobs.len(), 2);
        assert!(scheduler.jobs.iter().any(|j| j.kind == JobKind::DrainQueue));
        assert!(
            scheduler
                .jobs
                .iter()
                .any(|j| j.kind == JobKind::ResetSendCounter)
        );
    }
}
