//! Shared daily send limiter — a single Redis counter against a configured cap.
//!
//! Manual admin sends, immediate Slack sends, and queue drains all count
//! against the same counter, so a burst of manual sends shrinks the automatic
//! batch size for the rest of the day. A daily scheduled job resets the
//! counter; resetting an already-absent counter is a no-op.

use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use sqlx::PgPool;

use courier_common::error::AppError;

use crate::properties::{PropertyCache, PropertyService, keys};

const SEND_COUNTER_KEY: &str = "dispatch:sends_today";

pub struct SendLimiter;

impl SendLimiter {
    /// Sends still permitted today: configured cap minus the counter.
    ///
    /// A missing or unreadable cap property yields **zero** capacity
    /// (fail-closed — no sends proceed), logged and never propagated.
    pub async fn remaining(
        redis: &mut ConnectionManager,
        pool: &PgPool,
        cache: &PropertyCache,
    ) -> Result<u32, AppError> {
        let cap = match PropertyService::get_i64(pool, cache, keys::DAILY_SEND_CAP).await {
            Ok(cap) => cap,
            Err(e) => {
                tracing::error!(
                    key = keys::DAILY_SEND_CAP,
                    error = %e,
                    "Daily send cap unavailable, failing closed to zero capacity"
                );
                return Ok(0);
            }
        };

        let used: Option<i64> = redis.get(SEND_COUNTER_KEY).await?;
        Ok(Self::remaining_capacity(cap, used.unwrap_or(0)))
    }

    /// `max(0, cap - used)`.
    pub fn remaining_capacity(cap: i64, used: i64) -> u32 {
        cap.saturating_sub(used).clamp(0, u32::MAX as i64) as u32
    }

    /// Count one send attempt against today's cap. Returns the new total.
    pub async fn record(redis: &mut ConnectionManager) -> Result<i64, AppError> {
        let total: i64 = redis.incr(SEND_COUNTER_KEY, 1).await?;
        Ok(total)
    }

    /// Reset the counter to zero (daily scheduled job).
    pub async fn reset(redis: &mut ConnectionManager) -> Result<(), AppError> {
        redis.del::<_, ()>(SEND_COUNTER_KEY).await?;
        tracing::info!("Daily send counter reset");
        Ok(())
    }
}
