//! Application property store — string key/value settings in Postgres.
//!
//! Properties hold the mutable application-level configuration: feature
//! flags, templates, the daily send cap, delivery test mode. Reads go through
//! an explicit, injected `PropertyCache` with a short TTL so admin edits take
//! effect within a minute without a restart. This subsystem never writes
//! properties.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use sqlx::PgPool;

use courier_common::error::AppError;

/// Well-known property keys.
pub mod keys {
    pub const FEATURE_EMAIL: &str = "feature.email_enabled";
    pub const FEATURE_SMS: &str = "feature.sms_enabled";
    pub const FEATURE_SLACK: &str = "feature.slack_enabled";
    pub const DAILY_SEND_CAP: &str = "dispatch.daily_send_cap";
    pub const DELIVERY_TEST_MODE: &str = "delivery.test_mode";
    pub const DELIVERY_TEST_ADDRESS: &str = "delivery.test_address";
    pub const DELIVERY_TEST_SLACK_HANDLE: &str = "delivery.test_slack_handle";
    pub const DELIVERY_BCC_AUDIT: &str = "delivery.bcc_audit";
    pub const RENEWAL_URL_BASE: &str = "renewal.url_base";
}

/// Default cache TTL (1 minute).
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60);

struct CacheEntry {
    value: String,
    stored_at: Instant,
}

/// Short-lived in-process property cache.
///
/// Owned by the process and passed explicitly to every property read — no
/// global state. Entries expire after `ttl`.
pub struct PropertyCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl PropertyCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Fetch a cached value; expired entries are evicted and report a miss.
    pub fn get(&self, key: &str) -> Option<String> {
        let mut entries = self.entries.lock().ok()?;
        match entries.get(key) {
            Some(entry) if entry.stored_at.elapsed() < self.ttl => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn put(&self, key: &str, value: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(
                key.to_string(),
                CacheEntry {
                    value: value.to_string(),
                    stored_at: Instant::now(),
                },
            );
        }
    }
}

impl Default for PropertyCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_TTL)
    }
}

/// Typed read access to the `properties` table.
pub struct PropertyService;

impl PropertyService {
    pub async fn get_string(
        pool: &PgPool,
        cache: &PropertyCache,
        key: &str,
    ) -> Result<String, AppError> {
        if let Some(value) = cache.get(key) {
            return Ok(value);
        }

        let row: Option<(String,)> = sqlx::query_as("SELECT value FROM properties WHERE key = $1")
            .bind(key)
            .fetch_optional(pool)
            .await?;

        match row {
            Some((value,)) => {
                cache.put(key, &value);
                Ok(value)
            }
            None => Err(AppError::ConfigMissing(key.to_string())),
        }
    }

    pub async fn get_bool(
        pool: &PgPool,
        cache: &PropertyCache,
        key: &str,
    ) -> Result<bool, AppError> {
        let value = Self::get_string(pool, cache, key).await?;
        Ok(parse_bool(&value))
    }

    pub async fn get_i64(
        pool: &PgPool,
        cache: &PropertyCache,
        key: &str,
    ) -> Result<i64, AppError> {
        let value = Self::get_string(pool, cache, key).await?;
        value.trim().parse().map_err(|_| {
            AppError::Validation(format!("property {key} is not an integer: {value}"))
        })
    }
}

/// Properties are edited by hand; accept the usual truthy spellings.
fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes" | "on"
    )
}
