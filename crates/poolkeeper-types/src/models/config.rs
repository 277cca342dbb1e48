//! Application configuration types.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Server-enforced floor on the number of accounts selected per tick.
pub const DEFAULT_MIN_BATCH_SIZE: u32 = 5;

/// Operator-facing scheduled refresh settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Validate)]
pub struct ScheduledRefreshConfig {
    /// Master switch for the periodic driver
    #[serde(default)]
    pub scheduled_refresh_enabled: bool,
    /// Tick interval in minutes (the driver never polls faster than once a minute)
    #[validate(range(min = 0_i32, max = 10080_i32))]
    #[serde(default = "default_interval_minutes")]
    pub scheduled_refresh_interval_minutes: i32,
    /// Enable batched, backoff-aware selection; when off ticks do nothing
    #[serde(default)]
    pub scheduled_refresh_advanced_enabled: bool,
    /// Upper bound on accounts selected per tick (raised to the floor if lower)
    #[validate(range(min = 0_i32))]
    #[serde(default = "default_max_batch_size")]
    pub scheduled_refresh_max_batch_size: i32,
}

impl Default for ScheduledRefreshConfig {
    fn default() -> Self {
        Self {
            scheduled_refresh_enabled: false,
            scheduled_refresh_interval_minutes: default_interval_minutes(),
            scheduled_refresh_advanced_enabled: false,
            scheduled_refresh_max_batch_size: default_max_batch_size(),
        }
    }
}

/// Numeric tuning for the refresh coordinator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
pub struct SchedulerTuning {
    /// Backoff after the first failure, in seconds
    #[validate(range(min = 1_u64))]
    #[serde(default = "default_backoff_base")]
    pub backoff_base_seconds: u64,
    /// Largest exponent applied to the base
    #[validate(range(max = 20_u32))]
    #[serde(default = "default_backoff_cap_exponent")]
    pub backoff_cap_exponent: u32,
    /// Hard ceiling on a single backoff, in seconds
    #[validate(range(min = 1_u64))]
    #[serde(default = "default_backoff_max")]
    pub backoff_max_seconds: u64,
    /// Smoothing factor for the average refresh duration
    #[validate(range(exclusive_min = 0.0, max = 1.0))]
    #[serde(default = "default_ema_alpha")]
    pub ema_alpha: f64,
    /// Per-attempt timeout in seconds
    #[validate(range(min = 1_u64, max = 86400_u64))]
    #[serde(default = "default_attempt_timeout")]
    pub attempt_timeout_seconds: u64,
    /// Concurrent executor calls per scheduler
    #[validate(range(min = 1_u32, max = 256_u32))]
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: u32,
    /// Only refresh accounts whose known expiry falls within this many hours
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_window_hours: Option<u32>,
    /// Disable an account after this many consecutive refresh failures
    #[validate(range(min = 1_u32))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disable_after_consecutive_failures: Option<u32>,
    /// Selection floor; not settable from the config file
    #[serde(skip, default = "default_min_batch_size")]
    pub min_batch_size: u32,
}

impl Default for SchedulerTuning {
    fn default() -> Self {
        Self {
            backoff_base_seconds: default_backoff_base(),
            backoff_cap_exponent: default_backoff_cap_exponent(),
            backoff_max_seconds: default_backoff_max(),
            ema_alpha: default_ema_alpha(),
            attempt_timeout_seconds: default_attempt_timeout(),
            max_concurrency: default_max_concurrency(),
            refresh_window_hours: None,
            disable_after_consecutive_failures: None,
            min_batch_size: default_min_batch_size(),
        }
    }
}

/// Where refresh attempts are delegated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default, Validate)]
pub struct ExecutorConfig {
    /// Webhook receiving `{"account_id": ...}` for each refresh
    #[validate(url)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
    /// Extra headers sent with every webhook call (e.g. an API key)
    #[serde(default, skip_serializing_if = "std::collections::BTreeMap::is_empty")]
    pub headers: std::collections::BTreeMap<String, String>,
}

/// Admin HTTP server binding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Validate)]
pub struct ServerConfig {
    #[validate(length(min = 1_u64))]
    #[serde(default = "default_host")]
    pub host: String,
    #[validate(range(min = 1_u16))]
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: default_host(), port: default_port() }
    }
}

/// Full application configuration, stored as `config.json` in the data dir.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default, Validate)]
pub struct AppConfig {
    #[validate(nested)]
    #[serde(default)]
    pub scheduled_refresh: ScheduledRefreshConfig,
    #[validate(nested)]
    #[serde(default)]
    pub scheduled_refresh_tuning: SchedulerTuning,
    #[validate(nested)]
    #[serde(default)]
    pub executor: ExecutorConfig,
    #[validate(nested)]
    #[serde(default)]
    pub server: ServerConfig,
}

const fn default_interval_minutes() -> i32 {
    30
}

const fn default_max_batch_size() -> i32 {
    20
}

const fn default_min_batch_size() -> u32 {
    DEFAULT_MIN_BATCH_SIZE
}

/// First failure waits `base * 2` = 15 minutes.
const fn default_backoff_base() -> u64 {
    450
}

/// `450 * 2^7` exceeds the default 12 h maximum.
const fn default_backoff_cap_exponent() -> u32 {
    7
}

const fn default_backoff_max() -> u64 {
    12 * 60 * 60
}

const fn default_ema_alpha() -> f64 {
    0.2
}

const fn default_attempt_timeout() -> u64 {
    300
}

const fn default_max_concurrency() -> u32 {
    2
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

const fn default_port() -> u16 {
    8046
}
