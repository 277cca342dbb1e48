//! Batch and timing settings as applied by the scheduler.

use std::time::Duration;

use poolkeeper_types::models::BatchConfigView;
use poolkeeper_types::{AppConfig, ScheduledRefreshConfig, SchedulerTuning};

use crate::backoff::BackoffPolicy;
use crate::registry::RefreshPolicy;

/// The driver never polls faster than this, whatever the configured interval.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(60);

/// How often a disabled driver re-reads its configuration.
pub const CONFIG_CHECK_INTERVAL: Duration = Duration::from_secs(60);

/// Expiry window for the simple (non-advanced) path when none is configured.
pub const DEFAULT_REFRESH_WINDOW_HOURS: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchConfig {
    pub scheduled_refresh_enabled: bool,
    pub interval_minutes: i32,
    pub advanced_enabled: bool,
    pub max_batch_size: i32,
    pub min_batch_size: u32,
}

impl BatchConfig {
    pub fn from_config(config: &ScheduledRefreshConfig, tuning: &SchedulerTuning) -> Self {
        Self {
            scheduled_refresh_enabled: config.scheduled_refresh_enabled,
            interval_minutes: config.scheduled_refresh_interval_minutes,
            advanced_enabled: config.scheduled_refresh_advanced_enabled,
            max_batch_size: config.scheduled_refresh_max_batch_size,
            min_batch_size: tuning.min_batch_size,
        }
    }

    /// `max(max_batch_size, min_batch_size)`.
    pub fn effective_max_batch_size(&self) -> u32 {
        u32::try_from(self.max_batch_size).unwrap_or(0).max(self.min_batch_size)
    }

    pub fn interval_seconds(&self) -> u64 {
        u64::try_from(self.interval_minutes).unwrap_or(0) * 60
    }

    /// Sleep between ticks: the configured interval, floored at one minute.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds()).max(MIN_POLL_INTERVAL)
    }

    pub fn view(&self) -> BatchConfigView {
        BatchConfigView {
            scheduled_refresh_enabled: self.scheduled_refresh_enabled,
            interval_minutes: self.interval_minutes,
            advanced_enabled: self.advanced_enabled,
            max_batch_size: self.max_batch_size,
            min_batch_size: self.min_batch_size,
            effective_max_batch_size: self.effective_max_batch_size(),
        }
    }
}

/// Everything a tick needs to know.
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerSettings {
    pub batch: BatchConfig,
    pub tuning: SchedulerTuning,
    pub attempt_timeout: Duration,
}

impl SchedulerSettings {
    pub fn new(config: &ScheduledRefreshConfig, tuning: &SchedulerTuning) -> Self {
        Self {
            batch: BatchConfig::from_config(config, tuning),
            tuning: tuning.clone(),
            attempt_timeout: Duration::from_secs(tuning.attempt_timeout_seconds),
        }
    }

    pub fn from_app_config(config: &AppConfig) -> Self {
        Self::new(&config.scheduled_refresh, &config.scheduled_refresh_tuning)
    }

    pub fn refresh_policy(&self) -> RefreshPolicy {
        RefreshPolicy {
            backoff: BackoffPolicy::from_tuning(&self.tuning, self.batch.interval_seconds()),
            ema_alpha: self.tuning.ema_alpha,
            disable_after_consecutive_failures: self.tuning.disable_after_consecutive_failures,
        }
    }
}
