//! Wall-clock time source and Beijing-time formatting.
//!
//! Refresh bookkeeping is stored as epoch seconds (`f64`) because it has to be
//! rendered as local time for operators. Per-attempt timeouts do not go through
//! this module; they use the tokio monotonic clock.

use chrono::{DateTime, FixedOffset};
use parking_lot::Mutex;

/// Display format used for every `*_beijing` field.
pub const BEIJING_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const BEIJING_OFFSET_SECS: i32 = 8 * 3600;

/// Source of the current wall-clock time.
pub trait Clock: Send + Sync {
    /// Current time in epoch seconds.
    fn now(&self) -> f64;
}

/// The real system clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<f64>,
}

impl ManualClock {
    pub fn new(start: f64) -> Self {
        Self { now: Mutex::new(start) }
    }

    pub fn set(&self, now: f64) {
        *self.now.lock() = now;
    }

    pub fn advance(&self, secs: f64) {
        *self.now.lock() += secs;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        *self.now.lock()
    }
}

/// Render an epoch timestamp as Beijing local time (UTC+8).
///
/// Zero and negative timestamps mean "never" and render as an empty string.
pub fn format_beijing(ts: f64) -> String {
    if !ts.is_finite() || ts <= 0.0 {
        return String::new();
    }
    let Some(offset) = FixedOffset::east_opt(BEIJING_OFFSET_SECS) else {
        return String::new();
    };
    let secs = ts.floor() as i64;
    DateTime::from_timestamp(secs, 0)
        .map(|dt| dt.with_timezone(&offset).format(BEIJING_FORMAT).to_string())
        .unwrap_or_default()
}
