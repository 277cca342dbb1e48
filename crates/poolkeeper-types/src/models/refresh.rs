//! Scheduled refresh bookkeeping.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::RefreshError;

/// Coarse bucket for a refresh failure message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FailureCategory {
    CaptchaOrCode,
    RiskOrRateLimit,
    Timeout,
    ElementNotFound,
    Network,
    Other,
}

impl FailureCategory {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CaptchaOrCode => "captcha_or_code",
            Self::RiskOrRateLimit => "risk_or_rate_limit",
            Self::Timeout => "timeout",
            Self::ElementNotFound => "element_not_found",
            Self::Network => "network",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for FailureCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one refresh attempt as reported by the executor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RefreshOutcome {
    Success { duration_seconds: f64 },
    Failure { reason: String, duration_seconds: f64 },
}

impl RefreshOutcome {
    pub fn failure(reason: impl Into<String>, duration_seconds: f64) -> Self {
        Self::Failure { reason: reason.into(), duration_seconds }
    }

    /// Fold a refresh error into a failure outcome.
    pub fn from_error(err: &RefreshError, duration_seconds: f64) -> Self {
        Self::Failure { reason: err.to_string(), duration_seconds }
    }

    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub const fn duration_seconds(&self) -> f64 {
        match self {
            Self::Success { duration_seconds } | Self::Failure { duration_seconds, .. } => {
                *duration_seconds
            },
        }
    }

    pub fn failure_reason(&self) -> Option<&str> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { reason, .. } => Some(reason),
        }
    }
}

/// Per-account refresh history.
///
/// All timestamps are epoch seconds; `0.0` means "never".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ScheduledRefreshState {
    #[serde(default)]
    pub last_attempt_at: f64,
    #[serde(default)]
    pub last_success_at: f64,
    /// Exponentially weighted mean over attempts with a positive duration
    #[serde(default)]
    pub avg_refresh_duration_seconds: f64,
    #[serde(default)]
    pub consecutive_failures: u32,
    /// Earliest time the scheduler may pick this account again; `0.0` when not backing off
    #[serde(default)]
    pub next_eligible_at: f64,
    #[serde(default)]
    pub last_error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_failure_category: Option<FailureCategory>,
}

impl ScheduledRefreshState {
    pub fn in_backoff(&self, now: f64) -> bool {
        self.next_eligible_at > now
    }

    pub fn backoff_remaining_seconds(&self, now: f64) -> f64 {
        (self.next_eligible_at - now).max(0.0)
    }

    /// Whether the backoff gate lets the scheduler pick this account at `now`.
    pub fn is_eligible(&self, now: f64) -> bool {
        self.next_eligible_at <= 0.0 || now >= self.next_eligible_at
    }
}
