//! Admin API response shapes.

use serde::{Deserialize, Serialize};

use super::account::ResourceCooldowns;
use super::quota::AccountQuota;
use super::refresh::FailureCategory;

/// Observable scheduler phase.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerPhase {
    #[default]
    Idle,
    Selecting,
    Dispatching,
    Awaiting,
}

/// Counters describing one tick or manual batch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct BatchSummary {
    /// Accounts in the snapshot
    pub considered: usize,
    /// Accounts that passed every gate
    pub eligible: usize,
    pub skipped_disabled: usize,
    pub skipped_in_flight: usize,
    pub skipped_backoff: usize,
    /// Accounts outside the credential-expiry window
    pub skipped_not_due: usize,
    /// Accounts taken after the batch cap
    pub selected: usize,
    /// Accounts whose claim succeeded
    pub claimed: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// Batch settings as the scheduler applies them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BatchConfigView {
    pub scheduled_refresh_enabled: bool,
    pub interval_minutes: i32,
    pub advanced_enabled: bool,
    pub max_batch_size: i32,
    pub min_batch_size: u32,
    pub effective_max_batch_size: u32,
}

/// Driver status block of the states report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SchedulerStatusView {
    pub phase: SchedulerPhase,
    pub last_tick_at: f64,
    pub last_tick_at_beijing: String,
    pub last_enqueue_at: f64,
    pub last_enqueue_at_beijing: String,
    pub ticks: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_batch: Option<BatchSummary>,
}

/// One account row of the states report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScheduledRefreshStateEntry {
    pub id: String,
    pub disabled: bool,
    pub has_state: bool,
    pub in_flight: bool,
    pub last_attempt_at: f64,
    pub last_attempt_at_beijing: String,
    pub last_success_at: f64,
    pub last_success_at_beijing: String,
    pub avg_refresh_duration_seconds: f64,
    pub consecutive_failures: u32,
    pub next_eligible_at: f64,
    pub next_eligible_at_beijing: String,
    pub in_backoff: bool,
    pub backoff_remaining_seconds: f64,
    pub last_error: String,
    pub last_failure_category: Option<FailureCategory>,
}

/// Response of `GET /admin/scheduled-refresh/states`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScheduledRefreshStatesResponse {
    pub now: f64,
    pub now_beijing: String,
    pub config: BatchConfigView,
    pub scheduler: SchedulerStatusView,
    pub total: usize,
    pub accounts: Vec<ScheduledRefreshStateEntry>,
}

/// One account row of `GET /admin/accounts`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccountView {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub disabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled_reason: Option<String>,
    pub error_count: u32,
    pub failure_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
    pub in_flight: bool,
    pub cooldowns: ResourceCooldowns,
    pub quota: AccountQuota,
}

/// An account the manual refresh did not start.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ManualRefreshSkip {
    pub id: String,
    pub reason: String,
}

/// Response of `POST /admin/accounts/refresh`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ManualRefreshResponse {
    pub accepted: Vec<String>,
    pub skipped: Vec<ManualRefreshSkip>,
}
