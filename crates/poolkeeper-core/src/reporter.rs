//! Read-only projection of registry snapshots into admin API shapes.
//!
//! Everything here is pure: identical inputs produce identical output, and
//! the Beijing-time strings are derived at this boundary only.

use poolkeeper_types::models::{
    AccountView, ScheduledRefreshStateEntry, SchedulerStatusView, ScheduledRefreshStatesResponse,
};

use crate::clock::format_beijing;
use crate::quota::QuotaTracker;
use crate::registry::AccountSnapshot;
use crate::scheduler::{BatchConfig, SchedulerStatus};

#[derive(Debug, Default, Clone, Copy)]
pub struct StateReporter;

impl StateReporter {
    /// Build the `/admin/scheduled-refresh/states` response.
    pub fn report(
        snapshot: &[AccountSnapshot],
        batch: &BatchConfig,
        status: &SchedulerStatus,
        now: f64,
    ) -> ScheduledRefreshStatesResponse {
        let accounts: Vec<_> = snapshot.iter().map(|s| Self::entry(s, now)).collect();
        ScheduledRefreshStatesResponse {
            now,
            now_beijing: format_beijing(now),
            config: batch.view(),
            scheduler: SchedulerStatusView {
                phase: status.phase,
                last_tick_at: status.last_tick_at,
                last_tick_at_beijing: format_beijing(status.last_tick_at),
                last_enqueue_at: status.last_enqueue_at,
                last_enqueue_at_beijing: format_beijing(status.last_enqueue_at),
                ticks: status.ticks,
                last_batch: status.last_batch.clone(),
            },
            total: accounts.len(),
            accounts,
        }
    }

    fn entry(snapshot: &AccountSnapshot, now: f64) -> ScheduledRefreshStateEntry {
        let state = snapshot.state.clone().unwrap_or_default();
        ScheduledRefreshStateEntry {
            id: snapshot.account.id.clone(),
            disabled: snapshot.account.disabled,
            has_state: snapshot.state.is_some(),
            in_flight: snapshot.in_flight,
            last_attempt_at: state.last_attempt_at,
            last_attempt_at_beijing: format_beijing(state.last_attempt_at),
            last_success_at: state.last_success_at,
            last_success_at_beijing: format_beijing(state.last_success_at),
            avg_refresh_duration_seconds: state.avg_refresh_duration_seconds,
            consecutive_failures: state.consecutive_failures,
            next_eligible_at: state.next_eligible_at,
            next_eligible_at_beijing: format_beijing(state.next_eligible_at),
            in_backoff: state.in_backoff(now),
            backoff_remaining_seconds: state.backoff_remaining_seconds(now),
            last_error: state.last_error,
            last_failure_category: state.last_failure_category,
        }
    }

    /// Build the `/admin/accounts` rows with derived quota.
    pub fn accounts(snapshot: &[AccountSnapshot], now: f64) -> Vec<AccountView> {
        snapshot
            .iter()
            .map(|s| AccountView {
                id: s.account.id.clone(),
                label: s.account.label.clone(),
                disabled: s.account.disabled,
                disabled_reason: s.account.disabled_reason.clone(),
                error_count: s.account.error_count,
                failure_count: s.account.failure_count,
                expires_at: s.account.expires_at,
                in_flight: s.in_flight,
                cooldowns: s.account.cooldowns.clone(),
                quota: QuotaTracker::evaluate(&s.account, now),
            })
            .collect()
    }
}
