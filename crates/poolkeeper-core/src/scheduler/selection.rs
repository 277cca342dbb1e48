//! Batch selection: which accounts a tick should refresh.

use poolkeeper_types::models::BatchSummary;

use super::settings::BatchConfig;
use crate::registry::AccountSnapshot;

/// Accounts chosen for one tick, plus the counters explaining the choice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub ids: Vec<String>,
    pub summary: BatchSummary,
}

/// Pick up to `effective_max_batch_size` eligible accounts, least recently attempted first.
///
/// Eligible means enabled, not in flight, out of backoff and, when a refresh
/// window is set, with a known expiry inside the window (unknown expiry is due).
/// Ties keep registration order.
pub fn select_batch(
    snapshot: &[AccountSnapshot],
    now: f64,
    batch: &BatchConfig,
    refresh_window_hours: Option<u32>,
) -> Selection {
    let mut summary = BatchSummary { considered: snapshot.len(), ..BatchSummary::default() };
    let window_secs = refresh_window_hours.map(|h| f64::from(h) * 3600.0);

    let mut eligible: Vec<&AccountSnapshot> = Vec::with_capacity(snapshot.len());
    for entry in snapshot {
        if entry.account.disabled {
            summary.skipped_disabled += 1;
        } else if entry.in_flight {
            summary.skipped_in_flight += 1;
        } else if entry.state.as_ref().is_some_and(|s| !s.is_eligible(now)) {
            summary.skipped_backoff += 1;
        } else if window_secs.is_some_and(|w| !entry.account.expires_within(now, w)) {
            summary.skipped_not_due += 1;
        } else {
            eligible.push(entry);
        }
    }
    summary.eligible = eligible.len();

    // Stable sort keeps registration order among equal timestamps.
    eligible.sort_by(|a, b| {
        a.last_attempt_at().total_cmp(&b.last_attempt_at()).then(a.seq.cmp(&b.seq))
    });

    let take = (batch.effective_max_batch_size() as usize).min(eligible.len());
    let ids: Vec<String> = eligible.iter().take(take).map(|s| s.id().to_string()).collect();
    summary.selected = ids.len();

    Selection { ids, summary }
}

/// Simple selection used when advanced scheduling is off: every enabled,
/// idle account whose known expiry falls within `window_hours`.
///
/// No backoff, fairness or batch cap. Accounts with unknown expiry are not due.
pub fn select_expiring(snapshot: &[AccountSnapshot], now: f64, window_hours: u32) -> Selection {
    let mut summary = BatchSummary { considered: snapshot.len(), ..BatchSummary::default() };
    let window_secs = f64::from(window_hours) * 3600.0;

    let mut ids = Vec::new();
    for entry in snapshot {
        if entry.account.disabled {
            summary.skipped_disabled += 1;
        } else if entry.in_flight {
            summary.skipped_in_flight += 1;
        } else if entry.account.expires_at.is_some()
            && entry.account.expires_within(now, window_secs)
        {
            ids.push(entry.id().to_string());
        } else {
            summary.skipped_not_due += 1;
        }
    }
    summary.eligible = ids.len();
    summary.selected = ids.len();

    Selection { ids, summary }
}
