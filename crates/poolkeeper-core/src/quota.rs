//! Per-resource availability derived from cooldowns and disablement.
//!
//! Nothing here is stored: every view is recomputed from the account and
//! the current time.

use poolkeeper_types::models::{AccountQuota, QuotaStatus};
use poolkeeper_types::{Account, ResourceKind};

/// Derives quota availability for accounts.
#[derive(Debug, Default, Clone, Copy)]
pub struct QuotaTracker;

impl QuotaTracker {
    /// Availability of one resource at `now`.
    pub fn status(account: &Account, kind: ResourceKind, now: f64) -> QuotaStatus {
        if account.disabled {
            let reason = account.disabled_reason.as_deref().unwrap_or("account disabled");
            return QuotaStatus::restricted(None, reason);
        }
        match account.cooldowns.get(kind) {
            Some(cooldown) if cooldown.until > now => {
                QuotaStatus::restricted(Some(cooldown.until - now), cooldown.reason.clone())
            },
            _ => QuotaStatus::available(),
        }
    }

    /// Full quota view with the longest active cooldown.
    pub fn evaluate(account: &Account, now: f64) -> AccountQuota {
        let mut cooldown_seconds = 0.0_f64;
        let mut cooldown_reason = None;
        for kind in ResourceKind::ALL {
            if let Some(cooldown) = account.cooldowns.get(kind) {
                let remaining = cooldown.until - now;
                if remaining > cooldown_seconds {
                    cooldown_seconds = remaining;
                    cooldown_reason = Some(cooldown.reason.clone());
                }
            }
        }

        AccountQuota {
            text: Self::status(account, ResourceKind::Text, now),
            images: Self::status(account, ResourceKind::Images, now),
            videos: Self::status(account, ResourceKind::Videos, now),
            cooldown_seconds,
            cooldown_reason,
        }
    }

    /// Whether the account can serve requests of `kind` right now.
    pub fn is_available(account: &Account, kind: ResourceKind, now: f64) -> bool {
        Self::status(account, kind, now).available
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use poolkeeper_types::models::Cooldown;

    #[test]
    fn test_cooldown_expiry() {
        let mut acc = Account::new("a");
        acc.cooldowns.set(
            ResourceKind::Images,
            Cooldown { until: 200.0, reason: "rate limited".to_string() },
        );

        let status = QuotaTracker::status(&acc, ResourceKind::Images, 150.0);
        assert!(!status.available);
        assert_eq!(status.remaining_seconds, Some(50.0));
        assert_eq!(status.reason.as_deref(), Some("rate limited"));

        assert!(QuotaTracker::is_available(&acc, ResourceKind::Images, 200.0));
        assert!(QuotaTracker::is_available(&acc, ResourceKind::Text, 150.0));
    }

    #[test]
    fn test_disabled_blocks_everything() {
        let mut acc = Account::new("a");
        acc.disable("manual", 1);
        let view = QuotaTracker::evaluate(&acc, 0.0);
        assert!(!view.any_available());
        assert_eq!(view.text.reason.as_deref(), Some("manual"));
        assert!(view.text.remaining_seconds.is_none());
    }

    #[test]
    fn test_longest_cooldown_reported() {
        let mut acc = Account::new("a");
        acc.cooldowns.set(ResourceKind::Text, Cooldown { until: 110.0, reason: "t".to_string() });
        acc.cooldowns.set(ResourceKind::Videos, Cooldown { until: 400.0, reason: "v".to_string() });

        let view = QuotaTracker::evaluate(&acc, 100.0);
        assert!((view.cooldown_seconds - 300.0).abs() < f64::EPSILON);
        assert_eq!(view.cooldown_reason.as_deref(), Some("v"));
        assert!(view.images.available);
    }
}
