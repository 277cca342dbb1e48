//! Exponential backoff after consecutive refresh failures.

use poolkeeper_types::SchedulerTuning;

/// Backoff ceiling never exceeds this many tick intervals.
const INTERVAL_CEILING_MULTIPLIER: u64 = 48;

/// Pure backoff computation.
///
/// Delay after `n` failures is `base * 2^min(n, cap_exponent)`, clamped to
/// `min(max_backoff, interval * 48)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub base_seconds: u64,
    pub cap_exponent: u32,
    pub max_backoff_seconds: u64,
    pub interval_seconds: u64,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::from_tuning(&SchedulerTuning::default(), 30 * 60)
    }
}

impl BackoffPolicy {
    pub fn from_tuning(tuning: &SchedulerTuning, interval_seconds: u64) -> Self {
        let policy = Self {
            base_seconds: tuning.backoff_base_seconds,
            cap_exponent: tuning.backoff_cap_exponent,
            max_backoff_seconds: tuning.backoff_max_seconds,
            interval_seconds,
        };
        if interval_seconds > 0 && policy.ceiling_seconds() < policy.max_backoff_seconds {
            tracing::warn!(
                "[Backoff] Ceiling clamped to {}s (48 x {}s interval) below configured max {}s",
                policy.ceiling_seconds(),
                interval_seconds,
                policy.max_backoff_seconds
            );
        }
        policy
    }

    /// Effective upper bound on a single backoff.
    pub fn ceiling_seconds(&self) -> u64 {
        if self.interval_seconds == 0 {
            return self.max_backoff_seconds;
        }
        self.max_backoff_seconds
            .min(self.interval_seconds.saturating_mul(INTERVAL_CEILING_MULTIPLIER))
    }

    /// Backoff length for a failure streak; zero when the streak is empty.
    pub fn delay_seconds(&self, consecutive_failures: u32) -> u64 {
        if consecutive_failures == 0 {
            return 0;
        }
        let exponent = consecutive_failures.min(self.cap_exponent).min(63);
        let raw = self.base_seconds.saturating_mul(1_u64 << exponent);
        raw.min(self.ceiling_seconds())
    }

    /// Next time the account may be selected. `0.0` means no backoff.
    pub fn next_eligible(&self, now: f64, consecutive_failures: u32) -> f64 {
        if consecutive_failures == 0 {
            return 0.0;
        }
        now + self.delay_seconds(consecutive_failures) as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(base: u64) -> BackoffPolicy {
        BackoffPolicy {
            base_seconds: base,
            cap_exponent: 6,
            max_backoff_seconds: 12 * 3600,
            interval_seconds: 30 * 60,
        }
    }

    #[test]
    fn test_no_failures_means_immediately_eligible() {
        assert!(policy(60).next_eligible(1_000.0, 0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_three_failures_base_sixty() {
        let next = policy(60).next_eligible(1_000.0, 3);
        assert!((next - 1_480.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_monotonic_and_capped() {
        let p = policy(900);
        let mut prev = 0;
        for n in 0..20 {
            let d = p.delay_seconds(n);
            assert!(d >= prev, "delay must not shrink as failures grow");
            assert!(d <= 12 * 3600);
            prev = d;
        }
        assert_eq!(p.delay_seconds(19), 12 * 3600);
    }

    #[test]
    fn test_cap_exponent_limits_growth() {
        let p = BackoffPolicy { cap_exponent: 2, ..policy(10) };
        assert_eq!(p.delay_seconds(2), 40);
        assert_eq!(p.delay_seconds(10), 40);
    }

    #[test]
    fn test_interval_clamps_ceiling() {
        let p = BackoffPolicy { interval_seconds: 60, ..policy(900) };
        assert_eq!(p.ceiling_seconds(), 48 * 60);
        assert_eq!(p.delay_seconds(6), 48 * 60);
    }

    #[test]
    fn test_from_tuning_defaults() {
        let p = BackoffPolicy::from_tuning(&SchedulerTuning::default(), 3600);
        assert_eq!(p.base_seconds, 450);
        assert_eq!(p.cap_exponent, 7);
        assert_eq!(p.ceiling_seconds(), 12 * 3600);
    }

    #[test]
    fn test_default_progression_starts_at_fifteen_minutes() {
        let p = BackoffPolicy::from_tuning(&SchedulerTuning::default(), 3600);
        let minutes: Vec<_> = (1..=7).map(|n| p.delay_seconds(n) / 60).collect();
        assert_eq!(minutes, vec![15, 30, 60, 120, 240, 480, 720]);
    }
}
