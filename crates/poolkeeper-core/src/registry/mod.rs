//! Account registry: exclusive owner of accounts and their refresh state.
//!
//! Entries live in a sharded `DashMap`, so claims and completions lock a
//! single account. Callers only ever receive copies ([`AccountSnapshot`]).

mod guard;
#[cfg(test)]
mod tests;

pub use guard::AttemptGuard;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;
use uuid::Uuid;

use poolkeeper_types::models::Cooldown;
use poolkeeper_types::{Account, AccountError, RefreshOutcome, ResourceKind, ScheduledRefreshState};

use crate::backoff::BackoffPolicy;
use crate::clock::Clock;
use crate::failure::{classify_failure, mask_account_id, truncate_reason, MAX_ERROR_CHARS};
use crate::modules::storage::StoredAccount;

/// Rules applied when an attempt completes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RefreshPolicy {
    pub backoff: BackoffPolicy,
    pub ema_alpha: f64,
    pub disable_after_consecutive_failures: Option<u32>,
}

impl Default for RefreshPolicy {
    fn default() -> Self {
        Self {
            backoff: BackoffPolicy::default(),
            ema_alpha: 0.2,
            disable_after_consecutive_failures: None,
        }
    }
}

/// Proof of a live claim on one account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptToken {
    pub account_id: String,
    pub attempt_id: Uuid,
}

/// Point-in-time copy of one registry entry.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountSnapshot {
    pub account: Account,
    pub state: Option<ScheduledRefreshState>,
    pub in_flight: bool,
    /// Registration order
    pub seq: u64,
}

impl AccountSnapshot {
    pub fn id(&self) -> &str {
        &self.account.id
    }

    /// Time of the last recorded attempt, zero when never attempted.
    pub fn last_attempt_at(&self) -> f64 {
        self.state.as_ref().map_or(0.0, |s| s.last_attempt_at)
    }
}

struct RegistryEntry {
    seq: u64,
    account: Account,
    state: Option<ScheduledRefreshState>,
    claim: Option<Uuid>,
}

impl RegistryEntry {
    fn snapshot(&self) -> AccountSnapshot {
        AccountSnapshot {
            account: self.account.clone(),
            state: self.state.clone(),
            in_flight: self.claim.is_some(),
            seq: self.seq,
        }
    }
}

pub struct AccountRegistry {
    entries: DashMap<String, RegistryEntry>,
    next_seq: AtomicU64,
    policy: RwLock<RefreshPolicy>,
    clock: Arc<dyn Clock>,
}

impl AccountRegistry {
    pub fn new(clock: Arc<dyn Clock>, policy: RefreshPolicy) -> Self {
        Self {
            entries: DashMap::new(),
            next_seq: AtomicU64::new(0),
            policy: RwLock::new(policy),
            clock,
        }
    }

    pub fn policy(&self) -> RefreshPolicy {
        *self.policy.read()
    }

    pub fn set_policy(&self, policy: RefreshPolicy) {
        *self.policy.write() = policy;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Add a new account. Fails if the id is taken.
    pub fn register(&self, account: Account) -> Result<(), AccountError> {
        self.insert(account, None)
    }

    fn insert(
        &self,
        account: Account,
        state: Option<ScheduledRefreshState>,
    ) -> Result<(), AccountError> {
        use dashmap::mapref::entry::Entry;

        match self.entries.entry(account.id.clone()) {
            Entry::Occupied(_) => Err(AccountError::AlreadyExists { id: account.id }),
            Entry::Vacant(slot) => {
                let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
                slot.insert(RegistryEntry { seq, account, state, claim: None });
                Ok(())
            },
        }
    }

    /// Remove an account. A pending attempt for it later completes with `NotFound`.
    pub fn remove(&self, id: &str) -> Result<Account, AccountError> {
        self.entries
            .remove(id)
            .map(|(_, entry)| entry.account)
            .ok_or_else(|| AccountError::NotFound { id: id.to_string() })
    }

    pub fn get(&self, id: &str) -> Option<AccountSnapshot> {
        self.entries.get(id).map(|entry| entry.snapshot())
    }

    /// Copies of every entry in registration order.
    pub fn snapshot(&self) -> Vec<AccountSnapshot> {
        let mut out: Vec<AccountSnapshot> =
            self.entries.iter().map(|entry| entry.value().snapshot()).collect();
        out.sort_by_key(|s| s.seq);
        out
    }

    pub fn in_flight_count(&self) -> usize {
        self.entries.iter().filter(|entry| entry.claim.is_some()).count()
    }

    /// Claim an account for one refresh attempt.
    pub fn begin_attempt(&self, id: &str) -> Result<AttemptToken, AccountError> {
        let mut entry =
            self.entries.get_mut(id).ok_or_else(|| AccountError::NotFound { id: id.to_string() })?;
        if entry.account.disabled {
            return Err(AccountError::Disabled {
                id: id.to_string(),
                reason: entry.account.disabled_reason.clone(),
            });
        }
        if entry.claim.is_some() {
            return Err(AccountError::AlreadyInFlight { id: id.to_string() });
        }
        let attempt_id = Uuid::new_v4();
        entry.claim = Some(attempt_id);
        Ok(AttemptToken { account_id: id.to_string(), attempt_id })
    }

    /// Claim an account and wrap the claim in a guard that abandons it on drop.
    pub fn claim(self: &Arc<Self>, id: &str) -> Result<AttemptGuard, AccountError> {
        let token = self.begin_attempt(id)?;
        Ok(AttemptGuard::new(Arc::clone(self), token))
    }

    /// Record the outcome of a claimed attempt and release the claim.
    ///
    /// This is the only place refresh state changes.
    pub fn complete_attempt(
        &self,
        token: &AttemptToken,
        outcome: RefreshOutcome,
    ) -> Result<ScheduledRefreshState, AccountError> {
        let mut entry = self
            .entries
            .get_mut(&token.account_id)
            .ok_or_else(|| AccountError::NotFound { id: token.account_id.clone() })?;
        if entry.claim != Some(token.attempt_id) {
            return Err(AccountError::StaleAttempt {
                id: token.account_id.clone(),
                attempt_id: token.attempt_id.to_string(),
            });
        }

        let policy = self.policy();
        let now = self.clock.now();
        let entry = &mut *entry;
        let state = entry.state.get_or_insert_with(ScheduledRefreshState::default);

        state.last_attempt_at = now;
        let duration = outcome.duration_seconds();
        if duration > 0.0 {
            state.avg_refresh_duration_seconds = if state.avg_refresh_duration_seconds > 0.0 {
                policy.ema_alpha * duration
                    + (1.0 - policy.ema_alpha) * state.avg_refresh_duration_seconds
            } else {
                duration
            };
        }

        match outcome {
            RefreshOutcome::Success { .. } => {
                state.last_success_at = now;
                state.consecutive_failures = 0;
                state.next_eligible_at = 0.0;
                state.last_error.clear();
                state.last_failure_category = None;
            },
            RefreshOutcome::Failure { reason, .. } => {
                state.consecutive_failures = state.consecutive_failures.saturating_add(1);
                state.next_eligible_at =
                    policy.backoff.next_eligible(now, state.consecutive_failures);
                state.last_failure_category = Some(classify_failure(&reason));
                state.last_error = truncate_reason(&reason, MAX_ERROR_CHARS);
            },
        }
        entry.claim = None;

        let state = state.clone();
        if let Some(threshold) = policy.disable_after_consecutive_failures {
            if state.consecutive_failures >= threshold && !entry.account.disabled {
                entry.account.disable(
                    format!("{} consecutive refresh failures", state.consecutive_failures),
                    now as i64,
                );
                tracing::warn!(
                    "[Registry] Disabled account {} after {} consecutive refresh failures",
                    mask_account_id(&token.account_id),
                    state.consecutive_failures
                );
            }
        }
        Ok(state)
    }

    /// Release a claim without recording anything. Returns whether a claim was released.
    pub fn abandon_attempt(&self, token: &AttemptToken) -> bool {
        match self.entries.get_mut(&token.account_id) {
            Some(mut entry) if entry.claim == Some(token.attempt_id) => {
                entry.claim = None;
                true
            },
            _ => false,
        }
    }

    /// Drop every claim. Only meaningful at startup, before any attempt runs.
    pub fn reset_in_flight(&self) -> usize {
        let mut cleared = 0;
        for mut entry in self.entries.iter_mut() {
            if entry.claim.take().is_some() {
                cleared += 1;
            }
        }
        cleared
    }

    fn update<T>(
        &self,
        id: &str,
        f: impl FnOnce(&mut Account) -> T,
    ) -> Result<T, AccountError> {
        let mut entry =
            self.entries.get_mut(id).ok_or_else(|| AccountError::NotFound { id: id.to_string() })?;
        Ok(f(&mut entry.account))
    }

    /// Enable or disable an account.
    pub fn set_disabled(
        &self,
        id: &str,
        disabled: bool,
        reason: Option<String>,
    ) -> Result<Account, AccountError> {
        let now = self.clock.now() as i64;
        self.update(id, |account| {
            if disabled {
                account.disable(reason.unwrap_or_else(|| "disabled by operator".to_string()), now);
            } else {
                account.enable();
            }
            account.clone()
        })
    }

    /// Put one resource of an account on cooldown for `seconds`.
    pub fn apply_cooldown(
        &self,
        id: &str,
        kind: ResourceKind,
        seconds: f64,
        reason: impl Into<String>,
    ) -> Result<Account, AccountError> {
        let until = self.clock.now() + seconds.max(0.0);
        let reason = reason.into();
        self.update(id, |account| {
            account.cooldowns.set(kind, Cooldown { until, reason });
            account.clone()
        })
    }

    pub fn clear_cooldown(&self, id: &str, kind: ResourceKind) -> Result<bool, AccountError> {
        self.update(id, |account| account.cooldowns.clear(kind))
    }

    pub fn record_request_error(&self, id: &str) -> Result<u32, AccountError> {
        self.update(id, |account| {
            account.error_count = account.error_count.saturating_add(1);
            account.error_count
        })
    }

    pub fn record_request_failure(&self, id: &str) -> Result<u32, AccountError> {
        self.update(id, |account| {
            account.failure_count = account.failure_count.saturating_add(1);
            account.failure_count
        })
    }

    /// Export accounts with their refresh state for persistence. Claims are not exported.
    pub fn export(&self) -> Vec<StoredAccount> {
        self.snapshot()
            .into_iter()
            .map(|s| StoredAccount { account: s.account, scheduled_refresh_state: s.state })
            .collect()
    }

    /// Load persisted accounts, skipping ids that are already registered.
    pub fn import(&self, stored: Vec<StoredAccount>) -> usize {
        let mut loaded = 0;
        for item in stored {
            match self.insert(item.account, item.scheduled_refresh_state) {
                Ok(()) => loaded += 1,
                Err(e) => tracing::warn!("[Registry] Skipping stored account: {}", e),
            }
        }
        loaded
    }
}
