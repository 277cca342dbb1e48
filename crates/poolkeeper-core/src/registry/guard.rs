//! RAII guard for cancellation-safe refresh claims.

use std::sync::Arc;

use poolkeeper_types::{AccountError, RefreshOutcome, ScheduledRefreshState};

use super::{AccountRegistry, AttemptToken};

/// Holds a per-account refresh claim.
/// Abandons the claim on drop unless `complete()` was called.
pub struct AttemptGuard {
    registry: Arc<AccountRegistry>,
    token: Option<AttemptToken>,
}

impl AttemptGuard {
    pub(super) fn new(registry: Arc<AccountRegistry>, token: AttemptToken) -> Self {
        Self { registry, token: Some(token) }
    }

    pub fn account_id(&self) -> &str {
        self.token.as_ref().map_or("", |t| t.account_id.as_str())
    }

    pub fn token(&self) -> Option<&AttemptToken> {
        self.token.as_ref()
    }

    /// Record the outcome and release the claim.
    pub fn complete(
        mut self,
        outcome: RefreshOutcome,
    ) -> Result<ScheduledRefreshState, AccountError> {
        let Some(token) = self.token.take() else {
            return Err(AccountError::StaleAttempt {
                id: String::new(),
                attempt_id: String::new(),
            });
        };
        self.registry.complete_attempt(&token, outcome)
    }
}

impl Drop for AttemptGuard {
    fn drop(&mut self) {
        if let Some(token) = self.token.take() {
            if self.registry.abandon_attempt(&token) {
                tracing::debug!(
                    "[Registry] Abandoned refresh claim {} without recording an outcome",
                    token.attempt_id
                );
            }
        }
    }
}
