//! Refresh executors: the collaborators that actually perform a login refresh.

mod http;

pub use http::HttpRefreshExecutor;

use async_trait::async_trait;

use poolkeeper_types::RefreshOutcome;

/// Performs one credential/session refresh for one account.
///
/// Implementations must be safe to call concurrently for distinct accounts.
/// Failures are reported as [`RefreshOutcome::Failure`], never as panics.
#[async_trait]
pub trait RefreshExecutor: Send + Sync {
    async fn refresh(&self, account_id: &str) -> RefreshOutcome;
}

/// Executor used when no webhook is configured. Every attempt fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnconfiguredExecutor;

#[async_trait]
impl RefreshExecutor for UnconfiguredExecutor {
    async fn refresh(&self, _account_id: &str) -> RefreshOutcome {
        RefreshOutcome::failure("no refresh executor configured", 0.0)
    }
}
