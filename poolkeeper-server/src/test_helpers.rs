//! Test helpers for poolkeeper-server unit tests.

use std::sync::Arc;

use async_trait::async_trait;
use tempfile::TempDir;

use poolkeeper_core::modules::storage::AccountStore;
use poolkeeper_core::{
    AccountRegistry, Clock, ManualClock, RefreshExecutor, RefreshPolicy, RefreshScheduler,
    SchedulerSettings,
};
use poolkeeper_types::{Account, RefreshOutcome, ScheduledRefreshConfig, SchedulerTuning};

use crate::state::AppState;

pub const TEST_NOW: f64 = 1_700_000_000.0;

/// Executor that succeeds immediately.
pub struct InstantExecutor;

#[async_trait]
impl RefreshExecutor for InstantExecutor {
    async fn refresh(&self, _account_id: &str) -> RefreshOutcome {
        RefreshOutcome::Success { duration_seconds: 1.0 }
    }
}

fn build_state(account_ids: &[&str], executor_configured: bool) -> (AppState, TempDir) {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(TEST_NOW));
    let registry = Arc::new(AccountRegistry::new(clock.clone(), RefreshPolicy::default()));
    for id in account_ids {
        registry.register(Account::new(*id)).expect("failed to register test account");
    }

    let settings =
        SchedulerSettings::new(&ScheduledRefreshConfig::default(), &SchedulerTuning::default());
    let scheduler = RefreshScheduler::new(
        registry,
        Arc::new(InstantExecutor),
        clock,
        settings,
        Some(AccountStore::new(temp_dir.path())),
    );
    let state =
        AppState::new_with_components(scheduler, temp_dir.path().to_path_buf(), executor_configured);
    (state, temp_dir)
}

/// Create a minimal `AppState` with the given accounts registered.
///
/// Returns `(AppState, TempDir)`; keep `TempDir` alive for the test duration.
pub fn test_app_state(account_ids: &[&str]) -> (AppState, TempDir) {
    build_state(account_ids, true)
}

/// Same as [`test_app_state`], but as if no webhook were configured.
pub fn test_app_state_without_executor(account_ids: &[&str]) -> (AppState, TempDir) {
    build_state(account_ids, false)
}
