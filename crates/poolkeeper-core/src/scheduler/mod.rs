//! Scheduled refresh coordinator.
//!
//! A tick takes one registry snapshot, selects a batch (fair selection when
//! advanced scheduling is on, the simple expiry path otherwise), claims each account
//! and dispatches the claimed attempts to the executor under a concurrency
//! bound. Overlapping ticks are allowed: per-account claims are what keep two
//! attempts from stacking on the same account.

mod driver;
mod selection;
mod settings;

pub use selection::{select_batch, select_expiring, Selection};
pub use settings::{
    BatchConfig, SchedulerSettings, CONFIG_CHECK_INTERVAL, DEFAULT_REFRESH_WINDOW_HOURS,
    MIN_POLL_INTERVAL,
};

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use tokio::sync::Semaphore;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use poolkeeper_types::models::{BatchSummary, ManualRefreshResponse, ManualRefreshSkip, SchedulerPhase};
use poolkeeper_types::{RefreshError, RefreshOutcome, ScheduledRefreshConfig};

use crate::clock::Clock;
use crate::executor::RefreshExecutor;
use crate::failure::mask_account_id;
use crate::modules::storage::AccountStore;
use crate::registry::{AccountRegistry, AttemptGuard};

/// Observable driver bookkeeping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchedulerStatus {
    pub phase: SchedulerPhase,
    pub last_tick_at: f64,
    pub last_enqueue_at: f64,
    pub ticks: u64,
    pub last_batch: Option<BatchSummary>,
}

struct SchedulerInner {
    registry: Arc<AccountRegistry>,
    executor: Arc<dyn RefreshExecutor>,
    clock: Arc<dyn Clock>,
    settings: RwLock<SchedulerSettings>,
    permits: Arc<Semaphore>,
    status: Mutex<SchedulerStatus>,
    store: Option<AccountStore>,
    cancel: CancellationToken,
    tasks: TaskTracker,
}

/// Cloneable handle to the coordinator.
#[derive(Clone)]
pub struct RefreshScheduler {
    inner: Arc<SchedulerInner>,
}

impl RefreshScheduler {
    pub fn new(
        registry: Arc<AccountRegistry>,
        executor: Arc<dyn RefreshExecutor>,
        clock: Arc<dyn Clock>,
        settings: SchedulerSettings,
        store: Option<AccountStore>,
    ) -> Self {
        registry.set_policy(settings.refresh_policy());
        let permits = Arc::new(Semaphore::new(settings.tuning.max_concurrency.max(1) as usize));
        Self {
            inner: Arc::new(SchedulerInner {
                registry,
                executor,
                clock,
                settings: RwLock::new(settings),
                permits,
                status: Mutex::new(SchedulerStatus::default()),
                store,
                cancel: CancellationToken::new(),
                tasks: TaskTracker::new(),
            }),
        }
    }

    pub fn registry(&self) -> &Arc<AccountRegistry> {
        &self.inner.registry
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.inner.clock
    }

    pub fn settings(&self) -> SchedulerSettings {
        self.inner.settings.read().clone()
    }

    pub fn status(&self) -> SchedulerStatus {
        self.inner.status.lock().clone()
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.inner.cancel.clone()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.inner.cancel.is_cancelled()
    }

    /// Apply a re-read operator config. Tuning stays as loaded at startup.
    pub fn update_config(&self, config: &ScheduledRefreshConfig) {
        let changed = {
            let mut settings = self.inner.settings.write();
            let next = BatchConfig::from_config(config, &settings.tuning);
            if next == settings.batch {
                false
            } else {
                settings.batch = next;
                true
            }
        };
        if changed {
            let settings = self.settings();
            self.inner.registry.set_policy(settings.refresh_policy());
            tracing::info!(
                "[Scheduler] Config updated: enabled={}, advanced={}, interval={}m, max_batch={}",
                settings.batch.scheduled_refresh_enabled,
                settings.batch.advanced_enabled,
                settings.batch.interval_minutes,
                settings.batch.effective_max_batch_size()
            );
        }
    }

    fn set_phase(&self, phase: SchedulerPhase) {
        self.inner.status.lock().phase = phase;
    }

    /// Run one scheduling pass and wait for every dispatched attempt.
    pub async fn tick(&self) -> BatchSummary {
        let inner = &self.inner;
        if inner.cancel.is_cancelled() {
            return BatchSummary::default();
        }

        let settings = self.settings();
        let now = inner.clock.now();
        {
            let mut status = inner.status.lock();
            status.ticks += 1;
            status.last_tick_at = now;
        }

        self.set_phase(SchedulerPhase::Selecting);
        let snapshot = inner.registry.snapshot();
        let Selection { ids, mut summary } = if settings.batch.advanced_enabled {
            select_batch(&snapshot, now, &settings.batch, settings.tuning.refresh_window_hours)
        } else {
            let window =
                settings.tuning.refresh_window_hours.unwrap_or(DEFAULT_REFRESH_WINDOW_HOURS);
            tracing::debug!(
                "[Scheduler] Advanced scheduling off, refreshing accounts expiring within {}h",
                window
            );
            select_expiring(&snapshot, now, window)
        };

        self.set_phase(SchedulerPhase::Dispatching);
        let mut guards = Vec::with_capacity(ids.len());
        for id in &ids {
            match inner.registry.claim(id) {
                Ok(guard) => guards.push(guard),
                Err(e) if e.is_benign_skip() => summary.skipped_in_flight += 1,
                Err(e) => {
                    tracing::warn!("[Scheduler] Skipping {}: {}", mask_account_id(id), e);
                },
            }
        }
        summary.claimed = guards.len();

        if guards.is_empty() {
            tracing::debug!(
                "[Scheduler] Nothing to refresh (considered={}, eligible={}, backoff={})",
                summary.considered,
                summary.eligible,
                summary.skipped_backoff
            );
        } else {
            inner.status.lock().last_enqueue_at = now;
            tracing::info!(
                "[Scheduler] Dispatching {} of {} eligible account(s) (considered={}, backoff={}, in_flight={})",
                summary.claimed,
                summary.eligible,
                summary.considered,
                summary.skipped_backoff,
                summary.skipped_in_flight
            );
        }

        self.set_phase(SchedulerPhase::Awaiting);
        let (succeeded, failed) = self.dispatch(guards, settings.attempt_timeout).await;
        summary.succeeded = succeeded;
        summary.failed = failed;

        {
            let mut status = inner.status.lock();
            status.phase = SchedulerPhase::Idle;
            status.last_batch = Some(summary.clone());
        }
        if summary.claimed > 0 {
            self.persist().await;
        }
        summary
    }

    /// Claim the given accounts, bypassing backoff and fairness, and refresh them
    /// in the background. Disabled, unknown and in-flight accounts are skipped.
    pub fn refresh_now(
        &self,
        account_ids: Vec<String>,
    ) -> (ManualRefreshResponse, JoinHandle<BatchSummary>) {
        let mut response = ManualRefreshResponse::default();
        let mut guards = Vec::new();
        let mut seen = HashSet::new();
        let shutting_down = self.is_shutting_down();

        for id in account_ids {
            if !seen.insert(id.clone()) {
                continue;
            }
            if shutting_down {
                response.skipped.push(ManualRefreshSkip { id, reason: "shutting down".to_string() });
                continue;
            }
            match self.inner.registry.claim(&id) {
                Ok(guard) => {
                    response.accepted.push(id);
                    guards.push(guard);
                },
                Err(e) => response.skipped.push(ManualRefreshSkip { id, reason: e.to_string() }),
            }
        }

        tracing::info!(
            "[Scheduler] Manual refresh: {} accepted, {} skipped",
            response.accepted.len(),
            response.skipped.len()
        );

        let this = self.clone();
        let timeout = self.settings().attempt_timeout;
        let handle = self.inner.tasks.spawn(async move {
            let claimed = guards.len();
            let (succeeded, failed) = this.dispatch(guards, timeout).await;
            if claimed > 0 {
                this.persist().await;
            }
            BatchSummary {
                considered: claimed,
                eligible: claimed,
                selected: claimed,
                claimed,
                succeeded,
                failed,
                ..BatchSummary::default()
            }
        });
        (response, handle)
    }

    /// Start a tick now on the scheduler's task tracker.
    pub fn run_now(&self) -> JoinHandle<BatchSummary> {
        let this = self.clone();
        self.inner.tasks.spawn(async move { this.tick().await })
    }

    /// Run claimed attempts concurrently, bounded by the semaphore.
    /// Returns `(succeeded, failed)`; cancelled attempts count as neither.
    async fn dispatch(&self, guards: Vec<AttemptGuard>, timeout: Duration) -> (usize, usize) {
        let mut set = JoinSet::new();
        for guard in guards {
            set.spawn(run_attempt(
                guard,
                Arc::clone(&self.inner.executor),
                Arc::clone(&self.inner.permits),
                self.inner.cancel.clone(),
                timeout,
            ));
        }

        let (mut succeeded, mut failed) = (0, 0);
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(Some(true)) => succeeded += 1,
                Ok(Some(false)) => failed += 1,
                Ok(None) => {},
                Err(e) => tracing::error!("[Scheduler] Refresh task panicked: {}", e),
            }
        }
        (succeeded, failed)
    }

    /// Write accounts and refresh state to disk, if a store is attached.
    pub async fn persist(&self) {
        let Some(store) = self.inner.store.clone() else {
            return;
        };
        let registry = Arc::clone(&self.inner.registry);
        match tokio::task::spawn_blocking(move || store.save_with(|| registry.export())).await {
            Ok(Ok(())) => {},
            Ok(Err(e)) => tracing::warn!("[Scheduler] Failed to persist accounts: {}", e),
            Err(e) => tracing::error!("[Scheduler] spawn_blocking panic while persisting: {}", e),
        }
    }

    /// Cancel in-flight work, wait for tracked tasks and flush state.
    pub async fn shutdown(&self) {
        tracing::info!("[Scheduler] Shutting down");
        self.inner.cancel.cancel();
        self.inner.tasks.close();
        self.inner.tasks.wait().await;
        self.persist().await;
        tracing::info!("[Scheduler] Stopped");
    }
}

async fn run_attempt(
    guard: AttemptGuard,
    executor: Arc<dyn RefreshExecutor>,
    permits: Arc<Semaphore>,
    cancel: CancellationToken,
    timeout: Duration,
) -> Option<bool> {
    let account_id = guard.account_id().to_string();
    let masked = mask_account_id(&account_id);

    let _permit = tokio::select! {
        permit = permits.acquire_owned() => permit.ok()?,
        () = cancel.cancelled() => {
            tracing::debug!("[Scheduler] Cancelled before start: {}", masked);
            return None;
        },
    };

    let started = Instant::now();
    let outcome = tokio::select! {
        result = tokio::time::timeout(timeout, executor.refresh(&account_id)) => match result {
            Ok(outcome) => outcome,
            Err(_) => RefreshOutcome::from_error(
                &RefreshError::Timeout { after_secs: timeout.as_secs() },
                started.elapsed().as_secs_f64(),
            ),
        },
        () = cancel.cancelled() => {
            tracing::debug!("[Scheduler] Cancelled during refresh: {}", masked);
            return None;
        },
    };

    let success = outcome.is_success();
    match guard.complete(outcome) {
        Ok(state) if success => {
            tracing::info!(
                "[Scheduler] Refreshed {} (avg {:.1}s)",
                masked,
                state.avg_refresh_duration_seconds
            );
            Some(true)
        },
        Ok(state) => {
            tracing::warn!(
                account = %masked,
                category = state.last_failure_category.map(|c| c.as_str()).unwrap_or("other"),
                failures = state.consecutive_failures,
                "[Scheduler] Refresh failed: {}",
                state.last_error
            );
            Some(false)
        },
        Err(e) => {
            tracing::warn!("[Scheduler] Could not record outcome for {}: {}", masked, e);
            None
        },
    }
}
