//! Periodic driver loop.

use std::time::Duration;

use tokio::task::JoinHandle;

use poolkeeper_types::{ConfigError, ScheduledRefreshConfig};

use super::{RefreshScheduler, CONFIG_CHECK_INTERVAL};

impl RefreshScheduler {
    /// Spawn the periodic driver.
    ///
    /// Each iteration re-reads the operator config through `reload` (a failed
    /// reload keeps the previous config), spawns a tick on the task tracker
    /// when scheduling is enabled, then sleeps until the next interval. The
    /// loop exits when the scheduler's cancellation token fires.
    pub fn start<F>(&self, reload: F) -> JoinHandle<()>
    where
        F: Fn() -> Result<ScheduledRefreshConfig, ConfigError> + Send + 'static,
    {
        let this = self.clone();
        tokio::spawn(async move {
            tracing::info!("[Scheduler] Scheduled refresh driver started");
            let cancel = this.cancellation_token();

            loop {
                if cancel.is_cancelled() {
                    break;
                }

                match reload() {
                    Ok(config) => this.update_config(&config),
                    Err(e) => tracing::warn!("[Scheduler] Failed to reload config: {}", e),
                }

                let batch = this.settings().batch;
                let wait: Duration = if batch.scheduled_refresh_enabled {
                    let _tick = this.run_now();
                    batch.poll_interval()
                } else {
                    tracing::debug!("[Scheduler] Scheduled refresh disabled, re-checking later");
                    CONFIG_CHECK_INTERVAL
                };

                tokio::select! {
                    () = cancel.cancelled() => break,
                    () = tokio::time::sleep(wait) => {},
                }
            }

            tracing::info!("[Scheduler] Scheduled refresh driver stopped");
        })
    }
}
