//! Application State
//!
//! Holds the shared scheduler (and through it the account registry).

use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use poolkeeper_core::modules::storage::AccountStore;
use poolkeeper_core::{
    AccountRegistry, Clock, HttpRefreshExecutor, RefreshExecutor, RefreshPolicy, RefreshScheduler,
    SchedulerSettings, SystemClock, UnconfiguredExecutor,
};
use poolkeeper_types::AppConfig;

/// Slack added to the HTTP client timeout so the scheduler's own timeout fires first.
const EXECUTOR_TIMEOUT_SLACK: Duration = Duration::from_secs(5);

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub(crate) inner: Arc<AppStateInner>,
}

pub struct AppStateInner {
    pub scheduler: RefreshScheduler,
    pub data_dir: PathBuf,
    pub executor_configured: bool,
}

impl AppState {
    /// Build the registry, executor and scheduler from a validated config.
    pub fn from_config(config: &AppConfig, data_dir: PathBuf) -> Result<Self> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let registry = Arc::new(AccountRegistry::new(clock.clone(), RefreshPolicy::default()));

        let store = AccountStore::new(&data_dir);
        // An unreadable store is fatal: continuing empty would overwrite it on the next save.
        let stored = store.load().map_err(|e| {
            anyhow::anyhow!("Failed to load accounts from {}: {}", store.path().display(), e)
        })?;
        let count = registry.import(stored);
        tracing::info!("Loaded {} account(s) from {}", count, store.path().display());
        let cleared = registry.reset_in_flight();
        if cleared > 0 {
            tracing::warn!("Cleared {} stale in-flight marker(s)", cleared);
        }

        let settings = SchedulerSettings::from_app_config(config);
        let (executor, executor_configured): (Arc<dyn RefreshExecutor>, bool) =
            match &config.executor.webhook_url {
                Some(url) => {
                    let executor = HttpRefreshExecutor::new(
                        url.clone(),
                        &config.executor.headers,
                        settings.attempt_timeout + EXECUTOR_TIMEOUT_SLACK,
                    )?;
                    tracing::info!("Refresh executor: webhook {}", redact_url(url));
                    (Arc::new(executor), true)
                },
                None => {
                    tracing::warn!("No refresh executor configured; refreshes are unavailable");
                    (Arc::new(UnconfiguredExecutor), false)
                },
            };

        let scheduler = RefreshScheduler::new(registry, executor, clock, settings, Some(store));
        Ok(Self::new_with_components(scheduler, data_dir, executor_configured))
    }

    pub fn new_with_components(
        scheduler: RefreshScheduler,
        data_dir: PathBuf,
        executor_configured: bool,
    ) -> Self {
        Self { inner: Arc::new(AppStateInner { scheduler, data_dir, executor_configured }) }
    }

    pub fn scheduler(&self) -> &RefreshScheduler {
        &self.inner.scheduler
    }

    pub fn registry(&self) -> &Arc<AccountRegistry> {
        self.inner.scheduler.registry()
    }

    pub fn now(&self) -> f64 {
        self.inner.scheduler.clock().now()
    }

    pub fn executor_configured(&self) -> bool {
        self.inner.executor_configured
    }

    pub fn get_account_count(&self) -> usize {
        self.registry().len()
    }
}

/// Scheme and host of a URL; path, query and credentials may carry tokens.
fn redact_url(url: &str) -> String {
    match reqwest::Url::parse(url) {
        Ok(parsed) => {
            let host = parsed.host_str().unwrap_or("?");
            match parsed.port() {
                Some(port) => format!("{}://{}:{}/***", parsed.scheme(), host, port),
                None => format!("{}://{}/***", parsed.scheme(), host),
            }
        },
        Err(_) => "<invalid url>".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use poolkeeper_types::models::ExecutorConfig;

    #[test]
    fn test_unreadable_store_is_fatal_and_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("accounts.json");
        let corrupt = r#"{"version":1,"accounts":[{"id":"acc-1"},{"id":"acc-2"},]}"#;
        std::fs::write(&path, corrupt).unwrap();

        let result = AppState::from_config(&AppConfig::default(), dir.path().to_path_buf());
        assert!(result.is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), corrupt);
    }

    #[tokio::test]
    async fn test_loaded_accounts_survive_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("accounts.json"),
            r#"{"version":1,"accounts":[{"id":"acc-1"},{"id":"acc-2"}]}"#,
        )
        .unwrap();

        let state = AppState::from_config(&AppConfig::default(), dir.path().to_path_buf()).unwrap();
        assert_eq!(state.get_account_count(), 2);
        state.scheduler().shutdown().await;

        let saved = std::fs::read_to_string(dir.path().join("accounts.json")).unwrap();
        assert!(saved.contains("acc-1") && saved.contains("acc-2"));
    }

    #[test]
    fn test_redact_url_drops_path_and_query() {
        assert_eq!(
            redact_url("https://hooks.example.com/refresh/SECRET?token=abc"),
            "https://hooks.example.com/***"
        );
        assert_eq!(redact_url("http://127.0.0.1:9000/x"), "http://127.0.0.1:9000/***");
        assert_eq!(redact_url("not a url"), "<invalid url>");
    }

    #[test]
    fn test_webhook_executor_is_configured() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig {
            executor: ExecutorConfig {
                webhook_url: Some("https://user:pw@hooks.example.com/t0k3n".to_string()),
                ..ExecutorConfig::default()
            },
            ..AppConfig::default()
        };
        let state = AppState::from_config(&config, dir.path().to_path_buf()).unwrap();
        assert!(state.executor_configured());
    }
}
