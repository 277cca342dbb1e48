//! Tracing subscriber setup.
//!
//! Human-readable output goes to stdout. When a log directory is given, every
//! event is also written as one-line JSON to a daily-rolling file.

use std::path::Path;
use std::sync::OnceLock;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

use crate::error::{AppError, AppResult};

static FILE_GUARD: OnceLock<WorkerGuard> = OnceLock::new();
static LOGGER_READY: OnceLock<()> = OnceLock::new();

const LOG_FILE_PREFIX: &str = "poolkeeper.log";

fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "poolkeeper_core={default_level},poolkeeper_server={default_level},tower_http=info,warn"
        ))
    })
}

/// Install the global subscriber. Calling it again is a no-op.
pub fn init_logger(level: &str, log_dir: Option<&Path>) -> AppResult<()> {
    if LOGGER_READY.get().is_some() {
        return Ok(());
    }

    let _ = tracing_log::LogTracer::init();

    let stdout_layer = fmt::layer().with_target(false).with_filter(env_filter(level));

    let file_layer = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = FILE_GUARD.set(guard);
            Some(
                fmt::layer()
                    .json()
                    .with_writer(writer)
                    .with_current_span(false)
                    .with_span_list(false)
                    .with_target(true)
                    .with_filter(env_filter(level)),
            )
        },
        None => None,
    };

    let subscriber = Registry::default().with(stdout_layer).with(file_layer);
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| AppError::Unknown(format!("failed to set global subscriber: {e}")))?;

    let _ = LOGGER_READY.set(());
    tracing::info!(
        log_dir = log_dir.map(|d| d.display().to_string()).unwrap_or_default(),
        version = env!("CARGO_PKG_VERSION"),
        "Logger initialized"
    );
    Ok(())
}
