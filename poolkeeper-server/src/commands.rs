//! Client-side CLI commands that talk to a running server, plus offline config checks.

use anyhow::{Context, Result};
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, Color, Table};
use std::path::Path;

use poolkeeper_core::modules::config as core_config;
use poolkeeper_core::SchedulerSettings;
use poolkeeper_types::models::{ManualRefreshResponse, ScheduledRefreshStateEntry};
use poolkeeper_types::ScheduledRefreshStatesResponse;

pub async fn show_states(url: &str, json: bool) -> Result<()> {
    let endpoint = format!("{}/admin/scheduled-refresh/states", url.trim_end_matches('/'));
    let response = reqwest::get(&endpoint)
        .await
        .with_context(|| format!("Failed to reach {endpoint}"))?
        .error_for_status()?;

    if json {
        let value: serde_json::Value = response.json().await?;
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    let states: ScheduledRefreshStatesResponse = response.json().await?;
    let cfg = &states.config;
    println!("{}", "Scheduled Refresh".cyan().bold());
    println!(
        "  Enabled: {}  Advanced: {}  Interval: {}m  Batch: {} (min {}, max {})",
        cfg.scheduled_refresh_enabled,
        cfg.advanced_enabled,
        cfg.interval_minutes,
        cfg.effective_max_batch_size,
        cfg.min_batch_size,
        cfg.max_batch_size
    );
    println!(
        "  Phase: {:?}  Ticks: {}  Last tick: {}",
        states.scheduler.phase,
        states.scheduler.ticks,
        or_dash(&states.scheduler.last_tick_at_beijing)
    );

    if states.accounts.is_empty() {
        println!("{}", "No accounts registered.".yellow());
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec![
        "Account",
        "Status",
        "Last Attempt",
        "Last Success",
        "Avg (s)",
        "Failures",
        "Next Eligible",
        "Last Error",
    ]);

    for entry in &states.accounts {
        table.add_row(vec![
            Cell::new(&entry.id),
            status_cell(entry),
            Cell::new(or_dash(&entry.last_attempt_at_beijing)),
            Cell::new(or_dash(&entry.last_success_at_beijing)),
            Cell::new(format!("{:.1}", entry.avg_refresh_duration_seconds)),
            Cell::new(entry.consecutive_failures),
            Cell::new(or_dash(&entry.next_eligible_at_beijing)),
            Cell::new(or_dash(&entry.last_error)),
        ]);
    }

    println!("{table}");
    println!("\n{} accounts total, as of {}", states.total, states.now_beijing);
    Ok(())
}

fn status_cell(entry: &ScheduledRefreshStateEntry) -> Cell {
    if entry.disabled {
        Cell::new("Disabled").fg(Color::Red)
    } else if entry.in_flight {
        Cell::new("Refreshing").fg(Color::Cyan)
    } else if entry.in_backoff {
        Cell::new(format!("Backoff {:.0}s", entry.backoff_remaining_seconds)).fg(Color::Yellow)
    } else {
        Cell::new("Ready").fg(Color::Green)
    }
}

fn or_dash(value: &str) -> &str {
    if value.is_empty() {
        "-"
    } else {
        value
    }
}

pub async fn trigger_refresh(url: &str, account_ids: Vec<String>) -> Result<()> {
    let endpoint = format!("{}/admin/accounts/refresh", url.trim_end_matches('/'));
    let response = reqwest::Client::new()
        .post(&endpoint)
        .json(&serde_json::json!({ "account_ids": account_ids }))
        .send()
        .await
        .with_context(|| format!("Failed to reach {endpoint}"))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        anyhow::bail!("Server returned {}: {}", status, body);
    }

    let result: ManualRefreshResponse = response.json().await?;
    for id in &result.accepted {
        println!("{} {}", "✓".green(), id);
    }
    for skip in &result.skipped {
        println!("{} {}: {}", "✗".red(), skip.id, skip.reason);
    }
    println!("\n{} accepted, {} skipped", result.accepted.len(), result.skipped.len());
    Ok(())
}

pub fn check_config(data_dir: &Path) -> Result<()> {
    let config = core_config::load_config(data_dir)
        .map_err(|e| anyhow::anyhow!(e))
        .with_context(|| {
            format!("Invalid config at {}", core_config::config_path(data_dir).display())
        })?;
    let settings = SchedulerSettings::from_app_config(&config);
    let policy = settings.refresh_policy();

    println!("{} {}", "✓".green(), core_config::config_path(data_dir).display());
    println!("{}", serde_json::to_string_pretty(&settings.batch.view())?);
    println!("  Attempt timeout: {}s", settings.attempt_timeout.as_secs());
    println!("  Max concurrency: {}", settings.tuning.max_concurrency);
    println!("  Backoff ceiling: {}s", policy.backoff.ceiling_seconds());
    println!(
        "  Executor: {}",
        config.executor.webhook_url.as_deref().unwrap_or("not configured")
    );
    Ok(())
}
