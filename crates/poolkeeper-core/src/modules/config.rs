//! Loading and validating `config.json`.

use std::fs;
use std::path::{Path, PathBuf};

use validator::{Validate, ValidationErrors, ValidationErrorsKind};

use poolkeeper_types::{AppConfig, ConfigError};

const CONFIG_FILE: &str = "config.json";
const DATA_DIR_ENV: &str = "POOLKEEPER_DATA_DIR";
const DEFAULT_DATA_DIR: &str = ".poolkeeper";

/// Data directory: `$POOLKEEPER_DATA_DIR`, else `~/.poolkeeper`. Created if missing.
pub fn get_data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var(DATA_DIR_ENV) {
        Ok(dir) if !dir.trim().is_empty() => PathBuf::from(dir),
        _ => dirs::home_dir()
            .ok_or_else(|| ConfigError::NotFound { path: "home directory".to_string() })?
            .join(DEFAULT_DATA_DIR),
    };
    if !dir.exists() {
        fs::create_dir_all(&dir).map_err(|e| ConfigError::from_io_error(&e))?;
    }
    Ok(dir)
}

pub fn config_path(data_dir: &Path) -> PathBuf {
    data_dir.join(CONFIG_FILE)
}

/// Load and validate the configuration. A missing file yields defaults.
pub fn load_config(data_dir: &Path) -> Result<AppConfig, ConfigError> {
    let path = config_path(data_dir);
    if !path.exists() {
        return Ok(AppConfig::default());
    }

    let content = fs::read_to_string(&path).map_err(|e| ConfigError::ParseError {
        message: format!("failed to read {}: {}", path.display(), e),
    })?;
    let config: AppConfig =
        serde_json::from_str(&content).map_err(|e| ConfigError::from_json_error(&e))?;
    validate_config(&config)?;
    Ok(config)
}

/// Validate field ranges plus the rules spanning several fields.
pub fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    if let Err(errors) = config.validate() {
        let (field, message) = first_violation(&errors, "");
        return Err(ConfigError::invalid(field, message));
    }

    let tuning = &config.scheduled_refresh_tuning;
    if tuning.backoff_max_seconds < tuning.backoff_base_seconds {
        return Err(ConfigError::invalid(
            "scheduled_refresh_tuning.backoff_max_seconds",
            format!(
                "must be at least backoff_base_seconds ({})",
                tuning.backoff_base_seconds
            ),
        ));
    }

    if config.scheduled_refresh.scheduled_refresh_enabled && config.executor.webhook_url.is_none()
    {
        return Err(ConfigError::invalid(
            "executor.webhook_url",
            "required when scheduled_refresh_enabled is true",
        ));
    }

    Ok(())
}

fn first_violation(errors: &ValidationErrors, prefix: &str) -> (String, String) {
    let mut keys: Vec<_> = errors.errors().keys().collect();
    keys.sort();
    for key in keys {
        let path = if prefix.is_empty() { key.to_string() } else { format!("{prefix}.{key}") };
        match errors.errors().get(key) {
            Some(ValidationErrorsKind::Field(list)) => {
                let message = list
                    .first()
                    .map(|e| {
                        e.message.as_ref().map_or_else(
                            || format!("failed {} check", e.code),
                            ToString::to_string,
                        )
                    })
                    .unwrap_or_else(|| "invalid value".to_string());
                return (path, message);
            },
            Some(ValidationErrorsKind::Struct(inner)) => return first_violation(inner, &path),
            Some(ValidationErrorsKind::List(items)) => {
                if let Some((idx, inner)) = items.iter().next() {
                    return first_violation(inner, &format!("{path}[{idx}]"));
                }
            },
            None => {},
        }
    }
    (prefix.to_string(), "invalid value".to_string())
}
