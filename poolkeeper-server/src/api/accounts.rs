//! Account management handlers: list, register, remove, toggle, cooldown, counters, refresh

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;

use poolkeeper_core::StateReporter;
use poolkeeper_types::models::{AccountView, ManualRefreshResponse};
use poolkeeper_types::{Account, ResourceKind};

use super::account_error_response;
use crate::state::AppState;

pub async fn list_accounts(State(state): State<AppState>) -> Json<Vec<AccountView>> {
    let snapshot = state.registry().snapshot();
    Json(StateReporter::accounts(&snapshot, state.now()))
}

#[derive(Deserialize)]
pub struct RegisterAccountRequest {
    pub id: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub expires_at: Option<i64>,
}

pub async fn register_account(
    State(state): State<AppState>,
    Json(payload): Json<RegisterAccountRequest>,
) -> Result<(StatusCode, Json<Account>), (StatusCode, String)> {
    let id = payload.id.trim();
    if id.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "account id must not be empty".to_string()));
    }

    let mut account = Account::new(id);
    account.label = payload.label;
    account.expires_at = payload.expires_at;

    state.registry().register(account.clone()).map_err(account_error_response)?;
    state.scheduler().persist().await;
    tracing::info!("[Admin] Registered account {}", account.id);
    Ok((StatusCode::CREATED, Json(account)))
}

pub async fn remove_account(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Account>, (StatusCode, String)> {
    let removed = state.registry().remove(&id).map_err(account_error_response)?;
    state.scheduler().persist().await;
    tracing::info!("[Admin] Removed account {}", id);
    Ok(Json(removed))
}

#[derive(Deserialize)]
pub struct RefreshAccountsRequest {
    pub account_ids: Vec<String>,
}

/// Refresh the listed accounts now, bypassing backoff and batch fairness.
pub async fn refresh_accounts(
    State(state): State<AppState>,
    Json(payload): Json<RefreshAccountsRequest>,
) -> Result<(StatusCode, Json<ManualRefreshResponse>), (StatusCode, String)> {
    if payload.account_ids.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "account_ids must not be empty".to_string()));
    }
    if !state.executor_configured() {
        return Err((
            StatusCode::SERVICE_UNAVAILABLE,
            "no refresh executor configured".to_string(),
        ));
    }

    let (response, handle) = state.scheduler().refresh_now(payload.account_ids);
    drop(handle);
    Ok((StatusCode::ACCEPTED, Json(response)))
}

#[derive(Deserialize)]
pub struct ToggleAccountRequest {
    pub enable: bool,
    #[serde(default)]
    pub reason: Option<String>,
}

pub async fn toggle_account(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<ToggleAccountRequest>,
) -> Result<Json<Account>, (StatusCode, String)> {
    let account = state
        .registry()
        .set_disabled(&id, !payload.enable, payload.reason)
        .map_err(account_error_response)?;
    state.scheduler().persist().await;
    tracing::info!(
        "[Admin] Account {} {}",
        id,
        if payload.enable { "enabled" } else { "disabled" }
    );
    Ok(Json(account))
}

#[derive(Deserialize)]
pub struct CooldownRequest {
    pub resource: ResourceKind,
    pub seconds: f64,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Put one resource on cooldown. Non-positive `seconds` clears it.
pub async fn set_cooldown(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<CooldownRequest>,
) -> Result<Json<AccountView>, (StatusCode, String)> {
    let registry = state.registry();
    if payload.seconds > 0.0 {
        registry
            .apply_cooldown(
                &id,
                payload.resource,
                payload.seconds,
                payload.reason.unwrap_or_else(|| "operator cooldown".to_string()),
            )
            .map_err(account_error_response)?;
    } else {
        registry.clear_cooldown(&id, payload.resource).map_err(account_error_response)?;
    }
    state.scheduler().persist().await;

    let snapshot = registry
        .get(&id)
        .ok_or_else(|| (StatusCode::NOT_FOUND, format!("Account not found: {id}")))?;
    let mut views = StateReporter::accounts(std::slice::from_ref(&snapshot), state.now());
    views
        .pop()
        .map(Json)
        .ok_or_else(|| (StatusCode::INTERNAL_SERVER_ERROR, "empty account view".to_string()))
}

#[derive(Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestOutcomeKind {
    Error,
    Failure,
}

#[derive(Deserialize)]
pub struct RequestOutcomeRequest {
    pub kind: RequestOutcomeKind,
}

/// Count a request the serving layer saw fail on this account.
pub async fn record_request_outcome(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<RequestOutcomeRequest>,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    let registry = state.registry();
    let count = match payload.kind {
        RequestOutcomeKind::Error => registry.record_request_error(&id),
        RequestOutcomeKind::Failure => registry.record_request_failure(&id),
    }
    .map_err(account_error_response)?;
    state.scheduler().persist().await;
    Ok(Json(serde_json::json!({ "id": id, "count": count })))
}
