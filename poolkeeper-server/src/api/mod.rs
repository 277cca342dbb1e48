//! API Routes
//!
//! Admin REST endpoints for the account pool and the scheduled refresh coordinator.

mod accounts;
mod scheduled_refresh;

#[cfg(test)]
mod accounts_tests;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{delete, get, post},
    Router,
};
use serde::Serialize;

use poolkeeper_types::AccountError;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        // Status
        .route("/status", get(get_status))
        // Scheduled refresh
        .route("/scheduled-refresh/states", get(scheduled_refresh::get_states))
        .route("/scheduled-refresh/run", post(scheduled_refresh::run_now))
        // Accounts
        .route("/accounts", get(accounts::list_accounts))
        .route("/accounts", post(accounts::register_account))
        .route("/accounts/refresh", post(accounts::refresh_accounts))
        .route("/accounts/:id", delete(accounts::remove_account))
        .route("/accounts/:id/toggle", post(accounts::toggle_account))
        .route("/accounts/:id/cooldown", post(accounts::set_cooldown))
        .route("/accounts/:id/request-outcome", post(accounts::record_request_outcome))
        // API fallback: return 404 for unknown API endpoints
        .fallback(api_not_found)
}

async fn api_not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(serde_json::json!({"error": "Not found"})))
}

/// Map registry errors onto HTTP status codes.
pub(crate) fn account_error_response(err: AccountError) -> (StatusCode, String) {
    let status = match &err {
        AccountError::NotFound { .. } => StatusCode::NOT_FOUND,
        AccountError::AlreadyExists { .. }
        | AccountError::AlreadyInFlight { .. }
        | AccountError::Disabled { .. }
        | AccountError::StaleAttempt { .. } => StatusCode::CONFLICT,
    };
    (status, err.to_string())
}

#[derive(Serialize)]
struct StatusResponse {
    version: String,
    accounts_count: usize,
    in_flight: usize,
    executor_configured: bool,
    shutting_down: bool,
}

async fn get_status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        accounts_count: state.get_account_count(),
        in_flight: state.registry().in_flight_count(),
        executor_configured: state.executor_configured(),
        shutting_down: state.scheduler().is_shutting_down(),
    })
}
