//! Scheduled refresh observability and manual tick trigger.

use axum::{extract::State, http::StatusCode, response::Json};

use poolkeeper_core::StateReporter;
use poolkeeper_types::ScheduledRefreshStatesResponse;

use crate::state::AppState;

pub async fn get_states(State(state): State<AppState>) -> Json<ScheduledRefreshStatesResponse> {
    let scheduler = state.scheduler();
    let snapshot = scheduler.registry().snapshot();
    let settings = scheduler.settings();
    let status = scheduler.status();
    Json(StateReporter::report(&snapshot, &settings.batch, &status, state.now()))
}

/// Start one scheduler tick in the background.
pub async fn run_now(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<serde_json::Value>), (StatusCode, String)> {
    if state.scheduler().is_shutting_down() {
        return Err((StatusCode::SERVICE_UNAVAILABLE, "scheduler is shutting down".to_string()));
    }
    if !state.executor_configured() {
        return Err((
            StatusCode::SERVICE_UNAVAILABLE,
            "no refresh executor configured".to_string(),
        ));
    }

    drop(state.scheduler().run_now());
    tracing::info!("[Admin] Scheduled refresh tick triggered");
    Ok((StatusCode::ACCEPTED, Json(serde_json::json!({"started": true}))))
}
