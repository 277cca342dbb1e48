use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;

use poolkeeper_types::ResourceKind;

use super::accounts::{
    list_accounts, record_request_outcome, refresh_accounts, register_account, remove_account,
    set_cooldown, toggle_account, CooldownRequest, RefreshAccountsRequest, RegisterAccountRequest,
    RequestOutcomeKind, RequestOutcomeRequest, ToggleAccountRequest,
};
use crate::state::AppState;
use crate::test_helpers::{test_app_state, test_app_state_without_executor, TEST_NOW};

async fn wait_until_idle(state: &AppState) {
    for _ in 0..200 {
        if state.registry().in_flight_count() == 0 {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("refresh attempts did not finish");
}

#[tokio::test]
async fn test_list_accounts_in_registration_order() {
    let (state, _tmp) = test_app_state(&["b", "a", "c"]);
    let Json(views) = list_accounts(State(state)).await;
    let ids: Vec<_> = views.iter().map(|v| v.id.as_str()).collect();
    assert_eq!(ids, vec!["b", "a", "c"]);
    assert!(views.iter().all(|v| v.quota.text.available && !v.in_flight));
}

#[tokio::test]
async fn test_register_account_persists() {
    let (state, tmp) = test_app_state(&[]);
    let (status, Json(account)) = register_account(
        State(state.clone()),
        Json(RegisterAccountRequest {
            id: "acc-new".to_string(),
            label: Some("primary".to_string()),
            expires_at: None,
        }),
    )
    .await
    .unwrap();

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(account.label.as_deref(), Some("primary"));
    assert_eq!(state.get_account_count(), 1);
    let stored = std::fs::read_to_string(tmp.path().join("accounts.json")).unwrap();
    assert!(stored.contains("acc-new"));
}

#[tokio::test]
async fn test_register_duplicate_is_conflict() {
    let (state, _tmp) = test_app_state(&["acc-1"]);
    let err = register_account(
        State(state),
        Json(RegisterAccountRequest { id: "acc-1".to_string(), label: None, expires_at: None }),
    )
    .await
    .unwrap_err();
    assert_eq!(err.0, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_register_blank_id_is_bad_request() {
    let (state, _tmp) = test_app_state(&[]);
    let err = register_account(
        State(state),
        Json(RegisterAccountRequest { id: "  ".to_string(), label: None, expires_at: None }),
    )
    .await
    .unwrap_err();
    assert_eq!(err.0, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_remove_account() {
    let (state, _tmp) = test_app_state(&["acc-1", "acc-2"]);
    let Json(removed) =
        remove_account(State(state.clone()), Path("acc-1".to_string())).await.unwrap();
    assert_eq!(removed.id, "acc-1");
    assert_eq!(state.get_account_count(), 1);

    let err = remove_account(State(state), Path("acc-1".to_string())).await.unwrap_err();
    assert_eq!(err.0, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_refresh_accounts_reports_accepted_and_skipped() {
    let (state, _tmp) = test_app_state(&["acc-1", "acc-2"]);
    state.registry().set_disabled("acc-2", true, None).unwrap();

    let (status, Json(response)) = refresh_accounts(
        State(state.clone()),
        Json(RefreshAccountsRequest {
            account_ids: vec![
                "acc-1".to_string(),
                "acc-2".to_string(),
                "missing".to_string(),
                "acc-1".to_string(),
            ],
        }),
    )
    .await
    .unwrap();

    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(response.accepted, vec!["acc-1".to_string()]);
    let skipped: Vec<_> = response.skipped.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(skipped, vec!["acc-2", "missing"]);

    wait_until_idle(&state).await;
    let snapshot = state.registry().get("acc-1").unwrap();
    let refresh_state = snapshot.state.unwrap();
    assert_eq!(refresh_state.last_success_at, TEST_NOW);
    assert_eq!(refresh_state.consecutive_failures, 0);
}

#[tokio::test]
async fn test_refresh_accounts_rejects_empty_list() {
    let (state, _tmp) = test_app_state(&["acc-1"]);
    let err = refresh_accounts(State(state), Json(RefreshAccountsRequest { account_ids: vec![] }))
        .await
        .unwrap_err();
    assert_eq!(err.0, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_refresh_accounts_without_executor_is_unavailable() {
    let (state, _tmp) = test_app_state_without_executor(&["acc-1"]);
    let err = refresh_accounts(
        State(state.clone()),
        Json(RefreshAccountsRequest { account_ids: vec!["acc-1".to_string()] }),
    )
    .await
    .unwrap_err();
    assert_eq!(err.0, StatusCode::SERVICE_UNAVAILABLE);
    assert!(state.registry().get("acc-1").unwrap().state.is_none());
}

#[tokio::test]
async fn test_toggle_account() {
    let (state, _tmp) = test_app_state(&["acc-1"]);
    let Json(account) = toggle_account(
        State(state.clone()),
        Path("acc-1".to_string()),
        Json(ToggleAccountRequest { enable: false, reason: Some("maintenance".to_string()) }),
    )
    .await
    .unwrap();
    assert!(account.disabled);
    assert_eq!(account.disabled_reason.as_deref(), Some("maintenance"));

    let Json(account) = toggle_account(
        State(state),
        Path("acc-1".to_string()),
        Json(ToggleAccountRequest { enable: true, reason: None }),
    )
    .await
    .unwrap();
    assert!(!account.disabled);
    assert!(account.disabled_reason.is_none());
}

#[tokio::test]
async fn test_toggle_unknown_account_is_404() {
    let (state, _tmp) = test_app_state(&[]);
    let err = toggle_account(
        State(state),
        Path("ghost".to_string()),
        Json(ToggleAccountRequest { enable: true, reason: None }),
    )
    .await
    .unwrap_err();
    assert_eq!(err.0, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_set_and_clear_cooldown() {
    let (state, _tmp) = test_app_state(&["acc-1"]);
    let Json(view) = set_cooldown(
        State(state.clone()),
        Path("acc-1".to_string()),
        Json(CooldownRequest {
            resource: ResourceKind::Images,
            seconds: 120.0,
            reason: Some("rate limited".to_string()),
        }),
    )
    .await
    .unwrap();
    assert!(!view.quota.images.available);
    assert_eq!(view.quota.images.remaining_seconds, Some(120.0));
    assert!(view.quota.text.available);
    assert_eq!(view.quota.cooldown_reason.as_deref(), Some("rate limited"));

    let Json(view) = set_cooldown(
        State(state),
        Path("acc-1".to_string()),
        Json(CooldownRequest { resource: ResourceKind::Images, seconds: 0.0, reason: None }),
    )
    .await
    .unwrap();
    assert!(view.quota.images.available);
    assert!(view.cooldowns.images.is_none());
}

#[tokio::test]
async fn test_record_request_outcome_counts() {
    let (state, _tmp) = test_app_state(&["acc-1"]);
    for _ in 0..2 {
        record_request_outcome(
            State(state.clone()),
            Path("acc-1".to_string()),
            Json(RequestOutcomeRequest { kind: RequestOutcomeKind::Error }),
        )
        .await
        .unwrap();
    }
    let Json(body) = record_request_outcome(
        State(state.clone()),
        Path("acc-1".to_string()),
        Json(RequestOutcomeRequest { kind: RequestOutcomeKind::Failure }),
    )
    .await
    .unwrap();
    assert_eq!(body["count"], 1);

    let account = state.registry().get("acc-1").unwrap().account;
    assert_eq!(account.error_count, 2);
    assert_eq!(account.failure_count, 1);

    let err = record_request_outcome(
        State(state),
        Path("ghost".to_string()),
        Json(RequestOutcomeRequest { kind: RequestOutcomeKind::Error }),
    )
    .await
    .unwrap_err();
    assert_eq!(err.0, StatusCode::NOT_FOUND);
}
