//! Integration tests for mission completion, ranks and the progress ledger.

mod common;

use axum::http::{Method, StatusCode};
use common::{admin_token, call, get, member, spawn_app};
use serde_json::json;

fn complete_uri(user_id: i64, mission_id: i32, score: Option<f64>) -> String {
    match score {
        Some(score) => format!("/api/users/{user_id}/missions/{mission_id}/complete?score={score}"),
        None => format!("/api/users/{user_id}/missions/{mission_id}/complete"),
    }
}

#[tokio::test]
async fn test_three_completions_reach_adept() {
    let app = spawn_app().await;
    let (alice_id, token) = member(&app, "alice").await;

    let mut last = None;
    for mission_id in 1..=3 {
        let response = call(
            &app,
            Method::POST,
            &complete_uri(alice_id, mission_id, Some(100.0)),
            Some(&token),
            None,
        )
        .await;
        assert_eq!(response.status, StatusCode::OK, "{}", response.body);
        assert_eq!(response.body["experience_earned"], 10);
        last = Some(response.body);
    }

    let last = last.unwrap();
    assert_eq!(last["total_experience"], 30);
    assert_eq!(last["missions_completed"], 3);
    assert_eq!(last["guild_rank"], "Adept");
    assert_eq!(last["message"], "Mission 'Seal of the Keeper' completed!");

    let user = get(&app, &format!("/api/users/{alice_id}"), None).await;
    assert_eq!(user.body["data"]["experience_points"], 30);
    assert_eq!(user.body["data"]["guild_rank"], "Adept");

    let ledger = get(
        &app,
        &format!("/api/users/{alice_id}/missions"),
        Some(&token),
    )
    .await;
    let rows = ledger.body["data"].as_array().unwrap();
    assert_eq!(rows.len(), 3);
    assert!(rows.iter().all(|row| row["status"] == "completed"));
}

#[tokio::test]
async fn test_score_defaults_and_truncates() {
    let app = spawn_app().await;
    let (alice_id, token) = member(&app, "alice").await;

    let default_score = call(
        &app,
        Method::POST,
        &complete_uri(alice_id, 1, None),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(default_score.body["experience_earned"], 10);

    let partial = call(
        &app,
        Method::POST,
        &complete_uri(alice_id, 2, Some(95.0)),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(partial.body["experience_earned"], 9);
    assert_eq!(partial.body["total_experience"], 19);
}

#[tokio::test]
async fn test_invalid_completion_input() {
    let app = spawn_app().await;
    let (alice_id, token) = member(&app, "alice").await;

    for uri in [
        complete_uri(alice_id, 1, Some(-5.0)),
        complete_uri(alice_id, 0, Some(100.0)),
        format!("/api/users/{alice_id}/missions/1/complete?score=lots"),
    ] {
        let response = call(&app, Method::POST, &uri, Some(&token), None).await;
        assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY, "{uri}");
    }

    let user = get(&app, &format!("/api/users/{alice_id}"), None).await;
    assert_eq!(user.body["data"]["experience_points"], 0);
}

#[tokio::test]
async fn test_completion_requires_token() {
    let app = spawn_app().await;
    let (alice_id, _) = member(&app, "alice").await;

    let response = call(
        &app,
        Method::POST,
        &complete_uri(alice_id, 1, Some(100.0)),
        None,
        None,
    )
    .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_non_owner_cannot_complete_for_others() {
    let app = spawn_app().await;
    let (alice_id, _) = member(&app, "alice").await;
    let (_, bob_token) = member(&app, "bob").await;

    let response = call(
        &app,
        Method::POST,
        &complete_uri(alice_id, 1, Some(100.0)),
        Some(&bob_token),
        None,
    )
    .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    let user = get(&app, &format!("/api/users/{alice_id}"), None).await;
    assert_eq!(user.body["data"]["experience_points"], 0);
    assert_eq!(user.body["data"]["missions_completed"], 0);
}

#[tokio::test]
async fn test_admin_completes_for_member() {
    let app = spawn_app().await;
    let (alice_id, _) = member(&app, "alice").await;
    let admin = admin_token(&app).await;

    let response = call(
        &app,
        Method::POST,
        &complete_uri(alice_id, 4, Some(80.0)),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["total_experience"], 8);

    let missing = call(
        &app,
        Method::POST,
        &complete_uri(9999, 4, Some(80.0)),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_ledger_state_machine() {
    let app = spawn_app().await;
    let (alice_id, token) = member(&app, "alice").await;

    let started = call(
        &app,
        Method::POST,
        &format!("/api/users/{alice_id}/missions/5/start"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(started.status, StatusCode::OK);
    assert_eq!(started.body["data"]["status"], "in_progress");
    assert_eq!(started.body["data"]["mission_name"], "Parallel Prophecies");
    assert!(started.body["data"]["started_at"].is_string());

    let completed = call(
        &app,
        Method::PUT,
        &format!("/api/users/{alice_id}/missions/5"),
        Some(&token),
        Some(json!({"status": "completed", "score": 70.0})),
    )
    .await;
    assert_eq!(completed.status, StatusCode::OK);
    assert_eq!(completed.body["data"]["status"], "completed");
    assert!(completed.body["data"]["completed_at"].is_string());

    let reopened = call(
        &app,
        Method::PUT,
        &format!("/api/users/{alice_id}/missions/5"),
        Some(&token),
        Some(json!({"status": "in_progress"})),
    )
    .await;
    assert_eq!(reopened.status, StatusCode::UNPROCESSABLE_ENTITY);

    let bad_status = call(
        &app,
        Method::PUT,
        &format!("/api/users/{alice_id}/missions/5"),
        Some(&token),
        Some(json!({"status": "abandoned"})),
    )
    .await;
    assert_eq!(bad_status.status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_repeated_mission_keeps_counting() {
    let app = spawn_app().await;
    let (alice_id, token) = member(&app, "alice").await;

    for _ in 0..3 {
        let response = call(
            &app,
            Method::POST,
            &complete_uri(alice_id, 1, Some(100.0)),
            Some(&token),
            None,
        )
        .await;
        assert_eq!(response.status, StatusCode::OK);
    }

    let user = get(&app, &format!("/api/users/{alice_id}"), None).await;
    assert_eq!(user.body["data"]["missions_completed"], 3);
    assert_eq!(user.body["data"]["guild_rank"], "Adept");

    let ledger = get(
        &app,
        &format!("/api/users/{alice_id}/missions"),
        Some(&token),
    )
    .await;
    assert_eq!(ledger.body["data"].as_array().unwrap().len(), 1);
}
