//! Integration tests for landing, health, cache and analytics endpoints.

mod common;

use axum::http::{Method, StatusCode};
use common::{admin_token, call, get, member, spawn_app, spawn_app_with, test_config};

#[tokio::test]
async fn test_root_and_ping() {
    let app = spawn_app().await;

    let root = get(&app, "/", None).await;
    assert_eq!(root.status, StatusCode::OK);
    assert_eq!(root.body["message"], "Welcome to the Guild Arena");
    assert_eq!(root.body["missions"], 13);
    assert_eq!(root.body["status"], "operational");
    assert_eq!(root.body["version"], env!("CARGO_PKG_VERSION"));

    let ping = get(&app, "/ping", None).await;
    assert_eq!(ping.status, StatusCode::OK);
    assert_eq!(
        ping.body,
        serde_json::json!({"message": "The Guild is alive", "status": "operational"})
    );
}

#[tokio::test]
async fn test_mission_catalog() {
    let app = spawn_app().await;

    let response = get(&app, "/missions", None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["total"], 13);

    let missions = response.body["missions"].as_array().unwrap();
    assert_eq!(missions.len(), 13);
    assert_eq!(missions[0]["id"], 1);
    assert_eq!(missions[0]["name"], "The First Flame");
}

#[tokio::test]
async fn test_health_endpoints() {
    let app = spawn_app().await;

    let live = get(&app, "/api/system/health/live", None).await;
    assert_eq!(live.status, StatusCode::OK);
    assert_eq!(live.body["data"]["status"], "alive");

    let ready = get(&app, "/api/system/health/ready", None).await;
    assert_eq!(ready.status, StatusCode::OK);
    assert_eq!(ready.body["data"]["ready"], true);
    assert_eq!(ready.body["data"]["checks"]["database"], true);
}

#[tokio::test]
async fn test_metrics_without_recorder() {
    let app = spawn_app().await;

    let response = get(&app, "/metrics", None).await;
    assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response.body, "Metrics recorder is not installed");
}

#[tokio::test]
async fn test_cache_stats_admin_only() {
    let app = spawn_app().await;
    let (_, alice_token) = member(&app, "alice").await;

    let anonymous = get(&app, "/api/system/cache", None).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);

    let by_member = get(&app, "/api/system/cache", Some(&alice_token)).await;
    assert_eq!(by_member.status, StatusCode::FORBIDDEN);

    let admin = admin_token(&app).await;
    get(&app, "/api/analytics/users/stats", None).await;
    get(&app, "/api/analytics/users/stats", None).await;

    let stats = get(&app, "/api/system/cache", Some(&admin)).await;
    assert_eq!(stats.status, StatusCode::OK);
    assert_eq!(stats.body["data"]["status"], "available");
    assert_eq!(stats.body["data"]["backend"], "memory");
    assert!(stats.body["data"]["hits"].as_u64().unwrap() >= 1);
}

#[tokio::test]
async fn test_cache_stats_when_disabled() {
    let mut config = test_config();
    config.cache.backend = "disabled".to_string();
    let app = spawn_app_with(config).await;
    let admin = admin_token(&app).await;

    let stats = get(&app, "/api/system/cache", Some(&admin)).await;
    assert_eq!(stats.status, StatusCode::OK);
    assert_eq!(stats.body["data"]["status"], "unavailable");

    // Analytics still work without a cache.
    let users = get(&app, "/api/analytics/users/stats", None).await;
    assert_eq!(users.status, StatusCode::OK);
}

#[tokio::test]
async fn test_analytics_reflect_completions() {
    let app = spawn_app().await;
    let (alice_id, alice_token) = member(&app, "alice").await;
    let (bob_id, bob_token) = member(&app, "bob").await;

    // Warm the cache so the completions below must invalidate it.
    let before = get(&app, "/api/analytics/users/stats", None).await;
    assert_eq!(before.body["total_missions_completed"], 0);

    for (user_id, token, score) in [
        (alice_id, &alice_token, 100.0),
        (alice_id, &alice_token, 90.0),
        (bob_id, &bob_token, 50.0),
    ] {
        let response = call(
            &app,
            Method::POST,
            &format!("/api/users/{user_id}/missions/1/complete?score={score}"),
            Some(token),
            None,
        )
        .await;
        assert_eq!(response.status, StatusCode::OK);
    }

    let users = get(&app, "/api/analytics/users/stats", None).await;
    assert_eq!(users.status, StatusCode::OK);
    assert_eq!(users.body["total_users"], 3);
    assert_eq!(users.body["active_users"], 3);
    assert_eq!(users.body["total_missions_completed"], 3);

    let missions = get(&app, "/api/analytics/missions/stats", None).await;
    let first = &missions.body["missions"][0];
    assert_eq!(first["mission_id"], 1);
    assert_eq!(first["mission_name"], "The First Flame");
    assert_eq!(first["total_attempts"], 2);

    let board = get(&app, "/api/analytics/leaderboard?limit=2", None).await;
    let entries = board.body["leaderboard"].as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["rank"], 1);
    assert_eq!(entries[0]["username"], "alice");
    assert_eq!(entries[0]["experience_points"], 19);
    assert_eq!(entries[1]["username"], "bob");

    let bad_limit = get(&app, "/api/analytics/leaderboard?limit=500", None).await;
    assert_eq!(bad_limit.status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_performance_requires_authentication() {
    let app = spawn_app().await;
    let (alice_id, alice_token) = member(&app, "alice").await;
    let (_, bob_token) = member(&app, "bob").await;

    call(
        &app,
        Method::POST,
        &format!("/api/users/{alice_id}/missions/2/complete?score=80"),
        Some(&alice_token),
        None,
    )
    .await;

    let anonymous = get(
        &app,
        &format!("/api/analytics/users/{alice_id}/performance"),
        None,
    )
    .await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);

    let response = get(
        &app,
        &format!("/api/analytics/users/{alice_id}/performance"),
        Some(&bob_token),
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["username"], "alice");
    assert_eq!(response.body["total_experience"], 8);
    assert_eq!(response.body["missions_completed"], 1);

    let missing = get(
        &app,
        "/api/analytics/users/9999/performance",
        Some(&bob_token),
    )
    .await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
}
