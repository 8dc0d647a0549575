//! Integration tests for registration, token issuance and bearer resolution.

mod common;

use axum::http::{Method, StatusCode, header};
use common::{call, get, login, member, register, spawn_app, token_request};
use serde_json::json;

#[tokio::test]
async fn test_register_returns_new_member() {
    let app = spawn_app().await;

    let user = register(&app, "alice", "password123").await;

    assert_eq!(user["username"], "alice");
    assert_eq!(user["email"], "alice@example.com");
    assert_eq!(user["guild_rank"], "Apprentice");
    assert_eq!(user["experience_points"], 0);
    assert_eq!(user["missions_completed"], 0);
    assert_eq!(user["is_active"], true);
    assert_eq!(user["is_admin"], false);
    assert!(user.get("password_hash").is_none());
    assert!(user.get("hashed_password").is_none());
}

#[tokio::test]
async fn test_token_endpoint_issues_bearer() {
    let app = spawn_app().await;
    register(&app, "alice", "password123").await;

    let response = token_request(&app, "alice", "password123").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["token_type"], "bearer");
    assert_eq!(response.body["expires_in"], 1800);
    let token = response.body["access_token"].as_str().unwrap();
    assert_eq!(token.split('.').count(), 3);

    let me = get(&app, "/api/users/me", Some(token)).await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.body["data"]["username"], "alice");
}

#[tokio::test]
async fn test_json_login_uses_envelope() {
    let app = spawn_app().await;
    register(&app, "alice", "password123").await;

    let response = call(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({"username": "alice", "password": "password123"})),
    )
    .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["success"], true);
    assert!(response.body["data"]["access_token"].is_string());
}

#[tokio::test]
async fn test_wrong_password_and_unknown_user_are_indistinguishable() {
    let app = spawn_app().await;
    register(&app, "alice", "password123").await;

    let wrong_password = token_request(&app, "alice", "wrongpass1").await;
    let unknown_user = token_request(&app, "bob", "password123").await;

    assert_eq!(wrong_password.status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_user.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password.body, unknown_user.body);
    assert_eq!(
        wrong_password.body["error"],
        "Incorrect username or password"
    );
    assert_eq!(
        wrong_password.headers.get(header::WWW_AUTHENTICATE).unwrap(),
        "Bearer"
    );
}

#[tokio::test]
async fn test_missing_or_invalid_token_rejected() {
    let app = spawn_app().await;

    for token in [None, Some("not-a-token"), Some("a.b.c")] {
        let response = get(&app, "/api/users/me", token).await;
        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
        assert_eq!(response.body["error"], "Could not validate credentials");
        assert_eq!(
            response.headers.get(header::WWW_AUTHENTICATE).unwrap(),
            "Bearer"
        );
    }
}

#[tokio::test]
async fn test_token_from_other_secret_rejected() {
    let mut other = common::test_config();
    other.security.jwt_secret = "some-other-secret".to_string();
    let other_app = common::spawn_app_with(other).await;
    let (_, foreign_token) = member(&other_app, "alice").await;

    let app = spawn_app().await;
    register(&app, "alice", "password123").await;

    let response = get(&app, "/api/auth/me", Some(&foreign_token)).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_deleted_member_token_stops_working() {
    let app = spawn_app().await;
    let (alice_id, alice_token) = member(&app, "alice").await;
    let admin = common::admin_token(&app).await;

    let deleted = call(
        &app,
        Method::DELETE,
        &format!("/api/users/{alice_id}"),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);

    let response = get(&app, "/api/users/me", Some(&alice_token)).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_change_password() {
    let app = spawn_app().await;
    let (_, token) = member(&app, "alice").await;

    let wrong_current = call(
        &app,
        Method::PUT,
        "/api/auth/password",
        Some(&token),
        Some(json!({"current_password": "nope-nope", "new_password": "newpassword1"})),
    )
    .await;
    assert_eq!(wrong_current.status, StatusCode::UNPROCESSABLE_ENTITY);

    let changed = call(
        &app,
        Method::PUT,
        "/api/auth/password",
        Some(&token),
        Some(json!({"current_password": "password123", "new_password": "newpassword1"})),
    )
    .await;
    assert_eq!(changed.status, StatusCode::OK);

    let old = token_request(&app, "alice", "password123").await;
    assert_eq!(old.status, StatusCode::UNAUTHORIZED);
    login(&app, "alice", "newpassword1").await;
}

#[tokio::test]
async fn test_malformed_login_body_is_validation_error() {
    let app = spawn_app().await;

    let response = call(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({"username": "alice"})),
    )
    .await;

    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response.body["success"], false);
}
