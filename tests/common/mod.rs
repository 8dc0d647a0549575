//! Shared harness: a fresh file-backed database per app, driven with `oneshot`.

#![allow(dead_code)]

use arena::config::Config;
use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Method, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

pub const ADMIN_USERNAME: &str = "admin";
pub const ADMIN_PASSWORD: &str = "admin123";

pub fn test_config() -> Config {
    let db_path =
        std::env::temp_dir().join(format!("arena-test-{}.db", uuid::Uuid::new_v4()));

    let mut config = Config::default();
    config.general.database_path = format!("sqlite:{}", db_path.display());
    config.security.jwt_secret = "integration-test-secret".to_string();
    config.security.argon2_memory_cost_kib = 1024;
    config.security.argon2_time_cost = 1;
    config
}

pub async fn spawn_app() -> Router {
    spawn_app_with(test_config()).await
}

pub async fn spawn_app_with(config: Config) -> Router {
    let state = arena::api::create_app_state_from_config(config, None)
        .await
        .expect("Failed to create app state");
    arena::api::router(state)
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

pub async fn send(app: &Router, request: Request<Body>) -> TestResponse {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();

    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };

    TestResponse {
        status,
        headers,
        body,
    }
}

pub async fn call(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> TestResponse {
    let mut builder = Request::builder().method(method).uri(uri);

    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }

    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    send(app, request).await
}

pub async fn get(app: &Router, uri: &str, token: Option<&str>) -> TestResponse {
    call(app, Method::GET, uri, token, None).await
}

pub async fn register(app: &Router, username: &str, password: &str) -> Value {
    let response = call(
        app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(serde_json::json!({
            "username": username,
            "email": format!("{username}@example.com"),
            "password": password,
        })),
    )
    .await;

    assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
    response.body["data"].clone()
}

pub async fn token_request(app: &Router, username: &str, password: &str) -> TestResponse {
    let form = format!("username={username}&password={password}");
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/auth/token")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(form))
        .unwrap();

    send(app, request).await
}

pub async fn login(app: &Router, username: &str, password: &str) -> String {
    let response = token_request(app, username, password).await;
    assert_eq!(response.status, StatusCode::OK, "{}", response.body);
    response.body["access_token"].as_str().unwrap().to_string()
}

/// Registers `username` and returns its id and a bearer token.
pub async fn member(app: &Router, username: &str) -> (i64, String) {
    let user = register(app, username, "password123").await;
    let token = login(app, username, "password123").await;
    (user["id"].as_i64().unwrap(), token)
}

pub async fn admin_token(app: &Router) -> String {
    login(app, ADMIN_USERNAME, ADMIN_PASSWORD).await
}
