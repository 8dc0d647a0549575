use axum::{
    Router,
    http::HeaderValue,
    middleware,
    routing::{get, post, put},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::cache::Cache;
use crate::config::Config;
use crate::state::SharedState;

mod analytics;
pub mod auth;
mod error;
mod missions;
mod observability;
mod system;
mod types;
mod users;
mod validation;

pub use error::ApiError;
pub use types::*;

use crate::services::{AnalyticsService, AuthService, GuildService, UserService};
use metrics_exporter_prometheus::PrometheusHandle;

#[derive(Clone)]
pub struct AppState {
    pub shared: Arc<SharedState>,

    pub start_time: std::time::Instant,

    pub prometheus_handle: Option<PrometheusHandle>,
}

impl AppState {
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.shared.config
    }

    #[must_use]
    pub fn store(&self) -> &crate::db::Store {
        &self.shared.store
    }

    #[must_use]
    pub fn cache(&self) -> &Cache {
        &self.shared.cache
    }

    #[must_use]
    pub fn auth_service(&self) -> &Arc<dyn AuthService> {
        &self.shared.auth_service
    }

    #[must_use]
    pub fn user_service(&self) -> &Arc<dyn UserService> {
        &self.shared.user_service
    }

    #[must_use]
    pub fn guild_service(&self) -> &Arc<dyn GuildService> {
        &self.shared.guild_service
    }

    #[must_use]
    pub fn analytics_service(&self) -> &Arc<dyn AnalyticsService> {
        &self.shared.analytics_service
    }
}

#[must_use]
pub fn create_app_state(
    shared: Arc<SharedState>,
    prometheus_handle: Option<PrometheusHandle>,
) -> Arc<AppState> {
    Arc::new(AppState {
        shared,
        start_time: std::time::Instant::now(),
        prometheus_handle,
    })
}

pub async fn create_app_state_from_config(
    config: Config,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<Arc<AppState>> {
    let shared = Arc::new(SharedState::new(config).await?);
    Ok(create_app_state(shared, prometheus_handle))
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors_origins = state.config().server.cors_allowed_origins.clone();

    let cors_layer = if cors_origins.iter().any(|origin| origin == "*") {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> =
            cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new().allow_origin(origins)
    };

    Router::new()
        .route("/", get(system::root))
        .route("/ping", get(system::ping))
        .route("/missions", get(missions::list_catalog))
        .route("/metrics", get(observability::get_metrics))
        .nest("/api", api_router())
        .with_state(state)
        .layer(middleware::from_fn(observability::track_requests))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer.allow_methods(Any).allow_headers(Any))
}

fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/token", post(auth::token))
        .route("/auth/login", post(auth::login))
        .route("/auth/me", get(auth::me))
        .route("/auth/password", put(auth::change_password))
        .route("/users", get(users::list_users).post(users::create_user))
        .route("/users/me", get(users::get_me))
        .route(
            "/users/{id}",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .route("/users/{id}/active", put(users::set_active))
        .route("/users/{id}/missions", get(missions::list_progress))
        .route(
            "/users/{id}/missions/{mission_id}",
            put(missions::update_progress),
        )
        .route(
            "/users/{id}/missions/{mission_id}/start",
            post(missions::start_mission),
        )
        .route(
            "/users/{id}/missions/{mission_id}/complete",
            post(missions::complete_mission),
        )
        .route("/analytics/users/stats", get(analytics::user_stats))
        .route("/analytics/missions/stats", get(analytics::mission_stats))
        .route(
            "/analytics/users/{id}/performance",
            get(analytics::user_performance),
        )
        .route("/analytics/leaderboard", get(analytics::leaderboard))
        .route("/system/health/live", get(system::health_live))
        .route("/system/health/ready", get(system::health_ready))
        .route("/system/cache", get(system::cache_stats))
}
