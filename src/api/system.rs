//! Landing, liveness and cache inspection endpoints.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::sync::Arc;

use super::auth::CurrentUser;
use super::{ApiError, ApiResponse, AppState, PingResponse, RootResponse};
use crate::domain::MISSION_CATALOG;
use crate::services::require_admin;

#[derive(Debug, Serialize)]
pub struct HealthLiveResponse {
    pub status: &'static str,
    pub uptime_seconds: u64,
}

#[derive(Debug, Serialize)]
pub struct HealthReadinessChecks {
    pub database: bool,
    pub cache: bool,
}

#[derive(Debug, Serialize)]
pub struct HealthReadyResponse {
    pub ready: bool,
    pub checks: HealthReadinessChecks,
}

#[derive(Debug, Serialize)]
pub struct CacheStatsResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend: Option<&'static str>,
    pub entries: u64,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
}

/// `GET /`
pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "Welcome to the Guild Arena",
        version: env!("CARGO_PKG_VERSION"),
        missions: MISSION_CATALOG.len(),
        status: "operational",
    })
}

/// `GET /ping`
pub async fn ping() -> Json<PingResponse> {
    Json(PingResponse {
        message: "The Guild is alive",
        status: "operational",
    })
}

/// `GET /api/system/health/live`
pub async fn health_live(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(ApiResponse::success(HealthLiveResponse {
        status: "alive",
        uptime_seconds: state.start_time.elapsed().as_secs(),
    }))
}

/// `GET /api/system/health/ready`
///
/// 503 while the database is unreachable. A disabled cache does not block
/// readiness.
pub async fn health_ready(State(state): State<Arc<AppState>>) -> Response {
    let db_ready = state.store().ping().await.is_ok();
    let cache_enabled = state.cache().is_enabled();

    let status = if db_ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(ApiResponse::success(HealthReadyResponse {
            ready: db_ready,
            checks: HealthReadinessChecks {
                database: db_ready,
                cache: cache_enabled,
            },
        })),
    )
        .into_response()
}

/// `GET /api/system/cache` (admin)
pub async fn cache_stats(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<ApiResponse<CacheStatsResponse>>, ApiError> {
    require_admin(&user)?;

    let cache = state.cache();
    if !cache.is_enabled() {
        return Ok(Json(ApiResponse::success(CacheStatsResponse {
            status: "unavailable",
            backend: None,
            entries: 0,
            hits: 0,
            misses: 0,
            hit_rate: 0.0,
        })));
    }

    let stats = cache.stats().await;
    Ok(Json(ApiResponse::success(CacheStatsResponse {
        status: "available",
        backend: Some(stats.backend),
        entries: stats.entries,
        hits: stats.hits,
        misses: stats.misses,
        hit_rate: hit_rate(stats.hits, stats.misses),
    })))
}

#[allow(clippy::cast_precision_loss)]
fn hit_rate(hits: u64, misses: u64) -> f64 {
    let total = hits + misses;
    if total == 0 {
        return 0.0;
    }
    (hits as f64 / total as f64 * 10_000.0).round() / 100.0
}
