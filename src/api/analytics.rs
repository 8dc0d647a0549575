//! Guild archive endpoints. Every response comes through the analytics cache.

use axum::{
    Json,
    extract::{Path, Query, State, rejection::QueryRejection},
};
use std::sync::Arc;

use super::auth::CurrentUser;
use super::validation::{validate_leaderboard_limit, validate_user_id};
use super::{ApiError, AppState, LeaderboardQuery};
use crate::services::{
    AnalyticsError, Leaderboard, MissionStatsReport, UserPerformance, UserStats,
};

impl From<AnalyticsError> for ApiError {
    fn from(err: AnalyticsError) -> Self {
        match err {
            AnalyticsError::UserNotFound(id) => Self::not_found("User", id),
            AnalyticsError::Database(msg) => Self::DatabaseError(msg),
            AnalyticsError::Internal(msg) => Self::InternalError(msg),
        }
    }
}

/// `GET /api/analytics/users/stats`
pub async fn user_stats(State(state): State<Arc<AppState>>) -> Result<Json<UserStats>, ApiError> {
    Ok(Json(state.analytics_service().user_stats().await?))
}

/// `GET /api/analytics/missions/stats`
pub async fn mission_stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<MissionStatsReport>, ApiError> {
    Ok(Json(state.analytics_service().mission_stats().await?))
}

/// `GET /api/analytics/users/{id}/performance` (authenticated)
pub async fn user_performance(
    State(state): State<Arc<AppState>>,
    CurrentUser(_viewer): CurrentUser,
    Path(user_id): Path<i32>,
) -> Result<Json<UserPerformance>, ApiError> {
    let user_id = validate_user_id(user_id)?;
    Ok(Json(
        state.analytics_service().user_performance(user_id).await?,
    ))
}

/// `GET /api/analytics/leaderboard?limit=10`
pub async fn leaderboard(
    State(state): State<Arc<AppState>>,
    query: Result<Query<LeaderboardQuery>, QueryRejection>,
) -> Result<Json<Leaderboard>, ApiError> {
    let Query(query) = query?;
    let limit = validate_leaderboard_limit(query.limit)?;
    Ok(Json(state.analytics_service().leaderboard(limit).await?))
}
