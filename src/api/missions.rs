//! Mission catalog, completion and ledger endpoints.

use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
};
use std::sync::Arc;

use super::auth::CurrentUser;
use super::validation::validate_user_id;
use super::{ApiError, ApiResponse, AppState, CompleteQuery, MissionCatalogResponse};
use crate::db::MissionProgressRow;
use crate::domain::MISSION_CATALOG;
use crate::services::{CompletionOutcome, GuildError, ProgressUpdate};

impl From<GuildError> for ApiError {
    fn from(err: GuildError) -> Self {
        match err {
            GuildError::Validation(msg) => Self::ValidationError(msg),
            GuildError::Forbidden(msg) => Self::Forbidden(msg),
            GuildError::UserNotFound(id) => Self::not_found("User", id),
            GuildError::Database(msg) => Self::DatabaseError(msg),
            GuildError::Internal(msg) => Self::InternalError(msg),
        }
    }
}

/// `GET /missions`
pub async fn list_catalog() -> Json<MissionCatalogResponse> {
    Json(MissionCatalogResponse {
        missions: MISSION_CATALOG.to_vec(),
        total: MISSION_CATALOG.len(),
    })
}

/// `POST /api/users/{id}/missions/{mission_id}/complete?score=`
///
/// Score defaults to 100.
pub async fn complete_mission(
    State(state): State<Arc<AppState>>,
    CurrentUser(actor): CurrentUser,
    Path((user_id, mission_id)): Path<(i32, i32)>,
    query: Result<Query<CompleteQuery>, QueryRejection>,
) -> Result<Json<CompletionOutcome>, ApiError> {
    let Query(query) = query?;
    let user_id = validate_user_id(user_id)?;

    let outcome = state
        .guild_service()
        .complete_mission(&actor, user_id, mission_id, query.score)
        .await?;

    Ok(Json(outcome))
}

/// `GET /api/users/{id}/missions`
pub async fn list_progress(
    State(state): State<Arc<AppState>>,
    CurrentUser(actor): CurrentUser,
    Path(user_id): Path<i32>,
) -> Result<Json<ApiResponse<Vec<MissionProgressRow>>>, ApiError> {
    let user_id = validate_user_id(user_id)?;
    let rows = state.guild_service().list_progress(&actor, user_id).await?;
    Ok(Json(ApiResponse::success(rows)))
}

/// `POST /api/users/{id}/missions/{mission_id}/start`
pub async fn start_mission(
    State(state): State<Arc<AppState>>,
    CurrentUser(actor): CurrentUser,
    Path((user_id, mission_id)): Path<(i32, i32)>,
) -> Result<Json<ApiResponse<MissionProgressRow>>, ApiError> {
    let user_id = validate_user_id(user_id)?;
    let row = state
        .guild_service()
        .start_mission(&actor, user_id, mission_id)
        .await?;
    Ok(Json(ApiResponse::success(row)))
}

/// `PUT /api/users/{id}/missions/{mission_id}`
pub async fn update_progress(
    State(state): State<Arc<AppState>>,
    CurrentUser(actor): CurrentUser,
    Path((user_id, mission_id)): Path<(i32, i32)>,
    payload: Result<Json<ProgressUpdate>, JsonRejection>,
) -> Result<Json<ApiResponse<MissionProgressRow>>, ApiError> {
    let Json(payload) = payload?;
    let user_id = validate_user_id(user_id)?;

    let row = state
        .guild_service()
        .update_progress(&actor, user_id, mission_id, payload)
        .await?;
    Ok(Json(ApiResponse::success(row)))
}
