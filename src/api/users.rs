//! Member registry endpoints.

use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
};
use std::sync::Arc;

use super::auth::CurrentUser;
use super::validation::{validate_limit, validate_user_id};
use super::{ActiveRequest, ApiError, ApiResponse, AppState, PageQuery};
use crate::db::User;
use crate::services::{RegisterUser, UpdateUser, UserError};

impl From<UserError> for ApiError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::Validation(msg) => Self::ValidationError(msg),
            UserError::Conflict(msg) => Self::Conflict(msg),
            UserError::NotFound(id) => Self::not_found("User", id),
            UserError::Forbidden(msg) => Self::Forbidden(msg),
            UserError::Database(msg) => Self::DatabaseError(msg),
            UserError::Internal(msg) => Self::InternalError(msg),
        }
    }
}

/// `POST /api/users`
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RegisterUser>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<User>>), ApiError> {
    let Json(payload) = payload?;
    let user = state.user_service().register(payload).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(user))))
}

/// `GET /api/users?skip=&limit=`
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> Result<Json<ApiResponse<Vec<User>>>, ApiError> {
    let Query(query) = query?;
    let limit = validate_limit(query.limit)?;

    let users = state.user_service().list(query.skip, limit).await?;
    Ok(Json(ApiResponse::success(users)))
}

/// `GET /api/users/me`
pub async fn get_me(CurrentUser(user): CurrentUser) -> Json<ApiResponse<User>> {
    Json(ApiResponse::success(user))
}

/// `GET /api/users/{id}`
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<User>>, ApiError> {
    let id = validate_user_id(id)?;
    let user = state.user_service().get(id).await?;
    Ok(Json(ApiResponse::success(user)))
}

/// `PUT /api/users/{id}`
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    CurrentUser(actor): CurrentUser,
    Path(id): Path<i32>,
    payload: Result<Json<UpdateUser>, JsonRejection>,
) -> Result<Json<ApiResponse<User>>, ApiError> {
    let Json(payload) = payload?;
    let id = validate_user_id(id)?;

    let user = state.user_service().update(&actor, id, payload).await?;
    Ok(Json(ApiResponse::success(user)))
}

/// `DELETE /api/users/{id}` (admin)
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    CurrentUser(actor): CurrentUser,
    Path(id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    let id = validate_user_id(id)?;
    state.user_service().delete(&actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `PUT /api/users/{id}/active` (admin)
pub async fn set_active(
    State(state): State<Arc<AppState>>,
    CurrentUser(actor): CurrentUser,
    Path(id): Path<i32>,
    payload: Result<Json<ActiveRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<User>>, ApiError> {
    let Json(payload) = payload?;
    let id = validate_user_id(id)?;

    let user = state
        .user_service()
        .set_active(&actor, id, payload.is_active)
        .await?;
    Ok(Json(ApiResponse::success(user)))
}
