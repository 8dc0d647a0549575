//! Domain service for guild progression and the mission ledger.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db::{MissionProgressRow, User};
use crate::domain::{GuildRank, MAX_MISSION_SCORE, MissionStatus};
use crate::services::auth_service::AuthError;

#[derive(Debug, Error)]
pub enum GuildError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("User {0} not found")]
    UserNotFound(i32),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for GuildError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for GuildError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<AuthError> for GuildError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Forbidden(msg) => Self::Forbidden(msg),
            other => Self::Internal(other.to_string()),
        }
    }
}

/// Result of one mission completion.
#[derive(Debug, Clone, Serialize)]
pub struct CompletionOutcome {
    pub message: String,
    pub experience_earned: i32,
    pub total_experience: i32,
    pub guild_rank: GuildRank,
    pub missions_completed: i32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProgressUpdate {
    #[serde(default)]
    pub status: Option<MissionStatus>,
    #[serde(default)]
    pub score: Option<f64>,
}

pub fn validate_mission_id(mission_id: i32) -> Result<(), GuildError> {
    if mission_id <= 0 {
        return Err(GuildError::Validation(format!(
            "Invalid mission ID: {mission_id}. ID must be a positive integer"
        )));
    }
    Ok(())
}

pub fn validate_score(score: f64) -> Result<(), GuildError> {
    if !score.is_finite() || !(0.0..=MAX_MISSION_SCORE).contains(&score) {
        return Err(GuildError::Validation(format!(
            "Score must be a number between 0 and {MAX_MISSION_SCORE}"
        )));
    }
    Ok(())
}

/// Domain service trait for progression.
#[async_trait::async_trait]
pub trait GuildService: Send + Sync {
    /// Awards `floor(score / 10)` experience and one completed mission to
    /// `user_id`, then re-derives the rank.
    ///
    /// # Errors
    ///
    /// Returns [`GuildError::Forbidden`] when `actor` is inactive or neither
    /// the user nor an admin; nothing is written in that case.
    async fn complete_mission(
        &self,
        actor: &User,
        user_id: i32,
        mission_id: i32,
        score: f64,
    ) -> Result<CompletionOutcome, GuildError>;

    async fn list_progress(
        &self,
        actor: &User,
        user_id: i32,
    ) -> Result<Vec<MissionProgressRow>, GuildError>;

    /// Moves the progress row to `in_progress`, creating it if needed.
    async fn start_mission(
        &self,
        actor: &User,
        user_id: i32,
        mission_id: i32,
    ) -> Result<MissionProgressRow, GuildError>;

    /// Applies a status transition and/or score to a progress row. Never awards experience.
    async fn update_progress(
        &self,
        actor: &User,
        user_id: i32,
        mission_id: i32,
        update: ProgressUpdate,
    ) -> Result<MissionProgressRow, GuildError>;
}
