//! Domain service for the guild archives: read-only statistics over users
//! and mission progress, served through the cache.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db::MissionProgressRow;
use crate::domain::GuildRank;

#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("User {0} not found")]
    UserNotFound(i32),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for AnalyticsError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for AnalyticsError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserStats {
    pub total_users: u64,
    pub active_users: u64,
    pub total_missions_completed: i64,
    pub average_experience: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissionStats {
    pub mission_id: i32,
    pub mission_name: String,
    pub total_attempts: u64,
    pub completion_rate: f64,
    pub average_score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissionStatsReport {
    pub missions: Vec<MissionStats>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPerformance {
    pub user_id: i32,
    pub username: String,
    pub guild_rank: GuildRank,
    pub total_experience: i32,
    pub missions_attempted: u64,
    pub missions_completed: u64,
    pub completion_rate: f64,
    pub average_score: f64,
    pub missions: Vec<MissionProgressRow>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub rank: u64,
    pub user_id: i32,
    pub username: String,
    pub guild_rank: GuildRank,
    pub experience_points: i32,
    pub missions_completed: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Leaderboard {
    pub leaderboard: Vec<LeaderboardEntry>,
}

/// Round to two decimal places.
#[must_use]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// `part / whole` as a percentage, 0 when `whole` is 0.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn percentage(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        round2(part as f64 / whole as f64 * 100.0)
    }
}

#[async_trait::async_trait]
pub trait AnalyticsService: Send + Sync {
    async fn user_stats(&self) -> Result<UserStats, AnalyticsError>;

    async fn mission_stats(&self) -> Result<MissionStatsReport, AnalyticsError>;

    async fn user_performance(&self, user_id: i32) -> Result<UserPerformance, AnalyticsError>;

    /// Top `limit` users by experience, positions starting at 1.
    async fn leaderboard(&self, limit: u64) -> Result<Leaderboard, AnalyticsError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentages() {
        assert!((percentage(1, 3) - 33.33).abs() < f64::EPSILON);
        assert!((percentage(2, 2) - 100.0).abs() < f64::EPSILON);
        assert!(percentage(0, 0).abs() < f64::EPSILON);
    }

    #[test]
    fn rounding() {
        assert!((round2(87.456) - 87.46).abs() < f64::EPSILON);
        assert!((round2(10.0) - 10.0).abs() < f64::EPSILON);
    }
}
