use serde::{Deserialize, Serialize};

use crate::constants::limits::{DEFAULT_LEADERBOARD_LIMIT, DEFAULT_PAGE_LIMIT};
use crate::domain::MissionInfo;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub const fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default)]
    pub skip: u64,
    #[serde(default = "default_page_limit")]
    pub limit: u64,
}

const fn default_page_limit() -> u64 {
    DEFAULT_PAGE_LIMIT
}

#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    #[serde(default = "default_leaderboard_limit")]
    pub limit: u64,
}

const fn default_leaderboard_limit() -> u64 {
    DEFAULT_LEADERBOARD_LIMIT
}

#[derive(Debug, Deserialize)]
pub struct CompleteQuery {
    #[serde(default = "default_score")]
    pub score: f64,
}

const fn default_score() -> f64 {
    100.0
}

#[derive(Debug, Deserialize)]
pub struct ActiveRequest {
    pub is_active: bool,
}

#[derive(Debug, Serialize)]
pub struct MissionCatalogResponse {
    pub missions: Vec<MissionInfo>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct RootResponse {
    pub message: &'static str,
    pub version: &'static str,
    pub missions: usize,
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct PingResponse {
    pub message: &'static str,
    pub status: &'static str,
}
