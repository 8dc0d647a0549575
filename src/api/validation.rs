use super::ApiError;
use crate::constants::limits::{MAX_LEADERBOARD_LIMIT, MAX_PAGE_LIMIT};

pub fn validate_user_id(id: i32) -> Result<i32, ApiError> {
    if id <= 0 {
        return Err(ApiError::validation(format!(
            "Invalid user ID: {id}. ID must be a positive integer"
        )));
    }
    Ok(id)
}

pub fn validate_limit(limit: u64) -> Result<u64, ApiError> {
    const MIN_LIMIT: u64 = 1;

    if !(MIN_LIMIT..=MAX_PAGE_LIMIT).contains(&limit) {
        return Err(ApiError::validation(format!(
            "Invalid limit: {limit}. Limit must be between {MIN_LIMIT} and {MAX_PAGE_LIMIT}"
        )));
    }
    Ok(limit)
}

pub fn validate_leaderboard_limit(limit: u64) -> Result<u64, ApiError> {
    if !(1..=MAX_LEADERBOARD_LIMIT).contains(&limit) {
        return Err(ApiError::validation(format!(
            "Invalid limit: {limit}. Limit must be between 1 and {MAX_LEADERBOARD_LIMIT}"
        )));
    }
    Ok(limit)
}
