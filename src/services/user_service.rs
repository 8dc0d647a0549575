//! Domain service for the member registry.
//!
//! Registration, lookup, profile updates, deletion and activation. Field
//! validation happens here, before anything touches the store.

use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;
use thiserror::Error;

use crate::constants::limits::{MAX_USERNAME_LENGTH, MIN_PASSWORD_LENGTH, MIN_USERNAME_LENGTH};
use crate::db::User;
use crate::services::auth_service::AuthError;

#[derive(Debug, Error)]
pub enum UserError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("User {0} not found")]
    NotFound(i32),

    #[error("{0}")]
    Forbidden(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for UserError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for UserError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<AuthError> for UserError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Forbidden(msg) => Self::Forbidden(msg),
            AuthError::Validation(msg) => Self::Validation(msg),
            other => Self::Internal(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterUser {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub full_name: Option<String>,
}

/// Profile fields a client may send. `guild_rank` is accepted only so it
/// can be rejected explicitly; rank is always derived.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateUser {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub guild_rank: Option<serde_json::Value>,
}

/// Any value the key carries, `null` included, counts as present.
fn present<'de, D>(deserializer: D) -> Result<Option<serde_json::Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    serde_json::Value::deserialize(deserializer).map(Some)
}

static EMAIL_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").ok());

pub fn validate_username(username: &str) -> Result<(), UserError> {
    let len = username.chars().count();
    if !(MIN_USERNAME_LENGTH..=MAX_USERNAME_LENGTH).contains(&len) {
        return Err(UserError::Validation(format!(
            "Username must be between {MIN_USERNAME_LENGTH} and {MAX_USERNAME_LENGTH} characters"
        )));
    }

    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
    {
        return Err(UserError::Validation(
            "Username can only contain letters, numbers, underscores, hyphens and dots"
                .to_string(),
        ));
    }

    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), UserError> {
    let valid = EMAIL_RE
        .as_ref()
        .is_some_and(|re| re.is_match(email) && email.len() <= 254);

    if valid {
        Ok(())
    } else {
        Err(UserError::Validation(format!(
            "'{email}' is not a valid email address"
        )))
    }
}

pub fn validate_password(password: &str) -> Result<(), UserError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(UserError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Domain service trait for user management.
#[async_trait::async_trait]
pub trait UserService: Send + Sync {
    /// Creates a new member with rank Apprentice.
    ///
    /// # Errors
    ///
    /// Returns [`UserError::Validation`] for malformed fields and
    /// [`UserError::Conflict`] when the email or username is taken.
    async fn register(&self, input: RegisterUser) -> Result<User, UserError>;

    async fn list(&self, skip: u64, limit: u64) -> Result<Vec<User>, UserError>;

    async fn get(&self, id: i32) -> Result<User, UserError>;

    /// Updates the profile of `id`. The actor must be that user or an admin.
    async fn update(&self, actor: &User, id: i32, input: UpdateUser) -> Result<User, UserError>;

    /// Deletes a user and its mission progress. Admin only.
    async fn delete(&self, actor: &User, id: i32) -> Result<(), UserError>;

    /// Activates or deactivates a user. Admin only.
    async fn set_active(&self, actor: &User, id: i32, is_active: bool) -> Result<User, UserError>;
}
