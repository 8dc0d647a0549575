//! Domain service for authentication and authorization.
//!
//! Handles credential checks, token issuing and resolution, password
//! changes, and the active/admin gates used by every protected operation.

use serde::Serialize;
use thiserror::Error;

use crate::db::User;

/// Errors specific to authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Unknown username and wrong password are indistinguishable.
    #[error("Incorrect username or password")]
    InvalidCredentials,

    /// Bad signature, expiry, missing or unknown subject.
    #[error("Could not validate credentials")]
    InvalidToken,

    #[error("{0}")]
    Forbidden(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for AuthError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// OAuth2-style token body returned by the login endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct LoginResult {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
}

/// Fails with [`AuthError::Forbidden`] for a deactivated user.
pub fn require_active(user: &User) -> Result<(), AuthError> {
    if user.is_active {
        Ok(())
    } else {
        Err(AuthError::Forbidden("Inactive user".to_string()))
    }
}

/// Fails with [`AuthError::Forbidden`] unless the user is an active admin.
pub fn require_admin(user: &User) -> Result<(), AuthError> {
    require_active(user)?;
    if user.is_admin {
        Ok(())
    } else {
        Err(AuthError::Forbidden(
            "Not enough permissions: admin required".to_string(),
        ))
    }
}

/// Domain service trait for authentication.
#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    /// Verifies credentials and returns the user.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] for an unknown user or a wrong password.
    async fn authenticate(&self, username: &str, password: &str) -> Result<User, AuthError>;

    /// Authenticates and issues a token with the configured access lifetime.
    async fn login(&self, username: &str, password: &str) -> Result<LoginResult, AuthError>;

    /// Issues a token for `subject`. `None` uses the fallback lifetime.
    async fn issue_token(
        &self,
        subject: &str,
        ttl: Option<chrono::Duration>,
    ) -> Result<LoginResult, AuthError>;

    /// Validates a bearer token and loads its user live from the store.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidToken`] for every kind of invalid token.
    async fn resolve_token(&self, token: &str) -> Result<User, AuthError>;

    /// Changes a user's password.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Validation`] if current password is incorrect or new password invalid.
    async fn change_password(
        &self,
        user: &User,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError>;
}
