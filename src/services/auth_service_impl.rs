//! `SeaORM` implementation of the `AuthService` trait.

use async_trait::async_trait;
use chrono::Duration;
use tracing::{debug, info, warn};

use crate::config::SecurityConfig;
use crate::constants::limits::MIN_PASSWORD_LENGTH;
use crate::db::repositories::user::needs_rehash;
use crate::db::{Store, User};
use crate::services::auth_service::{AuthError, AuthService, LoginResult};
use crate::services::tokens::{IssuedToken, TokenAuthority};

pub struct SeaOrmAuthService {
    store: Store,
    tokens: TokenAuthority,
    security: SecurityConfig,
}

/// Minutes to a token lifetime. Out-of-range values saturate and fail at signing.
fn lifetime(minutes: i64) -> Duration {
    Duration::try_minutes(minutes).unwrap_or(Duration::MAX)
}

impl SeaOrmAuthService {
    #[must_use]
    pub fn new(store: Store, security: SecurityConfig) -> Self {
        let tokens = TokenAuthority::new(
            &security.jwt_secret,
            lifetime(security.fallback_token_ttl_minutes),
        );
        Self {
            store,
            tokens,
            security,
        }
    }

    fn token_body(issued: IssuedToken) -> LoginResult {
        LoginResult {
            access_token: issued.token,
            token_type: "bearer",
            expires_in: issued.expires_in,
        }
    }

    fn record_failure(reason: &'static str) {
        metrics::counter!("auth_failures_total", "reason" => reason).increment(1);
    }
}

#[async_trait]
impl AuthService for SeaOrmAuthService {
    async fn authenticate(&self, username: &str, password: &str) -> Result<User, AuthError> {
        let Some((user, stored_hash)) = self
            .store
            .verify_user_password(username, password, &self.security)
            .await?
        else {
            Self::record_failure("credentials");
            debug!(username, "Authentication failed");
            return Err(AuthError::InvalidCredentials);
        };

        if self.security.auto_migrate_password_hashes && needs_rehash(&stored_hash, &self.security)
        {
            // The login already succeeded; a failed re-hash only gets logged.
            match self
                .store
                .update_user_password_with_config(username, password, &self.security)
                .await
            {
                Ok(()) => info!(username, "Password hash migrated to current parameters"),
                Err(e) => warn!(username, error = %e, "Password hash migration failed"),
            }
        }

        Ok(user)
    }

    async fn login(&self, username: &str, password: &str) -> Result<LoginResult, AuthError> {
        let user = self.authenticate(username, password).await?;
        let ttl = lifetime(self.security.access_token_expire_minutes);
        let result = self.issue_token(&user.username, Some(ttl)).await?;

        info!(username = %user.username, "User logged in");
        Ok(result)
    }

    async fn issue_token(&self, subject: &str, ttl: Option<Duration>) -> Result<LoginResult, AuthError> {
        let issued = self
            .tokens
            .issue(subject, ttl)
            .map_err(|e| AuthError::Internal(e.to_string()))?;
        Ok(Self::token_body(issued))
    }

    async fn resolve_token(&self, token: &str) -> Result<User, AuthError> {
        let Ok(subject) = self.tokens.subject(token) else {
            Self::record_failure("token");
            return Err(AuthError::InvalidToken);
        };

        self.store
            .get_user_by_username(&subject)
            .await?
            .ok_or_else(|| {
                Self::record_failure("unknown_subject");
                AuthError::InvalidToken
            })
    }

    async fn change_password(
        &self,
        user: &User,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        if new_password.len() < MIN_PASSWORD_LENGTH {
            return Err(AuthError::Validation(format!(
                "New password must be at least {MIN_PASSWORD_LENGTH} characters"
            )));
        }

        if current_password == new_password {
            return Err(AuthError::Validation(
                "New password must be different from current password".to_string(),
            ));
        }

        let verified = self
            .store
            .verify_user_password(&user.username, current_password, &self.security)
            .await?;

        if verified.is_none() {
            return Err(AuthError::Validation(
                "Current password is incorrect".to_string(),
            ));
        }

        self.store
            .update_user_password_with_config(&user.username, new_password, &self.security)
            .await?;

        info!(username = %user.username, "Password changed");
        Ok(())
    }
}
