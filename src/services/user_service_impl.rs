//! `SeaORM` implementation of the `UserService` trait.

use async_trait::async_trait;
use tracing::info;

use crate::cache::Cache;
use crate::config::SecurityConfig;
use crate::constants::cache::ANALYTICS_PREFIX;
use crate::db::{NewUser, Store, User};
use crate::services::auth_service::{require_active, require_admin};
use crate::services::user_service::{
    RegisterUser, UpdateUser, UserError, UserService, validate_email, validate_password,
    validate_username,
};

pub struct SeaOrmUserService {
    store: Store,
    cache: Cache,
    security: SecurityConfig,
}

impl SeaOrmUserService {
    #[must_use]
    pub const fn new(store: Store, cache: Cache, security: SecurityConfig) -> Self {
        Self {
            store,
            cache,
            security,
        }
    }

    async fn invalidate_analytics(&self) {
        self.cache.delete_prefix(ANALYTICS_PREFIX).await;
    }

    async fn existing(&self, id: i32) -> Result<User, UserError> {
        self.store.get_user(id).await?.ok_or(UserError::NotFound(id))
    }
}

#[async_trait]
impl UserService for SeaOrmUserService {
    async fn register(&self, input: RegisterUser) -> Result<User, UserError> {
        let username = input.username.trim().to_string();
        let email = input.email.trim().to_lowercase();

        validate_username(&username)?;
        validate_email(&email)?;
        validate_password(&input.password)?;

        if self.store.get_user_by_email(&email).await?.is_some() {
            return Err(UserError::Conflict("Email already registered".to_string()));
        }

        if self.store.get_user_by_username(&username).await?.is_some() {
            return Err(UserError::Conflict("Username already taken".to_string()));
        }

        let user = self
            .store
            .create_user(
                NewUser {
                    username,
                    email,
                    password: input.password,
                    full_name: input.full_name.filter(|name| !name.trim().is_empty()),
                    is_admin: false,
                },
                &self.security,
            )
            .await?;

        info!(user_id = user.id, username = %user.username, "User registered");
        self.invalidate_analytics().await;
        Ok(user)
    }

    async fn list(&self, skip: u64, limit: u64) -> Result<Vec<User>, UserError> {
        Ok(self.store.list_users(skip, limit).await?)
    }

    async fn get(&self, id: i32) -> Result<User, UserError> {
        self.existing(id).await
    }

    async fn update(&self, actor: &User, id: i32, input: UpdateUser) -> Result<User, UserError> {
        require_active(actor)?;

        if !actor.can_act_for(id) {
            return Err(UserError::Forbidden(
                "Not enough permissions to update this user".to_string(),
            ));
        }

        if input.guild_rank.is_some() {
            return Err(UserError::Validation(
                "guild_rank is derived from completed missions and cannot be set".to_string(),
            ));
        }

        let email = input.email.map(|email| email.trim().to_lowercase());
        if let Some(email) = email.as_deref() {
            validate_email(email)?;
            if let Some(owner) = self.store.get_user_by_email(email).await?
                && owner.id != id
            {
                return Err(UserError::Conflict("Email already registered".to_string()));
            }
        }

        let user = self
            .store
            .update_user_profile(id, email, input.full_name)
            .await?
            .ok_or(UserError::NotFound(id))?;

        info!(user_id = id, actor = %actor.username, "User updated");
        self.invalidate_analytics().await;
        Ok(user)
    }

    async fn delete(&self, actor: &User, id: i32) -> Result<(), UserError> {
        require_admin(actor)?;

        if !self.store.delete_user(id).await? {
            return Err(UserError::NotFound(id));
        }

        info!(user_id = id, actor = %actor.username, "User deleted");
        self.invalidate_analytics().await;
        Ok(())
    }

    async fn set_active(&self, actor: &User, id: i32, is_active: bool) -> Result<User, UserError> {
        require_admin(actor)?;

        let user = self
            .store
            .set_user_active(id, is_active)
            .await?
            .ok_or(UserError::NotFound(id))?;

        info!(user_id = id, is_active, actor = %actor.username, "User activation changed");
        self.invalidate_analytics().await;
        Ok(user)
    }
}
