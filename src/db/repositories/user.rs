use anyhow::{Context, Result};
use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{LazyLock, Mutex};
use tokio::task;

use crate::config::SecurityConfig;
use crate::domain::GuildRank;
use crate::entities::{mission_progress, users};

/// User data returned from repository (without sensitive password hash)
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub full_name: Option<String>,
    pub is_active: bool,
    pub is_admin: bool,
    pub guild_rank: GuildRank,
    pub experience_points: i32,
    pub missions_completed: i32,
    pub created_at: String,
    pub updated_at: String,
}

impl User {
    /// Whether this user may act on `user_id`'s records (self or admin).
    #[must_use]
    pub const fn can_act_for(&self, user_id: i32) -> bool {
        self.id == user_id || self.is_admin
    }
}

impl From<users::Model> for User {
    fn from(model: users::Model) -> Self {
        let guild_rank = model
            .guild_rank
            .parse()
            .unwrap_or_else(|_| GuildRank::for_missions_completed(model.missions_completed));

        Self {
            id: model.id,
            username: model.username,
            email: model.email,
            full_name: model.full_name,
            is_active: model.is_active,
            is_admin: model.is_admin,
            guild_rank,
            experience_points: model.experience_points,
            missions_completed: model.missions_completed,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Input for creating a user. The password is plaintext and hashed here.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
    pub full_name: Option<String>,
    pub is_admin: bool,
}

pub struct UserRepository {
    conn: DatabaseConnection,
}

impl UserRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Insert a new user with rank Apprentice and zero progression.
    pub async fn create(&self, new_user: NewUser, config: &SecurityConfig) -> Result<User> {
        let password = new_user.password;
        let config = config.clone();
        let password_hash = task::spawn_blocking(move || hash_password(&password, Some(&config)))
            .await
            .context("Password hashing task panicked")??;

        let now = chrono::Utc::now().to_rfc3339();

        let active = users::ActiveModel {
            username: Set(new_user.username),
            email: Set(new_user.email),
            password_hash: Set(password_hash),
            full_name: Set(new_user.full_name),
            is_active: Set(true),
            is_admin: Set(new_user.is_admin),
            guild_rank: Set(GuildRank::Apprentice.as_str().to_string()),
            experience_points: Set(0),
            missions_completed: Set(0),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        };

        let model = active
            .insert(&self.conn)
            .await
            .context("Failed to insert user")?;

        Ok(User::from(model))
    }

    pub async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        let user = users::Entity::find()
            .filter(users::Column::Username.eq(username))
            .one(&self.conn)
            .await
            .context("Failed to query user by username")?;

        Ok(user.map(User::from))
    }

    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = users::Entity::find()
            .filter(users::Column::Email.eq(email))
            .one(&self.conn)
            .await
            .context("Failed to query user by email")?;

        Ok(user.map(User::from))
    }

    pub async fn get_by_id(&self, id: i32) -> Result<Option<User>> {
        let user = users::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query user by ID")?;

        Ok(user.map(User::from))
    }

    /// Get user by username with password hash (for verification and re-hashing)
    pub async fn get_by_username_with_password(
        &self,
        username: &str,
    ) -> Result<Option<(User, String)>> {
        let user = users::Entity::find()
            .filter(users::Column::Username.eq(username))
            .one(&self.conn)
            .await
            .context("Failed to query user by username")?;

        Ok(user.map(|u| {
            let password_hash = u.password_hash.clone();
            (User::from(u), password_hash)
        }))
    }

    pub async fn list(&self, skip: u64, limit: u64) -> Result<Vec<User>> {
        let users = users::Entity::find()
            .order_by_asc(users::Column::Id)
            .offset(skip)
            .limit(limit)
            .all(&self.conn)
            .await
            .context("Failed to list users")?;

        Ok(users.into_iter().map(User::from).collect())
    }

    pub async fn list_all(&self) -> Result<Vec<User>> {
        let users = users::Entity::find()
            .order_by_asc(users::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to list users")?;

        Ok(users.into_iter().map(User::from).collect())
    }

    pub async fn count(&self) -> Result<u64> {
        users::Entity::find()
            .count(&self.conn)
            .await
            .context("Failed to count users")
    }

    /// Top users by experience; ties broken by id so the order is stable.
    pub async fn leaderboard(&self, limit: u64) -> Result<Vec<User>> {
        let users = users::Entity::find()
            .order_by_desc(users::Column::ExperiencePoints)
            .order_by_asc(users::Column::Id)
            .limit(limit)
            .all(&self.conn)
            .await
            .context("Failed to query leaderboard")?;

        Ok(users.into_iter().map(User::from).collect())
    }

    /// Update the client-editable profile fields. `None` leaves a field untouched.
    pub async fn update_profile(
        &self,
        id: i32,
        email: Option<String>,
        full_name: Option<String>,
    ) -> Result<Option<User>> {
        let Some(user) = users::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query user for update")?
        else {
            return Ok(None);
        };

        let mut active: users::ActiveModel = user.into();
        if let Some(email) = email {
            active.email = Set(email);
        }
        if let Some(full_name) = full_name {
            active.full_name = Set(Some(full_name));
        }
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());

        let model = active.update(&self.conn).await?;
        Ok(Some(User::from(model)))
    }

    pub async fn set_active(&self, id: i32, is_active: bool) -> Result<Option<User>> {
        let Some(user) = users::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query user for activation change")?
        else {
            return Ok(None);
        };

        let mut active: users::ActiveModel = user.into();
        active.is_active = Set(is_active);
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());

        let model = active.update(&self.conn).await?;
        Ok(Some(User::from(model)))
    }

    /// Delete a user together with its mission progress rows.
    pub async fn delete(&self, id: i32) -> Result<bool> {
        let txn = self.conn.begin().await?;

        mission_progress::Entity::delete_many()
            .filter(mission_progress::Column::UserId.eq(id))
            .exec(&txn)
            .await
            .context("Failed to delete mission progress for user")?;

        let result = users::Entity::delete_by_id(id)
            .exec(&txn)
            .await
            .context("Failed to delete user")?;

        txn.commit().await?;
        Ok(result.rows_affected > 0)
    }

    /// Verify credentials. Unknown users and wrong passwords both yield `None`
    /// after the same Argon2 work under the configured cost.
    /// Note: This uses `spawn_blocking` because Argon2 hashing is CPU-intensive
    /// and would block the async runtime if run directly.
    pub async fn verify_password(
        &self,
        username: &str,
        password: &str,
        config: &SecurityConfig,
    ) -> Result<Option<(User, String)>> {
        let found = self.get_by_username_with_password(username).await?;

        let password = password.to_string();
        let Some((user, password_hash)) = found else {
            let config = config.clone();
            task::spawn_blocking(move || -> Result<bool> {
                let decoy = decoy_hash(&config)?;
                Ok(verify_password_hash(&password, &decoy))
            })
            .await
            .context("Password verification task panicked")??;
            return Ok(None);
        };

        let stored = password_hash.clone();
        let is_valid = task::spawn_blocking(move || verify_password_hash(&password, &stored))
            .await
            .context("Password verification task panicked")?;

        Ok(is_valid.then_some((user, password_hash)))
    }

    /// Update password for a user with specific security config
    pub async fn update_password_with_config(
        &self,
        username: &str,
        new_password: &str,
        config: &SecurityConfig,
    ) -> Result<()> {
        let user = users::Entity::find()
            .filter(users::Column::Username.eq(username))
            .one(&self.conn)
            .await
            .context("Failed to query user for password update")?
            .ok_or_else(|| anyhow::anyhow!("User not found: {username}"))?;

        let password = new_password.to_string();
        let config = config.clone();
        let new_hash = task::spawn_blocking(move || hash_password(&password, Some(&config)))
            .await
            .context("Password hashing task panicked")??;

        let now = chrono::Utc::now().to_rfc3339();

        let mut active: users::ActiveModel = user.into();
        active.password_hash = Set(new_hash);
        active.updated_at = Set(now);
        active.update(&self.conn).await?;

        Ok(())
    }
}

type ArgonCost = (u32, u32, u32);

static DECOY_HASHES: LazyLock<Mutex<HashMap<ArgonCost, String>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

/// A throwaway hash built with the configured Argon2 cost, verified against
/// when the username is unknown. Computed once per cost triple.
pub fn decoy_hash(config: &SecurityConfig) -> Result<String> {
    let cost = (
        config.argon2_memory_cost_kib,
        config.argon2_time_cost,
        config.argon2_parallelism,
    );

    if let Some(hash) = DECOY_HASHES
        .lock()
        .map_err(|_| anyhow::anyhow!("Decoy hash cache poisoned"))?
        .get(&cost)
    {
        return Ok(hash.clone());
    }

    let hash = hash_password("arena-decoy-password", Some(config))?;
    DECOY_HASHES
        .lock()
        .map_err(|_| anyhow::anyhow!("Decoy hash cache poisoned"))?
        .entry(cost)
        .or_insert_with(|| hash.clone());
    Ok(hash)
}

fn argon2_for(config: Option<&SecurityConfig>) -> Result<Argon2<'static>> {
    let Some(cfg) = config else {
        return Ok(Argon2::default());
    };

    let params = Params::new(
        cfg.argon2_memory_cost_kib,
        cfg.argon2_time_cost,
        cfg.argon2_parallelism,
        None,
    )
    .map_err(|e| anyhow::anyhow!("Invalid Argon2 params: {e}"))?;

    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

/// Hash a password using Argon2id with optional custom params.
/// If config is None, uses the argon2 crate defaults.
pub fn hash_password(password: &str, config: Option<&SecurityConfig>) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    let hash = argon2_for(config)?
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {e}"))?;

    Ok(hash.to_string())
}

/// Verify a password against a PHC hash string. A malformed hash never verifies.
#[must_use]
pub fn verify_password_hash(password: &str, password_hash: &str) -> bool {
    let Ok(parsed_hash) = PasswordHash::new(password_hash) else {
        return false;
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

/// Whether a stored hash was produced with params other than the configured ones.
#[must_use]
pub fn needs_rehash(password_hash: &str, config: &SecurityConfig) -> bool {
    let Ok(parsed_hash) = PasswordHash::new(password_hash) else {
        return true;
    };

    Params::try_from(&parsed_hash).map_or(true, |params| {
        params.m_cost() != config.argon2_memory_cost_kib
            || params.t_cost() != config.argon2_time_cost
            || params.p_cost() != config.argon2_parallelism
    })
}

/// Generate a random secret (64 character hex string)
#[must_use]
pub fn generate_secret() -> String {
    use rand::Rng;

    let mut rng = rand::rng();
    let bytes: [u8; 32] = rng.random();

    bytes.iter().fold(String::with_capacity(64), |mut acc, b| {
        use std::fmt::Write;
        let _ = write!(acc, "{b:02x}");
        acc
    })
}
