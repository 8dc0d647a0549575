use anyhow::Result;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::config::SecurityConfig;

pub mod migrator;
pub mod repositories;

pub use repositories::cache::CacheTableStats;
pub use repositories::mission::{CompletionRecord, MissionProgressRow, TransitionOutcome};
pub use repositories::user::{NewUser, User};

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

/// `sqlite::memory:`, `sqlite://:memory:` and bare `:memory:` all name a private in-memory database.
fn is_memory_url(db_url: &str) -> bool {
    db_url.contains(":memory:") || db_url.contains("mode=memory")
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        let in_memory = is_memory_url(db_url);

        if !in_memory {
            let path_str = db_url
                .trim_start_matches("sqlite://")
                .trim_start_matches("sqlite:");
            let path_str = path_str.split('?').next().unwrap_or(path_str);
            if let Some(parent) = Path::new(path_str).parent()
                && !parent.as_os_str().is_empty()
            {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .sqlx_logging(false);

        // Every pooled connection to `:memory:` would open its own empty database.
        if in_memory {
            opt.max_connections(1).min_connections(1);
        } else {
            opt.max_connections(max_connections)
                .min_connections(min_connections)
                .idle_timeout(Duration::from_secs(300))
                .max_lifetime(Duration::from_secs(600));
        }

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            in_memory,
            "Database connected & migrations applied (pool: {}-{})",
            min_connections,
            max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    #[must_use]
    pub fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    #[must_use]
    pub fn mission_repo(&self) -> repositories::mission::MissionRepository {
        repositories::mission::MissionRepository::new(self.conn.clone())
    }

    #[must_use]
    pub fn cache_repo(&self) -> repositories::cache::CacheRepository {
        repositories::cache::CacheRepository::new(self.conn.clone())
    }

    // ========== User Repository Methods ==========

    pub async fn create_user(&self, new_user: NewUser, config: &SecurityConfig) -> Result<User> {
        self.user_repo().create(new_user, config).await
    }

    pub async fn get_user(&self, id: i32) -> Result<Option<User>> {
        self.user_repo().get_by_id(id).await
    }

    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.user_repo().get_by_username(username).await
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.user_repo().get_by_email(email).await
    }

    pub async fn list_users(&self, skip: u64, limit: u64) -> Result<Vec<User>> {
        self.user_repo().list(skip, limit).await
    }

    pub async fn list_all_users(&self) -> Result<Vec<User>> {
        self.user_repo().list_all().await
    }

    pub async fn count_users(&self) -> Result<u64> {
        self.user_repo().count().await
    }

    pub async fn leaderboard(&self, limit: u64) -> Result<Vec<User>> {
        self.user_repo().leaderboard(limit).await
    }

    pub async fn update_user_profile(
        &self,
        id: i32,
        email: Option<String>,
        full_name: Option<String>,
    ) -> Result<Option<User>> {
        self.user_repo().update_profile(id, email, full_name).await
    }

    pub async fn set_user_active(&self, id: i32, is_active: bool) -> Result<Option<User>> {
        self.user_repo().set_active(id, is_active).await
    }

    pub async fn delete_user(&self, id: i32) -> Result<bool> {
        self.user_repo().delete(id).await
    }

    pub async fn verify_user_password(
        &self,
        username: &str,
        password: &str,
        config: &SecurityConfig,
    ) -> Result<Option<(User, String)>> {
        self.user_repo()
            .verify_password(username, password, config)
            .await
    }

    pub async fn update_user_password_with_config(
        &self,
        username: &str,
        new_password: &str,
        config: &SecurityConfig,
    ) -> Result<()> {
        self.user_repo()
            .update_password_with_config(username, new_password, config)
            .await
    }

    /// Create the configured bootstrap admin if no user with that name exists yet.
    pub async fn ensure_admin(&self, config: &SecurityConfig) -> Result<bool> {
        let admin = &config.bootstrap_admin;
        if !admin.enabled || self.get_user_by_username(&admin.username).await?.is_some() {
            return Ok(false);
        }

        self.create_user(
            NewUser {
                username: admin.username.clone(),
                email: admin.email.clone(),
                password: admin.password.clone(),
                full_name: Some("Guild Administrator".to_string()),
                is_admin: true,
            },
            config,
        )
        .await?;

        info!(username = %admin.username, "Bootstrap admin created");
        Ok(true)
    }

    // ========== Mission Repository Methods ==========

    pub async fn list_progress(&self, user_id: i32) -> Result<Vec<MissionProgressRow>> {
        self.mission_repo().list_for_user(user_id).await
    }

    pub async fn list_all_progress(&self) -> Result<Vec<MissionProgressRow>> {
        self.mission_repo().list_all().await
    }

    pub async fn get_progress(
        &self,
        user_id: i32,
        mission_id: i32,
    ) -> Result<Option<MissionProgressRow>> {
        self.mission_repo().get(user_id, mission_id).await
    }

    pub async fn transition_progress(
        &self,
        user_id: i32,
        mission_id: i32,
        next: Option<crate::domain::MissionStatus>,
        score: Option<f64>,
    ) -> Result<TransitionOutcome> {
        self.mission_repo()
            .transition(user_id, mission_id, next, score)
            .await
    }

    pub async fn complete_mission(
        &self,
        user_id: i32,
        mission_id: i32,
        score: f64,
        experience: i32,
    ) -> Result<Option<CompletionRecord>> {
        self.mission_repo()
            .complete(user_id, mission_id, score, experience)
            .await
    }
}
