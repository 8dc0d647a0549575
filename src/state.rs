use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::cache::Cache;
use crate::config::Config;
use crate::db::Store;
use crate::services::{
    AnalyticsService, AuthService, GuildService, SeaOrmAnalyticsService, SeaOrmAuthService,
    SeaOrmGuildService, SeaOrmUserService, UserService,
};

/// Composition root: the database pool, the cache handle and every service
/// built on them. Created once and shared by the HTTP layer and the CLI.
#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<Config>,

    pub store: Store,

    pub cache: Cache,

    pub auth_service: Arc<dyn AuthService>,

    pub user_service: Arc<dyn UserService>,

    pub guild_service: Arc<dyn GuildService>,

    pub analytics_service: Arc<dyn AnalyticsService>,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        store.ensure_admin(&config.security).await?;

        Ok(Self::with_store(config, store))
    }

    #[must_use]
    pub fn with_store(config: Config, store: Store) -> Self {
        let cache = Cache::from_config(&config.cache, &store);
        info!(
            backend = %config.cache.backend,
            enabled = cache.is_enabled(),
            "Cache initialized"
        );

        let analytics_ttl = Duration::from_secs(config.cache.analytics_ttl_seconds);

        let auth_service = Arc::new(SeaOrmAuthService::new(
            store.clone(),
            config.security.clone(),
        )) as Arc<dyn AuthService + Send + Sync + 'static>;

        let user_service = Arc::new(SeaOrmUserService::new(
            store.clone(),
            cache.clone(),
            config.security.clone(),
        )) as Arc<dyn UserService + Send + Sync + 'static>;

        let guild_service = Arc::new(SeaOrmGuildService::new(store.clone(), cache.clone()))
            as Arc<dyn GuildService + Send + Sync + 'static>;

        let analytics_service = Arc::new(SeaOrmAnalyticsService::new(
            store.clone(),
            cache.clone(),
            analytics_ttl,
        )) as Arc<dyn AnalyticsService + Send + Sync + 'static>;

        Self {
            config: Arc::new(config),
            store,
            cache,
            auth_service,
            user_service,
            guild_service,
            analytics_service,
        }
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }
}
