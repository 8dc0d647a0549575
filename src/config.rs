use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub server: ServerConfig,

    pub security: SecurityConfig,

    pub cache: CacheConfig,

    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Argon2 memory cost in KiB (default: 8192 = 8MB)
    pub argon2_memory_cost_kib: u32,

    /// Argon2 time cost (iterations)
    pub argon2_time_cost: u32,

    pub argon2_parallelism: u32,

    /// Re-hash stored passwords with the current argon2 params on successful login
    pub auto_migrate_password_hashes: bool,

    /// HMAC secret used to sign access tokens (HS256).
    pub jwt_secret: String,

    /// Lifetime passed explicitly by the login endpoints.
    pub access_token_expire_minutes: i64,

    /// Lifetime used when a token is issued without an explicit ttl.
    pub fallback_token_ttl_minutes: i64,

    pub bootstrap_admin: BootstrapAdminConfig,
}

/// Shipped in the default config; `validate` refuses to sign tokens with it.
pub const PLACEHOLDER_JWT_SECRET: &str = "change-me-in-production";

/// Upper bound for token lifetimes, one year.
pub const MAX_TOKEN_LIFETIME_MINUTES: i64 = 525_600;

/// Upper bound for cache entry lifetimes, one year.
pub const MAX_CACHE_TTL_SECONDS: u64 = 31_536_000;

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            argon2_memory_cost_kib: 8192,
            argon2_time_cost: 3,
            argon2_parallelism: 1,
            auto_migrate_password_hashes: true,
            jwt_secret: PLACEHOLDER_JWT_SECRET.to_string(),
            access_token_expire_minutes: 30,
            fallback_token_ttl_minutes: 15,
            bootstrap_admin: BootstrapAdminConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapAdminConfig {
    pub enabled: bool,

    pub username: String,

    pub email: String,

    pub password: String,
}

impl Default for BootstrapAdminConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            username: "admin".to_string(),
            email: "admin@arena.dev".to_string(),
            password: "admin123".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// "memory", "database" or "disabled"
    pub backend: String,

    pub default_ttl_seconds: u64,

    /// TTL for analytics read models
    pub analytics_ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: "memory".to_string(),
            default_ttl_seconds: 300,
            analytics_ttl_seconds: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub metrics_enabled: bool,

    pub loki_enabled: bool,

    pub loki_url: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: true,
            loki_enabled: false,
            loki_url: "http://localhost:3100".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub enabled: bool,

    pub port: u16,

    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 8000,
            cors_allowed_origins: vec!["*".to_string()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub database_path: String,

    pub log_level: String,

    /// Number of tokio worker threads (default: 2)
    /// Set to 0 to use the number of CPU cores
    pub worker_threads: usize,

    /// Maximum database connections (default: 5)
    pub max_db_connections: u32,

    /// Minimum database connections (default: 1)
    pub min_db_connections: u32,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            database_path: "sqlite:data/arena.db".to_string(),
            log_level: "info".to_string(),
            worker_threads: 2,
            max_db_connections: 5,
            min_db_connections: 1,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            server: ServerConfig::default(),
            security: SecurityConfig::default(),
            cache: CacheConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let paths = Self::config_paths();

        let mut config = None;
        for path in &paths {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                config = Some(Self::load_from_path(path)?);
                break;
            }
        }

        let mut config = config.unwrap_or_else(|| {
            info!("No config file found, using defaults");
            Self::default()
        });
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// `ARENA_DATABASE_URL`, `ARENA_JWT_SECRET` and `ARENA_LOG_LEVEL` win over the file.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("ARENA_DATABASE_URL")
            && !url.is_empty()
        {
            self.general.database_path = url;
        }

        if let Ok(secret) = std::env::var("ARENA_JWT_SECRET")
            && !secret.is_empty()
        {
            self.security.jwt_secret = secret;
        }

        if let Ok(level) = std::env::var("ARENA_LOG_LEVEL")
            && !level.is_empty()
        {
            self.general.log_level = level;
        }
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![];

        paths.push(PathBuf::from("config.toml"));

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("arena").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".arena").join("config.toml"));
        }

        paths
    }

    fn default_config_path() -> PathBuf {
        PathBuf::from("config.toml")
    }

    /// Writes a default config with a freshly generated JWT secret.
    pub fn create_default_if_missing() -> Result<bool> {
        let path = Self::default_config_path();
        if path.exists() {
            Ok(false)
        } else {
            let mut config = Self::default();
            config.security.jwt_secret = crate::db::repositories::user::generate_secret();
            config.save_to_path(&path)?;
            info!("Created default config file: {}", path.display());
            Ok(true)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.security.jwt_secret.is_empty() {
            anyhow::bail!("security.jwt_secret cannot be empty");
        }

        if self.security.jwt_secret == PLACEHOLDER_JWT_SECRET {
            anyhow::bail!(
                "security.jwt_secret is still the placeholder; run `arena init` or set ARENA_JWT_SECRET"
            );
        }

        let lifetimes = [
            self.security.access_token_expire_minutes,
            self.security.fallback_token_ttl_minutes,
        ];
        if lifetimes
            .iter()
            .any(|m| !(1..=MAX_TOKEN_LIFETIME_MINUTES).contains(m))
        {
            anyhow::bail!(
                "Token lifetimes must be between 1 and {MAX_TOKEN_LIFETIME_MINUTES} minutes"
            );
        }

        if [self.cache.default_ttl_seconds, self.cache.analytics_ttl_seconds]
            .iter()
            .any(|s| !(1..=MAX_CACHE_TTL_SECONDS).contains(s))
        {
            anyhow::bail!("Cache TTLs must be between 1 and {MAX_CACHE_TTL_SECONDS} seconds");
        }

        if !matches!(
            self.cache.backend.as_str(),
            "memory" | "database" | "disabled"
        ) {
            anyhow::bail!(
                "Unknown cache backend '{}' (expected memory, database or disabled)",
                self.cache.backend
            );
        }

        if self.security.bootstrap_admin.enabled
            && self.security.bootstrap_admin.password.len() < 8
        {
            anyhow::bail!("Bootstrap admin password must be at least 8 characters");
        }

        Ok(())
    }
}
