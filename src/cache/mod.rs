//! Best-effort key/value cache for derived read models.
//!
//! Every backend failure is logged and treated as a miss, so callers can
//! always fall through to the database.

mod database;
mod memory;

pub use database::DatabaseCache;
pub use memory::MemoryCache;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use tracing::debug;

use crate::config::CacheConfig;
use crate::db::Store;

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct CacheStats {
    pub backend: &'static str,
    pub entries: u64,
    pub hits: u64,
    pub misses: u64,
}

#[async_trait]
pub trait CacheBackend: Send + Sync {
    fn name(&self) -> &'static str;

    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()>;

    async fn delete(&self, key: &str) -> Result<()>;

    /// Remove every key starting with `prefix`, returning how many were removed.
    async fn delete_prefix(&self, prefix: &str) -> Result<u64>;

    async fn stats(&self) -> Result<CacheStats>;
}

/// Cloneable handle over an optional backend. A disabled cache always misses.
#[derive(Clone, Default)]
pub struct Cache {
    backend: Option<Arc<dyn CacheBackend>>,
    default_ttl: Duration,
}

impl Cache {
    #[must_use]
    pub fn new(backend: Arc<dyn CacheBackend>, default_ttl: Duration) -> Self {
        Self {
            backend: Some(backend),
            default_ttl,
        }
    }

    #[must_use]
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Build the backend named by `config.backend`.
    #[must_use]
    pub fn from_config(config: &CacheConfig, store: &Store) -> Self {
        let ttl = Duration::from_secs(config.default_ttl_seconds);
        match config.backend.as_str() {
            "memory" => Self::new(Arc::new(MemoryCache::new()), ttl),
            "database" => Self::new(Arc::new(DatabaseCache::new(store.clone())), ttl),
            _ => Self::disabled(),
        }
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.backend.is_some()
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let backend = self.backend.as_ref()?;

        match backend.get(key).await {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(value) => Some(value),
                Err(e) => {
                    debug!(key, error = %e, "Discarding undecodable cache entry");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                debug!(key, backend = backend.name(), error = %e, "Cache read failed");
                None
            }
        }
    }

    pub async fn set<T: Serialize + Sync>(&self, key: &str, value: &T, ttl: Option<Duration>) {
        let Some(backend) = self.backend.as_ref() else {
            return;
        };

        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                debug!(key, error = %e, "Skipping unserializable cache value");
                return;
            }
        };

        if let Err(e) = backend
            .set(key, raw, ttl.unwrap_or(self.default_ttl))
            .await
        {
            debug!(key, backend = backend.name(), error = %e, "Cache write failed");
        }
    }

    pub async fn delete(&self, key: &str) {
        if let Some(backend) = self.backend.as_ref()
            && let Err(e) = backend.delete(key).await
        {
            debug!(key, backend = backend.name(), error = %e, "Cache delete failed");
        }
    }

    pub async fn delete_prefix(&self, prefix: &str) -> u64 {
        let Some(backend) = self.backend.as_ref() else {
            return 0;
        };

        backend.delete_prefix(prefix).await.unwrap_or_else(|e| {
            debug!(prefix, backend = backend.name(), error = %e, "Cache invalidation failed");
            0
        })
    }

    pub async fn stats(&self) -> CacheStats {
        let Some(backend) = self.backend.as_ref() else {
            return CacheStats {
                backend: "disabled",
                ..CacheStats::default()
            };
        };

        backend.stats().await.unwrap_or_else(|e| {
            debug!(backend = backend.name(), error = %e, "Cache stats unavailable");
            CacheStats {
                backend: backend.name(),
                ..CacheStats::default()
            }
        })
    }

    /// Cache-aside: return the cached value for `key`, or run `producer`,
    /// store its result and return it. Producer errors are never cached.
    pub async fn get_or_compute<T, E, F, Fut>(
        &self,
        key: &str,
        ttl: Option<Duration>,
        producer: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned + Sync,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(hit) = self.get(key).await {
            return Ok(hit);
        }

        let value = producer().await?;
        self.set(key, &value, ttl).await;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FailingBackend;

    #[async_trait]
    impl CacheBackend for FailingBackend {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn get(&self, _key: &str) -> Result<Option<String>> {
            anyhow::bail!("backend down")
        }

        async fn set(&self, _key: &str, _value: String, _ttl: Duration) -> Result<()> {
            anyhow::bail!("backend down")
        }

        async fn delete(&self, _key: &str) -> Result<()> {
            anyhow::bail!("backend down")
        }

        async fn delete_prefix(&self, _prefix: &str) -> Result<u64> {
            anyhow::bail!("backend down")
        }

        async fn stats(&self) -> Result<CacheStats> {
            anyhow::bail!("backend down")
        }
    }

    #[tokio::test]
    async fn get_or_compute_runs_producer_once() {
        let cache = Cache::new(Arc::new(MemoryCache::new()), Duration::from_secs(60));
        let calls = AtomicU32::new(0);

        for _ in 0..3 {
            let value: Result<Vec<i32>, std::convert::Infallible> = cache
                .get_or_compute("numbers", None, || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(vec![1, 2, 3])
                })
                .await;
            assert_eq!(value.unwrap(), vec![1, 2, 3]);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn producer_errors_are_not_cached() {
        let cache = Cache::new(Arc::new(MemoryCache::new()), Duration::from_secs(60));

        let first: Result<i32, String> = cache
            .get_or_compute("flaky", None, || async { Err("boom".to_string()) })
            .await;
        assert!(first.is_err());

        let second: Result<i32, String> = cache
            .get_or_compute("flaky", None, || async { Ok(7) })
            .await;
        assert_eq!(second.unwrap(), 7);
    }

    #[tokio::test]
    async fn failing_backend_degrades_to_miss() {
        let cache = Cache::new(Arc::new(FailingBackend), Duration::from_secs(60));

        assert!(cache.get::<i32>("anything").await.is_none());
        cache.set("anything", &1, None).await;
        assert_eq!(cache.delete_prefix("any").await, 0);

        let value: Result<i32, String> = cache
            .get_or_compute("anything", None, || async { Ok(42) })
            .await;
        assert_eq!(value.unwrap(), 42);
        assert_eq!(cache.stats().await.backend, "failing");
    }

    #[tokio::test]
    async fn disabled_cache_always_misses() {
        let cache = Cache::disabled();
        cache.set("key", &"value", None).await;
        assert!(cache.get::<String>("key").await.is_none());
        assert!(!cache.is_enabled());
        assert_eq!(cache.stats().await.backend, "disabled");
    }
}
