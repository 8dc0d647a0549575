use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

use super::{CacheBackend, CacheStats};
use crate::db::Store;

/// Cache persisted in the `cache_entries` table, shared by every process
/// pointing at the same database.
pub struct DatabaseCache {
    store: Store,
    misses: AtomicU64,
}

impl DatabaseCache {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self {
            store,
            misses: AtomicU64::new(0),
        }
    }
}

#[async_trait]
impl CacheBackend for DatabaseCache {
    fn name(&self) -> &'static str {
        "database"
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let value = self.store.cache_repo().get(key).await?;
        if value.is_none() {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        Ok(value)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
        self.store.cache_repo().set(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.store.cache_repo().delete(key).await?;
        Ok(())
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<u64> {
        self.store.cache_repo().delete_prefix(prefix).await
    }

    async fn stats(&self) -> Result<CacheStats> {
        let repo = self.store.cache_repo();
        repo.purge_expired().await?;
        let table = repo.stats().await?;

        Ok(CacheStats {
            backend: self.name(),
            entries: table.entries,
            hits: u64::try_from(table.hits).unwrap_or(0),
            misses: self.misses.load(Ordering::Relaxed),
        })
    }
}
