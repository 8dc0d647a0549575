use crate::entities::{cache_entries, prelude::*};
use anyhow::Result;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QuerySelect, Set,
    sea_query::{Expr, OnConflict},
};

/// Aggregate counters over the persisted cache table.
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheTableStats {
    pub entries: u64,
    pub hits: i64,
    pub misses: i64,
}

pub struct CacheRepository {
    conn: DatabaseConnection,
}

impl CacheRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Fetch a live entry and bump its hit counter. An expired entry counts
    /// as a miss on its row and stays until `purge_expired` or the next `set`.
    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        let now = chrono::Utc::now().to_rfc3339();

        let Some(entry) = CacheEntries::find()
            .filter(cache_entries::Column::CacheKey.eq(key))
            .one(&self.conn)
            .await?
        else {
            return Ok(None);
        };

        let expired = entry.expires_at <= now;
        let counter = if expired {
            cache_entries::Column::MissCount
        } else {
            cache_entries::Column::HitCount
        };

        CacheEntries::update_many()
            .col_expr(counter, Expr::col(counter).add(1))
            .col_expr(cache_entries::Column::LastAccessed, Expr::value(now))
            .filter(cache_entries::Column::Id.eq(entry.id))
            .exec(&self.conn)
            .await?;

        Ok((!expired).then_some(entry.value_json))
    }

    pub async fn set(&self, key: &str, value_json: String, ttl: std::time::Duration) -> Result<()> {
        let now = chrono::Utc::now();
        let expires_at = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| now.checked_add_signed(ttl))
            .ok_or_else(|| anyhow::anyhow!("Cache TTL out of range for '{key}'"))?
            .to_rfc3339();
        let now = now.to_rfc3339();

        let active_model = cache_entries::ActiveModel {
            cache_key: Set(key.to_string()),
            value_json: Set(value_json),
            expires_at: Set(expires_at),
            hit_count: Set(0),
            miss_count: Set(0),
            last_accessed: Set(now.clone()),
            created_at: Set(now),
            ..Default::default()
        };

        CacheEntries::insert(active_model)
            .on_conflict(
                OnConflict::column(cache_entries::Column::CacheKey)
                    .update_columns([
                        cache_entries::Column::ValueJson,
                        cache_entries::Column::ExpiresAt,
                        cache_entries::Column::LastAccessed,
                    ])
                    .to_owned(),
            )
            .exec(&self.conn)
            .await?;

        Ok(())
    }

    pub async fn delete(&self, key: &str) -> Result<bool> {
        let result = CacheEntries::delete_many()
            .filter(cache_entries::Column::CacheKey.eq(key))
            .exec(&self.conn)
            .await?;
        Ok(result.rows_affected > 0)
    }

    pub async fn delete_prefix(&self, prefix: &str) -> Result<u64> {
        let result = CacheEntries::delete_many()
            .filter(cache_entries::Column::CacheKey.starts_with(prefix))
            .exec(&self.conn)
            .await?;
        Ok(result.rows_affected)
    }

    pub async fn purge_expired(&self) -> Result<u64> {
        let now = chrono::Utc::now().to_rfc3339();
        let result = CacheEntries::delete_many()
            .filter(cache_entries::Column::ExpiresAt.lte(now))
            .exec(&self.conn)
            .await?;
        Ok(result.rows_affected)
    }

    pub async fn stats(&self) -> Result<CacheTableStats> {
        let entries = CacheEntries::find().count(&self.conn).await?;

        let totals: Option<(Option<i64>, Option<i64>)> = CacheEntries::find()
            .select_only()
            .column_as(cache_entries::Column::HitCount.sum(), "hits")
            .column_as(cache_entries::Column::MissCount.sum(), "misses")
            .into_tuple()
            .one(&self.conn)
            .await?;

        let (hits, misses) = totals.unwrap_or_default();
        Ok(CacheTableStats {
            entries,
            hits: hits.unwrap_or(0),
            misses: misses.unwrap_or(0),
        })
    }
}
