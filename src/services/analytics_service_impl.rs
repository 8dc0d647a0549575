//! `SeaORM` implementation of the `AnalyticsService` trait.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::time::Duration;

use crate::cache::Cache;
use crate::constants::cache::{
    MISSION_STATS_KEY, USER_STATS_KEY, leaderboard_key, performance_key,
};
use crate::db::{MissionProgressRow, Store};
use crate::domain::MissionStatus;
use crate::services::analytics_service::{
    AnalyticsError, AnalyticsService, Leaderboard, LeaderboardEntry, MissionStats,
    MissionStatsReport, UserPerformance, UserStats, percentage, round2,
};

pub struct SeaOrmAnalyticsService {
    store: Store,
    cache: Cache,
    ttl: Duration,
}

impl SeaOrmAnalyticsService {
    #[must_use]
    pub const fn new(store: Store, cache: Cache, ttl: Duration) -> Self {
        Self { store, cache, ttl }
    }

    async fn compute_user_stats(&self) -> Result<UserStats, AnalyticsError> {
        let users = self.store.list_all_users().await?;
        if users.is_empty() {
            return Ok(UserStats {
                total_users: 0,
                active_users: 0,
                total_missions_completed: 0,
                average_experience: 0.0,
            });
        }

        let total_users = users.len() as u64;
        let active_users = users.iter().filter(|u| u.is_active).count() as u64;
        let total_missions_completed = users
            .iter()
            .map(|u| i64::from(u.missions_completed))
            .sum();
        let total_experience: i64 = users.iter().map(|u| i64::from(u.experience_points)).sum();

        #[allow(clippy::cast_precision_loss)]
        let average_experience = round2(total_experience as f64 / total_users as f64);

        Ok(UserStats {
            total_users,
            active_users,
            total_missions_completed,
            average_experience,
        })
    }

    async fn compute_mission_stats(&self) -> Result<MissionStatsReport, AnalyticsError> {
        #[derive(Default)]
        struct Bucket {
            name: String,
            attempts: u64,
            completed: u64,
            score_sum: f64,
        }

        let rows = self.store.list_all_progress().await?;
        let mut buckets: BTreeMap<i32, Bucket> = BTreeMap::new();

        for row in rows {
            let bucket = buckets.entry(row.mission_id).or_default();
            if bucket.name.is_empty() {
                bucket.name = row.mission_name;
            }
            bucket.attempts += 1;
            bucket.score_sum += row.score;
            if row.status == MissionStatus::Completed {
                bucket.completed += 1;
            }
        }

        #[allow(clippy::cast_precision_loss)]
        let missions = buckets
            .into_iter()
            .map(|(mission_id, bucket)| MissionStats {
                mission_id,
                mission_name: bucket.name,
                total_attempts: bucket.attempts,
                completion_rate: percentage(bucket.completed, bucket.attempts),
                average_score: round2(bucket.score_sum / bucket.attempts as f64),
            })
            .collect();

        Ok(MissionStatsReport { missions })
    }

    async fn compute_performance(&self, user_id: i32) -> Result<UserPerformance, AnalyticsError> {
        let user = self
            .store
            .get_user(user_id)
            .await?
            .ok_or(AnalyticsError::UserNotFound(user_id))?;

        let missions = self.store.list_progress(user_id).await?;
        let completed: Vec<&MissionProgressRow> = missions
            .iter()
            .filter(|row| row.status == MissionStatus::Completed)
            .collect();

        let attempted = missions.len() as u64;
        let completed_count = completed.len() as u64;

        #[allow(clippy::cast_precision_loss)]
        let average_score = if completed.is_empty() {
            0.0
        } else {
            round2(completed.iter().map(|row| row.score).sum::<f64>() / completed.len() as f64)
        };

        Ok(UserPerformance {
            user_id,
            username: user.username,
            guild_rank: user.guild_rank,
            total_experience: user.experience_points,
            missions_attempted: attempted,
            missions_completed: completed_count,
            completion_rate: percentage(completed_count, attempted),
            average_score,
            missions,
        })
    }

    async fn compute_leaderboard(&self, limit: u64) -> Result<Leaderboard, AnalyticsError> {
        let users = self.store.leaderboard(limit).await?;

        let leaderboard = users
            .into_iter()
            .zip(1..)
            .map(|(user, rank)| LeaderboardEntry {
                rank,
                user_id: user.id,
                username: user.username,
                guild_rank: user.guild_rank,
                experience_points: user.experience_points,
                missions_completed: user.missions_completed,
            })
            .collect();

        Ok(Leaderboard { leaderboard })
    }
}

#[async_trait]
impl AnalyticsService for SeaOrmAnalyticsService {
    async fn user_stats(&self) -> Result<UserStats, AnalyticsError> {
        self.cache
            .get_or_compute(USER_STATS_KEY, Some(self.ttl), || {
                self.compute_user_stats()
            })
            .await
    }

    async fn mission_stats(&self) -> Result<MissionStatsReport, AnalyticsError> {
        self.cache
            .get_or_compute(MISSION_STATS_KEY, Some(self.ttl), || {
                self.compute_mission_stats()
            })
            .await
    }

    async fn user_performance(&self, user_id: i32) -> Result<UserPerformance, AnalyticsError> {
        self.cache
            .get_or_compute(&performance_key(user_id), Some(self.ttl), || {
                self.compute_performance(user_id)
            })
            .await
    }

    async fn leaderboard(&self, limit: u64) -> Result<Leaderboard, AnalyticsError> {
        self.cache
            .get_or_compute(&leaderboard_key(limit), Some(self.ttl), || {
                self.compute_leaderboard(limit)
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::config::SecurityConfig;
    use crate::constants::cache::ANALYTICS_PREFIX;
    use crate::db::NewUser;
    use std::sync::Arc;

    fn security() -> SecurityConfig {
        SecurityConfig {
            argon2_memory_cost_kib: 1024,
            argon2_time_cost: 1,
            ..SecurityConfig::default()
        }
    }

    async fn member(store: &Store, username: &str) -> i32 {
        store
            .create_user(
                NewUser {
                    username: username.to_string(),
                    email: format!("{username}@example.com"),
                    password: "password123".to_string(),
                    full_name: None,
                    is_admin: false,
                },
                &security(),
            )
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn empty_guild() {
        let store = Store::new("sqlite::memory:").await.unwrap();
        let service = SeaOrmAnalyticsService::new(store, Cache::disabled(), Duration::from_secs(60));

        let stats = service.user_stats().await.unwrap();
        assert_eq!(stats.total_users, 0);
        assert!(stats.average_experience.abs() < f64::EPSILON);
        assert!(service.mission_stats().await.unwrap().missions.is_empty());
        assert!(service.leaderboard(10).await.unwrap().leaderboard.is_empty());
    }

    #[tokio::test]
    async fn stats_over_progress() {
        let store = Store::new("sqlite::memory:").await.unwrap();
        let alice = member(&store, "alice").await;
        let bob = member(&store, "bob").await;

        store.complete_mission(alice, 1, 100.0, 10).await.unwrap();
        store.complete_mission(alice, 2, 80.0, 8).await.unwrap();
        store.complete_mission(bob, 1, 60.0, 6).await.unwrap();
        store
            .transition_progress(bob, 2, Some(MissionStatus::InProgress), None)
            .await
            .unwrap();

        let service = SeaOrmAnalyticsService::new(store, Cache::disabled(), Duration::from_secs(60));

        let users = service.user_stats().await.unwrap();
        assert_eq!(users.total_users, 2);
        assert_eq!(users.active_users, 2);
        assert_eq!(users.total_missions_completed, 3);
        assert!((users.average_experience - 12.0).abs() < f64::EPSILON);

        let missions = service.mission_stats().await.unwrap().missions;
        assert_eq!(missions.len(), 2);
        assert_eq!(missions[0].mission_id, 1);
        assert_eq!(missions[0].total_attempts, 2);
        assert!((missions[0].completion_rate - 100.0).abs() < f64::EPSILON);
        assert!((missions[0].average_score - 80.0).abs() < f64::EPSILON);
        assert!((missions[1].completion_rate - 50.0).abs() < f64::EPSILON);

        let performance = service.user_performance(bob).await.unwrap();
        assert_eq!(performance.missions_attempted, 2);
        assert_eq!(performance.missions_completed, 1);
        assert!((performance.completion_rate - 50.0).abs() < f64::EPSILON);
        assert!((performance.average_score - 60.0).abs() < f64::EPSILON);

        let board = service.leaderboard(10).await.unwrap().leaderboard;
        assert_eq!(board[0].username, "alice");
        assert_eq!(board[0].rank, 1);
        assert_eq!(board[1].rank, 2);

        assert!(matches!(
            service.user_performance(9999).await,
            Err(AnalyticsError::UserNotFound(9999))
        ));
    }

    #[tokio::test]
    async fn cached_until_invalidated() {
        let store = Store::new("sqlite::memory:").await.unwrap();
        let cache = Cache::new(Arc::new(MemoryCache::new()), Duration::from_secs(60));
        let service =
            SeaOrmAnalyticsService::new(store.clone(), cache.clone(), Duration::from_secs(60));

        assert_eq!(service.user_stats().await.unwrap().total_users, 0);
        member(&store, "alice").await;
        assert_eq!(service.user_stats().await.unwrap().total_users, 0);

        cache.delete_prefix(ANALYTICS_PREFIX).await;
        assert_eq!(service.user_stats().await.unwrap().total_users, 1);
    }
}
