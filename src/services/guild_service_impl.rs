//! `SeaORM` implementation of the `GuildService` trait.

use async_trait::async_trait;
use tracing::info;

use crate::cache::Cache;
use crate::constants::cache::ANALYTICS_PREFIX;
use crate::db::{MissionProgressRow, Store, TransitionOutcome, User};
use crate::domain::{MissionStatus, experience_for_score, missions::mission_name};
use crate::services::auth_service::require_active;
use crate::services::guild_service::{
    CompletionOutcome, GuildError, GuildService, ProgressUpdate, validate_mission_id,
    validate_score,
};

pub struct SeaOrmGuildService {
    store: Store,
    cache: Cache,
}

impl SeaOrmGuildService {
    #[must_use]
    pub const fn new(store: Store, cache: Cache) -> Self {
        Self { store, cache }
    }

    /// Active actor acting on their own records, or an active admin.
    fn authorize(actor: &User, user_id: i32) -> Result<(), GuildError> {
        require_active(actor)?;
        if actor.can_act_for(user_id) {
            Ok(())
        } else {
            Err(GuildError::Forbidden(
                "Not enough permissions to act for this user".to_string(),
            ))
        }
    }

    async fn ensure_user(&self, user_id: i32) -> Result<(), GuildError> {
        self.store
            .get_user(user_id)
            .await?
            .map(|_| ())
            .ok_or(GuildError::UserNotFound(user_id))
    }

    async fn transition(
        &self,
        user_id: i32,
        mission_id: i32,
        next: Option<MissionStatus>,
        score: Option<f64>,
    ) -> Result<MissionProgressRow, GuildError> {
        match self
            .store
            .transition_progress(user_id, mission_id, next, score)
            .await?
        {
            TransitionOutcome::Applied(row) => {
                self.cache.delete_prefix(ANALYTICS_PREFIX).await;
                Ok(row)
            }
            TransitionOutcome::Rejected { from, to } => Err(GuildError::Validation(format!(
                "Cannot move mission from {from} to {to}"
            ))),
        }
    }
}

#[async_trait]
impl GuildService for SeaOrmGuildService {
    async fn complete_mission(
        &self,
        actor: &User,
        user_id: i32,
        mission_id: i32,
        score: f64,
    ) -> Result<CompletionOutcome, GuildError> {
        Self::authorize(actor, user_id)?;
        validate_mission_id(mission_id)?;
        validate_score(score)?;

        let experience = experience_for_score(score);
        let record = self
            .store
            .complete_mission(user_id, mission_id, score, experience)
            .await?
            .ok_or(GuildError::UserNotFound(user_id))?;

        self.cache.delete_prefix(ANALYTICS_PREFIX).await;
        metrics::counter!("missions_completed_total").increment(1);

        let name = mission_name(mission_id);
        info!(
            user_id,
            mission_id,
            experience,
            total_experience = record.experience_points,
            guild_rank = %record.guild_rank,
            "Mission completed"
        );

        Ok(CompletionOutcome {
            message: format!("Mission '{name}' completed!"),
            experience_earned: experience,
            total_experience: record.experience_points,
            guild_rank: record.guild_rank,
            missions_completed: record.missions_completed,
        })
    }

    async fn list_progress(
        &self,
        actor: &User,
        user_id: i32,
    ) -> Result<Vec<MissionProgressRow>, GuildError> {
        Self::authorize(actor, user_id)?;
        self.ensure_user(user_id).await?;
        Ok(self.store.list_progress(user_id).await?)
    }

    async fn start_mission(
        &self,
        actor: &User,
        user_id: i32,
        mission_id: i32,
    ) -> Result<MissionProgressRow, GuildError> {
        Self::authorize(actor, user_id)?;
        validate_mission_id(mission_id)?;
        self.ensure_user(user_id).await?;

        let row = self
            .transition(user_id, mission_id, Some(MissionStatus::InProgress), None)
            .await?;
        info!(user_id, mission_id, "Mission started");
        Ok(row)
    }

    async fn update_progress(
        &self,
        actor: &User,
        user_id: i32,
        mission_id: i32,
        update: ProgressUpdate,
    ) -> Result<MissionProgressRow, GuildError> {
        Self::authorize(actor, user_id)?;
        validate_mission_id(mission_id)?;
        if let Some(score) = update.score {
            validate_score(score)?;
        }
        self.ensure_user(user_id).await?;

        self.transition(user_id, mission_id, update.status, update.score)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SecurityConfig;
    use crate::db::NewUser;
    use crate::domain::GuildRank;

    fn security() -> SecurityConfig {
        SecurityConfig {
            argon2_memory_cost_kib: 1024,
            argon2_time_cost: 1,
            ..SecurityConfig::default()
        }
    }

    async fn member(store: &Store, username: &str, is_admin: bool) -> User {
        store
            .create_user(
                NewUser {
                    username: username.to_string(),
                    email: format!("{username}@example.com"),
                    password: "password123".to_string(),
                    full_name: None,
                    is_admin,
                },
                &security(),
            )
            .await
            .unwrap()
    }

    async fn setup() -> (Store, SeaOrmGuildService) {
        let store = Store::new("sqlite::memory:").await.unwrap();
        let service = SeaOrmGuildService::new(store.clone(), Cache::disabled());
        (store, service)
    }

    #[tokio::test]
    async fn three_completions_reach_adept() {
        let (store, service) = setup().await;
        let alice = member(&store, "alice", false).await;

        let mut last = None;
        for mission_id in 1..=3 {
            last = Some(
                service
                    .complete_mission(&alice, alice.id, mission_id, 100.0)
                    .await
                    .unwrap(),
            );
        }

        let last = last.unwrap();
        assert_eq!(last.experience_earned, 10);
        assert_eq!(last.total_experience, 30);
        assert_eq!(last.missions_completed, 3);
        assert_eq!(last.guild_rank, GuildRank::Adept);
        assert_eq!(last.message, "Mission 'Seal of the Keeper' completed!");
    }

    #[tokio::test]
    async fn fractional_experience_truncates() {
        let (store, service) = setup().await;
        let alice = member(&store, "alice", false).await;

        let outcome = service
            .complete_mission(&alice, alice.id, 1, 95.0)
            .await
            .unwrap();
        assert_eq!(outcome.experience_earned, 9);
        assert_eq!(outcome.total_experience, 9);
    }

    #[tokio::test]
    async fn repeated_mission_still_counts() {
        let (store, service) = setup().await;
        let alice = member(&store, "alice", false).await;

        for _ in 0..3 {
            service
                .complete_mission(&alice, alice.id, 1, 100.0)
                .await
                .unwrap();
        }

        let alice = store.get_user(alice.id).await.unwrap().unwrap();
        assert_eq!(alice.missions_completed, 3);
        assert_eq!(alice.guild_rank, GuildRank::Adept);
        assert_eq!(store.list_progress(alice.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn non_owner_cannot_complete() {
        let (store, service) = setup().await;
        let alice = member(&store, "alice", false).await;
        let bob = member(&store, "bob", false).await;

        let result = service.complete_mission(&alice, bob.id, 1, 100.0).await;
        assert!(matches!(result, Err(GuildError::Forbidden(_))));

        let bob = store.get_user(bob.id).await.unwrap().unwrap();
        assert_eq!(bob.experience_points, 0);
        assert_eq!(bob.missions_completed, 0);
        assert!(store.list_progress(bob.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn admin_completes_for_others() {
        let (store, service) = setup().await;
        let admin = member(&store, "warden", true).await;
        let bob = member(&store, "bob", false).await;

        let outcome = service
            .complete_mission(&admin, bob.id, 4, 250.0)
            .await
            .unwrap();
        assert_eq!(outcome.total_experience, 25);

        assert!(matches!(
            service.complete_mission(&admin, 9999, 1, 100.0).await,
            Err(GuildError::UserNotFound(9999))
        ));
    }

    #[tokio::test]
    async fn inactive_actor_is_forbidden() {
        let (store, service) = setup().await;
        let alice = member(&store, "alice", false).await;
        let alice = store.set_user_active(alice.id, false).await.unwrap().unwrap();

        assert!(matches!(
            service.complete_mission(&alice, alice.id, 1, 100.0).await,
            Err(GuildError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn invalid_input_is_rejected_before_writes() {
        let (store, service) = setup().await;
        let alice = member(&store, "alice", false).await;

        assert!(matches!(
            service.complete_mission(&alice, alice.id, 0, 100.0).await,
            Err(GuildError::Validation(_))
        ));
        assert!(matches!(
            service.complete_mission(&alice, alice.id, 1, -5.0).await,
            Err(GuildError::Validation(_))
        ));

        let alice = store.get_user(alice.id).await.unwrap().unwrap();
        assert_eq!(alice.missions_completed, 0);
    }

    #[tokio::test]
    async fn ledger_state_machine() {
        let (store, service) = setup().await;
        let alice = member(&store, "alice", false).await;

        let row = service.start_mission(&alice, alice.id, 5).await.unwrap();
        assert_eq!(row.status, MissionStatus::InProgress);

        let row = service
            .update_progress(
                &alice,
                alice.id,
                5,
                ProgressUpdate {
                    status: Some(MissionStatus::Completed),
                    score: Some(70.0),
                },
            )
            .await
            .unwrap();
        assert_eq!(row.status, MissionStatus::Completed);

        assert!(matches!(
            service.start_mission(&alice, alice.id, 5).await,
            Err(GuildError::Validation(_))
        ));

        // Ledger updates never award experience.
        let alice = store.get_user(alice.id).await.unwrap().unwrap();
        assert_eq!(alice.experience_points, 0);

        let rows = service.list_progress(&alice, alice.id).await.unwrap();
        assert_eq!(rows.len(), 1);
    }
}
