use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait, sea_query::Expr,
};
use serde::{Deserialize, Serialize};

use crate::domain::missions::mission_name;
use crate::domain::{GuildRank, MissionStatus};
use crate::entities::{mission_progress, users};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissionProgressRow {
    pub id: i32,
    pub user_id: i32,
    pub mission_id: i32,
    pub mission_name: String,
    pub status: MissionStatus,
    pub score: f64,
    pub started_at: Option<String>,
    pub completed_at: Option<String>,
    pub created_at: String,
}

impl From<mission_progress::Model> for MissionProgressRow {
    fn from(model: mission_progress::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            mission_id: model.mission_id,
            mission_name: model.mission_name,
            status: model.status.parse().unwrap_or_default(),
            score: model.score,
            started_at: model.started_at,
            completed_at: model.completed_at,
            created_at: model.created_at,
        }
    }
}

/// Progression totals after a completion was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletionRecord {
    pub experience_points: i32,
    pub missions_completed: i32,
    pub guild_rank: GuildRank,
}

#[derive(Debug, Clone)]
pub enum TransitionOutcome {
    Applied(MissionProgressRow),
    Rejected {
        from: MissionStatus,
        to: MissionStatus,
    },
}

pub struct MissionRepository {
    conn: DatabaseConnection,
}

impl MissionRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn list_for_user(&self, user_id: i32) -> Result<Vec<MissionProgressRow>> {
        let rows = mission_progress::Entity::find()
            .filter(mission_progress::Column::UserId.eq(user_id))
            .order_by_asc(mission_progress::Column::MissionId)
            .all(&self.conn)
            .await
            .context("Failed to list mission progress")?;

        Ok(rows.into_iter().map(MissionProgressRow::from).collect())
    }

    pub async fn list_all(&self) -> Result<Vec<MissionProgressRow>> {
        let rows = mission_progress::Entity::find()
            .order_by_asc(mission_progress::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to list mission progress")?;

        Ok(rows.into_iter().map(MissionProgressRow::from).collect())
    }

    pub async fn get(&self, user_id: i32, mission_id: i32) -> Result<Option<MissionProgressRow>> {
        let row = find_progress(&self.conn, user_id, mission_id).await?;
        Ok(row.map(MissionProgressRow::from))
    }

    /// Move a progress row to `next`, creating it in `not_started` first if absent.
    /// `next = None` keeps the current status and only records the score.
    pub async fn transition(
        &self,
        user_id: i32,
        mission_id: i32,
        next: Option<MissionStatus>,
        score: Option<f64>,
    ) -> Result<TransitionOutcome> {
        let txn = self.conn.begin().await?;
        let now = chrono::Utc::now().to_rfc3339();

        let existing = find_progress(&txn, user_id, mission_id).await?;
        let current = existing
            .as_ref()
            .map_or(MissionStatus::NotStarted, |row| {
                row.status.parse().unwrap_or_default()
            });
        let target = next.unwrap_or(current);

        if !current.can_transition_to(target) {
            return Ok(TransitionOutcome::Rejected {
                from: current,
                to: target,
            });
        }

        let model = if let Some(row) = existing {
            let started_at = row.started_at.clone();
            let mut active: mission_progress::ActiveModel = row.into();
            apply_status(&mut active, target, started_at.is_some(), &now);
            if let Some(score) = score {
                active.score = Set(score);
            }
            active.update(&txn).await?
        } else {
            let mut active = mission_progress::ActiveModel {
                user_id: Set(user_id),
                mission_id: Set(mission_id),
                mission_name: Set(mission_name(mission_id)),
                status: Set(MissionStatus::NotStarted.as_str().to_string()),
                score: Set(score.unwrap_or(0.0)),
                started_at: Set(None),
                completed_at: Set(None),
                created_at: Set(now.clone()),
                ..Default::default()
            };
            apply_status(&mut active, target, false, &now);
            active.insert(&txn).await?
        };

        txn.commit().await?;
        Ok(TransitionOutcome::Applied(MissionProgressRow::from(model)))
    }

    /// Award `experience` and one completion to `user_id`, re-derive the rank
    /// and mark the progress row completed, all in one transaction.
    ///
    /// Returns `None` when the user does not exist; nothing is written then.
    pub async fn complete(
        &self,
        user_id: i32,
        mission_id: i32,
        score: f64,
        experience: i32,
    ) -> Result<Option<CompletionRecord>> {
        let txn = self.conn.begin().await?;
        let now = chrono::Utc::now().to_rfc3339();

        let result = users::Entity::update_many()
            .col_expr(
                users::Column::ExperiencePoints,
                Expr::col(users::Column::ExperiencePoints).add(experience),
            )
            .col_expr(
                users::Column::MissionsCompleted,
                Expr::col(users::Column::MissionsCompleted).add(1),
            )
            .col_expr(users::Column::UpdatedAt, Expr::value(now.clone()))
            .filter(users::Column::Id.eq(user_id))
            .exec(&txn)
            .await
            .context("Failed to apply mission reward")?;

        if result.rows_affected == 0 {
            txn.rollback().await?;
            return Ok(None);
        }

        let user = users::Entity::find_by_id(user_id)
            .one(&txn)
            .await?
            .ok_or_else(|| anyhow::anyhow!("User {user_id} vanished during completion"))?;

        let guild_rank = GuildRank::for_missions_completed(user.missions_completed);
        let record = CompletionRecord {
            experience_points: user.experience_points,
            missions_completed: user.missions_completed,
            guild_rank,
        };

        if user.guild_rank != guild_rank.as_str() {
            let mut active: users::ActiveModel = user.into();
            active.guild_rank = Set(guild_rank.as_str().to_string());
            active.update(&txn).await?;
        }

        match find_progress(&txn, user_id, mission_id).await? {
            Some(row) => {
                let started = row.started_at.is_some();
                let mut active: mission_progress::ActiveModel = row.into();
                apply_status(&mut active, MissionStatus::Completed, started, &now);
                active.score = Set(score);
                active.update(&txn).await?;
            }
            None => {
                mission_progress::ActiveModel {
                    user_id: Set(user_id),
                    mission_id: Set(mission_id),
                    mission_name: Set(mission_name(mission_id)),
                    status: Set(MissionStatus::Completed.as_str().to_string()),
                    score: Set(score),
                    started_at: Set(Some(now.clone())),
                    completed_at: Set(Some(now.clone())),
                    created_at: Set(now.clone()),
                    ..Default::default()
                }
                .insert(&txn)
                .await?;
            }
        }

        txn.commit().await?;
        Ok(Some(record))
    }
}

async fn find_progress<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
    mission_id: i32,
) -> Result<Option<mission_progress::Model>> {
    mission_progress::Entity::find()
        .filter(mission_progress::Column::UserId.eq(user_id))
        .filter(mission_progress::Column::MissionId.eq(mission_id))
        .one(conn)
        .await
        .context("Failed to query mission progress")
}

fn apply_status(
    active: &mut mission_progress::ActiveModel,
    status: MissionStatus,
    already_started: bool,
    now: &str,
) {
    active.status = Set(status.as_str().to_string());
    match status {
        MissionStatus::NotStarted => {}
        MissionStatus::InProgress => {
            if !already_started {
                active.started_at = Set(Some(now.to_string()));
            }
        }
        MissionStatus::Completed => {
            if !already_started {
                active.started_at = Set(Some(now.to_string()));
            }
            active.completed_at = Set(Some(now.to_string()));
        }
    }
}
