use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub username: String,

    #[sea_orm(unique)]
    pub email: String,

    /// Argon2id password hash
    pub password_hash: String,

    pub full_name: Option<String>,

    pub is_active: bool,

    pub is_admin: bool,

    /// Derived from `missions_completed`, never written from client input.
    pub guild_rank: String,

    pub experience_points: i32,

    pub missions_completed: i32,

    pub created_at: String,

    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::mission_progress::Entity")]
    MissionProgress,
}

impl Related<super::mission_progress::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MissionProgress.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
