use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(MissionProgress::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(MissionProgress::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(MissionProgress::UserId).integer().not_null())
                    .col(ColumnDef::new(MissionProgress::MissionId).integer().not_null())
                    .col(ColumnDef::new(MissionProgress::MissionName).string().not_null())
                    .col(
                        ColumnDef::new(MissionProgress::Status)
                            .string()
                            .not_null()
                            .default("not_started"),
                    )
                    .col(
                        ColumnDef::new(MissionProgress::Score)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(ColumnDef::new(MissionProgress::StartedAt).string().null())
                    .col(ColumnDef::new(MissionProgress::CompletedAt).string().null())
                    .col(ColumnDef::new(MissionProgress::CreatedAt).string().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_mission_progress_user")
                            .from(MissionProgress::Table, MissionProgress::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // One progress row per (user, mission)
        manager
            .create_index(
                Index::create()
                    .name("idx_mission_progress_user_mission")
                    .table(MissionProgress::Table)
                    .col(MissionProgress::UserId)
                    .col(MissionProgress::MissionId)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(MissionProgress::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum MissionProgress {
    Table,
    Id,
    UserId,
    MissionId,
    MissionName,
    Status,
    Score,
    StartedAt,
    CompletedAt,
    CreatedAt,
}

#[derive(Iden)]
enum Users {
    Table,
    Id,
}
