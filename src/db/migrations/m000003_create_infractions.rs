use super::m000001_create_guild_table::GuildConfigs;
use super::m000002_create_users::Users;
use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Infractions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Infractions::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Infractions::GuildId).big_integer().not_null())
                    .col(ColumnDef::new(Infractions::UserId).big_integer().not_null())
                    .col(ColumnDef::new(Infractions::ActorId).big_integer())
                    .col(ColumnDef::new(Infractions::Type).integer().not_null())
                    .col(ColumnDef::new(Infractions::Reason).text())
                    .col(ColumnDef::new(Infractions::ExpiresAt).date_time())
                    .col(ColumnDef::new(Infractions::CreatedAt).date_time().not_null())
                    .col(
                        ColumnDef::new(Infractions::Active)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-infractions-guild")
                            .from(Infractions::Table, Infractions::GuildId)
                            .to(GuildConfigs::Table, GuildConfigs::GuildId)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-infractions-actor")
                            .from(Infractions::Table, Infractions::ActorId)
                            .to(Users::Table, Users::UserId)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-infractions-guild-user")
                    .table(Infractions::Table)
                    .col(Infractions::GuildId)
                    .col(Infractions::UserId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Infractions::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Infractions {
    Table,
    Id,
    GuildId,
    UserId,
    ActorId,
    Type,
    Reason,
    ExpiresAt,
    CreatedAt,
    Active,
}
