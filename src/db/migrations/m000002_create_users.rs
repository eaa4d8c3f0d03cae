use sea_orm::{ConnectionTrait, DatabaseBackend, Statement};
use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Users::UserId)
                            .big_integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Users::Username).text().not_null())
                    .col(ColumnDef::new(Users::Discriminator).small_integer().not_null())
                    .col(ColumnDef::new(Users::Avatar).text())
                    .col(ColumnDef::new(Users::Bot).boolean().not_null())
                    .col(ColumnDef::new(Users::CreatedAt).date_time().not_null())
                    .to_owned(),
            )
            .await?;

        // Trigram index for fuzzy username search. Postgres only.
        let db_backend = manager.get_database_backend();
        if db_backend == DatabaseBackend::Postgres {
            let conn = manager.get_connection();
            conn.execute(Statement::from_string(
                db_backend,
                "CREATE EXTENSION IF NOT EXISTS pg_trgm;".to_owned(),
            ))
            .await?;
            conn.execute(Statement::from_string(
                db_backend,
                r#"CREATE INDEX IF NOT EXISTS "users_username_trgm" ON "users" USING gin ("username" gin_trgm_ops);"#
                    .to_owned(),
            ))
            .await?;
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub(super) enum Users {
    Table,
    UserId,
    Username,
    Discriminator,
    Avatar,
    Bot,
    CreatedAt,
}
