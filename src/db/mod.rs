use crate::config::DatabaseConfig;
use sea_orm::{Database, DatabaseConnection};
use std::time::Duration;
use tracing::info;

pub mod entities;
pub mod migrations;

pub async fn establish_connection(
    config: &DatabaseConfig,
) -> Result<DatabaseConnection, sea_orm::DbErr> {
    let mut opt = sea_orm::ConnectOptions::new(config.url.clone());
    opt.max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
        .sqlx_logging(true)
        .sqlx_logging_level(tracing::log::LevelFilter::Debug);

    info!("Connecting to database...");
    let db = Database::connect(opt).await?;
    info!("Database connection established");

    Ok(db)
}

/// Fresh in-memory SQLite database with every migration applied.
#[cfg(test)]
pub async fn test_connection() -> DatabaseConnection {
    use sea_orm_migration::MigratorTrait;

    let mut opt = sea_orm::ConnectOptions::new("sqlite::memory:".to_owned());
    // A single connection keeps every query on the same in-memory database.
    opt.max_connections(1).min_connections(1).sqlx_logging(false);

    let db = Database::connect(opt)
        .await
        .expect("in-memory sqlite should open");
    migrations::Migrator::up(&db, None)
        .await
        .expect("migrations should apply on sqlite");
    db
}
