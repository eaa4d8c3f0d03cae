pub mod m000001_create_guild_table;
pub mod m000002_create_users;
pub mod m000003_create_infractions;

use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m000001_create_guild_table::Migration),
            Box::new(m000002_create_users::Migration),
            Box::new(m000003_create_infractions::Migration),
        ]
    }
}
