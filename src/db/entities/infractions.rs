use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Kind of moderation action. Persisted as an integer in the `type` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "i32", db_type = "Integer")]
pub enum InfractionType {
    #[sea_orm(num_value = 1)]
    Kick,
    #[sea_orm(num_value = 2)]
    TempBan,
    #[sea_orm(num_value = 3)]
    SoftBan,
    #[sea_orm(num_value = 4)]
    Ban,
}

impl std::fmt::Display for InfractionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InfractionType::Kick => write!(f, "KICK"),
            InfractionType::TempBan => write!(f, "TEMPBAN"),
            InfractionType::SoftBan => write!(f, "SOFTBAN"),
            InfractionType::Ban => write!(f, "BAN"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, Eq)]
#[sea_orm(table_name = "infractions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub guild_id: i64,
    // Target is not a foreign key: banned-by-id users may never have been observed.
    pub user_id: i64,
    pub actor_id: Option<i64>,
    #[sea_orm(column_name = "type")]
    pub kind: InfractionType,
    pub reason: Option<String>,
    pub expires_at: Option<DateTime>,
    pub created_at: DateTime,
    pub active: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::guild_configs::Entity",
        from = "Column::GuildId",
        to = "super::guild_configs::Column::GuildId"
    )]
    Guild,
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::ActorId",
        to = "super::users::Column::UserId"
    )]
    Actor,
}

impl Related<super::guild_configs::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Guild.def()
    }
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Actor.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
