use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, Eq)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: i64,
    pub username: String,
    pub discriminator: i16,
    pub avatar: Option<String>,
    pub bot: bool,
    pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::infractions::Entity")]
    ActedInfractions,
}

impl Related<super::infractions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ActedInfractions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
