use crate::db::entities::guild_configs;
use poise::serenity_prelude as serenity;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ConnectionTrait, DbErr, EntityTrait, Set};

/// Creates the guild row if it does not exist yet. Existing rows are left as-is.
pub async fn ensure_guild<C: ConnectionTrait>(
    db: &C,
    guild_id: serenity::GuildId,
) -> Result<(), DbErr> {
    let model = guild_configs::ActiveModel {
        guild_id: Set(guild_id.get() as i64),
        log_channel_id: Set(None),
    };

    guild_configs::Entity::insert(model)
        .on_conflict(
            OnConflict::column(guild_configs::Column::GuildId)
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;

    Ok(())
}

pub async fn set_log_channel<C: ConnectionTrait>(
    db: &C,
    guild_id: serenity::GuildId,
    channel_id: Option<serenity::ChannelId>,
) -> Result<(), DbErr> {
    let model = guild_configs::ActiveModel {
        guild_id: Set(guild_id.get() as i64),
        log_channel_id: Set(channel_id.map(|c| c.get() as i64)),
    };

    guild_configs::Entity::insert(model)
        .on_conflict(
            OnConflict::column(guild_configs::Column::GuildId)
                .update_column(guild_configs::Column::LogChannelId)
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;

    Ok(())
}

pub async fn log_channel<C: ConnectionTrait>(
    db: &C,
    guild_id: serenity::GuildId,
) -> Result<Option<serenity::ChannelId>, DbErr> {
    let config = guild_configs::Entity::find_by_id(guild_id.get() as i64)
        .one(db)
        .await?;

    Ok(config
        .and_then(|c| c.log_channel_id)
        .map(|id| serenity::ChannelId::new(id as u64)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_connection;
    use sea_orm::PaginatorTrait;

    #[tokio::test]
    async fn test_ensure_guild_is_idempotent_and_keeps_channel() {
        let db = test_connection().await;
        let guild = serenity::GuildId::new(100);

        ensure_guild(&db, guild).await.unwrap();
        set_log_channel(&db, guild, Some(serenity::ChannelId::new(555)))
            .await
            .unwrap();
        ensure_guild(&db, guild).await.unwrap();

        assert_eq!(guild_configs::Entity::find().count(&db).await.unwrap(), 1);
        assert_eq!(
            log_channel(&db, guild).await.unwrap(),
            Some(serenity::ChannelId::new(555))
        );
    }

    #[tokio::test]
    async fn test_unconfigured_guild_has_no_log_channel() {
        let db = test_connection().await;
        assert_eq!(
            log_channel(&db, serenity::GuildId::new(1)).await.unwrap(),
            None
        );

        set_log_channel(&db, serenity::GuildId::new(1), None).await.unwrap();
        assert_eq!(
            log_channel(&db, serenity::GuildId::new(1)).await.unwrap(),
            None
        );
    }
}
