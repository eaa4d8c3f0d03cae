use poise::serenity_prelude as serenity;
use std::sync::Arc;

/// Punitive calls against the chat platform.
#[async_trait::async_trait]
pub trait ModerationPlatform: Send + Sync {
    async fn kick(
        &self,
        guild_id: serenity::GuildId,
        user_id: serenity::UserId,
        reason: Option<&str>,
    ) -> anyhow::Result<()>;

    async fn ban(
        &self,
        guild_id: serenity::GuildId,
        user_id: serenity::UserId,
        delete_message_days: u8,
        reason: Option<&str>,
    ) -> anyhow::Result<()>;

    async fn unban(
        &self,
        guild_id: serenity::GuildId,
        user_id: serenity::UserId,
    ) -> anyhow::Result<()>;
}

/// Discord REST implementation.
pub struct SerenityPlatform {
    http: Arc<serenity::Http>,
}

impl SerenityPlatform {
    pub fn new(http: Arc<serenity::Http>) -> Self {
        Self { http }
    }
}

#[async_trait::async_trait]
impl ModerationPlatform for SerenityPlatform {
    async fn kick(
        &self,
        guild_id: serenity::GuildId,
        user_id: serenity::UserId,
        reason: Option<&str>,
    ) -> anyhow::Result<()> {
        match reason {
            Some(reason) => guild_id.kick_with_reason(&*self.http, user_id, reason).await?,
            None => guild_id.kick(&*self.http, user_id).await?,
        }
        Ok(())
    }

    async fn ban(
        &self,
        guild_id: serenity::GuildId,
        user_id: serenity::UserId,
        delete_message_days: u8,
        reason: Option<&str>,
    ) -> anyhow::Result<()> {
        match reason {
            Some(reason) => {
                guild_id
                    .ban_with_reason(&*self.http, user_id, delete_message_days, reason)
                    .await?
            }
            None => guild_id.ban(&*self.http, user_id, delete_message_days).await?,
        }
        Ok(())
    }

    async fn unban(
        &self,
        guild_id: serenity::GuildId,
        user_id: serenity::UserId,
    ) -> anyhow::Result<()> {
        guild_id.unban(&*self.http, user_id).await?;
        Ok(())
    }
}
